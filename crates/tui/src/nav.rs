/// Bottom tab of the signed-in area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Home,
    Crops,
    Profile,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::Home, Tab::Crops, Tab::Profile];

    pub fn title(&self) -> &'static str {
        match self {
            Tab::Home => "Home",
            Tab::Crops => "Crops",
            Tab::Profile => "Profile",
        }
    }

    fn index(&self) -> usize {
        match self {
            Tab::Home => 0,
            Tab::Crops => 1,
            Tab::Profile => 2,
        }
    }

    fn root(&self) -> Route {
        match self {
            Tab::Home => Route::Home,
            Tab::Crops => Route::Crops,
            Tab::Profile => Route::Profile,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Crops,
    CropDetail { crop_id: String },
    /// `crop_id` is set when editing an existing crop.
    CropForm { crop_id: Option<String> },
    Profile,
}

impl Route {
    /// Detail and form routes take the whole screen.
    pub fn shows_tab_bar(&self) -> bool {
        !matches!(self, Route::CropDetail { .. } | Route::CropForm { .. })
    }
}

/// One route stack per tab.
#[derive(Debug, Clone)]
pub struct Navigator {
    active: Tab,
    stacks: [Vec<Route>; 3],
}

impl Default for Navigator {
    fn default() -> Self {
        Self::rooted_at(Tab::Home)
    }
}

impl Navigator {
    fn rooted_at(tab: Tab) -> Self {
        Self {
            active: tab,
            stacks: Tab::ALL.map(|tab| vec![tab.root()]),
        }
    }

    pub fn active_tab(&self) -> Tab {
        self.active
    }

    pub fn current(&self) -> &Route {
        let stack = &self.stacks[self.active.index()];
        stack.last().unwrap_or(&stack[0])
    }

    pub fn tab_bar_visible(&self) -> bool {
        self.current().shows_tab_bar()
    }

    pub fn push(&mut self, route: Route) {
        self.stacks[self.active.index()].push(route);
    }

    /// Pop the top route; the tab root is never popped.
    pub fn pop(&mut self) -> bool {
        let stack = &mut self.stacks[self.active.index()];
        if stack.len() > 1 {
            stack.pop();
            true
        } else {
            false
        }
    }

    pub fn switch_tab(&mut self, tab: Tab) {
        self.active = tab;
    }

    pub fn cycle_tab(&mut self, delta: isize) {
        let len = Tab::ALL.len() as isize;
        let next = (self.active.index() as isize + delta).rem_euclid(len) as usize;
        self.active = Tab::ALL[next];
    }

    /// Drop every stack's history and land on `tab`.
    pub fn reset_to(&mut self, tab: Tab) {
        *self = Self::rooted_at(tab);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stacks_are_independent_per_tab() {
        let mut nav = Navigator::default();
        nav.switch_tab(Tab::Crops);
        nav.push(Route::CropDetail {
            crop_id: "c1".to_string(),
        });
        assert!(!nav.tab_bar_visible());

        nav.switch_tab(Tab::Home);
        assert_eq!(nav.current(), &Route::Home);
        assert!(nav.tab_bar_visible());

        nav.switch_tab(Tab::Crops);
        assert!(nav.pop());
        assert_eq!(nav.current(), &Route::Crops);
        assert!(!nav.pop());
    }

    #[test]
    fn reset_discards_history() {
        let mut nav = Navigator::default();
        nav.switch_tab(Tab::Crops);
        nav.push(Route::CropForm { crop_id: None });
        nav.reset_to(Tab::Home);
        assert_eq!(nav.active_tab(), Tab::Home);
        nav.switch_tab(Tab::Crops);
        assert_eq!(nav.current(), &Route::Crops);
    }

    #[test]
    fn tabs_cycle_around() {
        let mut nav = Navigator::default();
        nav.cycle_tab(-1);
        assert_eq!(nav.active_tab(), Tab::Profile);
        nav.cycle_tab(1);
        assert_eq!(nav.active_tab(), Tab::Home);
    }
}
