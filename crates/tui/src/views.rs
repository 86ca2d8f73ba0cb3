use std::cmp;

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs, Wrap},
    Frame,
};
use kisan_core::{
    models::{CropStatus, CropSummary},
    Crop, Farmer,
};

use crate::nav::Tab;

pub const EMPTY_CROPS: &str = "No crops added yet";

#[derive(Debug, Clone)]
pub struct Theme {
    pub primary_fg: Color,
    pub accent: Color,
    pub muted: Color,
    pub selection_bg: Color,
    pub selection_fg: Color,
    pub success: Color,
    pub warning: Color,
    pub danger: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_fg: Color::White,
            accent: Color::Green,
            muted: Color::DarkGray,
            selection_bg: Color::DarkGray,
            selection_fg: Color::White,
            success: Color::Green,
            warning: Color::Yellow,
            danger: Color::Red,
        }
    }
}

impl Theme {
    pub fn status_color(&self, status: CropStatus) -> Color {
        match status {
            CropStatus::Pending => self.warning,
            CropStatus::Verified => self.success,
            CropStatus::Rejected => self.danger,
        }
    }

    fn label(&self) -> Style {
        Style::default().fg(self.muted)
    }

    fn heading(&self) -> Style {
        Style::default()
            .fg(self.accent)
            .add_modifier(Modifier::BOLD)
    }
}

/// Remote data a screen is waiting on.
#[derive(Debug, Clone)]
pub enum Loadable<T> {
    Idle,
    Loading,
    Loaded(T),
    Failed(String),
}

impl<T> Default for Loadable<T> {
    fn default() -> Self {
        Loadable::Idle
    }
}

impl<T> Loadable<T> {
    pub fn loaded(&self) -> Option<&T> {
        match self {
            Loadable::Loaded(value) => Some(value),
            _ => None,
        }
    }
}

/// Text shown in place of data that is not available.
fn placeholder<T>(value: &Loadable<T>) -> Option<String> {
    match value {
        Loadable::Idle => Some(String::new()),
        Loadable::Loading => Some("Loading…".to_string()),
        Loadable::Failed(message) => Some(format!("{message}  (r to retry)")),
        Loadable::Loaded(_) => None,
    }
}

pub struct Alert {
    pub title: String,
    pub message: String,
}

impl Alert {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            title: "Error".to_string(),
            message: message.into(),
        }
    }
}

pub fn render_tab_bar(frame: &mut Frame, area: Rect, theme: &Theme, active: Tab) {
    let titles: Vec<Line> = Tab::ALL
        .iter()
        .enumerate()
        .map(|(idx, tab)| Line::from(format!("{} {}", idx + 1, tab.title())))
        .collect();
    let selected = Tab::ALL.iter().position(|tab| *tab == active).unwrap_or(0);
    let tabs = Tabs::new(titles)
        .select(selected)
        .block(Block::default().borders(Borders::ALL))
        .style(Style::default().fg(theme.primary_fg))
        .highlight_style(theme.heading());
    frame.render_widget(tabs, area);
}

pub fn render_status(frame: &mut Frame, area: Rect, theme: &Theme, status: &str, hints: &str) {
    let paragraph = Paragraph::new(vec![
        Line::from(status.to_string()),
        Line::from(Span::styled(hints.to_string(), theme.label())),
    ])
    .block(Block::default().borders(Borders::TOP))
    .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn crop_item<'a>(crop: &Crop, theme: &Theme) -> ListItem<'a> {
    ListItem::new(vec![
        Line::from(vec![
            Span::styled(
                crop.display_name(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(
                crop.status.label(),
                Style::default().fg(theme.status_color(crop.status)),
            ),
        ]),
        Line::from(Span::styled(
            format!("{} · sown {}", crop.area_label(), crop.sowing_label()),
            theme.label(),
        )),
    ])
}

pub fn render_crop_list(
    frame: &mut Frame,
    area: Rect,
    theme: &Theme,
    title: &str,
    crops: &Loadable<Vec<Crop>>,
    list_state: &mut ListState,
) {
    let block = Block::default().borders(Borders::ALL).title(title.to_string());
    let crops = match crops {
        Loadable::Loaded(crops) => crops,
        other => {
            let text = placeholder(other).unwrap_or_default();
            frame.render_widget(
                Paragraph::new(text).block(block).wrap(Wrap { trim: true }),
                area,
            );
            return;
        }
    };
    if crops.is_empty() {
        let empty = Paragraph::new(Line::from(Span::styled(EMPTY_CROPS, theme.label())))
            .alignment(Alignment::Center)
            .block(block);
        frame.render_widget(empty, area);
        return;
    }
    let items: Vec<ListItem> = crops.iter().map(|crop| crop_item(crop, theme)).collect();
    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(theme.selection_bg)
                .fg(theme.selection_fg),
        )
        .highlight_symbol("▶ ");
    frame.render_stateful_widget(list, area, list_state);
}

pub fn render_home(
    frame: &mut Frame,
    area: Rect,
    theme: &Theme,
    greeting: &str,
    crops: &Loadable<Vec<Crop>>,
    recent: &Loadable<Vec<Crop>>,
    recent_state: &mut ListState,
) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(5),
            Constraint::Min(3),
        ])
        .split(area);

    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(greeting.to_string(), theme.heading()))),
        layout[0],
    );

    let summary_block = Block::default().borders(Borders::ALL).title("My crops");
    let summary = match crops {
        Loadable::Loaded(crops) => {
            let summary = CropSummary::from_crops(crops);
            vec![
                Line::from(format!("Total: {}", summary.total)),
                Line::from(vec![
                    Span::styled(
                        format!("Verified: {}", summary.verified),
                        Style::default().fg(theme.success),
                    ),
                    Span::raw("   "),
                    Span::styled(
                        format!("Pending: {}", summary.pending),
                        Style::default().fg(theme.warning),
                    ),
                    Span::raw("   "),
                    Span::styled(
                        format!("Rejected: {}", summary.rejected),
                        Style::default().fg(theme.danger),
                    ),
                ]),
            ]
        }
        other => vec![Line::from(placeholder(other).unwrap_or_default())],
    };
    frame.render_widget(
        Paragraph::new(summary).block(summary_block),
        layout[1],
    );

    render_crop_list(frame, layout[2], theme, "Recent crops", recent, recent_state);
}

fn field_line<'a>(theme: &Theme, label: &str, value: String) -> Line<'a> {
    Line::from(vec![
        Span::styled(format!("{label:<14}"), theme.label()),
        Span::raw(value),
    ])
}

pub fn render_crop_detail(
    frame: &mut Frame,
    area: Rect,
    theme: &Theme,
    crop: &Loadable<Crop>,
    media_url: impl Fn(&str) -> String,
) {
    let block = Block::default().borders(Borders::ALL).title("Crop details");
    let Loadable::Loaded(crop) = crop else {
        let text = placeholder(crop).unwrap_or_default();
        frame.render_widget(Paragraph::new(text).block(block), area);
        return;
    };
    let mut lines = vec![
        Line::from(Span::styled(crop.crop_name.clone(), theme.heading())),
        Line::from(""),
        field_line(
            theme,
            "Type",
            crop.crop_type.clone().unwrap_or_else(|| "-".to_string()),
        ),
        field_line(theme, "Area", crop.area_label()),
        field_line(theme, "Sown", crop.sowing_label()),
        field_line(theme, "Harvest", crop.harvest_label()),
        Line::from(vec![
            Span::styled(format!("{:<14}", "Status"), theme.label()),
            Span::styled(
                crop.status.label(),
                Style::default().fg(theme.status_color(crop.status)),
            ),
        ]),
    ];
    if !crop.images.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("Images", theme.label())));
        lines.extend(
            crop.images
                .iter()
                .map(|image| Line::from(format!("  {}", media_url(image)))),
        );
    }
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

pub fn render_profile(frame: &mut Frame, area: Rect, theme: &Theme, farmer: &Loadable<Farmer>) {
    let block = Block::default().borders(Borders::ALL).title("Profile");
    let Loadable::Loaded(farmer) = farmer else {
        let text = placeholder(farmer).unwrap_or_default();
        frame.render_widget(Paragraph::new(text).block(block), area);
        return;
    };
    let or_dash = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());
    let lines = vec![
        Line::from(Span::styled(farmer.name.clone(), theme.heading())),
        Line::from(""),
        field_line(theme, "Mobile", or_dash(&farmer.contact)),
        field_line(
            theme,
            "Aadhaar",
            farmer.masked_aadhaar().unwrap_or_else(|| "-".to_string()),
        ),
        field_line(theme, "Village", or_dash(&farmer.village)),
        field_line(theme, "Taluka", or_dash(&farmer.taluka)),
        field_line(theme, "District", or_dash(&farmer.district)),
        field_line(theme, "State", or_dash(&farmer.state)),
        field_line(theme, "Pincode", or_dash(&farmer.pincode)),
    ];
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Labelled inputs with one focused row. Returns the cursor position of the
/// focused value so the caller can place the terminal cursor.
pub fn render_form(
    frame: &mut Frame,
    area: Rect,
    theme: &Theme,
    title: &str,
    rows: &[(&str, String)],
    focus: Option<usize>,
) -> Option<(u16, u16)> {
    let label_width = rows
        .iter()
        .map(|(label, _)| label.len())
        .max()
        .unwrap_or(0)
        + 2;
    let lines: Vec<Line> = rows
        .iter()
        .enumerate()
        .map(|(idx, (label, value))| {
            let focused = focus == Some(idx);
            let marker = if focused { "▶ " } else { "  " };
            let value_style = if focused {
                Style::default()
                    .fg(theme.selection_fg)
                    .bg(theme.selection_bg)
            } else {
                Style::default().fg(theme.primary_fg)
            };
            Line::from(vec![
                Span::styled(marker, Style::default().fg(theme.accent)),
                Span::styled(format!("{label:<label_width$}"), theme.label()),
                Span::styled(value.clone(), value_style),
            ])
        })
        .collect();
    let block = Block::default().borders(Borders::ALL).title(title.to_string());
    frame.render_widget(Paragraph::new(lines).block(block), area);

    focus.and_then(|idx| {
        let (_, value) = rows.get(idx)?;
        let x = area.x + 1 + 2 + label_width as u16 + value.len() as u16;
        let y = area.y + 1 + idx as u16;
        (y < area.y + area.height.saturating_sub(1))
            .then_some((x.min(area.x + area.width.saturating_sub(2)), y))
    })
}

pub fn render_alert(frame: &mut Frame, theme: &Theme, alert: &Alert) {
    let frame_area = frame.size();
    let width = cmp::max(cmp::min(60_u16, frame_area.width.saturating_sub(4)), 24_u16);
    let height = 7_u16.min(frame_area.height.saturating_sub(2)).max(5_u16);
    let area = centered_rect(width, height, frame_area);

    frame.render_widget(Clear, area);
    let paragraph = Paragraph::new(vec![
        Line::from(alert.message.clone()),
        Line::from(""),
        Line::from(vec![
            Span::styled("Enter", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" OK"),
        ]),
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.danger))
            .title(alert.title.clone()),
    )
    .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

pub fn render_confirm(frame: &mut Frame, theme: &Theme, title: &str, message: &str) {
    let frame_area = frame.size();
    let width = cmp::max(cmp::min(56_u16, frame_area.width.saturating_sub(4)), 24_u16);
    let area = centered_rect(width, 7, frame_area);

    frame.render_widget(Clear, area);
    let paragraph = Paragraph::new(vec![
        Line::from(message.to_string()),
        Line::from(""),
        Line::from(vec![
            Span::styled("y", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" yes  "),
            Span::styled("n", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" no"),
        ]),
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.accent))
            .title(title.to_string()),
    )
    .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{backend::TestBackend, Terminal};

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        buffer
            .content
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn crop(name: &str, area: serde_json::Value) -> Crop {
        serde_json::from_value(serde_json::json!({
            "id": name,
            "cropName": name,
            "cropType": "Rabi",
            "area": area,
            "status": "verified"
        }))
        .unwrap()
    }

    #[test]
    fn empty_crop_list_shows_empty_state() {
        let mut terminal = Terminal::new(TestBackend::new(40, 6)).unwrap();
        let crops = Loadable::Loaded(Vec::new());
        terminal
            .draw(|frame| {
                render_crop_list(
                    frame,
                    frame.size(),
                    &Theme::default(),
                    "Crops",
                    &crops,
                    &mut ListState::default(),
                )
            })
            .unwrap();
        assert!(screen_text(&terminal).contains(EMPTY_CROPS));
    }

    #[test]
    fn both_area_shapes_render_the_same() {
        let mut terminal = Terminal::new(TestBackend::new(50, 8)).unwrap();
        let crops = Loadable::Loaded(vec![
            crop("Wheat", serde_json::json!({"value": 10, "unit": "acres"})),
            crop("Gram", serde_json::json!("10 acres")),
        ]);
        terminal
            .draw(|frame| {
                render_crop_list(
                    frame,
                    frame.size(),
                    &Theme::default(),
                    "Crops",
                    &crops,
                    &mut ListState::default(),
                )
            })
            .unwrap();
        let text = screen_text(&terminal);
        assert_eq!(text.matches("10 acres").count(), 2);
        assert!(text.contains("Verified"));
    }

    #[test]
    fn failed_load_offers_retry() {
        let mut terminal = Terminal::new(TestBackend::new(60, 5)).unwrap();
        let crops: Loadable<Vec<Crop>> = Loadable::Failed("Network error".to_string());
        terminal
            .draw(|frame| {
                render_crop_list(
                    frame,
                    frame.size(),
                    &Theme::default(),
                    "Crops",
                    &crops,
                    &mut ListState::default(),
                )
            })
            .unwrap();
        assert!(screen_text(&terminal).contains("Network error  (r to retry)"));
    }
}
