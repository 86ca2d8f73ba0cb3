use std::{fmt::Display, future::Future, io, sync::Arc, thread, time::Duration};

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use kisan_core::{
    api::OtpDispatch,
    auth::{AuthFlow, AuthStep},
    forms::{CropField, CropForm, RegistrationField, RegistrationForm, RegistrationStep, RegistrationWizard},
    ApiError, AppConfig, Crop, Farmer, FarmerApi, ScreenTasks, SessionContext, SessionRecord,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::{
    input::TextInput,
    nav::{Navigator, Route, Tab},
    views::{self, Alert, Loadable, Theme},
};

const TICK_RATE: Duration = Duration::from_millis(250);
const APP_TITLE: &str = "Kisan Mitra";

enum AppEvent {
    Input(Event),
    Tick,
    /// Result of a request started while `generation` was current.
    Api { generation: u64, event: ApiEvent },
}

enum ApiEvent {
    Existence {
        contact: String,
        result: Result<bool, ApiError>,
    },
    OtpResent(Result<OtpDispatch, ApiError>),
    Verified(Result<SessionRecord, ApiError>),
    ContactReserved(Result<(), ApiError>),
    Registered(Result<SessionRecord, ApiError>),
    FarmerCrops(Result<Vec<Crop>, ApiError>),
    RecentCrops(Result<Vec<Crop>, ApiError>),
    Crop(Result<Crop, ApiError>),
    CropSaved(Result<Crop, ApiError>),
    Farmer(Result<Farmer, ApiError>),
}

/// Login, OTP and registration screens.
struct AuthUi {
    flow: AuthFlow,
    mobile: TextInput,
    otp: TextInput,
    wizard: Option<RegistrationWizard>,
    wizard_focus: usize,
    pending: bool,
}

impl AuthUi {
    fn new(flow: AuthFlow) -> Self {
        Self {
            flow,
            mobile: TextInput::digits(10),
            otp: TextInput::digits(6),
            wizard: None,
            wizard_focus: 0,
            pending: false,
        }
    }
}

/// Tabs shown once signed in.
#[derive(Default)]
struct MainUi {
    nav: Navigator,
    crops: Loadable<Vec<Crop>>,
    recent: Loadable<Vec<Crop>>,
    crop: Loadable<Crop>,
    farmer: Loadable<Farmer>,
    crops_list: ListState,
    recent_list: ListState,
    crop_form: CropForm,
    crop_focus: usize,
    saving: bool,
    confirm_logout: bool,
}

/// Terminal frontend for the farmer client.
pub struct KisanApp {
    api: Arc<dyn FarmerApi>,
    session: SessionContext,
    config: AppConfig,
    theme: Theme,
    auth: AuthUi,
    main: MainUi,
    signed_in: bool,
    alert: Option<Alert>,
    status: String,
    should_quit: bool,
    tasks: ScreenTasks,
    generation: u64,
    event_tx: Option<mpsc::Sender<AppEvent>>,
}

impl KisanApp {
    pub fn new(api: Arc<dyn FarmerApi>, session: SessionContext, config: AppConfig) -> Self {
        let flow = AuthFlow::resume(&session);
        Self {
            api,
            session,
            config,
            theme: Theme::default(),
            auth: AuthUi::new(flow),
            main: MainUi::default(),
            signed_in: false,
            alert: None,
            status: "Ready".to_string(),
            should_quit: false,
            tasks: ScreenTasks::new("screen"),
            generation: 0,
            event_tx: None,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_input_thread(event_tx.clone());
        self.event_tx = Some(event_tx);

        let mut session_rx = self.session.subscribe();
        self.sync_session();

        let result = 'events: loop {
            if let Err(err) = terminal.draw(|frame| self.draw(frame)) {
                break 'events Err(err.into());
            }
            if self.should_quit {
                break 'events Ok(());
            }

            tokio::select! {
                maybe_event = event_rx.recv() => {
                    if !self.process_app_event(maybe_event) {
                        break 'events Ok(());
                    }
                }
                changed = session_rx.changed() => {
                    if changed.is_ok() {
                        self.sync_session();
                    }
                }
            }
        };

        self.tasks.abort_all();
        self.event_tx = None;
        restore_terminal(&mut terminal)?;
        result
    }

    fn process_app_event(&mut self, maybe_event: Option<AppEvent>) -> bool {
        match maybe_event {
            Some(AppEvent::Input(event)) => {
                self.handle_input(event);
                true
            }
            Some(AppEvent::Tick) => true,
            Some(AppEvent::Api { generation, event }) => {
                if generation == self.generation {
                    self.handle_api_event(event);
                } else {
                    debug!(generation, current = self.generation, "dropping stale result");
                }
                true
            }
            None => false,
        }
    }

    /// Move between signed-in and signed-out screens when the session changes.
    fn sync_session(&mut self) {
        let authenticated = self.session.is_authenticated();
        if authenticated == self.signed_in {
            return;
        }
        self.signed_in = authenticated;
        self.leave_screen();
        self.main = MainUi::default();
        if authenticated {
            if self.auth.flow.step() != &AuthStep::Authenticated {
                self.auth = AuthUi::new(AuthFlow::resume(&self.session));
            }
            self.main.nav.reset_to(Tab::Home);
            self.enter_route();
        } else {
            self.auth = AuthUi::new(AuthFlow::default());
            self.status = "Signed out".to_string();
        }
    }

    /// Abort the current screen's requests; results still in flight are ignored.
    fn leave_screen(&mut self) {
        self.tasks.abort_all();
        self.generation += 1;
        self.auth.pending = false;
        self.main.saving = false;
    }

    fn spawn_request<F>(&mut self, request: F)
    where
        F: Future<Output = ApiEvent> + Send + 'static,
    {
        let Some(sender) = self.event_tx.clone() else {
            error!("event_channel_missing");
            return;
        };
        let generation = self.generation;
        self.tasks.spawn(async move {
            let event = request.await;
            let _ = sender.send(AppEvent::Api { generation, event }).await;
        });
    }

    fn show_error(&mut self, err: impl Display) {
        let message = err.to_string();
        warn!(%message, "showing error");
        self.status = message.clone();
        self.alert = Some(Alert::error(message));
    }

    fn greeting(&self) -> String {
        let name = self
            .session
            .current()
            .map(|record| record.display_name())
            .unwrap_or_else(|| "Farmer".to_string());
        format!("Namaste, {name}")
    }

    fn navigate(&mut self, change: impl FnOnce(&mut Navigator)) {
        let before = self.main.nav.current().clone();
        let tab_before = self.main.nav.active_tab();
        change(&mut self.main.nav);
        if self.main.nav.current() != &before || self.main.nav.active_tab() != tab_before {
            self.leave_screen();
            self.enter_route();
        }
    }

    /// Start the fetches the visible route needs.
    fn enter_route(&mut self) {
        match self.main.nav.current().clone() {
            Route::Home => {
                self.load_farmer_crops();
                self.main.recent = Loadable::Loading;
                let api = self.api.clone();
                self.spawn_request(async move { ApiEvent::RecentCrops(api.recent_crops().await) });
            }
            Route::Crops => self.load_farmer_crops(),
            Route::CropDetail { crop_id } => {
                self.main.crop = Loadable::Loading;
                let api = self.api.clone();
                self.spawn_request(async move { ApiEvent::Crop(api.get_crop(&crop_id).await) });
            }
            Route::CropForm { .. } => {
                self.main.crop_focus = 0;
            }
            Route::Profile => {
                let Some(farmer_id) = self.session.user_id() else {
                    self.main.farmer = Loadable::Failed("No farmer signed in".to_string());
                    return;
                };
                self.main.farmer = Loadable::Loading;
                let api = self.api.clone();
                self.spawn_request(async move { ApiEvent::Farmer(api.get_farmer(&farmer_id).await) });
            }
        }
    }

    fn load_farmer_crops(&mut self) {
        let Some(farmer_id) = self.session.user_id() else {
            self.main.crops = Loadable::Failed("No farmer signed in".to_string());
            return;
        };
        self.main.crops = Loadable::Loading;
        let api = self.api.clone();
        self.spawn_request(async move {
            ApiEvent::FarmerCrops(api.crops_by_farmer(&farmer_id).await)
        });
    }

    fn handle_api_event(&mut self, event: ApiEvent) {
        match event {
            ApiEvent::Existence { contact, result } => {
                self.auth.pending = false;
                match self.auth.flow.apply_existence(contact, result) {
                    Ok(()) => match self.auth.flow.step() {
                        AuthStep::OtpEntry { contact } => {
                            self.status = format!("OTP sent to {contact}");
                            self.auth.otp.clear();
                        }
                        AuthStep::RegistrationOffer { .. } => {
                            self.status = "This number is not registered".to_string();
                        }
                        _ => {}
                    },
                    Err(err) => self.show_error(err),
                }
            }
            ApiEvent::OtpResent(result) => {
                self.auth.pending = false;
                match result {
                    Ok(dispatch) => {
                        self.status = dispatch.message.unwrap_or_else(|| "OTP resent".to_string());
                    }
                    Err(err) => self.show_error(err),
                }
            }
            ApiEvent::Verified(result) => {
                self.auth.pending = false;
                match self.auth.flow.apply_verification(result, &self.session) {
                    Ok(()) => {
                        info!("otp verified");
                        self.status = "Signed in".to_string();
                        self.sync_session();
                    }
                    Err(err) => {
                        self.auth.otp.clear();
                        self.show_error(err);
                    }
                }
            }
            ApiEvent::ContactReserved(result) => {
                if let Err(err) = result {
                    warn!(%err, "could not reserve contact before registration");
                }
            }
            ApiEvent::Registered(result) => {
                self.auth.pending = false;
                match self.auth.flow.apply_registration(result, &self.session) {
                    Ok(()) => {
                        info!("registration complete");
                        self.status = "Registration complete".to_string();
                        self.sync_session();
                    }
                    Err(err) => self.show_error(err),
                }
            }
            ApiEvent::FarmerCrops(result) => {
                self.main.crops = self.loaded(result);
                select_first(&mut self.main.crops_list, self.main.crops.loaded());
            }
            ApiEvent::RecentCrops(result) => {
                self.main.recent = self.loaded(result);
                select_first(&mut self.main.recent_list, self.main.recent.loaded());
            }
            ApiEvent::Crop(result) => {
                self.main.crop = self.loaded(result);
            }
            ApiEvent::CropSaved(result) => {
                self.main.saving = false;
                match result {
                    Ok(crop) => {
                        info!(crop_id = %crop.id, "crop saved");
                        self.status = format!("Saved {}", crop.crop_name);
                        self.navigate(|nav| {
                            nav.pop();
                        });
                    }
                    Err(err) => self.show_error(err),
                }
            }
            ApiEvent::Farmer(result) => {
                if let Ok(farmer) = &result {
                    self.session
                        .update_profile(SessionRecord::from_farmer(farmer, None));
                }
                self.main.farmer = self.loaded(result);
            }
        }
    }

    fn loaded<T>(&mut self, result: Result<T, ApiError>) -> Loadable<T> {
        match result {
            Ok(value) => Loadable::Loaded(value),
            Err(err) => {
                let message = err.to_string();
                self.show_error(&message);
                Loadable::Failed(message)
            }
        }
    }

    fn handle_input(&mut self, event: Event) {
        let Event::Key(key) = event else {
            return;
        };
        if key.kind != KeyEventKind::Press {
            return;
        }
        if key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        if self.alert.is_some() {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
                self.alert = None;
            }
            return;
        }
        if self.signed_in {
            self.handle_main_key(key);
        } else {
            self.handle_auth_key(key);
        }
    }

    fn handle_auth_key(&mut self, key: KeyEvent) {
        if self.auth.pending {
            return;
        }
        match self.auth.flow.step().clone() {
            AuthStep::MobileEntry => self.handle_mobile_key(key),
            AuthStep::OtpEntry { contact } => self.handle_otp_key(key, contact),
            AuthStep::RegistrationOffer { contact } => self.handle_offer_key(key, contact),
            AuthStep::Registration { .. } => self.handle_registration_key(key),
            AuthStep::Authenticated => {}
        }
    }

    fn handle_mobile_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Enter => self.submit_mobile(),
            _ => edit_input(&mut self.auth.mobile, key),
        }
    }

    fn submit_mobile(&mut self) {
        let contact = match self.auth.flow.begin_mobile(self.auth.mobile.value()) {
            Ok(contact) => contact,
            Err(err) => return self.show_error(err),
        };
        self.auth.pending = true;
        self.status = "Checking number…".to_string();
        let api = self.api.clone();
        self.spawn_request(async move {
            let result = api.check_farmer_exists(&contact).await;
            ApiEvent::Existence { contact, result }
        });
    }

    fn handle_otp_key(&mut self, key: KeyEvent, contact: String) {
        match key.code {
            KeyCode::Esc => {
                if self.auth.flow.go_back().is_ok() {
                    self.leave_screen();
                    self.auth.otp.clear();
                    self.status = "Enter your mobile number".to_string();
                }
            }
            KeyCode::Enter => self.submit_otp(),
            KeyCode::Char('r') if key.modifiers == KeyModifiers::CONTROL => {
                self.auth.pending = true;
                self.status = format!("Resending OTP to {contact}…");
                let api = self.api.clone();
                self.spawn_request(async move {
                    ApiEvent::OtpResent(api.mobile_login_by_contact(&contact).await)
                });
            }
            _ => edit_input(&mut self.auth.otp, key),
        }
    }

    fn submit_otp(&mut self) {
        let (contact, otp) = match self.auth.flow.begin_otp(self.auth.otp.value()) {
            Ok(pair) => pair,
            Err(err) => return self.show_error(err),
        };
        self.auth.pending = true;
        self.status = "Verifying OTP…".to_string();
        let api = self.api.clone();
        self.spawn_request(async move { ApiEvent::Verified(api.verify_otp(&contact, &otp).await) });
    }

    fn handle_offer_key(&mut self, key: KeyEvent, contact: String) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                if self.auth.flow.accept_registration().is_err() {
                    return;
                }
                self.auth.wizard = Some(RegistrationWizard::new(RegistrationForm::with_contact(
                    contact.clone(),
                )));
                self.auth.wizard_focus = 0;
                self.status = "Fill in your details".to_string();
                let api = self.api.clone();
                self.spawn_request(async move {
                    ApiEvent::ContactReserved(api.register_contact(&contact).await)
                });
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                if self.auth.flow.decline_registration().is_ok() {
                    self.status = "Enter your mobile number".to_string();
                }
            }
            _ => {}
        }
    }

    fn handle_registration_key(&mut self, key: KeyEvent) {
        let Some(wizard) = self.auth.wizard.as_mut() else {
            return;
        };
        let fields = wizard.step().fields();
        match key.code {
            KeyCode::Esc => {
                if wizard.back() {
                    self.auth.wizard_focus = 0;
                } else if self.auth.flow.go_back().is_ok() {
                    self.leave_screen();
                    self.auth.wizard = None;
                    self.status = "Registration cancelled".to_string();
                }
            }
            KeyCode::Enter => {
                if wizard.step() == RegistrationStep::Review {
                    self.submit_registration();
                } else {
                    match wizard.next() {
                        Ok(step) => {
                            self.auth.wizard_focus = 0;
                            self.status = format!("Step {} of 3: {}", step.number(), step.title());
                        }
                        Err(err) => self.show_error(err),
                    }
                }
            }
            KeyCode::Down | KeyCode::Tab if !fields.is_empty() => {
                self.auth.wizard_focus = (self.auth.wizard_focus + 1) % fields.len();
            }
            KeyCode::Up | KeyCode::BackTab if !fields.is_empty() => {
                self.auth.wizard_focus = (self.auth.wizard_focus + fields.len() - 1) % fields.len();
            }
            KeyCode::Backspace => {
                if let Some(field) = fields.get(self.auth.wizard_focus) {
                    wizard.form.get_mut(*field).pop();
                }
            }
            KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                if let Some(field) = fields.get(self.auth.wizard_focus) {
                    let value = wizard.form.get_mut(*field);
                    if registration_accepts(*field, value, ch) {
                        value.push(ch);
                    }
                }
            }
            _ => {}
        }
    }

    fn submit_registration(&mut self) {
        let Some(wizard) = self.auth.wizard.as_ref() else {
            return;
        };
        let payload = match wizard.submit() {
            Ok(payload) => payload,
            Err(err) => return self.show_error(err),
        };
        if let Err(err) = self.auth.flow.begin_registration() {
            return self.show_error(err);
        }
        self.auth.pending = true;
        self.status = "Registering…".to_string();
        let api = self.api.clone();
        self.spawn_request(async move {
            ApiEvent::Registered(api.register_farmer(&payload).await)
        });
    }

    fn handle_main_key(&mut self, key: KeyEvent) {
        if self.main.confirm_logout {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    self.main.confirm_logout = false;
                    self.auth.flow.logout(&self.session);
                    self.sync_session();
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    self.main.confirm_logout = false;
                }
                _ => {}
            }
            return;
        }

        let route = self.main.nav.current().clone();
        if let Route::CropForm { .. } = route {
            return self.handle_crop_form_key(key);
        }

        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
                return;
            }
            KeyCode::Tab if route.shows_tab_bar() => {
                return self.navigate(|nav| nav.cycle_tab(1));
            }
            KeyCode::BackTab if route.shows_tab_bar() => {
                return self.navigate(|nav| nav.cycle_tab(-1));
            }
            KeyCode::Char(ch @ '1'..='3') if route.shows_tab_bar() => {
                let tab = Tab::ALL[ch as usize - '1' as usize];
                return self.navigate(|nav| nav.switch_tab(tab));
            }
            KeyCode::Char('r') => {
                self.leave_screen();
                return self.enter_route();
            }
            _ => {}
        }

        match route {
            Route::Home => {
                let recent = self.main.recent.loaded().map(Vec::len).unwrap_or(0);
                self.handle_list_key(key, recent, ListTarget::Recent);
            }
            Route::Crops => {
                if key.code == KeyCode::Char('a') {
                    self.main.crop_form = CropForm::default();
                    return self.navigate(|nav| nav.push(Route::CropForm { crop_id: None }));
                }
                let total = self.main.crops.loaded().map(Vec::len).unwrap_or(0);
                self.handle_list_key(key, total, ListTarget::Crops);
            }
            Route::CropDetail { crop_id } => match key.code {
                KeyCode::Esc | KeyCode::Backspace => self.navigate(|nav| {
                    nav.pop();
                }),
                KeyCode::Char('e') => {
                    let Some(crop) = self.main.crop.loaded() else {
                        return;
                    };
                    self.main.crop_form = CropForm::from_crop(crop);
                    self.navigate(|nav| {
                        nav.push(Route::CropForm {
                            crop_id: Some(crop_id),
                        })
                    });
                }
                _ => {}
            },
            Route::Profile => {
                if key.code == KeyCode::Char('l') {
                    self.main.confirm_logout = true;
                }
            }
            Route::CropForm { .. } => {}
        }
    }

    fn handle_list_key(&mut self, key: KeyEvent, len: usize, target: ListTarget) {
        let (state, crops) = match target {
            ListTarget::Recent => (&mut self.main.recent_list, &self.main.recent),
            ListTarget::Crops => (&mut self.main.crops_list, &self.main.crops),
        };
        match key.code {
            KeyCode::Down | KeyCode::Char('j') => move_selection(state, len, 1),
            KeyCode::Up | KeyCode::Char('k') => move_selection(state, len, -1),
            KeyCode::Enter => {
                let Some(crop_id) = state
                    .selected()
                    .and_then(|idx| crops.loaded()?.get(idx))
                    .map(|crop| crop.id.clone())
                else {
                    return;
                };
                self.navigate(|nav| nav.push(Route::CropDetail { crop_id }));
            }
            _ => {}
        }
    }

    fn handle_crop_form_key(&mut self, key: KeyEvent) {
        if self.main.saving {
            return;
        }
        let field = CropField::ALL[self.main.crop_focus];
        let len = CropField::ALL.len();
        match key.code {
            KeyCode::Esc => {
                self.status = "Changes discarded".to_string();
                self.navigate(|nav| {
                    nav.pop();
                });
            }
            KeyCode::Enter => self.submit_crop_form(),
            KeyCode::Char('s') if key.modifiers == KeyModifiers::CONTROL => self.submit_crop_form(),
            KeyCode::Down | KeyCode::Tab => self.main.crop_focus = (self.main.crop_focus + 1) % len,
            KeyCode::Up | KeyCode::BackTab => {
                self.main.crop_focus = (self.main.crop_focus + len - 1) % len;
            }
            KeyCode::Left if field == CropField::AreaUnit => self.main.crop_form.cycle_unit(-1),
            KeyCode::Right if field == CropField::AreaUnit => self.main.crop_form.cycle_unit(1),
            KeyCode::Backspace if field != CropField::AreaUnit => {
                self.main.crop_form.get_mut(field).pop();
            }
            KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                if field == CropField::AreaUnit {
                    return;
                }
                let value = self.main.crop_form.get_mut(field);
                if crop_accepts(field, ch) {
                    value.push(ch);
                }
            }
            _ => {}
        }
    }

    fn submit_crop_form(&mut self) {
        let Route::CropForm { crop_id } = self.main.nav.current().clone() else {
            return;
        };
        let payload = match self.main.crop_form.payload(self.session.user_id()) {
            Ok(payload) => payload,
            Err(err) => return self.show_error(err),
        };
        self.main.saving = true;
        self.status = "Saving crop…".to_string();
        let api = self.api.clone();
        self.spawn_request(async move {
            let result = match crop_id {
                Some(id) => api.update_crop(&id, &payload).await,
                None => api.create_crop(&payload).await,
            };
            ApiEvent::CropSaved(result)
        });
    }

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.size();
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(5),
                Constraint::Length(3),
            ])
            .split(area);

        let hints = if self.signed_in {
            self.draw_main(frame, layout[0], layout[1])
        } else {
            self.draw_auth(frame, layout[0], layout[1])
        };
        views::render_status(frame, layout[2], &self.theme, &self.status, hints);

        if self.main.confirm_logout {
            views::render_confirm(frame, &self.theme, "Logout", "Sign out of this device?");
        }
        if let Some(alert) = &self.alert {
            views::render_alert(frame, &self.theme, alert);
        }
    }

    fn render_header(&self, frame: &mut Frame, area: Rect, subtitle: &str) {
        let header = Paragraph::new(Line::from(vec![
            Span::styled(
                APP_TITLE,
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(subtitle.to_string(), Style::default().fg(self.theme.muted)),
        ]))
        .block(Block::default().borders(Borders::ALL));
        frame.render_widget(header, area);
    }

    fn draw_auth(&mut self, frame: &mut Frame, header: Rect, body: Rect) -> &'static str {
        match self.auth.flow.step().clone() {
            AuthStep::MobileEntry => {
                self.render_header(frame, header, "Login");
                self.render_prompt(
                    frame,
                    body,
                    "Login",
                    "Enter your 10-digit mobile number",
                    "+91 ",
                    &self.auth.mobile,
                );
                "Enter continue  Esc quit"
            }
            AuthStep::OtpEntry { contact } => {
                self.render_header(frame, header, "Verify OTP");
                self.render_prompt(
                    frame,
                    body,
                    "Verify OTP",
                    &format!("Enter the 6-digit OTP sent to +91 {contact}"),
                    "",
                    &self.auth.otp,
                );
                "Enter verify  Ctrl+R resend  Esc change number"
            }
            AuthStep::RegistrationOffer { contact } => {
                self.render_header(frame, header, "Login");
                self.render_prompt(
                    frame,
                    body,
                    "Login",
                    "Enter your 10-digit mobile number",
                    "+91 ",
                    &self.auth.mobile,
                );
                views::render_confirm(
                    frame,
                    &self.theme,
                    "Not registered",
                    &format!("+91 {contact} is not registered. Register now?"),
                );
                "y register  n cancel"
            }
            AuthStep::Registration { .. } => {
                self.render_header(frame, header, "Register");
                self.draw_registration(frame, body);
                "Enter next  Up/Down field  Esc back"
            }
            AuthStep::Authenticated => {
                self.render_header(frame, header, "");
                ""
            }
        }
    }

    fn render_prompt(
        &self,
        frame: &mut Frame,
        area: Rect,
        title: &str,
        instruction: &str,
        prefix: &str,
        input: &TextInput,
    ) {
        let width = 56_u16.min(area.width);
        let prompt_area = views::centered_rect(width, 6, area);
        let mut lines = vec![
            Line::from(instruction.to_string()),
            Line::from(""),
            Line::from(vec![
                Span::styled("> ", Style::default().fg(self.theme.accent)),
                Span::styled(prefix.to_string(), Style::default().fg(self.theme.muted)),
                Span::raw(input.value().to_string()),
            ]),
        ];
        if self.auth.pending {
            lines.push(Line::from(Span::styled(
                "Please wait…",
                Style::default().fg(self.theme.muted),
            )));
        }
        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title(title.to_string()))
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, prompt_area);

        if self.alert.is_none() && !self.auth.pending {
            let cursor_x = prompt_area.x + 1 + 2 + prefix.len() as u16 + input.cursor() as u16;
            let cursor_y = prompt_area.y + 3;
            frame.set_cursor(
                cursor_x.min(prompt_area.x + prompt_area.width.saturating_sub(2)),
                cursor_y,
            );
        }
    }

    fn draw_registration(&mut self, frame: &mut Frame, area: Rect) {
        let Some(wizard) = self.auth.wizard.as_ref() else {
            return;
        };
        let step = wizard.step();
        let title = format!("Step {} of 3: {}", step.number(), step.title());
        let (rows, focus): (Vec<(&str, String)>, Option<usize>) = match step {
            RegistrationStep::Review => (
                ALL_REGISTRATION_FIELDS
                    .iter()
                    .map(|field| (field.label(), wizard.form.get(*field).to_string()))
                    .collect(),
                None,
            ),
            _ => (
                step.fields()
                    .iter()
                    .map(|field| (field.label(), wizard.form.get(*field).to_string()))
                    .collect(),
                Some(self.auth.wizard_focus),
            ),
        };
        let cursor = views::render_form(frame, area, &self.theme, &title, &rows, focus);
        if let Some((x, y)) = cursor.filter(|_| self.alert.is_none() && !self.auth.pending) {
            frame.set_cursor(x, y);
        }
    }

    fn draw_main(&mut self, frame: &mut Frame, header: Rect, body: Rect) -> &'static str {
        let route = self.main.nav.current().clone();
        if self.main.nav.tab_bar_visible() {
            views::render_tab_bar(frame, header, &self.theme, self.main.nav.active_tab());
        } else {
            let subtitle = match route {
                Route::CropForm { crop_id: Some(_) } => "Edit crop",
                Route::CropForm { crop_id: None } => "Add crop",
                _ => "Crop details",
            };
            self.render_header(frame, header, subtitle);
        }

        match route {
            Route::Home => {
                let greeting = self.greeting();
                views::render_home(
                    frame,
                    body,
                    &self.theme,
                    &greeting,
                    &self.main.crops,
                    &self.main.recent,
                    &mut self.main.recent_list,
                );
                "Tab switch  Enter open  r refresh  q quit"
            }
            Route::Crops => {
                views::render_crop_list(
                    frame,
                    body,
                    &self.theme,
                    "My crops",
                    &self.main.crops,
                    &mut self.main.crops_list,
                );
                "Enter open  a add  r refresh  q quit"
            }
            Route::CropDetail { .. } => {
                let config = &self.config;
                views::render_crop_detail(frame, body, &self.theme, &self.main.crop, |image| {
                    config.media_url(image)
                });
                "e edit  r refresh  Esc back"
            }
            Route::CropForm { .. } => {
                let rows: Vec<(&str, String)> = CropField::ALL
                    .iter()
                    .map(|field| {
                        let value = self.main.crop_form.get(*field).to_string();
                        let value = if *field == CropField::AreaUnit {
                            format!("◀ {value} ▶")
                        } else {
                            value
                        };
                        (field.label(), value)
                    })
                    .collect();
                let title = match (&route, self.main.saving) {
                    (_, true) => "Saving…",
                    (Route::CropForm { crop_id: Some(_) }, false) => "Edit crop",
                    _ => "Add crop",
                };
                let cursor = views::render_form(
                    frame,
                    body,
                    &self.theme,
                    title,
                    &rows,
                    Some(self.main.crop_focus),
                );
                let on_unit = CropField::ALL[self.main.crop_focus] == CropField::AreaUnit;
                if let Some((x, y)) = cursor.filter(|_| self.alert.is_none() && !on_unit) {
                    frame.set_cursor(x, y);
                }
                "Enter save  Up/Down field  Left/Right unit  Esc cancel"
            }
            Route::Profile => {
                views::render_profile(frame, body, &self.theme, &self.main.farmer);
                "l logout  r refresh  q quit"
            }
        }
    }
}

const ALL_REGISTRATION_FIELDS: [RegistrationField; 8] = [
    RegistrationField::Name,
    RegistrationField::Contact,
    RegistrationField::Aadhaar,
    RegistrationField::Village,
    RegistrationField::Taluka,
    RegistrationField::District,
    RegistrationField::State,
    RegistrationField::Pincode,
];

#[derive(Clone, Copy)]
enum ListTarget {
    Recent,
    Crops,
}

fn edit_input(input: &mut TextInput, key: KeyEvent) {
    match key.code {
        KeyCode::Left => input.move_cursor(-1),
        KeyCode::Right => input.move_cursor(1),
        KeyCode::Home => input.move_home(),
        KeyCode::End => input.move_end(),
        KeyCode::Backspace => input.backspace(),
        KeyCode::Delete => input.delete(),
        KeyCode::Char(ch) => {
            if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT {
                input.insert(ch);
            }
        }
        _ => {}
    }
}

fn registration_accepts(field: RegistrationField, current: &str, ch: char) -> bool {
    let limit = match field {
        RegistrationField::Contact => Some(10),
        RegistrationField::Aadhaar => Some(12),
        RegistrationField::Pincode => Some(6),
        _ => None,
    };
    match limit {
        Some(limit) => ch.is_ascii_digit() && current.len() < limit,
        None => !ch.is_control() && current.len() < 80,
    }
}

fn crop_accepts(field: CropField, ch: char) -> bool {
    match field {
        CropField::AreaValue => ch.is_ascii_digit() || ch == '.',
        CropField::SowingDate | CropField::HarvestStart | CropField::HarvestEnd => {
            ch.is_ascii_digit() || ch == '-'
        }
        _ => !ch.is_control(),
    }
}

fn select_first<T>(state: &mut ListState, items: Option<&Vec<T>>) {
    match items {
        Some(items) if !items.is_empty() => {
            let idx = state.selected().unwrap_or(0).min(items.len() - 1);
            state.select(Some(idx));
        }
        _ => state.select(None),
    }
}

fn move_selection(state: &mut ListState, len: usize, delta: isize) {
    if len == 0 {
        state.select(None);
        return;
    }
    let current = state.selected().unwrap_or(0) as isize;
    let next = (current + delta).clamp(0, len as isize - 1) as usize;
    state.select(Some(next));
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(TICK_RATE) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.blocking_send(AppEvent::Tick).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}
