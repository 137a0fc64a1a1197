//! Application state and event handling

pub mod config;
pub mod events;
pub mod router;
pub mod state;

pub use config::{ClientConfig, ConfigError, StoragePaths};
pub use events::Event;
pub use state::{AppState, Operation, Screen, SettingsSection};

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{Event as CrosstermEvent, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use ratatui::prelude::*;
use taskline_client::ApiClient;
use taskline_session::{
    ActivitySource, ScopedStorage, SessionManager, SessionState, SessionSupervisor,
};
use tokio::sync::mpsc;
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::ui::{self, Theme};
use events::activity_signal;
use state::{validate_change_pin, validate_login, validate_setup};

/// Redraw interval; keeps the idle countdown current
const TICK_RATE: Duration = Duration::from_millis(250);

/// Main application struct
pub struct App {
    /// Application state
    pub state: AppState,

    /// Latest published session snapshot
    pub session: SessionState,

    /// Color theme
    pub theme: Theme,

    /// Whether the app should quit
    pub should_quit: bool,

    /// Tick counter for animations
    pub tick: u64,

    manager: Arc<SessionManager>,
    client: Arc<ApiClient>,
    supervisor: SessionSupervisor,
    source: ActivitySource,
    events_tx: mpsc::UnboundedSender<Event>,
    events_rx: mpsc::UnboundedReceiver<Event>,
}

impl App {
    /// Wire the client, manager, and supervisor; must run inside a Tokio runtime
    pub fn new(config: &ClientConfig, storage: ScopedStorage) -> Result<Self> {
        let client = Arc::new(ApiClient::new(&config.server_url, config.request_timeout())?);
        let manager = Arc::new(SessionManager::new(client.clone(), storage));
        let source = ActivitySource::new();
        let supervisor = SessionSupervisor::spawn(
            manager.clone(),
            client.clone(),
            source.clone(),
            &config.session,
        );
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let theme = if config.high_contrast {
            Theme::high_contrast()
        } else {
            Theme::default()
        };

        Ok(Self {
            state: AppState::new(),
            session: manager.snapshot(),
            theme,
            should_quit: false,
            tick: 0,
            manager,
            client,
            supervisor,
            source,
            events_tx,
            events_rx,
        })
    }

    /// Server the client talks to
    pub fn server_url(&self) -> &str {
        self.client.base_url()
    }

    /// Auto-lock threshold in effect
    pub fn auto_lock_minutes(&self) -> Option<u32> {
        self.supervisor.auto_lock_minutes()
    }

    /// Time since the last input
    pub fn idle_for(&self) -> Duration {
        self.manager.idle_for()
    }

    /// Time left before the auto-lock engages, if it is armed
    pub fn time_until_lock(&self) -> Option<Duration> {
        let minutes = self.auto_lock_minutes()?;
        self.manager
            .time_until_lock(Duration::from_secs(u64::from(minutes) * 60))
    }

    /// Run the application main loop
    pub async fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        let mut input = EventStream::new();
        let mut ticker = tokio::time::interval(TICK_RATE);
        let mut session_rx = self.manager.subscribe();

        let manager = self.manager.clone();
        tokio::spawn(async move { manager.restore().await });

        while !self.should_quit {
            terminal.draw(|frame| ui::render(frame, self))?;

            tokio::select! {
                maybe_event = input.next() => match maybe_event {
                    Some(Ok(event)) => self.handle_terminal_event(event),
                    Some(Err(e)) => return Err(e.into()),
                    None => break,
                },
                _ = ticker.tick() => {
                    self.tick = self.tick.wrapping_add(1);
                }
                changed = session_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let session = session_rx.borrow_and_update().clone();
                    self.on_session(session);
                }
                Some(event) = self.events_rx.recv() => self.on_event(event),
            }
        }

        info!("Exiting");
        Ok(())
    }

    /// Every input counts as activity before it is handled
    fn handle_terminal_event(&mut self, event: CrosstermEvent) {
        if let Some(signal) = activity_signal(&event) {
            self.source.dispatch(signal);
        }

        if let CrosstermEvent::Key(key) = event {
            if key.kind == KeyEventKind::Press {
                self.handle_key(key);
            }
        }
    }

    /// Handle key press events
    fn handle_key(&mut self, key: KeyEvent) {
        // Global quit handler
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        match self.state.current_screen {
            Screen::Splash => {
                if key.code == KeyCode::Esc {
                    self.should_quit = true;
                }
            }
            Screen::Login => self.handle_login_key(key.code),
            Screen::Setup => self.handle_setup_key(key.code),
            Screen::Lock => self.handle_lock_key(key.code),
            Screen::Dashboard => self.handle_dashboard_key(key.code),
            Screen::Settings => self.handle_settings_key(key.code),
        }
    }

    fn handle_login_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::F(2) => self.switch_screen(Screen::Setup),
            _ => {
                if self.edit_form(key) {
                    self.submit_login();
                }
            }
        }
    }

    fn handle_setup_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc => self.switch_screen(Screen::Login),
            _ => {
                if self.edit_form(key) {
                    self.submit_setup();
                }
            }
        }
    }

    fn handle_lock_key(&mut self, key: KeyCode) {
        if self.edit_form(key) {
            self.submit_unlock();
        }
    }

    fn handle_dashboard_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('l') => self.manager.lock(),
            KeyCode::Char('s') => self.switch_screen(Screen::Settings),
            KeyCode::Char('r') => {
                self.supervisor.refresh_settings();
                self.state.notice = Some("Refreshing settings".to_string());
            }
            KeyCode::Char('o') => self.submit_logout(),
            _ => {}
        }
    }

    fn handle_settings_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc => self.switch_screen(Screen::Dashboard),
            KeyCode::Left => {
                self.state.settings_section = self.state.settings_section.previous();
                self.state.form_error = None;
            }
            KeyCode::Right => {
                self.state.settings_section = self.state.settings_section.next();
                self.state.form_error = None;
            }
            _ => {
                if self.edit_form(key) {
                    match self.state.settings_section {
                        SettingsSection::ChangePin => self.submit_change_pin(),
                        SettingsSection::ChangeUsername => self.submit_change_username(),
                        SettingsSection::AutoLock => self.submit_auto_lock(),
                    }
                }
            }
        }
    }

    /// Apply an editing key to the active form; true when Enter submits it
    fn edit_form(&mut self, key: KeyCode) -> bool {
        if matches!(key, KeyCode::Char(_) | KeyCode::Backspace) {
            self.state.form_error = None;
        }
        let pending = self.state.is_pending();
        let Some(form) = self.state.active_form_mut() else {
            return false;
        };

        match key {
            KeyCode::Tab | KeyCode::Down => form.next(),
            KeyCode::BackTab | KeyCode::Up => form.previous(),
            KeyCode::Backspace => {
                if let Some(field) = form.focused_mut() {
                    field.pop();
                }
            }
            KeyCode::Char(c) => {
                if let Some(field) = form.focused_mut() {
                    field.push(c);
                }
            }
            KeyCode::Enter => {
                if form.on_last_field() {
                    return !pending;
                }
                form.next();
            }
            _ => {}
        }
        false
    }

    fn switch_screen(&mut self, screen: Screen) {
        self.state.current_screen = screen;
        self.state.form_error = None;
        self.state.notice = None;
        self.manager.clear_error();
    }

    fn submit_login(&mut self) {
        if let Err(message) = validate_login(&self.state.login_form) {
            self.state.form_error = Some(message.to_string());
            return;
        }
        let username = self.state.login_form.value(0).trim().to_string();
        let pin = Zeroizing::new(self.state.login_form.value(1).to_string());
        let manager = self.manager.clone();

        self.dispatch(Operation::Login, async move {
            manager
                .login(&username, &pin)
                .await
                .map(|user| format!("Welcome, {}", user.username))
                .map_err(|e| e.to_string())
        });
    }

    fn submit_setup(&mut self) {
        if let Err(message) = validate_setup(&self.state.setup_form) {
            self.state.form_error = Some(message.to_string());
            return;
        }
        let form = &self.state.setup_form;
        let username = non_empty(form.value(0)).unwrap_or_else(|| "admin".to_string());
        let email = non_empty(form.value(1));
        let pin = Zeroizing::new(form.value(2).to_string());
        let manager = self.manager.clone();

        self.dispatch(Operation::Setup, async move {
            manager
                .setup(&pin, Some(&username), email.as_deref())
                .await
                .map(|user| format!("Welcome to Taskline, {}", user.username))
                .map_err(|e| e.to_string())
        });
    }

    fn submit_unlock(&mut self) {
        if self.state.unlock_form.value(0).is_empty() {
            return;
        }
        let pin = Zeroizing::new(self.state.unlock_form.value(0).to_string());
        let manager = self.manager.clone();

        self.dispatch(Operation::Unlock, async move {
            manager
                .unlock(&pin)
                .await
                .map(|()| String::new())
                .map_err(|e| e.to_string())
        });
    }

    fn submit_logout(&mut self) {
        let manager = self.manager.clone();
        self.dispatch(Operation::Logout, async move {
            manager
                .logout()
                .await
                .map(|()| "Signed out".to_string())
                .map_err(|e| e.to_string())
        });
    }

    fn submit_change_pin(&mut self) {
        if let Err(message) = validate_change_pin(&self.state.change_pin_form) {
            self.state.form_error = Some(message.to_string());
            return;
        }
        let current = Zeroizing::new(self.state.change_pin_form.value(0).to_string());
        let new_pin = Zeroizing::new(self.state.change_pin_form.value(1).to_string());
        let manager = self.manager.clone();

        self.dispatch(Operation::ChangePin, async move {
            manager
                .change_pin(&current, &new_pin)
                .await
                .map(|()| "PIN changed".to_string())
                .map_err(|e| e.to_string())
        });
    }

    fn submit_change_username(&mut self) {
        let Some(username) = non_empty(self.state.change_username_form.value(0)) else {
            self.state.form_error = Some("Enter a new username".to_string());
            return;
        };
        let pin = Zeroizing::new(self.state.change_username_form.value(1).to_string());
        let manager = self.manager.clone();

        self.dispatch(Operation::ChangeUsername, async move {
            manager
                .change_username(&username, &pin)
                .await
                .map(|name| format!("Username changed to {}", name))
                .map_err(|e| e.to_string())
        });
    }

    fn submit_auto_lock(&mut self) {
        let Ok(minutes) = self.state.auto_lock_form.value(0).parse::<u32>() else {
            self.state.form_error = Some("Enter a number of minutes".to_string());
            return;
        };
        let client = self.client.clone();

        self.dispatch(Operation::UpdateAutoLock, async move {
            client
                .update_auto_lock(minutes)
                .await
                .map(|settings| match settings.auto_lock_minutes {
                    0 => "Auto-lock disabled".to_string(),
                    n => format!("Auto-lock after {} minute(s) of inactivity", n),
                })
                .map_err(|e| e.message)
        });
    }

    /// Run a remote operation in the background; one at a time
    fn dispatch<F>(&mut self, operation: Operation, task: F)
    where
        F: Future<Output = std::result::Result<String, String>> + Send + 'static,
    {
        if self.state.is_pending() {
            return;
        }
        self.state.pending = Some(operation);
        self.state.form_error = None;
        self.state.notice = None;

        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = task.await;
            if tx.send(Event::OperationComplete { operation, result }).is_err() {
                debug!("Operation finished after the UI closed");
            }
        });
    }

    fn on_event(&mut self, event: Event) {
        match event {
            Event::OperationComplete { operation, result } => {
                self.state.pending = None;
                match result {
                    Ok(message) => {
                        self.clear_form_for(operation);
                        if !message.is_empty() {
                            self.state.notice = Some(message);
                        }
                        if operation == Operation::UpdateAutoLock {
                            self.supervisor.refresh_settings();
                        }
                    }
                    Err(message) => {
                        debug!("{:?} failed: {}", operation, message);
                        match operation {
                            // Published by the manager; shown from the session snapshot
                            Operation::Unlock => self.state.unlock_form.clear(),
                            Operation::UpdateAutoLock => self.state.form_error = Some(message),
                            _ => {}
                        }
                    }
                }
            }
        }
    }

    fn clear_form_for(&mut self, operation: Operation) {
        match operation {
            Operation::Login => self.state.login_form.clear(),
            Operation::Setup => self.state.setup_form.clear(),
            Operation::Unlock => self.state.unlock_form.clear(),
            Operation::ChangePin => self.state.change_pin_form.clear(),
            Operation::ChangeUsername => self.state.change_username_form.clear(),
            Operation::UpdateAutoLock => self.state.auto_lock_form.clear(),
            Operation::Logout => {}
        }
    }

    fn on_session(&mut self, session: SessionState) {
        if self.session.user.is_some() && session.user.is_none() {
            self.state.clear_forms();
        }

        let next = router::route(&session, self.state.current_screen);
        if next != self.state.current_screen {
            debug!("Screen {:?} -> {:?}", self.state.current_screen, next);
            if next == Screen::Lock {
                self.state.unlock_form.clear();
                self.state.notice = None;
            }
            self.state.current_screen = next;
            self.state.form_error = None;
        }

        self.session = session;
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
