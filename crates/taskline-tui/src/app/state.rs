//! Application state

use zeroize::Zeroize;

/// Maximum PIN length accepted by the server
pub const MAX_PIN_LENGTH: usize = 8;

/// Minimum PIN length accepted by the server
pub const MIN_PIN_LENGTH: usize = 4;

/// Current screen/view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Screen {
    /// Shown while the stored session is being restored
    #[default]
    Splash,

    /// Username + PIN sign-in
    Login,

    /// First-run account creation
    Setup,

    /// PIN re-entry while locked
    Lock,

    /// Signed-in home
    Dashboard,

    /// PIN, username, and auto-lock settings
    Settings,
}

/// Remote operations dispatched from the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Login,
    Setup,
    Unlock,
    Logout,
    ChangePin,
    ChangeUsername,
    UpdateAutoLock,
}

impl Operation {
    /// Progress label shown while pending
    pub fn progress_label(&self) -> &'static str {
        match self {
            Operation::Login => "Signing in...",
            Operation::Setup => "Creating account...",
            Operation::Unlock => "Unlocking...",
            Operation::Logout => "Signing out...",
            Operation::ChangePin => "Changing PIN...",
            Operation::ChangeUsername => "Changing username...",
            Operation::UpdateAutoLock => "Saving auto-lock...",
        }
    }
}

/// Accepted characters for an input field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Pin,
    Number,
}

/// Single-line input
pub struct InputField {
    pub label: &'static str,
    pub kind: FieldKind,
    pub value: String,
    max_len: usize,
}

impl InputField {
    pub fn text(label: &'static str) -> Self {
        Self::new(label, FieldKind::Text, 64)
    }

    pub fn pin(label: &'static str) -> Self {
        Self::new(label, FieldKind::Pin, MAX_PIN_LENGTH)
    }

    pub fn number(label: &'static str, max_len: usize) -> Self {
        Self::new(label, FieldKind::Number, max_len)
    }

    fn new(label: &'static str, kind: FieldKind, max_len: usize) -> Self {
        Self {
            label,
            kind,
            value: String::new(),
            max_len,
        }
    }

    /// Append a character if the field accepts it
    pub fn push(&mut self, c: char) {
        if self.value.chars().count() >= self.max_len {
            return;
        }
        let accepted = match self.kind {
            FieldKind::Text => !c.is_control(),
            FieldKind::Pin | FieldKind::Number => c.is_ascii_digit(),
        };
        if accepted {
            self.value.push(c);
        }
    }

    pub fn pop(&mut self) {
        self.value.pop();
    }

    pub fn clear(&mut self) {
        self.value.zeroize();
    }

    /// Text to render; PINs are masked
    pub fn display(&self) -> String {
        match self.kind {
            FieldKind::Pin => "●".repeat(self.value.chars().count()),
            _ => self.value.clone(),
        }
    }
}

impl Drop for InputField {
    fn drop(&mut self) {
        self.value.zeroize();
    }
}

/// Ordered set of inputs with a focus cursor
pub struct Form {
    pub fields: Vec<InputField>,
    pub focus: usize,
}

impl Form {
    pub fn new(fields: Vec<InputField>) -> Self {
        Self { fields, focus: 0 }
    }

    pub fn login() -> Self {
        Self::new(vec![InputField::text("Username"), InputField::pin("PIN")])
    }

    pub fn setup() -> Self {
        Self::new(vec![
            InputField::text("Username"),
            InputField::text("Email (optional)"),
            InputField::pin("PIN"),
            InputField::pin("Confirm PIN"),
        ])
    }

    pub fn unlock() -> Self {
        Self::new(vec![InputField::pin("PIN")])
    }

    pub fn change_pin() -> Self {
        Self::new(vec![
            InputField::pin("Current PIN"),
            InputField::pin("New PIN"),
            InputField::pin("Confirm new PIN"),
        ])
    }

    pub fn change_username() -> Self {
        Self::new(vec![InputField::text("New username"), InputField::pin("PIN")])
    }

    pub fn auto_lock() -> Self {
        Self::new(vec![InputField::number("Minutes (0 = off)", 4)])
    }

    pub fn value(&self, index: usize) -> &str {
        self.fields.get(index).map(|f| f.value.as_str()).unwrap_or("")
    }

    pub fn focused_mut(&mut self) -> Option<&mut InputField> {
        self.fields.get_mut(self.focus)
    }

    pub fn next(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + 1) % self.fields.len();
        }
    }

    pub fn previous(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + self.fields.len() - 1) % self.fields.len();
        }
    }

    pub fn on_last_field(&self) -> bool {
        self.focus + 1 >= self.fields.len()
    }

    pub fn clear(&mut self) {
        for field in &mut self.fields {
            field.clear();
        }
        self.focus = 0;
    }
}

/// Login form check, before contacting the server
pub fn validate_login(form: &Form) -> Result<(), &'static str> {
    if form.value(0).trim().is_empty() {
        return Err("Enter your username");
    }
    if form.value(1).len() < MIN_PIN_LENGTH {
        return Err("PIN must be at least 4 digits");
    }
    Ok(())
}

/// Setup form check
pub fn validate_setup(form: &Form) -> Result<(), &'static str> {
    if form.value(2).len() < MIN_PIN_LENGTH {
        return Err("PIN must be at least 4 digits");
    }
    if form.value(2) != form.value(3) {
        return Err("PINs do not match");
    }
    Ok(())
}

/// PIN change form check
pub fn validate_change_pin(form: &Form) -> Result<(), &'static str> {
    if form.value(0).is_empty() {
        return Err("Enter your current PIN");
    }
    if form.value(1).len() < MIN_PIN_LENGTH {
        return Err("PIN must be at least 4 digits");
    }
    if form.value(1) != form.value(2) {
        return Err("PINs do not match");
    }
    Ok(())
}

/// Settings screen sections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SettingsSection {
    #[default]
    ChangePin,
    ChangeUsername,
    AutoLock,
}

impl SettingsSection {
    pub const ALL: [SettingsSection; 3] = [
        SettingsSection::ChangePin,
        SettingsSection::ChangeUsername,
        SettingsSection::AutoLock,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            SettingsSection::ChangePin => "Change PIN",
            SettingsSection::ChangeUsername => "Change Username",
            SettingsSection::AutoLock => "Auto-Lock",
        }
    }

    pub fn next(self) -> Self {
        match self {
            SettingsSection::ChangePin => SettingsSection::ChangeUsername,
            SettingsSection::ChangeUsername => SettingsSection::AutoLock,
            SettingsSection::AutoLock => SettingsSection::ChangePin,
        }
    }

    pub fn previous(self) -> Self {
        match self {
            SettingsSection::ChangePin => SettingsSection::AutoLock,
            SettingsSection::ChangeUsername => SettingsSection::ChangePin,
            SettingsSection::AutoLock => SettingsSection::ChangeUsername,
        }
    }
}

/// Application state
pub struct AppState {
    /// Current screen
    pub current_screen: Screen,

    pub login_form: Form,
    pub setup_form: Form,
    pub unlock_form: Form,
    pub change_pin_form: Form,
    pub change_username_form: Form,
    pub auto_lock_form: Form,

    /// Selected settings section
    pub settings_section: SettingsSection,

    /// Operation in flight; its control is disabled until it completes
    pub pending: Option<Operation>,

    /// Local validation error for the current form
    pub form_error: Option<String>,

    /// Success notice
    pub notice: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            current_screen: Screen::Splash,
            login_form: Form::login(),
            setup_form: Form::setup(),
            unlock_form: Form::unlock(),
            change_pin_form: Form::change_pin(),
            change_username_form: Form::change_username(),
            auto_lock_form: Form::auto_lock(),
            settings_section: SettingsSection::default(),
            pending: None,
            form_error: None,
            notice: None,
        }
    }

    /// Form that receives input on the current screen
    pub fn active_form_mut(&mut self) -> Option<&mut Form> {
        match self.current_screen {
            Screen::Login => Some(&mut self.login_form),
            Screen::Setup => Some(&mut self.setup_form),
            Screen::Lock => Some(&mut self.unlock_form),
            Screen::Settings => Some(match self.settings_section {
                SettingsSection::ChangePin => &mut self.change_pin_form,
                SettingsSection::ChangeUsername => &mut self.change_username_form,
                SettingsSection::AutoLock => &mut self.auto_lock_form,
            }),
            Screen::Splash | Screen::Dashboard => None,
        }
    }

    /// Forget every typed value
    pub fn clear_forms(&mut self) {
        self.login_form.clear();
        self.setup_form.clear();
        self.unlock_form.clear();
        self.change_pin_form.clear();
        self.change_username_form.clear();
        self.auto_lock_form.clear();
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
