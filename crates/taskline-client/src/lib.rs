//! Taskline Client - HTTP implementation of the session collaborators
//!
//! [`ApiClient`] implements [`taskline_session::AuthBackend`] and
//! [`taskline_session::SettingsSupplier`] against the Taskline REST API.

pub mod client;
pub mod envelope;
pub mod error;
pub mod models;

pub use client::ApiClient;
pub use envelope::decode_response;
pub use error::{ApiError, Result, NETWORK_ERROR_MESSAGE};
pub use models::UserSettings;
