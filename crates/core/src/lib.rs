#![warn(clippy::all, missing_docs)]

//! Core logic for the Kisan farmer client.
//!
//! This crate hosts the backend API client, the persisted session, the
//! phone/OTP sign-in flow, form validation and the crop/farmer models used by
//! the terminal UI and any future frontends.

pub mod api;
pub mod auth;
pub mod config;
pub mod forms;
pub mod models;
pub mod session;
pub mod storage;
pub mod tasks;

pub use api::{ApiClient, ApiError, FarmerApi};
pub use auth::{AuthError, AuthFlow, AuthStep};
pub use config::AppConfig;
pub use models::{Crop, CropStatus, Farmer};
pub use session::{SessionContext, SessionRecord, SessionStore};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use tasks::ScreenTasks;
