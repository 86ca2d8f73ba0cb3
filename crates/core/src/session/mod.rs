//! Persisted login session and the process-wide context screens observe.

mod context;
mod models;
mod store;

pub use context::SessionContext;
pub use models::SessionRecord;
pub use store::{SessionStore, LOGGED_IN_KEY, TOKEN_KEY, USER_KEY};
