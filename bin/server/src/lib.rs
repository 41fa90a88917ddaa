//! gatehouse HTTP server.
//!
//! This crate exposes the session broker over HTTP:
//! - `GET /auth/{realm}/{provider}?action=` redirects to the identity provider
//! - `GET /auth/callback?code=&state=` completes the login and sets the
//!   `session` cookie
//! - `GET /verify` checks a realm API key
//! - `GET /{session_id}`, `PUT /{session_id}/refresh`, and
//!   `DELETE /{session_id}` read, refresh, and end a session

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::router;
pub use state::{AppState, StartupError};
