//! Auth handlers and supporting modules.
//!
//! The SMS magic link flow is exposed as a credential provider named
//! `sms-magic-link`:
//!
//! - `POST /api/auth/sms-magic-link` issues and delivers a link.
//! - `POST /api/auth/callback/sms-magic-link` exchanges a link token for a
//!   session cookie.
//! - `GET /auth/verify-sms` does the same for a browser following the link and
//!   answers with a redirect.
//!
//! Sessions are signed tokens carried in the `whatsdesigns_session` cookie or
//! an `Authorization: Bearer` header. Every rejected link produces the same
//! public error so callers cannot probe which phone numbers exist.

pub(crate) mod callback;
pub(crate) mod magic_link;
pub(crate) mod session;
mod state;
pub(crate) mod types;
pub(crate) mod verify_sms;

pub use state::{AuthConfig, AuthState};
