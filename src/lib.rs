//! # WhatsDesigns (SMS magic link authentication)
//!
//! `whatsdesigns` signs visitors in with their phone number. A visitor asks
//! for a login link, the service texts a short-lived signed link, and the
//! first visit to that link establishes a session.
//!
//! ## Flow
//!
//! 1. `POST /api/auth/sms-magic-link` validates the phone number, rejects
//!    repeat requests inside the rate-limit window, issues a 15 minute token
//!    and delivers the link (Twilio SMS, or echoed back in local mode).
//! 2. `GET /auth/verify-sms?token=...` (or the `sms-magic-link` credential
//!    callback) verifies the signature and expiry, consumes the stored attempt
//!    with a single conditional update, resolves the account by phone and sets
//!    a signed session cookie.
//! 3. Protected views run the route guard, which redirects anonymous visitors
//!    to sign-in and visitors without the required role to `/unauthorized`.
//!
//! ## Failure reporting
//!
//! Verification failures keep their kind (`NoToken`, `Invalid`, `NotFound`,
//! `Used`) for logs, but callers only ever see one generic message. No
//! response reveals whether a phone number has an account.

pub mod api;
pub mod auth;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
