//! Phone number authentication by SMS magic link.
//!
//! - `token`: signed, 15-minute link tokens.
//! - `attempts` / `accounts`: storage traits with Postgres implementations;
//!   `memory` holds in-process versions.
//! - `delivery`: Twilio or local echo, chosen at startup.
//! - `flow`: request and verification orchestration.
//! - `session` / `guard`: session tokens and access decisions.

pub mod accounts;
pub mod attempts;
pub mod delivery;
pub mod error;
pub mod flow;
pub mod guard;
pub mod memory;
pub mod session;
pub mod token;

pub use accounts::{Account, AccountStore, PgAccountStore};
pub use attempts::{AttemptStore, LoginAttempt, PgAttemptStore};
pub use delivery::{Delivery, DeliveryResult, Environment, TwilioOptions, TwilioSms};
pub use error::{DeliveryError, RequestLinkError, TokenError, VerifyError};
pub use flow::{LinkRequested, MagicLinkService, Verified};
pub use guard::{GuardDecision, RouteGuard, SessionStatus};
pub use session::{Session, SessionClaims, SessionIssuer};
pub use token::{MagicLinkClaims, TokenCodec};
