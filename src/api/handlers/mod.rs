//! API handlers for WhatsDesigns.

pub mod auth;
pub mod dashboard;
pub mod guard;
pub mod health;
