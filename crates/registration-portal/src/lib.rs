//! Client library for the council registration portal.
//!
//! The backend owns every business rule that needs persistence; this crate
//! owns the applicant-side flow: signing in, walking the application wizard,
//! handing the fee to the payment checkout and submitting the paid
//! application.

pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod session;
pub mod telemetry;
pub mod workflows;
