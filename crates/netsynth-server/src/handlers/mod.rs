//! HTTP handler modules for the netsynth API.
//!
//! Handlers parse and validate requests, delegate to
//! [`crate::service::SynthesisService`], and return JSON responses.

pub mod health;
pub mod status;
pub mod synthesize;
