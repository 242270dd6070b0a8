//! API schema types for request/response definitions.
//!
//! Each sub-module defines the request and response types for one endpoint.
//! Types use serde derives for JSON serialization/deserialization.

pub mod status;
pub mod synthesize;
