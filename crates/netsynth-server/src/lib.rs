//! HTTP front end for the Yosys logic-synthesis tool.
//!
//! Accepts Verilog over `POST /synthesize`, runs Yosys in an isolated scratch
//! workspace under a bounded admission policy, and answers with the mapped
//! gate-level netlist, its statistics and an excerpt of the tool log. This
//! crate contains the server framework, API schema types, error handling,
//! and route definitions; the tool plumbing lives in `netsynth-runner`.

pub mod concurrency;
pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod schema;
pub mod service;
pub mod state;
