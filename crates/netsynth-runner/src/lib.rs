//! Orchestration of the external Yosys synthesis tool.
//!
//! This crate owns everything between a validated design source and a parsed
//! netlist: it stages the source in a private scratch directory, runs the tool
//! as a bounded subprocess, and turns the result into a [`SynthesisOutcome`].
//!
//! # Modules
//!
//! - [`workspace`] -- Per-job scratch directories with guaranteed cleanup
//! - [`invoker`] -- Subprocess execution with timeout and bounded capture
//! - [`capture`] -- Tail-keeping stream buffers
//! - [`script`] -- Yosys script template and option validation
//! - [`pipeline`] -- The end-to-end [`Synthesizer`]

pub mod capture;
pub mod error;
pub mod invoker;
pub mod pipeline;
pub mod script;
pub mod workspace;

pub use capture::{CapturedOutput, CapturedStream};
pub use error::{RunnerError, WorkspaceError};
pub use invoker::{ExitKind, ToolInvocation, ToolInvoker, ToolOutcome, MAX_TOOL_TIMEOUT};
pub use pipeline::{SynthesisOutcome, SynthesisReport, Synthesizer, DEFAULT_MAX_NETLIST_BYTES};
pub use script::SynthesisOptions;
pub use workspace::{Workspace, WorkspaceManager};
