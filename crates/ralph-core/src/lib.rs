//! Shared types for the Ralph loop orchestrator.
//!
//! The loop runs as short-lived hook processes: the host invokes the engine
//! every time the agent would stop a turn, and the engine answers with a
//! [`types::LoopDecision`]: either let the stop stand, or force another
//! turn with a freshly composed instruction document.

pub mod error;
pub mod types;

pub use error::RalphError;
pub use types::{
    AdapterMetrics, AdapterVerdict, ContinueReason, DecisionAudit, LoopDecision,
    OutputFingerprint, Phase, StopReason,
};
