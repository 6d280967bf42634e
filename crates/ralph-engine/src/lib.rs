//! The loop decision engine.
//!
//! One hook tick: load config and session, run the detectors (budget,
//! completion, repetition, guidance, adapter), apply the state machine,
//! and either let the assistant stop or force another turn with a freshly
//! composed instruction document.
//!
//! Detectors are pure functions returning verdict values; all branching
//! lives in [`decision`].

pub mod adapter;
pub mod budget;
pub mod completion;
pub mod decision;
pub mod guidance_filter;
pub mod phase;
pub mod prompt;
pub mod repetition;
pub mod transcript;

pub use budget::{BudgetReport, MaxExceeded};
pub use completion::{CompletionSignal, CompletionVerdict};
pub use decision::{TickInput, TickOutcome, run_stop_tick};
pub use guidance_filter::{GuidanceDecision, classify};
pub use repetition::{RepetitionAction, RepetitionVerdict, fingerprint};
