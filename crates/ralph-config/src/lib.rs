//! Loop control documents: config, guidance, state machine, global signals.
//!
//! Everything here is invocation-scoped: nothing is cached between hook
//! ticks. Each tick re-reads the documents so user edits (a `forbid`
//! between turns, a hand-edited threshold) land on the very next turn.
//!
//! All mutators write temp-file-then-rename with post-write validation;
//! the config additionally keeps a one-slot backup for rollback.

pub mod ack;
pub mod config;
pub mod global;
pub mod guidance;
pub mod io;
pub mod paths;
pub mod state;

pub use ack::{AckRecord, Constraint, append_ack, constraints_from_scan, load_acked_ids};
pub use config::{CompletionConfig, Config, LoopDetection, LoopLimits, ProtectionConfig,
    SCHEMA_VERSION};
pub use global::{
    GlobalStop, StopReasonCache, clear_global_stop, read_global_stop, read_stop_reason,
    write_global_stop, write_stop_reason,
};
pub use guidance::Guidance;
pub use state::{LoopState, clear_kill_switch, kill_switch_present, load_state, transition_state};
