//! Host integration: hook payload parsing and the PreToolUse guard.
//!
//! Two entry points reach this crate from the CLI:
//! - the stop hook, which maps an engine decision onto the host's
//!   block/continue wire shape, and
//! - the pretool hook, which vetoes destructive commands against loop
//!   control files.

pub mod guard;
pub mod protocol;

pub use guard::{GuardDecision, evaluate};
pub use protocol::{
    HookInput, PermissionDecisionPayload, StopDecisionPayload, ToolInput,
};
