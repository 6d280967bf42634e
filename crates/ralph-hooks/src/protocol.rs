//! Host hook protocol: the JSON the host writes to stdin and expects on
//! stdout.
//!
//! Stdout discipline matters here: a stop-hook process prints exactly one
//! JSON object and nothing else. A decision of `block` forces another
//! turn, with `additionalContext` as the instruction document; `continue`
//! lets the assistant's stop stand.

use ralph_core::LoopDecision;
use serde::{Deserialize, Serialize};

/// One hook invocation's stdin payload. Unknown fields are ignored; every
/// field is optional so a host protocol drift degrades instead of failing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HookInput {
    #[serde(default)]
    pub tool_name: Option<String>,

    #[serde(default)]
    pub tool_input: ToolInput,

    #[serde(default)]
    pub session_id: Option<String>,

    #[serde(default)]
    pub parent_session_id: Option<String>,

    #[serde(default)]
    pub transcript_path: Option<String>,

    #[serde(default)]
    pub cwd: Option<String>,

    /// Set by the host when a stop hook already blocked once this turn.
    #[serde(default)]
    pub stop_hook_active: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolInput {
    #[serde(default)]
    pub command: Option<String>,

    #[serde(default)]
    pub file_path: Option<String>,
}

impl HookInput {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

/// Stop-hook stdout shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StopDecisionPayload {
    /// `"block"` forces another turn; `"continue"` lets the stop stand.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(rename = "stopReason", skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,

    #[serde(rename = "additionalContext", skip_serializing_if = "Option::is_none")]
    pub additional_context: Option<String>,
}

impl StopDecisionPayload {
    /// Map an engine decision onto the wire shape. Note the inversion:
    /// the engine "continue the loop" is the host's `block`.
    pub fn from_decision(decision: &LoopDecision) -> Self {
        match decision {
            LoopDecision::Continue { reason, next_prompt } => Self {
                decision: Some("block".to_string()),
                reason: Some(reason.to_string()),
                stop_reason: None,
                additional_context: next_prompt.clone(),
            },
            LoopDecision::Stop { reason, summary } => Self {
                decision: Some("continue".to_string()),
                reason: Some(reason.as_str().to_string()),
                stop_reason: Some(summary.clone()),
                additional_context: None,
            },
        }
    }

    /// The empty decision: emitted when stdin is unparseable, equivalent
    /// to "no opinion".
    pub fn empty() -> Self {
        Self::default()
    }
}

/// PreToolUse stdout shape (only emitted on deny).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionDecisionPayload {
    #[serde(rename = "hookSpecificOutput")]
    pub hook_specific_output: PermissionDecision,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionDecision {
    #[serde(rename = "hookEventName")]
    pub hook_event_name: String,

    #[serde(rename = "permissionDecision")]
    pub permission_decision: String,

    #[serde(rename = "permissionDecisionReason")]
    pub permission_decision_reason: String,
}

impl PermissionDecisionPayload {
    pub fn deny(reason: String) -> Self {
        Self {
            hook_specific_output: PermissionDecision {
                hook_event_name: "PreToolUse".to_string(),
                permission_decision: "deny".to_string(),
                permission_decision_reason: reason,
            },
        }
    }
}
