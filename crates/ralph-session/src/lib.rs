//! Per-session persistent state.
//!
//! Every hook tick is a fresh process; everything the engine needs to
//! remember between ticks lives in these records. Records are keyed by the
//! host's session id and survive host restarts; a resumed session inherits
//! focus targets from its parent on first touch.

pub mod record;
pub mod store;

pub use record::{RUNTIME_GAP_CEILING_SECONDS, SessionRecord};
pub use store::{
    list_sessions, load_or_create, load_session, newest_session, save_session, session_path,
    validate_session_id,
};
