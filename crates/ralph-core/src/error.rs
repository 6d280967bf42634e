#[derive(thiserror::Error, Debug)]
pub enum RalphError {
    #[error("Config not found at {0}")]
    ConfigNotFound(String),

    #[error("Config at {path} is invalid: {reason}")]
    ConfigInvalid { path: String, reason: String },

    #[error("Config at {path} is corrupt and no usable backup exists")]
    ConfigUnrecoverable { path: String },

    #[error("Invalid loop state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Home directory could not be determined")]
    HomeNotFound,
}
