use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error("unknown action '{0}'")]
    UnknownAction(String),

    #[error("empty action")]
    EmptyAction,

    #[error("action '{name}' expects {expected} argument(s), got {got}")]
    ArgumentCount {
        name: &'static str,
        expected: &'static str,
        got: usize,
    },

    #[error("argument {0:?} contains a NUL byte")]
    NulInArgument(String),

    #[error("empty chord pattern")]
    EmptyPattern,

    #[error("chord step '{0}' has no key")]
    MissingKey(String),

    #[error("unknown modifier '{0}'")]
    UnknownModifier(String),

    #[error("unknown keysym '{0}'")]
    UnknownKeysym(String),

    #[error("unknown property '{0}'")]
    UnknownProperty(String),

    #[error("property '{0}' is read-only")]
    ReadOnlyProperty(String),

    #[error("invalid value for '{path}': {reason}")]
    InvalidValue { path: String, reason: String },

    #[error("no such output '{0}'")]
    UnknownOutput(String),

    #[error("spawn failed: {0}")]
    Spawn(String),

    #[error("failed to encode '{path}': {reason}")]
    Encode { path: String, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
