/*!
Error types for parsing and invocation.

Every user-input mistake — unknown option, missing value, failed conversion,
failed check, missing required binding, surplus positionals — surfaces as
the one [`ParseError`] kind with a descriptive message, so a hosting CLI can
catch it specifically and print the message. Configuration mistakes
(duplicate identities, misordered array parameters, empty names) are
programmer bugs and panic at the offending declaration call instead; see
the `# Panics` sections on the declaration APIs.
*/

use thiserror::Error;

/// Boxed error type returned by execution hooks.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// The single user-facing failure kind for everything that can go wrong
/// while classifying, converting, or validating command-line input.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParseError {
    #[error("unknown option --{0}")]
    UnknownLong(String),

    #[error("unknown option -{0}")]
    UnknownShort(char),

    #[error("option {0} requires a value")]
    MissingValue(String),

    #[error("option {0} does not take a value (got {1:?})")]
    UnexpectedValue(String, String),

    #[error("option {0} specified more than once")]
    Repeated(String),

    #[error("required option {0} was not supplied")]
    MissingOption(String),

    #[error("required argument <{0}> was not supplied")]
    MissingParameter(String),

    #[error("unexpected argument {0:?}")]
    UnexpectedArgument(String),

    #[error("invalid value {raw:?} for {name}: {reason}")]
    Invalid {
        name: String,
        raw: String,
        reason: String,
    },

    #[error("options {names} may not be combined")]
    GroupConflict { names: String },

    #[error("at least one of {names} must be supplied")]
    GroupMissing { names: String },

    #[error("options {names} must be supplied together")]
    GroupPartial { names: String },
}

/// Failure of a [`Command::invoke`][crate::command::Command::invoke] call.
///
/// Parse failures keep their own variant so the hosting application can
/// catch usage errors specifically and let hook failures propagate as its
/// own domain errors.
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// An execution hook failed. Not a usage error.
    #[error(transparent)]
    Handler(HookError),
}

impl InvokeError {
    /// A hook that failed because a lazy value read failed is still a parse
    /// failure; unwrap it back to the uniform kind.
    pub(crate) fn from_hook(error: HookError) -> Self {
        match error.downcast::<ParseError>() {
            Ok(parse) => Self::Parse(*parse),
            Err(other) => Self::Handler(other),
        }
    }

    /// The parse failure, if this is one.
    pub fn parse(&self) -> Option<&ParseError> {
        match self {
            Self::Parse(error) => Some(error),
            Self::Handler(_) => None,
        }
    }
}
