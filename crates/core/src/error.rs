//! Error taxonomy at the command boundary.
//!
//! One variant per error kind from the keyspace engine's design: each
//! is either surfaced to the caller as-is, turned into a nil reply, or
//! logged and treated as a local recovery per the policy documented on
//! the variant.

use thiserror::Error;

/// Result alias used throughout the engine.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced at the command boundary.
///
/// `expired`/`nil` from the design doc is deliberately not a variant
/// here: lazy expiration is normal key absence, represented as
/// `Option::None` at the call site, never as an `Err`.
#[derive(Debug, Error)]
pub enum Error {
    /// A command read or wrote a key whose stored value has a different tag.
    #[error("WRONGTYPE operation against a key holding the wrong kind of value")]
    WrongType,

    /// The requested command (or sub-command) is not in the registry.
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    /// Malformed options, argument counts, or mismatched weight/member counts.
    #[error("syntax error: {0}")]
    Syntax(String),

    /// The connection lacks permission for the keys, category, or command.
    #[error("NOPERM this user has no permissions to run this command or its subcommand")]
    AclDenied,

    /// A write would exceed `max_memory` under the `noeviction` policy.
    #[error("OOM command not allowed when used memory > 'maxmemory'")]
    MaxMemory,

    /// A `sync` write arrived at a non-leader node with forwarding disabled.
    #[error("not cluster leader and forwarding is disabled")]
    NotLeader,

    /// Snapshot or append-only-log I/O failed. The operation aborts; the
    /// engine keeps serving and the operation may be retried.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An internal invariant was violated. Per policy this is logged and
    /// the offending connection is closed rather than silently continued.
    #[error("internal error: {0}")]
    Internal(String),

    /// A sorted-set score was NaN, or otherwise not a valid IEEE-754 score.
    #[error("value is not a valid float")]
    InvalidScore,

    /// A string command target could not be parsed as the numeric type required.
    #[error("value is not an integer or out of range")]
    NotAnInteger,

    /// `add_or_update`'s own argument contract was violated (see sorted set docs).
    #[error("invalid sorted set update: {0}")]
    InvalidUpdate(String),

    /// A re-entrant snapshot or rewrite was attempted while one was already running.
    #[error("operation already in progress")]
    AlreadyInProgress,
}

impl Error {
    /// Whether this error reflects a transient condition worth retrying
    /// (I/O failures, or an in-progress guard rejecting re-entry).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Io(_) | Error::AlreadyInProgress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrong_type_message() {
        let err = Error::WrongType;
        assert!(err.to_string().contains("WRONGTYPE"));
    }

    #[test]
    fn unknown_command_carries_name() {
        let err = Error::UnknownCommand("FROB".into());
        assert!(err.to_string().contains("FROB"));
    }

    #[test]
    fn io_errors_are_retryable() {
        let err = Error::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
        assert!(err.is_retryable());
        assert!(!Error::WrongType.is_retryable());
    }
}
