//! Access-control hook point.
//!
//! The dispatcher consults an [`AclEnforcer`] before running a command's
//! handler. No ACL system ships in this engine — [`NoopAcl`] is the
//! default and permits everything — but the seam lets a caller plug one
//! in without touching the dispatcher.

use ember_core::Error;

pub trait AclEnforcer: Send + Sync {
    /// Returns `Err(Error::AclDenied)` if `connection_id` may not run
    /// `command_name` (upper-cased) against `keys`.
    fn check(&self, connection_id: u64, command_name: &str, keys: &[&[u8]]) -> Result<(), Error>;
}

#[derive(Debug, Default)]
pub struct NoopAcl;

impl AclEnforcer for NoopAcl {
    fn check(&self, _connection_id: u64, _command_name: &str, _keys: &[&[u8]]) -> Result<(), Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_acl_permits_everything() {
        let acl = NoopAcl;
        assert!(acl.check(0, "GET", &[b"k"]).is_ok());
    }
}
