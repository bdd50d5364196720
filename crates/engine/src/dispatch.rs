//! The command dispatch sequence.
//!
//! 1. Parse the command name (case-insensitive) and look it up, with
//!    sub-command override: `CLIENT SETNAME` and `COMMAND LIST` are
//!    registered under their own combined name, checked before the
//!    bare top-level name.
//! 2. Reject on arity mismatch.
//! 3. Run the ACL hook.
//! 4. For a mutating command, enter the write-serialization gate
//!    before touching the keyspace and hold it for the duration of the
//!    handler; a snapshot/rewrite in progress blocks this step, never
//!    the reverse. Then ask the memory governor to enforce `max_memory`
//!    synchronously, before the handler runs: under `noeviction` this
//!    rejects the write outright rather than letting it land and only
//!    get cleaned up on the next background tick.
//! 5. Run the handler against the store.
//! 6. On success, append a durability record for the mutation (skipped
//!    entirely for read-only and admin commands).
//! 7. Forward the write to the replication sink (a no-op by default;
//!    this is the sync/standalone/cluster branch point — this core
//!    only ever runs standalone, so the branch always takes the
//!    "local only" arm).

use crate::connection::Connection;
use crate::engine::Engine;
use crate::registry::SyncFlag;
use crate::reply::{DispatchResult, Reply};
use bytes::Bytes;
use ember_core::Error;
use tracing::trace;

pub fn dispatch(engine: &Engine, connection: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let Some(raw_name) = args.first() else {
        return Err(Error::Syntax("empty command".into()));
    };
    let upper = String::from_utf8_lossy(raw_name).to_ascii_uppercase();

    let combined = args.get(1).map(|sub| format!("{upper} {}", String::from_utf8_lossy(sub).to_ascii_uppercase()));
    let (spec, rest) = match combined.as_deref().and_then(|c| engine.registry().lookup(c)) {
        Some(spec) => (spec, &args[2..]),
        None => match engine.registry().lookup(&upper) {
            Some(spec) => (spec, &args[1..]),
            None => return Err(Error::UnknownCommand(upper)),
        },
    };

    if rest.len() < spec.arity_min {
        return Err(Error::Syntax(format!("wrong number of arguments for '{}'", spec.name)));
    }

    let key_refs: Vec<&[u8]> = (spec.key_extraction_fn)(rest).into_iter().filter_map(|i| rest.get(i)).map(|b| b.as_ref()).collect();
    engine.acl().check(connection.id(), spec.name, &key_refs)?;

    match spec.sync_flag {
        SyncFlag::Write => {
            let _guard = engine.gate().enter_write();
            engine.governor().enforce(engine.store())?;
            let reply = (spec.handler_fn)(engine, connection, rest)?;
            engine.record_write(connection.database_index(), spec.name, &key_refs, args);
            trace!(command = spec.name, "replicated to local sink only: standalone core");
            Ok(reply)
        }
        SyncFlag::ReadOnly | SyncFlag::Admin => (spec.handler_fn)(engine, connection, rest),
    }
}

pub fn unknown_subcommand(name: &str, sub: &Bytes) -> Error {
    Error::UnknownCommand(format!("{name} {}", String::from_utf8_lossy(sub)))
}

pub fn ok() -> DispatchResult {
    Ok(Reply::ok())
}

#[cfg(test)]
mod tests {
    use crate::engine::Engine;
    use bytes::Bytes;
    use ember_core::Error;
    use ember_storage::eviction::EvictionPolicy;
    use ember_storage::StorageConfig;

    /// A write issued while the keyspace is already over `max_memory`
    /// under `noeviction` must be rejected synchronously, not merely
    /// cleaned up on the next background tick.
    #[test]
    fn write_rejected_synchronously_over_max_memory_with_noeviction() {
        let storage = StorageConfig { max_memory: Some(1), eviction_policy: EvictionPolicy::NoEviction, ..StorageConfig::default() };
        let engine = Engine::in_memory(storage);
        let mut conn = engine.embedded_connection();
        let err = engine.dispatch(&mut conn, &[Bytes::from_static(b"SET"), Bytes::from_static(b"k"), Bytes::from_static(b"v")]).unwrap_err();
        assert!(matches!(err, Error::MaxMemory));
    }
}
