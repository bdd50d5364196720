//! Persistence control: on-demand snapshots and append-only log
//! rewrites, driven synchronously from the calling connection rather
//! than the background ticker.

use crate::connection::Connection;
use crate::engine::Engine;
use crate::registry::{no_keys, CommandSpec, SyncFlag};
use crate::reply::{DispatchResult, Reply};
use bytes::Bytes;

fn save(engine: &Engine, _c: &mut Connection, _args: &[Bytes]) -> DispatchResult {
    engine.save()?;
    Ok(Reply::ok())
}

fn bgsave(engine: &Engine, _c: &mut Connection, _args: &[Bytes]) -> DispatchResult {
    engine.save()?;
    Ok(Reply::Simple("Background saving started"))
}

fn lastsave(engine: &Engine, _c: &mut Connection, _args: &[Bytes]) -> DispatchResult {
    Ok(Reply::Integer((engine.last_save_unix_ms() / 1000) as i64))
}

fn bgrewriteaof(engine: &Engine, _c: &mut Connection, _args: &[Bytes]) -> DispatchResult {
    engine.bgrewriteaof()?;
    Ok(Reply::Simple("Background append only file rewriting started"))
}

pub fn specs() -> Vec<CommandSpec> {
    vec![
        CommandSpec { name: "SAVE", module: "admin", categories: &["admin"], description: "Synchronously write a snapshot to disk", sync_flag: SyncFlag::Admin, key_extraction_fn: no_keys, handler_fn: save, arity_min: 0 },
        CommandSpec { name: "BGSAVE", module: "admin", categories: &["admin"], description: "Write a snapshot to disk without blocking", sync_flag: SyncFlag::Admin, key_extraction_fn: no_keys, handler_fn: bgsave, arity_min: 0 },
        CommandSpec { name: "LASTSAVE", module: "admin", categories: &["admin"], description: "Get the unix timestamp of the last successful snapshot", sync_flag: SyncFlag::Admin, key_extraction_fn: no_keys, handler_fn: lastsave, arity_min: 0 },
        CommandSpec { name: "BGREWRITEAOF", module: "admin", categories: &["admin"], description: "Compact the append-only log in the background", sync_flag: SyncFlag::Admin, key_extraction_fn: no_keys, handler_fn: bgrewriteaof, arity_min: 0 },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use ember_storage::StorageConfig;

    #[test]
    fn save_on_in_memory_engine_is_a_harmless_noop() {
        let engine = Engine::in_memory(StorageConfig::default());
        let mut c = engine.embedded_connection();
        assert_eq!(save(&engine, &mut c, &[]).unwrap(), Reply::ok());
    }

    #[test]
    fn save_then_reopen_recovers_state() {
        let dir = tempfile::tempdir().unwrap();
        {
            let engine = Engine::open(dir.path()).unwrap();
            let mut c = engine.embedded_connection();
            engine.dispatch(&mut c, &[Bytes::from_static(b"SET"), Bytes::from_static(b"k"), Bytes::from_static(b"v")]).unwrap();
            save(&engine, &mut c, &[]).unwrap();
        }
        let engine = Engine::open(dir.path()).unwrap();
        let mut c = engine.embedded_connection();
        let got = engine.dispatch(&mut c, &[Bytes::from_static(b"GET"), Bytes::from_static(b"k")]).unwrap();
        assert_eq!(got, Reply::Bulk(Bytes::from_static(b"v")));
    }

    #[test]
    fn bgrewriteaof_on_in_memory_engine_is_a_harmless_noop() {
        let engine = Engine::in_memory(StorageConfig::default());
        let mut c = engine.embedded_connection();
        assert!(bgrewriteaof(&engine, &mut c, &[]).is_ok());
    }
}
