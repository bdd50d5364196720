//! Key-agnostic and type-agnostic keyspace commands: connection-level
//! `PING`/`ECHO`, database selection, expiry management, and the
//! `KEYS`/`RANDOMKEY`/`TYPE`/`OBJECT` introspection surface.

use super::util::{key, parse_i64, upper};
use crate::connection::Connection;
use crate::engine::Engine;
use crate::registry::{all_keys, first_key, no_keys, CommandSpec, SyncFlag};
use crate::reply::{DispatchResult, Reply};
use bytes::Bytes;
use ember_core::{DbIndex, Error, Key};
use std::time::Duration;

fn ping(_engine: &Engine, _c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    match args.first() {
        Some(msg) => Ok(Reply::bulk(msg.clone())),
        None => Ok(Reply::Simple("PONG")),
    }
}

fn echo(_engine: &Engine, _c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    Ok(Reply::bulk(args[0].clone()))
}

fn select(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let index = parse_i64(&args[0])?;
    if index < 0 || index as usize >= engine.store().num_databases() {
        return Err(Error::Syntax("DB index is out of range".into()));
    }
    c.select(DbIndex::new(index as u16));
    Ok(Reply::ok())
}

fn swapdb(engine: &Engine, _c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let a = parse_i64(&args[0])?;
    let b = parse_i64(&args[1])?;
    let count = engine.store().num_databases() as i64;
    if a < 0 || b < 0 || a >= count || b >= count {
        return Err(Error::Syntax("DB index is out of range".into()));
    }
    engine.store().swap_databases(DbIndex::new(a as u16), DbIndex::new(b as u16));
    Ok(Reply::ok())
}

fn flushdb(engine: &Engine, c: &mut Connection, _args: &[Bytes]) -> DispatchResult {
    engine.store().flush_db(c.database_index());
    Ok(Reply::ok())
}

fn flushall(engine: &Engine, _c: &mut Connection, _args: &[Bytes]) -> DispatchResult {
    engine.store().flush_all();
    Ok(Reply::ok())
}

fn dbsize(engine: &Engine, c: &mut Connection, _args: &[Bytes]) -> DispatchResult {
    Ok(Reply::Integer(engine.store().dbsize(c.database_index()) as i64))
}

fn exists(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let db = c.database_index();
    let count = args.iter().filter(|raw| engine.store().exists(db, &Key::from((*raw).clone()))).count();
    Ok(Reply::Integer(count as i64))
}

fn del(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let db = c.database_index();
    let count = args.iter().filter(|raw| engine.store().delete(db, &Key::from((*raw).clone()))).count();
    Ok(Reply::Integer(count as i64))
}

fn key_type(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    match engine.store().key_type(c.database_index(), &key(args, 0)) {
        Some(t) => Ok(Reply::Simple(t.as_str())),
        None => Ok(Reply::Simple("none")),
    }
}

fn expire_at_ms(engine: &Engine, c: &mut Connection, k: &Key, at_ms: i64, options: &[Bytes]) -> DispatchResult {
    let db = c.database_index();
    let current_ttl = engine.store().ttl(db, k);
    let Some(current_ttl) = current_ttl else {
        return Ok(Reply::Integer(0));
    };
    for opt in options {
        match upper(opt).as_str() {
            "NX" if current_ttl.is_some() => return Ok(Reply::Integer(0)),
            "XX" if current_ttl.is_none() => return Ok(Reply::Integer(0)),
            "GT" => {
                let new_remaining = at_ms - now_ms(engine);
                let current_remaining = current_ttl.map(|d| d.as_millis() as i64).unwrap_or(i64::MAX);
                if new_remaining <= current_remaining {
                    return Ok(Reply::Integer(0));
                }
            }
            "LT" => {
                let new_remaining = at_ms - now_ms(engine);
                let current_remaining = current_ttl.map(|d| d.as_millis() as i64).unwrap_or(i64::MAX);
                if new_remaining >= current_remaining {
                    return Ok(Reply::Integer(0));
                }
            }
            _ => {}
        }
    }
    let now = engine.clock().now();
    let delta = (at_ms - now_ms(engine)).max(0) as u64;
    let applied = engine.store().set_expiry(db, k, now + Duration::from_millis(delta));
    Ok(Reply::Integer(applied as i64))
}

fn now_ms(_engine: &Engine) -> i64 {
    ember_durability::snapshot::now_ms() as i64
}

fn expire(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let k = key(args, 0);
    let seconds = parse_i64(&args[1])?;
    expire_at_ms(engine, c, &k, now_ms(engine) + seconds * 1000, &args[2..])
}

fn pexpire(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let k = key(args, 0);
    let ms = parse_i64(&args[1])?;
    expire_at_ms(engine, c, &k, now_ms(engine) + ms, &args[2..])
}

fn expireat(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let k = key(args, 0);
    let at_seconds = parse_i64(&args[1])?;
    expire_at_ms(engine, c, &k, at_seconds * 1000, &args[2..])
}

fn pexpireat(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let k = key(args, 0);
    let at_ms = parse_i64(&args[1])?;
    expire_at_ms(engine, c, &k, at_ms, &args[2..])
}

fn ttl(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    match engine.store().ttl(c.database_index(), &key(args, 0)) {
        None => Ok(Reply::Integer(-2)),
        Some(None) => Ok(Reply::Integer(-1)),
        Some(Some(d)) => Ok(Reply::Integer(d.as_secs() as i64)),
    }
}

fn pttl(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    match engine.store().ttl(c.database_index(), &key(args, 0)) {
        None => Ok(Reply::Integer(-2)),
        Some(None) => Ok(Reply::Integer(-1)),
        Some(Some(d)) => Ok(Reply::Integer(d.as_millis() as i64)),
    }
}

fn expiretime(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    match engine.store().ttl(c.database_index(), &key(args, 0)) {
        None => Ok(Reply::Integer(-2)),
        Some(None) => Ok(Reply::Integer(-1)),
        Some(Some(d)) => Ok(Reply::Integer(now_ms(engine) / 1000 + d.as_secs() as i64)),
    }
}

fn pexpiretime(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    match engine.store().ttl(c.database_index(), &key(args, 0)) {
        None => Ok(Reply::Integer(-2)),
        Some(None) => Ok(Reply::Integer(-1)),
        Some(Some(d)) => Ok(Reply::Integer(now_ms(engine) + d.as_millis() as i64)),
    }
}

fn persist(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    Ok(Reply::Integer(engine.store().persist(c.database_index(), &key(args, 0)) as i64))
}

fn randomkey(engine: &Engine, c: &mut Connection, _args: &[Bytes]) -> DispatchResult {
    Ok(Reply::from_optional(engine.store().random_key(c.database_index()).map(|k| k.into_bytes())))
}

fn keys(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let pattern = String::from_utf8_lossy(&args[0]).into_owned();
    let matches: Vec<Reply> = engine
        .store()
        .keys(c.database_index())
        .into_iter()
        .filter(|k| glob_match(&pattern, &String::from_utf8_lossy(k.as_bytes())))
        .map(|k| Reply::Bulk(k.into_bytes()))
        .collect();
    Ok(Reply::Array(matches))
}

/// Minimal glob: `*` and `?` wildcards, no character classes. Adequate
/// for `KEYS`/`SCAN`-style patterns without pulling in a regex engine.
fn glob_match(pattern: &str, text: &str) -> bool {
    fn inner(p: &[char], t: &[char]) -> bool {
        match (p.first(), t.first()) {
            (None, None) => true,
            (Some('*'), _) => inner(&p[1..], t) || (!t.is_empty() && inner(p, &t[1..])),
            (Some('?'), Some(_)) => inner(&p[1..], &t[1..]),
            (Some(pc), Some(tc)) if pc == tc => inner(&p[1..], &t[1..]),
            _ => false,
        }
    }
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    inner(&p, &t)
}

fn object_freq(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    match engine.store().object_freq(c.database_index(), &key(args, 0)) {
        Some(f) => Ok(Reply::Integer(f as i64)),
        None => Err(Error::Syntax("no such key".into())),
    }
}

fn object_idletime(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    match engine.store().object_idle_time(c.database_index(), &key(args, 0)) {
        Some(d) => Ok(Reply::Integer(d.as_secs() as i64)),
        None => Err(Error::Syntax("no such key".into())),
    }
}

pub fn specs() -> Vec<CommandSpec> {
    vec![
        CommandSpec { name: "PING", module: "connection", categories: &["connection"], description: "Ping the server", sync_flag: SyncFlag::Admin, key_extraction_fn: no_keys, handler_fn: ping, arity_min: 0 },
        CommandSpec { name: "ECHO", module: "connection", categories: &["connection"], description: "Echo the given string", sync_flag: SyncFlag::Admin, key_extraction_fn: no_keys, handler_fn: echo, arity_min: 1 },
        CommandSpec { name: "SELECT", module: "connection", categories: &["connection"], description: "Change the selected database", sync_flag: SyncFlag::Admin, key_extraction_fn: no_keys, handler_fn: select, arity_min: 1 },
        CommandSpec { name: "SWAPDB", module: "generic", categories: &["write", "keyspace"], description: "Swap two databases", sync_flag: SyncFlag::Write, key_extraction_fn: no_keys, handler_fn: swapdb, arity_min: 2 },
        CommandSpec { name: "FLUSHDB", module: "generic", categories: &["write", "keyspace"], description: "Remove all keys from the current database", sync_flag: SyncFlag::Write, key_extraction_fn: no_keys, handler_fn: flushdb, arity_min: 0 },
        CommandSpec { name: "FLUSHALL", module: "generic", categories: &["write", "keyspace"], description: "Remove all keys from every database", sync_flag: SyncFlag::Write, key_extraction_fn: no_keys, handler_fn: flushall, arity_min: 0 },
        CommandSpec { name: "DBSIZE", module: "generic", categories: &["read", "keyspace"], description: "Return the number of keys in the current database", sync_flag: SyncFlag::ReadOnly, key_extraction_fn: no_keys, handler_fn: dbsize, arity_min: 0 },
        CommandSpec { name: "EXISTS", module: "generic", categories: &["read", "keyspace"], description: "Count how many of the given keys exist", sync_flag: SyncFlag::ReadOnly, key_extraction_fn: all_keys, handler_fn: exists, arity_min: 1 },
        CommandSpec { name: "DEL", module: "generic", categories: &["write", "keyspace"], description: "Delete the given keys", sync_flag: SyncFlag::Write, key_extraction_fn: all_keys, handler_fn: del, arity_min: 1 },
        CommandSpec { name: "UNLINK", module: "generic", categories: &["write", "keyspace"], description: "Delete the given keys (alias of DEL)", sync_flag: SyncFlag::Write, key_extraction_fn: all_keys, handler_fn: del, arity_min: 1 },
        CommandSpec { name: "TYPE", module: "generic", categories: &["read", "keyspace"], description: "Return the type stored at key", sync_flag: SyncFlag::ReadOnly, key_extraction_fn: first_key, handler_fn: key_type, arity_min: 1 },
        CommandSpec { name: "EXPIRE", module: "generic", categories: &["write", "keyspace"], description: "Set a key's time to live in seconds", sync_flag: SyncFlag::Write, key_extraction_fn: first_key, handler_fn: expire, arity_min: 2 },
        CommandSpec { name: "PEXPIRE", module: "generic", categories: &["write", "keyspace"], description: "Set a key's time to live in milliseconds", sync_flag: SyncFlag::Write, key_extraction_fn: first_key, handler_fn: pexpire, arity_min: 2 },
        CommandSpec { name: "EXPIREAT", module: "generic", categories: &["write", "keyspace"], description: "Set the expiration as a UNIX timestamp, in seconds", sync_flag: SyncFlag::Write, key_extraction_fn: first_key, handler_fn: expireat, arity_min: 2 },
        CommandSpec { name: "PEXPIREAT", module: "generic", categories: &["write", "keyspace"], description: "Set the expiration as a UNIX timestamp, in milliseconds", sync_flag: SyncFlag::Write, key_extraction_fn: first_key, handler_fn: pexpireat, arity_min: 2 },
        CommandSpec { name: "TTL", module: "generic", categories: &["read", "keyspace"], description: "Get the time to live for a key in seconds", sync_flag: SyncFlag::ReadOnly, key_extraction_fn: first_key, handler_fn: ttl, arity_min: 1 },
        CommandSpec { name: "PTTL", module: "generic", categories: &["read", "keyspace"], description: "Get the time to live for a key in milliseconds", sync_flag: SyncFlag::ReadOnly, key_extraction_fn: first_key, handler_fn: pttl, arity_min: 1 },
        CommandSpec { name: "EXPIRETIME", module: "generic", categories: &["read", "keyspace"], description: "Get the expiration UNIX timestamp in seconds", sync_flag: SyncFlag::ReadOnly, key_extraction_fn: first_key, handler_fn: expiretime, arity_min: 1 },
        CommandSpec { name: "PEXPIRETIME", module: "generic", categories: &["read", "keyspace"], description: "Get the expiration UNIX timestamp in milliseconds", sync_flag: SyncFlag::ReadOnly, key_extraction_fn: first_key, handler_fn: pexpiretime, arity_min: 1 },
        CommandSpec { name: "PERSIST", module: "generic", categories: &["write", "keyspace"], description: "Remove the expiration from a key", sync_flag: SyncFlag::Write, key_extraction_fn: first_key, handler_fn: persist, arity_min: 1 },
        CommandSpec { name: "RANDOMKEY", module: "generic", categories: &["read", "keyspace"], description: "Return a random key from the current database", sync_flag: SyncFlag::ReadOnly, key_extraction_fn: no_keys, handler_fn: randomkey, arity_min: 0 },
        CommandSpec { name: "KEYS", module: "generic", categories: &["read", "keyspace"], description: "Find all keys matching a glob-style pattern", sync_flag: SyncFlag::ReadOnly, key_extraction_fn: no_keys, handler_fn: keys, arity_min: 1 },
        CommandSpec { name: "OBJECT FREQ", module: "generic", categories: &["read", "keyspace"], description: "Get the approximate LFU access frequency of a key", sync_flag: SyncFlag::ReadOnly, key_extraction_fn: first_key, handler_fn: object_freq, arity_min: 1 },
        CommandSpec { name: "OBJECT IDLETIME", module: "generic", categories: &["read", "keyspace"], description: "Get the time since a key was last accessed", sync_flag: SyncFlag::ReadOnly, key_extraction_fn: first_key, handler_fn: object_idletime, arity_min: 1 },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use ember_storage::StorageConfig;

    fn bytes(s: &str) -> Bytes {
        Bytes::copy_from_slice(s.as_bytes())
    }

    #[test]
    fn del_counts_only_present_keys() {
        let engine = Engine::in_memory(StorageConfig::default());
        let mut c = engine.embedded_connection();
        engine.store().set(c.database_index(), Key::from("a"), ember_primitives::Value::Str(bytes("1")));
        assert_eq!(del(&engine, &mut c, &[bytes("a"), bytes("ghost")]).unwrap(), Reply::Integer(1));
    }

    #[test]
    fn expire_then_ttl_then_persist() {
        let engine = Engine::in_memory(StorageConfig::default());
        let mut c = engine.embedded_connection();
        engine.store().set(c.database_index(), Key::from("k"), ember_primitives::Value::Str(bytes("v")));
        assert_eq!(expire(&engine, &mut c, &[bytes("k"), bytes("100")]).unwrap(), Reply::Integer(1));
        assert!(matches!(ttl(&engine, &mut c, &[bytes("k")]).unwrap(), Reply::Integer(n) if n > 0));
        assert_eq!(persist(&engine, &mut c, &[bytes("k")]).unwrap(), Reply::Integer(1));
        assert_eq!(ttl(&engine, &mut c, &[bytes("k")]).unwrap(), Reply::Integer(-1));
    }

    #[test]
    fn glob_matches_star_and_question_mark() {
        assert!(glob_match("k*", "key1"));
        assert!(glob_match("k?y", "key"));
        assert!(!glob_match("k?y", "keey"));
    }

    #[test]
    fn select_rejects_out_of_range() {
        let engine = Engine::in_memory(StorageConfig::default());
        let mut c = engine.embedded_connection();
        assert!(select(&engine, &mut c, &[bytes("999999")]).is_err());
    }
}
