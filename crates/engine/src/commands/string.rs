//! String commands: `GET`, `SET` and its options, numeric increments,
//! range/append operations, and the multi-key `MGET`/`MSET`.

use super::util::{key, parse_f64, parse_i64, upper};
use crate::connection::Connection;
use crate::engine::Engine;
use crate::registry::{all_keys, first_key, paired_keys, CommandSpec, SyncFlag};
use crate::reply::{DispatchResult, Reply};
use bytes::Bytes;
use ember_core::Error;
use ember_primitives::Value;

fn get(engine: &Engine, _c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    match engine.store().get(_c.database_index(), &key(args, 0)) {
        Some(v) => Ok(Reply::Bulk(v.as_str().ok_or(Error::WrongType)?.clone())),
        None => Ok(Reply::Nil),
    }
}

fn set(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let db = c.database_index();
    let k = key(args, 0);
    let value = args[1].clone();

    let mut nx = false;
    let mut xx = false;
    let mut keep_ttl = false;
    let mut return_old = false;
    let mut expire_ms: Option<i64> = None;
    let mut i = 2;
    while i < args.len() {
        match upper(&args[i]).as_str() {
            "NX" => nx = true,
            "XX" => xx = true,
            "KEEPTTL" => keep_ttl = true,
            "GET" => return_old = true,
            "EX" => {
                i += 1;
                expire_ms = Some(parse_i64(&args[i])? * 1000);
            }
            "PX" => {
                i += 1;
                expire_ms = Some(parse_i64(&args[i])?);
            }
            other => return Err(Error::Syntax(format!("unknown SET option '{other}'"))),
        }
        i += 1;
    }
    if nx && xx {
        return Err(Error::Syntax("NX and XX are mutually exclusive".into()));
    }

    let existed = engine.store().exists(db, &k);
    let old = if return_old { engine.store().get(db, &k) } else { None };
    if (nx && existed) || (xx && !existed) {
        return Ok(if return_old { Reply::from_optional(old.and_then(|v| v.as_str().cloned())) } else { Reply::Nil });
    }

    match (expire_ms, keep_ttl) {
        (Some(ms), _) => engine.store().set_with_expiry(db, k, Value::Str(value), engine.clock().now() + std::time::Duration::from_millis(ms.max(0) as u64)),
        (None, true) => engine.store().set_keep_ttl(db, k, Value::Str(value)),
        (None, false) => engine.store().set(db, k, Value::Str(value)),
    }

    if return_old {
        Ok(Reply::from_optional(old.and_then(|v| v.as_str().cloned())))
    } else {
        Ok(Reply::ok())
    }
}

/// `start > end` is not an empty range here: it reads the same span a
/// forward call would and hands it back reversed, matching a quirk the
/// original server's index handling produces rather than rejecting it.
fn getrange(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let Some(v) = engine.store().get(c.database_index(), &key(args, 0)) else {
        return Ok(Reply::bulk(Bytes::new()));
    };
    let s = v.as_str().ok_or(Error::WrongType)?;
    let len = s.len() as i64;
    if len == 0 {
        return Ok(Reply::bulk(Bytes::new()));
    }
    let norm = |i: i64| if i < 0 { (len + i).max(0) } else { i.min(len - 1) };
    let start = norm(parse_i64(&args[1])?);
    let end = norm(parse_i64(&args[2])?);
    if start > end {
        let slice = s.slice(end as usize..start as usize);
        let reversed: Vec<u8> = slice.iter().rev().copied().collect();
        return Ok(Reply::bulk(Bytes::from(reversed)));
    }
    Ok(Reply::bulk(s.slice(start as usize..(end + 1) as usize)))
}

fn setrange(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let db = c.database_index();
    let k = key(args, 0);
    let offset = parse_i64(&args[1])?.max(0) as usize;
    let patch = &args[2];
    let mut current = engine.store().get(db, &k).and_then(|v| v.as_str().cloned()).unwrap_or_default().to_vec();
    if current.len() < offset + patch.len() {
        current.resize(offset + patch.len(), 0);
    }
    current[offset..offset + patch.len()].copy_from_slice(patch);
    let len = current.len() as i64;
    engine.store().set_keep_ttl(db, k, Value::Str(Bytes::from(current)));
    Ok(Reply::Integer(len))
}

fn strlen(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let len = engine.store().get(c.database_index(), &key(args, 0)).map(|v| v.as_str().map(|s| s.len()).ok_or(Error::WrongType)).transpose()?.unwrap_or(0);
    Ok(Reply::Integer(len as i64))
}

fn append(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let db = c.database_index();
    let k = key(args, 0);
    let mut current = engine.store().get(db, &k).and_then(|v| v.as_str().cloned()).unwrap_or_default().to_vec();
    current.extend_from_slice(&args[1]);
    let len = current.len() as i64;
    engine.store().set_keep_ttl(db, k, Value::Str(Bytes::from(current)));
    Ok(Reply::Integer(len))
}

fn incr_by(engine: &Engine, c: &mut Connection, db_key: &Bytes, delta: i64) -> Result<i64, Error> {
    let db = c_db(c);
    let k = key_from(db_key);
    let current = engine.store().get(db, &k).map(|v| v.as_str().cloned().ok_or(Error::WrongType)).transpose()?;
    let current = match current {
        Some(s) => std::str::from_utf8(&s).ok().and_then(|s| s.parse::<i64>().ok()).ok_or(Error::NotAnInteger)?,
        None => 0,
    };
    let next = current.checked_add(delta).ok_or(Error::NotAnInteger)?;
    engine.store().set_keep_ttl(db, k, Value::Str(Bytes::from(next.to_string())));
    Ok(next)
}

// small local helpers to avoid threading `Connection` through `incr_by`'s signature twice
fn c_db(c: &Connection) -> ember_core::DbIndex {
    c.database_index()
}
fn key_from(b: &Bytes) -> ember_core::Key {
    ember_core::Key::from(b.clone())
}

fn incr(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    Ok(Reply::Integer(incr_by(engine, c, &args[0], 1)?))
}

fn decr(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    Ok(Reply::Integer(incr_by(engine, c, &args[0], -1)?))
}

fn incrby(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let delta = parse_i64(&args[1])?;
    Ok(Reply::Integer(incr_by(engine, c, &args[0], delta)?))
}

fn decrby(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let delta = parse_i64(&args[1])?;
    Ok(Reply::Integer(incr_by(engine, c, &args[0], delta.checked_neg().ok_or(Error::NotAnInteger)?)?))
}

fn incrbyfloat(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let db = c.database_index();
    let k = key(args, 0);
    let delta = parse_f64(&args[1])?;
    let current = engine.store().get(db, &k).map(|v| v.as_str().cloned().ok_or(Error::WrongType)).transpose()?;
    let current = match current {
        Some(s) => std::str::from_utf8(&s).ok().and_then(|s| s.parse::<f64>().ok()).ok_or(Error::InvalidScore)?,
        None => 0.0,
    };
    let next = current + delta;
    engine.store().set_keep_ttl(db, k, Value::Str(Bytes::from(next.to_string())));
    Ok(Reply::bulk(next.to_string()))
}

fn mget(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let db = c.database_index();
    let items = args
        .iter()
        .map(|raw| match engine.store().get(db, &ember_core::Key::from(raw.clone())) {
            Some(v) => v.as_str().map(|s| Reply::Bulk(s.clone())).unwrap_or(Reply::Nil),
            None => Reply::Nil,
        })
        .collect();
    Ok(Reply::Array(items))
}

fn mset(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    if args.len() % 2 != 0 {
        return Err(Error::Syntax("wrong number of arguments for MSET".into()));
    }
    let db = c.database_index();
    for pair in args.chunks_exact(2) {
        engine.store().set(db, ember_core::Key::from(pair[0].clone()), Value::Str(pair[1].clone()));
    }
    Ok(Reply::ok())
}

pub fn specs() -> Vec<CommandSpec> {
    vec![
        CommandSpec { name: "GET", module: "string", categories: &["read", "string"], description: "Get the value of a key", sync_flag: SyncFlag::ReadOnly, key_extraction_fn: first_key, handler_fn: get, arity_min: 1 },
        CommandSpec { name: "SET", module: "string", categories: &["write", "string"], description: "Set the value of a key", sync_flag: SyncFlag::Write, key_extraction_fn: first_key, handler_fn: set, arity_min: 2 },
        CommandSpec { name: "GETRANGE", module: "string", categories: &["read", "string"], description: "Get a substring of a string value", sync_flag: SyncFlag::ReadOnly, key_extraction_fn: first_key, handler_fn: getrange, arity_min: 3 },
        CommandSpec { name: "SETRANGE", module: "string", categories: &["write", "string"], description: "Overwrite part of a string at key starting at offset", sync_flag: SyncFlag::Write, key_extraction_fn: first_key, handler_fn: setrange, arity_min: 3 },
        CommandSpec { name: "STRLEN", module: "string", categories: &["read", "string"], description: "Get the length of the value stored in a key", sync_flag: SyncFlag::ReadOnly, key_extraction_fn: first_key, handler_fn: strlen, arity_min: 1 },
        CommandSpec { name: "APPEND", module: "string", categories: &["write", "string"], description: "Append a value to a key", sync_flag: SyncFlag::Write, key_extraction_fn: first_key, handler_fn: append, arity_min: 2 },
        CommandSpec { name: "INCR", module: "string", categories: &["write", "string"], description: "Increment the integer value of a key by one", sync_flag: SyncFlag::Write, key_extraction_fn: first_key, handler_fn: incr, arity_min: 1 },
        CommandSpec { name: "DECR", module: "string", categories: &["write", "string"], description: "Decrement the integer value of a key by one", sync_flag: SyncFlag::Write, key_extraction_fn: first_key, handler_fn: decr, arity_min: 1 },
        CommandSpec { name: "INCRBY", module: "string", categories: &["write", "string"], description: "Increment the integer value of a key by the given amount", sync_flag: SyncFlag::Write, key_extraction_fn: first_key, handler_fn: incrby, arity_min: 2 },
        CommandSpec { name: "DECRBY", module: "string", categories: &["write", "string"], description: "Decrement the integer value of a key by the given amount", sync_flag: SyncFlag::Write, key_extraction_fn: first_key, handler_fn: decrby, arity_min: 2 },
        CommandSpec { name: "INCRBYFLOAT", module: "string", categories: &["write", "string"], description: "Increment the float value of a key by the given amount", sync_flag: SyncFlag::Write, key_extraction_fn: first_key, handler_fn: incrbyfloat, arity_min: 2 },
        CommandSpec { name: "MGET", module: "string", categories: &["read", "string"], description: "Get the values of all the given keys", sync_flag: SyncFlag::ReadOnly, key_extraction_fn: all_keys, handler_fn: mget, arity_min: 1 },
        CommandSpec { name: "MSET", module: "string", categories: &["write", "string"], description: "Set multiple keys to multiple values", sync_flag: SyncFlag::Write, key_extraction_fn: paired_keys, handler_fn: mset, arity_min: 2 },
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
    fn set_nx_rejects_existing_key() {
        let engine = Engine::in_memory(StorageConfig::default());
        let mut c = engine.embedded_connection();
        set(&engine, &mut c, &[bytes("k"), bytes("v1")]).unwrap();
        let reply = set(&engine, &mut c, &[bytes("k"), bytes("v2"), bytes("NX")]).unwrap();
        assert_eq!(reply, Reply::Nil);
        assert_eq!(get(&engine, &mut c, &[bytes("k")]).unwrap(), Reply::Bulk(bytes("v1")));
    }

    #[test]
    fn incrby_then_decrby_round_trip() {
        let engine = Engine::in_memory(StorageConfig::default());
        let mut c = engine.embedded_connection();
        assert_eq!(incrby(&engine, &mut c, &[bytes("n"), bytes("5")]).unwrap(), Reply::Integer(5));
        assert_eq!(decrby(&engine, &mut c, &[bytes("n"), bytes("2")]).unwrap(), Reply::Integer(3));
    }

    #[test]
    fn getrange_handles_negative_indices() {
        let engine = Engine::in_memory(StorageConfig::default());
        let mut c = engine.embedded_connection();
        set(&engine, &mut c, &[bytes("k"), bytes("Hello World")]).unwrap();
        assert_eq!(getrange(&engine, &mut c, &[bytes("k"), bytes("-5"), bytes("-1")]).unwrap(), Reply::Bulk(bytes("World")));
    }

    #[test]
    fn getrange_reversed_indices_reads_backwards() {
        let engine = Engine::in_memory(StorageConfig::default());
        let mut c = engine.embedded_connection();
        set(&engine, &mut c, &[bytes("k"), bytes("Test String Five")]).unwrap();
        assert_eq!(getrange(&engine, &mut c, &[bytes("k"), bytes("-11"), bytes("10")]).unwrap(), Reply::Bulk(bytes("String")));

        set(&engine, &mut c, &[bytes("k"), bytes("Test String Six")]).unwrap();
        assert_eq!(getrange(&engine, &mut c, &[bytes("k"), bytes("4"), bytes("0")]).unwrap(), Reply::Bulk(bytes("tseT")));
    }

    #[test]
    fn mset_then_mget() {
        let engine = Engine::in_memory(StorageConfig::default());
        let mut c = engine.embedded_connection();
        mset(&engine, &mut c, &[bytes("a"), bytes("1"), bytes("b"), bytes("2")]).unwrap();
        assert_eq!(mget(&engine, &mut c, &[bytes("a"), bytes("b"), bytes("missing")]).unwrap(), Reply::Array(vec![Reply::Bulk(bytes("1")), Reply::Bulk(bytes("2")), Reply::Nil]));
    }
}
