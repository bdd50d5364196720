//! Hash commands: field get/set/delete, numeric increments, and the
//! per-field TTL extension (`HEXPIRE`/`HPERSIST`/`HTTL`) that has no
//! equivalent on the other container types.

use super::util::{key, mutate_or_create, parse_f64, parse_i64, require_hash};
use crate::connection::Connection;
use crate::engine::Engine;
use crate::registry::{first_key, CommandSpec, SyncFlag};
use crate::reply::{DispatchResult, Reply};
use bytes::Bytes;
use ember_core::Error;
use ember_primitives::hash::SetOutcome;
use ember_primitives::{Hash, Value};
use std::time::Duration;

fn hset(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    if args[1..].len() % 2 != 0 {
        return Err(Error::Syntax("wrong number of arguments for HSET".into()));
    }
    let db = c.database_index();
    let k = key(args, 0);
    let created = mutate_or_create(engine.store(), db, &k, || Value::Hash(Hash::new()), |v| {
        let hash = require_hash(v)?;
        let mut new_fields = 0i64;
        for pair in args[1..].chunks_exact(2) {
            if hash.set(pair[0].clone(), pair[1].clone()) {
                new_fields += 1;
            }
        }
        Ok(new_fields)
    })?;
    Ok(Reply::Integer(created))
}

fn hsetnx(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let db = c.database_index();
    let k = key(args, 0);
    let now = engine.clock().now();
    let outcome = mutate_or_create(engine.store(), db, &k, || Value::Hash(Hash::new()), |v| Ok(require_hash(v)?.set_nx(args[1].clone(), args[2].clone(), now)))?;
    Ok(Reply::Integer((outcome == SetOutcome::Created) as i64))
}

fn hget(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let db = c.database_index();
    let k = key(args, 0);
    let now = engine.clock().now();
    let value = engine.store().with_value_mut(db, &k, |v| require_hash(v).map(|h| h.get(&args[1], now).cloned())).transpose()?.flatten();
    Ok(Reply::from_optional(value))
}

fn hmget(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let db = c.database_index();
    let k = key(args, 0);
    let now = engine.clock().now();
    let values = engine
        .store()
        .with_value_mut(db, &k, |v| require_hash(v).map(|h| args[1..].iter().map(|f| h.get(f, now).cloned()).collect::<Vec<_>>()))
        .transpose()?
        .unwrap_or_else(|| vec![None; args.len() - 1]);
    Ok(Reply::Array(values.into_iter().map(Reply::from_optional).collect()))
}

fn hdel(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let db = c.database_index();
    let k = key(args, 0);
    let fields = &args[1..];
    let removed = engine.store().with_value_mut(db, &k, |v| require_hash(v).map(|h| h.remove(fields))).transpose()?.unwrap_or(0);
    Ok(Reply::Integer(removed))
}

fn hexists(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let db = c.database_index();
    let k = key(args, 0);
    let now = engine.clock().now();
    let exists = engine.store().with_value_mut(db, &k, |v| require_hash(v).map(|h| h.contains(&args[1], now))).transpose()?.unwrap_or(false);
    Ok(Reply::Integer(exists as i64))
}

fn hlen(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let db = c.database_index();
    let k = key(args, 0);
    let len = engine.store().with_value_mut(db, &k, |v| require_hash(v).map(|h| h.len())).transpose()?.unwrap_or(0);
    Ok(Reply::Integer(len as i64))
}

fn hkeys(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let db = c.database_index();
    let k = key(args, 0);
    let now = engine.clock().now();
    let keys = engine.store().with_value_mut(db, &k, |v| require_hash(v).map(|h| h.keys(now))).transpose()?.unwrap_or_default();
    Ok(Reply::Array(keys.into_iter().map(Reply::Bulk).collect()))
}

fn hvals(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let db = c.database_index();
    let k = key(args, 0);
    let now = engine.clock().now();
    let values = engine.store().with_value_mut(db, &k, |v| require_hash(v).map(|h| h.values(now))).transpose()?.unwrap_or_default();
    Ok(Reply::Array(values.into_iter().map(Reply::Bulk).collect()))
}

fn hgetall(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let db = c.database_index();
    let k = key(args, 0);
    let now = engine.clock().now();
    let entries = engine.store().with_value_mut(db, &k, |v| require_hash(v).map(|h| h.entries(now))).transpose()?.unwrap_or_default();
    let mut flat = Vec::with_capacity(entries.len() * 2);
    for (field, value) in entries {
        flat.push(Reply::Bulk(field));
        flat.push(Reply::Bulk(value));
    }
    Ok(Reply::Array(flat))
}

fn hincrby(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let db = c.database_index();
    let k = key(args, 0);
    let delta = parse_i64(&args[2])?;
    let now = engine.clock().now();
    let next = mutate_or_create(engine.store(), db, &k, || Value::Hash(Hash::new()), |v| {
        require_hash(v)?.incr_by(args[1].clone(), delta, now).map_err(|_| Error::NotAnInteger)
    })?;
    Ok(Reply::Integer(next))
}

fn hincrbyfloat(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let db = c.database_index();
    let k = key(args, 0);
    let delta = parse_f64(&args[2])?;
    let now = engine.clock().now();
    let next = mutate_or_create(engine.store(), db, &k, || Value::Hash(Hash::new()), |v| {
        require_hash(v)?.incr_by_float(args[1].clone(), delta, now).map_err(|_| Error::InvalidScore)
    })?;
    Ok(Reply::bulk(next.to_string()))
}

fn hrandfield(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let db = c.database_index();
    let k = key(args, 0);
    let now = engine.clock().now();
    let count = args.get(1).map(parse_i64).transpose()?;
    let keys = engine.store().with_value_mut(db, &k, |v| require_hash(v).map(|h| h.keys(now))).transpose()?.unwrap_or_default();
    if keys.is_empty() {
        return Ok(if count.is_some() { Reply::Array(Vec::new()) } else { Reply::Nil });
    }
    use rand::seq::{IteratorRandom, SliceRandom};
    use rand::Rng;
    let mut rng = rand::thread_rng();
    match count {
        None => Ok(Reply::Bulk(keys.into_iter().choose(&mut rng).unwrap())),
        Some(n) if n < 0 => {
            let picks: Vec<Bytes> = (0..(-n) as usize).map(|_| keys[rng.gen_range(0..keys.len())].clone()).collect();
            Ok(Reply::Array(picks.into_iter().map(Reply::Bulk).collect()))
        }
        Some(n) => {
            let mut shuffled = keys;
            shuffled.shuffle(&mut rng);
            shuffled.truncate(n as usize);
            Ok(Reply::Array(shuffled.into_iter().map(Reply::Bulk).collect()))
        }
    }
}

fn hexpire(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let db = c.database_index();
    let k = key(args, 0);
    let seconds = parse_i64(&args[1])?.max(0) as u64;
    let fields = &args[2..];
    let now = engine.clock().now();
    let at = now + Duration::from_secs(seconds);
    let results = engine
        .store()
        .with_value_mut(db, &k, |v| require_hash(v).map(|h| fields.iter().map(|f| h.expire_field(f, at) as i64).collect::<Vec<_>>()))
        .transpose()?
        .unwrap_or_else(|| vec![-2; fields.len()]);
    Ok(Reply::Array(results.into_iter().map(Reply::Integer).collect()))
}

fn hpersist(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let db = c.database_index();
    let k = key(args, 0);
    let fields = &args[1..];
    let results = engine
        .store()
        .with_value_mut(db, &k, |v| require_hash(v).map(|h| fields.iter().map(|f| h.persist_field(f) as i64).collect::<Vec<_>>()))
        .transpose()?
        .unwrap_or_else(|| vec![-2; fields.len()]);
    Ok(Reply::Array(results.into_iter().map(Reply::Integer).collect()))
}

fn httl(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let db = c.database_index();
    let k = key(args, 0);
    let fields = &args[1..];
    let now = engine.clock().now();
    let results = engine
        .store()
        .with_value_mut(db, &k, |v| {
            require_hash(v).map(|h| {
                fields
                    .iter()
                    .map(|f| match h.field_ttl(f, now) {
                        None => -2,
                        Some(None) => -1,
                        Some(Some(d)) => d.as_secs() as i64,
                    })
                    .collect::<Vec<_>>()
            })
        })
        .transpose()?
        .unwrap_or_else(|| vec![-2; fields.len()]);
    Ok(Reply::Array(results.into_iter().map(Reply::Integer).collect()))
}

pub fn specs() -> Vec<CommandSpec> {
    vec![
        CommandSpec { name: "HSET", module: "hash", categories: &["write", "hash"], description: "Set field-value pairs in a hash", sync_flag: SyncFlag::Write, key_extraction_fn: first_key, handler_fn: hset, arity_min: 3 },
        CommandSpec { name: "HSETNX", module: "hash", categories: &["write", "hash"], description: "Set a hash field only if it does not exist", sync_flag: SyncFlag::Write, key_extraction_fn: first_key, handler_fn: hsetnx, arity_min: 3 },
        CommandSpec { name: "HGET", module: "hash", categories: &["read", "hash"], description: "Get the value of a hash field", sync_flag: SyncFlag::ReadOnly, key_extraction_fn: first_key, handler_fn: hget, arity_min: 2 },
        CommandSpec { name: "HMGET", module: "hash", categories: &["read", "hash"], description: "Get the values of multiple hash fields", sync_flag: SyncFlag::ReadOnly, key_extraction_fn: first_key, handler_fn: hmget, arity_min: 2 },
        CommandSpec { name: "HDEL", module: "hash", categories: &["write", "hash"], description: "Delete hash fields", sync_flag: SyncFlag::Write, key_extraction_fn: first_key, handler_fn: hdel, arity_min: 2 },
        CommandSpec { name: "HEXISTS", module: "hash", categories: &["read", "hash"], description: "Test whether a hash field exists", sync_flag: SyncFlag::ReadOnly, key_extraction_fn: first_key, handler_fn: hexists, arity_min: 2 },
        CommandSpec { name: "HLEN", module: "hash", categories: &["read", "hash"], description: "Get the number of fields in a hash", sync_flag: SyncFlag::ReadOnly, key_extraction_fn: first_key, handler_fn: hlen, arity_min: 1 },
        CommandSpec { name: "HKEYS", module: "hash", categories: &["read", "hash"], description: "Get all field names in a hash", sync_flag: SyncFlag::ReadOnly, key_extraction_fn: first_key, handler_fn: hkeys, arity_min: 1 },
        CommandSpec { name: "HVALS", module: "hash", categories: &["read", "hash"], description: "Get all values in a hash", sync_flag: SyncFlag::ReadOnly, key_extraction_fn: first_key, handler_fn: hvals, arity_min: 1 },
        CommandSpec { name: "HGETALL", module: "hash", categories: &["read", "hash"], description: "Get all fields and values in a hash", sync_flag: SyncFlag::ReadOnly, key_extraction_fn: first_key, handler_fn: hgetall, arity_min: 1 },
        CommandSpec { name: "HINCRBY", module: "hash", categories: &["write", "hash"], description: "Increment the integer value of a hash field", sync_flag: SyncFlag::Write, key_extraction_fn: first_key, handler_fn: hincrby, arity_min: 3 },
        CommandSpec { name: "HINCRBYFLOAT", module: "hash", categories: &["write", "hash"], description: "Increment the float value of a hash field", sync_flag: SyncFlag::Write, key_extraction_fn: first_key, handler_fn: hincrbyfloat, arity_min: 3 },
        CommandSpec { name: "HRANDFIELD", module: "hash", categories: &["read", "hash"], description: "Get random fields from a hash", sync_flag: SyncFlag::ReadOnly, key_extraction_fn: first_key, handler_fn: hrandfield, arity_min: 1 },
        CommandSpec { name: "HEXPIRE", module: "hash", categories: &["write", "hash"], description: "Set a TTL on individual hash fields", sync_flag: SyncFlag::Write, key_extraction_fn: first_key, handler_fn: hexpire, arity_min: 3 },
        CommandSpec { name: "HPERSIST", module: "hash", categories: &["write", "hash"], description: "Clear the TTL on individual hash fields", sync_flag: SyncFlag::Write, key_extraction_fn: first_key, handler_fn: hpersist, arity_min: 2 },
        CommandSpec { name: "HTTL", module: "hash", categories: &["read", "hash"], description: "Get the remaining TTL on individual hash fields", sync_flag: SyncFlag::ReadOnly, key_extraction_fn: first_key, handler_fn: httl, arity_min: 2 },
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
    fn hset_then_hgetall() {
        let engine = Engine::in_memory(StorageConfig::default());
        let mut c = engine.embedded_connection();
        hset(&engine, &mut c, &[bytes("h"), bytes("f1"), bytes("v1"), bytes("f2"), bytes("v2")]).unwrap();
        assert_eq!(hgetall(&engine, &mut c, &[bytes("h")]).unwrap(), Reply::Array(vec![Reply::Bulk(bytes("f1")), Reply::Bulk(bytes("v1")), Reply::Bulk(bytes("f2")), Reply::Bulk(bytes("v2"))]));
    }

    #[test]
    fn hincrby_accumulates() {
        let engine = Engine::in_memory(StorageConfig::default());
        let mut c = engine.embedded_connection();
        assert_eq!(hincrby(&engine, &mut c, &[bytes("h"), bytes("n"), bytes("3")]).unwrap(), Reply::Integer(3));
        assert_eq!(hincrby(&engine, &mut c, &[bytes("h"), bytes("n"), bytes("4")]).unwrap(), Reply::Integer(7));
    }

    #[test]
    fn hexpire_then_httl_then_hpersist() {
        let engine = Engine::in_memory(StorageConfig::default());
        let mut c = engine.embedded_connection();
        hset(&engine, &mut c, &[bytes("h"), bytes("f"), bytes("v")]).unwrap();
        assert_eq!(hexpire(&engine, &mut c, &[bytes("h"), bytes("100"), bytes("f")]).unwrap(), Reply::Array(vec![Reply::Integer(1)]));
        assert!(matches!(httl(&engine, &mut c, &[bytes("h"), bytes("f")]).unwrap(), Reply::Array(v) if matches!(v[0], Reply::Integer(n) if n > 0)));
        assert_eq!(hpersist(&engine, &mut c, &[bytes("h"), bytes("f")]).unwrap(), Reply::Array(vec![Reply::Integer(1)]));
    }
}
