//! List commands: push/pop from either end, indexed access, ranges,
//! value removal, and trimming.

use super::util::{key, mutate_or_create, parse_i64, require_list, upper};
use crate::connection::Connection;
use crate::engine::Engine;
use crate::registry::{first_key, CommandSpec, SyncFlag};
use crate::reply::{DispatchResult, Reply};
use bytes::Bytes;
use ember_core::Error;
use ember_primitives::Value;

fn push(engine: &Engine, c: &mut Connection, args: &[Bytes], left: bool) -> DispatchResult {
    let db = c.database_index();
    let k = key(args, 0);
    let values: Vec<Bytes> = args[1..].to_vec();
    let len = mutate_or_create(engine.store(), db, &k, || Value::List(ember_primitives::List::new()), |v| {
        let list = require_list(v)?;
        Ok::<usize, Error>(if left { list.push_left(values) } else { list.push_right(values) })
    })?;
    Ok(Reply::Integer(len as i64))
}

fn pushx(engine: &Engine, c: &mut Connection, args: &[Bytes], left: bool) -> DispatchResult {
    let db = c.database_index();
    let k = key(args, 0);
    if !engine.store().exists(db, &k) {
        return Ok(Reply::Integer(0));
    }
    let values: Vec<Bytes> = args[1..].to_vec();
    let len = engine
        .store()
        .with_value_mut(db, &k, |v| {
            let list = require_list(v)?;
            Ok::<usize, Error>(if left { list.push_left(values) } else { list.push_right(values) })
        })
        .ok_or_else(|| Error::Internal("key vanished mid-mutation".into()))??;
    Ok(Reply::Integer(len as i64))
}

fn lpush(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    push(engine, c, args, true)
}

fn rpush(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    push(engine, c, args, false)
}

fn lpushx(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    pushx(engine, c, args, true)
}

fn rpushx(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    pushx(engine, c, args, false)
}

fn pop(engine: &Engine, c: &mut Connection, args: &[Bytes], left: bool) -> DispatchResult {
    let db = c.database_index();
    let k = key(args, 0);
    let count = args.get(1).map(parse_i64).transpose()?;
    let Some(popped) = engine.store().with_value_mut(db, &k, |v| -> Result<Vec<Bytes>, Error> {
        let list = require_list(v)?;
        Ok(if left { list.pop_left(count.unwrap_or(1).max(0) as usize) } else { list.pop_right(count.unwrap_or(1).max(0) as usize) })
    }) else {
        return Ok(if count.is_some() { Reply::Array(Vec::new()) } else { Reply::Nil });
    };
    let popped = popped?;
    if engine.store().with_value_mut(db, &k, |v| v.as_list().map(|l| l.is_empty()).unwrap_or(false)) == Some(true) {
        engine.store().delete(db, &k);
    }
    match count {
        Some(_) => Ok(Reply::Array(popped.into_iter().map(Reply::Bulk).collect())),
        None => Ok(Reply::from_optional(popped.into_iter().next())),
    }
}

fn lpop(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    pop(engine, c, args, true)
}

fn rpop(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    pop(engine, c, args, false)
}

fn llen(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let db = c.database_index();
    let k = key(args, 0);
    let len = engine.store().with_value_mut(db, &k, |v| require_list(v).map(|l| l.len())).transpose()?.unwrap_or(0);
    Ok(Reply::Integer(len as i64))
}

fn lrange(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let db = c.database_index();
    let k = key(args, 0);
    let start = parse_i64(&args[1])?;
    let stop = parse_i64(&args[2])?;
    let items = engine
        .store()
        .with_value_mut(db, &k, |v| require_list(v).map(|l| l.range(start, stop)))
        .transpose()?
        .unwrap_or_default();
    Ok(Reply::Array(items.into_iter().map(Reply::Bulk).collect()))
}

fn lindex(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let db = c.database_index();
    let k = key(args, 0);
    let idx = parse_i64(&args[1])?;
    let item = engine.store().with_value_mut(db, &k, |v| require_list(v).map(|l| l.get(idx).cloned())).transpose()?.flatten();
    Ok(Reply::from_optional(item))
}

fn lset(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let db = c.database_index();
    let k = key(args, 0);
    let idx = parse_i64(&args[1])?;
    let value = args[2].clone();
    let ok = engine
        .store()
        .with_value_mut(db, &k, |v| require_list(v).map(|l| l.set(idx, value)))
        .ok_or_else(|| Error::Syntax("no such key".into()))??;
    if !ok {
        return Err(Error::Syntax("index out of range".into()));
    }
    Ok(Reply::ok())
}

fn lrem(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let db = c.database_index();
    let k = key(args, 0);
    let count = parse_i64(&args[1])?;
    let value = args[2].clone();
    let removed = engine
        .store()
        .with_value_mut(db, &k, |v| require_list(v).map(|l| l.remove_value(count, &value)))
        .transpose()?
        .unwrap_or(0);
    Ok(Reply::Integer(removed as i64))
}

fn ltrim(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let db = c.database_index();
    let k = key(args, 0);
    let start = parse_i64(&args[1])?;
    let stop = parse_i64(&args[2])?;
    engine.store().with_value_mut(db, &k, |v| require_list(v).map(|l| l.trim(start, stop))).transpose()?;
    Ok(Reply::ok())
}

fn lpos(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let db = c.database_index();
    let k = key(args, 0);
    let target = &args[1];
    let mut rank = 1i64;
    let mut i = 2;
    while i + 1 < args.len() {
        if upper(&args[i]) == "RANK" {
            rank = parse_i64(&args[i + 1])?;
        }
        i += 2;
    }
    let found = engine
        .store()
        .with_value_mut(db, &k, |v| {
            require_list(v).map(|l| {
                let items = l.range(0, -1);
                if rank >= 0 {
                    items.iter().position(|item| item == target)
                } else {
                    items.iter().rposition(|item| item == target)
                }
            })
        })
        .transpose()?
        .flatten();
    Ok(found.map(|i| Reply::Integer(i as i64)).unwrap_or(Reply::Nil))
}

pub fn specs() -> Vec<CommandSpec> {
    vec![
        CommandSpec { name: "LPUSH", module: "list", categories: &["write", "list"], description: "Prepend values to a list", sync_flag: SyncFlag::Write, key_extraction_fn: first_key, handler_fn: lpush, arity_min: 2 },
        CommandSpec { name: "RPUSH", module: "list", categories: &["write", "list"], description: "Append values to a list", sync_flag: SyncFlag::Write, key_extraction_fn: first_key, handler_fn: rpush, arity_min: 2 },
        CommandSpec { name: "LPUSHX", module: "list", categories: &["write", "list"], description: "Prepend values to a list only if it exists", sync_flag: SyncFlag::Write, key_extraction_fn: first_key, handler_fn: lpushx, arity_min: 2 },
        CommandSpec { name: "RPUSHX", module: "list", categories: &["write", "list"], description: "Append values to a list only if it exists", sync_flag: SyncFlag::Write, key_extraction_fn: first_key, handler_fn: rpushx, arity_min: 2 },
        CommandSpec { name: "LPOP", module: "list", categories: &["write", "list"], description: "Remove and return the first elements of a list", sync_flag: SyncFlag::Write, key_extraction_fn: first_key, handler_fn: lpop, arity_min: 1 },
        CommandSpec { name: "RPOP", module: "list", categories: &["write", "list"], description: "Remove and return the last elements of a list", sync_flag: SyncFlag::Write, key_extraction_fn: first_key, handler_fn: rpop, arity_min: 1 },
        CommandSpec { name: "LLEN", module: "list", categories: &["read", "list"], description: "Get the length of a list", sync_flag: SyncFlag::ReadOnly, key_extraction_fn: first_key, handler_fn: llen, arity_min: 1 },
        CommandSpec { name: "LRANGE", module: "list", categories: &["read", "list"], description: "Get a range of elements from a list", sync_flag: SyncFlag::ReadOnly, key_extraction_fn: first_key, handler_fn: lrange, arity_min: 3 },
        CommandSpec { name: "LINDEX", module: "list", categories: &["read", "list"], description: "Get an element from a list by its index", sync_flag: SyncFlag::ReadOnly, key_extraction_fn: first_key, handler_fn: lindex, arity_min: 2 },
        CommandSpec { name: "LSET", module: "list", categories: &["write", "list"], description: "Set the value of an element in a list by its index", sync_flag: SyncFlag::Write, key_extraction_fn: first_key, handler_fn: lset, arity_min: 3 },
        CommandSpec { name: "LREM", module: "list", categories: &["write", "list"], description: "Remove elements from a list", sync_flag: SyncFlag::Write, key_extraction_fn: first_key, handler_fn: lrem, arity_min: 3 },
        CommandSpec { name: "LTRIM", module: "list", categories: &["write", "list"], description: "Trim a list to the specified range", sync_flag: SyncFlag::Write, key_extraction_fn: first_key, handler_fn: ltrim, arity_min: 3 },
        CommandSpec { name: "LPOS", module: "list", categories: &["read", "list"], description: "Return the index of matching elements in a list", sync_flag: SyncFlag::ReadOnly, key_extraction_fn: first_key, handler_fn: lpos, arity_min: 2 },
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
    fn rpush_then_lrange() {
        let engine = Engine::in_memory(StorageConfig::default());
        let mut c = engine.embedded_connection();
        rpush(&engine, &mut c, &[bytes("l"), bytes("a"), bytes("b")]).unwrap();
        assert_eq!(lrange(&engine, &mut c, &[bytes("l"), bytes("0"), bytes("-1")]).unwrap(), Reply::Array(vec![Reply::Bulk(bytes("a")), Reply::Bulk(bytes("b"))]));
    }

    #[test]
    fn lpop_removes_key_when_emptied() {
        let engine = Engine::in_memory(StorageConfig::default());
        let mut c = engine.embedded_connection();
        rpush(&engine, &mut c, &[bytes("l"), bytes("only")]).unwrap();
        assert_eq!(lpop(&engine, &mut c, &[bytes("l")]).unwrap(), Reply::Bulk(bytes("only")));
        assert!(!engine.store().exists(c.database_index(), &ember_core::Key::from("l")));
    }

    #[test]
    fn pushx_is_noop_on_missing_key() {
        let engine = Engine::in_memory(StorageConfig::default());
        let mut c = engine.embedded_connection();
        assert_eq!(lpushx(&engine, &mut c, &[bytes("l"), bytes("a")]).unwrap(), Reply::Integer(0));
    }

    #[test]
    fn lrem_removes_matching_count() {
        let engine = Engine::in_memory(StorageConfig::default());
        let mut c = engine.embedded_connection();
        rpush(&engine, &mut c, &[bytes("l"), bytes("a"), bytes("x"), bytes("a")]).unwrap();
        assert_eq!(lrem(&engine, &mut c, &[bytes("l"), bytes("0"), bytes("a")]).unwrap(), Reply::Integer(2));
    }
}
