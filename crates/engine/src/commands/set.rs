//! Set commands: membership, random sampling, cross-key
//! union/intersection/difference and their `*STORE` variants.

use super::util::{key, mutate_or_create, parse_i64, require_set};
use crate::connection::Connection;
use crate::engine::Engine;
use crate::registry::{all_keys, first_key, first_two_keys, CommandSpec, SyncFlag};
use crate::reply::{DispatchResult, Reply};
use bytes::Bytes;
use ember_core::{Error, Key};
use ember_primitives::{Set, Value};

fn sadd(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let db = c.database_index();
    let k = key(args, 0);
    let members: Vec<Bytes> = args[1..].to_vec();
    let added = mutate_or_create(engine.store(), db, &k, || Value::Set(Set::new()), |v| Ok(require_set(v)?.add(members)))?;
    Ok(Reply::Integer(added))
}

fn srem(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let db = c.database_index();
    let k = key(args, 0);
    let members = &args[1..];
    let removed = engine.store().with_value_mut(db, &k, |v| require_set(v).map(|s| s.remove(members))).transpose()?.unwrap_or(0);
    Ok(Reply::Integer(removed))
}

fn sismember(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let db = c.database_index();
    let k = key(args, 0);
    let is_member = engine.store().with_value_mut(db, &k, |v| require_set(v).map(|s| s.contains(&args[1]))).transpose()?.unwrap_or(false);
    Ok(Reply::Integer(is_member as i64))
}

fn smismember(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let db = c.database_index();
    let k = key(args, 0);
    let results = engine
        .store()
        .with_value_mut(db, &k, |v| require_set(v).map(|s| args[1..].iter().map(|m| s.contains(m)).collect::<Vec<_>>()))
        .transpose()?
        .unwrap_or_else(|| vec![false; args.len() - 1]);
    Ok(Reply::Array(results.into_iter().map(|b| Reply::Integer(b as i64)).collect()))
}

fn scard(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let db = c.database_index();
    let k = key(args, 0);
    let n = engine.store().with_value_mut(db, &k, |v| require_set(v).map(|s| s.cardinality())).transpose()?.unwrap_or(0);
    Ok(Reply::Integer(n as i64))
}

fn smembers(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let db = c.database_index();
    let k = key(args, 0);
    let members = engine
        .store()
        .with_value_mut(db, &k, |v| require_set(v).map(|s| s.members().cloned().collect::<Vec<_>>()))
        .transpose()?
        .unwrap_or_default();
    Ok(Reply::Array(members.into_iter().map(Reply::Bulk).collect()))
}

fn spop(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let db = c.database_index();
    let k = key(args, 0);
    let count = args.get(1).map(parse_i64).transpose()?;
    let popped = engine
        .store()
        .with_value_mut(db, &k, |v| require_set(v).map(|s| s.pop_random(count.unwrap_or(1).max(0) as usize)))
        .transpose()?
        .unwrap_or_default();
    if engine.store().with_value_mut(db, &k, |v| v.as_set().map(|s| s.is_empty()).unwrap_or(false)) == Some(true) {
        engine.store().delete(db, &k);
    }
    match count {
        Some(_) => Ok(Reply::Array(popped.into_iter().map(Reply::Bulk).collect())),
        None => Ok(Reply::from_optional(popped.into_iter().next())),
    }
}

fn srandmember(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let db = c.database_index();
    let k = key(args, 0);
    let count = args.get(1).map(parse_i64).transpose()?;
    let picked = engine
        .store()
        .with_value_mut(db, &k, |v| require_set(v).map(|s| s.get_random(count.unwrap_or(1))))
        .transpose()?
        .unwrap_or_default();
    match count {
        Some(_) => Ok(Reply::Array(picked.into_iter().map(Reply::Bulk).collect())),
        None => Ok(Reply::from_optional(picked.into_iter().next())),
    }
}

fn smove(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let db = c.database_index();
    let src = key(args, 0);
    let dst = key(args, 1);
    let member = args[2].clone();

    if !engine.store().exists(db, &src) {
        return Ok(Reply::Integer(0));
    }
    if !engine.store().exists(db, &dst) {
        engine.store().set(db, dst.clone(), Value::Set(Set::new()));
    }

    let mut taken: Option<Bytes> = None;
    engine
        .store()
        .with_value_mut(db, &src, |v| -> Result<(), Error> {
            let set = require_set(v)?;
            if set.contains(&member) {
                taken = Some(member.clone());
            }
            Ok(())
        })
        .transpose()?;
    let Some(member) = taken else {
        return Ok(Reply::Integer(0));
    };

    engine
        .store()
        .with_value_mut(db, &src, |v| require_set(v).map(|s| s.remove(std::slice::from_ref(&member))))
        .transpose()?;
    engine.store().with_value_mut(db, &dst, |v| require_set(v).map(|s| s.add(vec![member]))).transpose()?;
    Ok(Reply::Integer(1))
}

enum SetOp {
    Union,
    Inter,
    Diff,
}

fn combine(engine: &Engine, db: ember_core::DbIndex, keys: &[Bytes], op: SetOp) -> Result<Set, Error> {
    let sets: Vec<Set> = keys
        .iter()
        .map(|raw| {
            let k = Key::from(raw.clone());
            match engine.store().get(db, &k) {
                Some(v) => v.as_set().cloned().ok_or(Error::WrongType),
                None => Ok(Set::new()),
            }
        })
        .collect::<Result<_, Error>>()?;
    let refs: Vec<&Set> = sets.iter().collect();
    Ok(match op {
        SetOp::Union => Set::union(&refs),
        SetOp::Inter => Set::intersect(&refs),
        SetOp::Diff => Set::difference(&refs),
    })
}

fn sunion(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let result = combine(engine, c.database_index(), args, SetOp::Union)?;
    Ok(Reply::Array(result.members().cloned().map(Reply::Bulk).collect()))
}

fn sinter(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let result = combine(engine, c.database_index(), args, SetOp::Inter)?;
    Ok(Reply::Array(result.members().cloned().map(Reply::Bulk).collect()))
}

fn sdiff(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let result = combine(engine, c.database_index(), args, SetOp::Diff)?;
    Ok(Reply::Array(result.members().cloned().map(Reply::Bulk).collect()))
}

fn store_variant(engine: &Engine, c: &mut Connection, args: &[Bytes], op: SetOp) -> DispatchResult {
    let db = c.database_index();
    let dest = key(args, 0);
    let result = combine(engine, db, &args[1..], op)?;
    let card = result.cardinality();
    if card == 0 {
        engine.store().delete(db, &dest);
    } else {
        engine.store().set(db, dest, Value::Set(result));
    }
    Ok(Reply::Integer(card as i64))
}

fn sunionstore(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    store_variant(engine, c, args, SetOp::Union)
}

fn sinterstore(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    store_variant(engine, c, args, SetOp::Inter)
}

fn sdiffstore(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    store_variant(engine, c, args, SetOp::Diff)
}

fn sintercard(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let numkeys = parse_i64(&args[0])?.max(0) as usize;
    let keys = &args[1..1 + numkeys.min(args.len().saturating_sub(1))];
    let result = combine(engine, c.database_index(), keys, SetOp::Inter)?;
    let mut card = result.cardinality();
    if let Some(limit_idx) = args.iter().position(|a| super::util::upper(a) == "LIMIT") {
        let limit = parse_i64(&args[limit_idx + 1])?;
        if limit > 0 {
            card = card.min(limit as usize);
        }
    }
    Ok(Reply::Integer(card as i64))
}

pub fn specs() -> Vec<CommandSpec> {
    vec![
        CommandSpec { name: "SADD", module: "set", categories: &["write", "set"], description: "Add members to a set", sync_flag: SyncFlag::Write, key_extraction_fn: first_key, handler_fn: sadd, arity_min: 2 },
        CommandSpec { name: "SREM", module: "set", categories: &["write", "set"], description: "Remove members from a set", sync_flag: SyncFlag::Write, key_extraction_fn: first_key, handler_fn: srem, arity_min: 2 },
        CommandSpec { name: "SISMEMBER", module: "set", categories: &["read", "set"], description: "Test whether a member is present in a set", sync_flag: SyncFlag::ReadOnly, key_extraction_fn: first_key, handler_fn: sismember, arity_min: 2 },
        CommandSpec { name: "SMISMEMBER", module: "set", categories: &["read", "set"], description: "Test membership of multiple members at once", sync_flag: SyncFlag::ReadOnly, key_extraction_fn: first_key, handler_fn: smismember, arity_min: 2 },
        CommandSpec { name: "SCARD", module: "set", categories: &["read", "set"], description: "Get the number of members in a set", sync_flag: SyncFlag::ReadOnly, key_extraction_fn: first_key, handler_fn: scard, arity_min: 1 },
        CommandSpec { name: "SMEMBERS", module: "set", categories: &["read", "set"], description: "Get all members in a set", sync_flag: SyncFlag::ReadOnly, key_extraction_fn: first_key, handler_fn: smembers, arity_min: 1 },
        CommandSpec { name: "SPOP", module: "set", categories: &["write", "set"], description: "Remove and return random members from a set", sync_flag: SyncFlag::Write, key_extraction_fn: first_key, handler_fn: spop, arity_min: 1 },
        CommandSpec { name: "SRANDMEMBER", module: "set", categories: &["read", "set"], description: "Get random members from a set without removing them", sync_flag: SyncFlag::ReadOnly, key_extraction_fn: first_key, handler_fn: srandmember, arity_min: 1 },
        CommandSpec { name: "SMOVE", module: "set", categories: &["write", "set"], description: "Move a member between sets", sync_flag: SyncFlag::Write, key_extraction_fn: first_two_keys, handler_fn: smove, arity_min: 3 },
        CommandSpec { name: "SUNION", module: "set", categories: &["read", "set"], description: "Union of multiple sets", sync_flag: SyncFlag::ReadOnly, key_extraction_fn: all_keys, handler_fn: sunion, arity_min: 1 },
        CommandSpec { name: "SINTER", module: "set", categories: &["read", "set"], description: "Intersection of multiple sets", sync_flag: SyncFlag::ReadOnly, key_extraction_fn: all_keys, handler_fn: sinter, arity_min: 1 },
        CommandSpec { name: "SDIFF", module: "set", categories: &["read", "set"], description: "Difference of multiple sets", sync_flag: SyncFlag::ReadOnly, key_extraction_fn: all_keys, handler_fn: sdiff, arity_min: 1 },
        CommandSpec { name: "SUNIONSTORE", module: "set", categories: &["write", "set"], description: "Store the union of multiple sets", sync_flag: SyncFlag::Write, key_extraction_fn: all_keys, handler_fn: sunionstore, arity_min: 2 },
        CommandSpec { name: "SINTERSTORE", module: "set", categories: &["write", "set"], description: "Store the intersection of multiple sets", sync_flag: SyncFlag::Write, key_extraction_fn: all_keys, handler_fn: sinterstore, arity_min: 2 },
        CommandSpec { name: "SDIFFSTORE", module: "set", categories: &["write", "set"], description: "Store the difference of multiple sets", sync_flag: SyncFlag::Write, key_extraction_fn: all_keys, handler_fn: sdiffstore, arity_min: 2 },
        CommandSpec { name: "SINTERCARD", module: "set", categories: &["read", "set"], description: "Count the intersection of multiple sets without storing it", sync_flag: SyncFlag::ReadOnly, key_extraction_fn: all_keys, handler_fn: sintercard, arity_min: 2 },
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
    fn sadd_then_sismember() {
        let engine = Engine::in_memory(StorageConfig::default());
        let mut c = engine.embedded_connection();
        sadd(&engine, &mut c, &[bytes("s"), bytes("a"), bytes("b")]).unwrap();
        assert_eq!(sismember(&engine, &mut c, &[bytes("s"), bytes("a")]).unwrap(), Reply::Integer(1));
        assert_eq!(sismember(&engine, &mut c, &[bytes("s"), bytes("z")]).unwrap(), Reply::Integer(0));
    }

    #[test]
    fn smove_transfers_member_between_sets() {
        let engine = Engine::in_memory(StorageConfig::default());
        let mut c = engine.embedded_connection();
        sadd(&engine, &mut c, &[bytes("src"), bytes("a")]).unwrap();
        assert_eq!(smove(&engine, &mut c, &[bytes("src"), bytes("dst"), bytes("a")]).unwrap(), Reply::Integer(1));
        assert_eq!(sismember(&engine, &mut c, &[bytes("dst"), bytes("a")]).unwrap(), Reply::Integer(1));
        assert_eq!(sismember(&engine, &mut c, &[bytes("src"), bytes("a")]).unwrap(), Reply::Integer(0));
    }

    #[test]
    fn sinterstore_writes_result_set() {
        let engine = Engine::in_memory(StorageConfig::default());
        let mut c = engine.embedded_connection();
        sadd(&engine, &mut c, &[bytes("a"), bytes("x"), bytes("y")]).unwrap();
        sadd(&engine, &mut c, &[bytes("b"), bytes("y"), bytes("z")]).unwrap();
        assert_eq!(sinterstore(&engine, &mut c, &[bytes("dest"), bytes("a"), bytes("b")]).unwrap(), Reply::Integer(1));
        assert_eq!(scard(&engine, &mut c, &[bytes("dest")]).unwrap(), Reply::Integer(1));
    }
}
