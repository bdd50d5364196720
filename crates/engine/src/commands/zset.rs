//! Sorted set commands: score-ordered membership, rank and range
//! queries, pop-extremes, random sampling, and the weighted
//! union/intersection/difference family shared with `SORT`-free Redis.

use super::util::{key, mutate_or_create, parse_f64, parse_i64, require_zset, upper};
use crate::connection::Connection;
use crate::engine::Engine;
use crate::registry::{first_key, CommandSpec, SyncFlag};
use crate::reply::{DispatchResult, Reply};
use bytes::Bytes;
use ember_core::{Error, Key};
use ember_primitives::sorted_set::{AddOutcome, Aggregate, Comparison, LexBound, SetOp, UpdatePolicy};
use ember_primitives::{SortedSet, Value};

fn fmt_score(score: f64) -> Bytes {
    Bytes::from(score.to_string())
}

fn zadd(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let db = c.database_index();
    let k = key(args, 0);

    let mut policy = UpdatePolicy::None;
    let mut comparison = Comparison::None;
    let mut changed = false;
    let mut incr = false;
    let mut i = 1;
    while i < args.len() {
        match upper(&args[i]).as_str() {
            "NX" => policy = UpdatePolicy::Nx,
            "XX" => policy = UpdatePolicy::Xx,
            "GT" => comparison = Comparison::Gt,
            "LT" => comparison = Comparison::Lt,
            "CH" => changed = true,
            "INCR" => incr = true,
            _ => break,
        }
        i += 1;
    }
    let rest = &args[i..];
    if rest.is_empty() || rest.len() % 2 != 0 {
        return Err(Error::Syntax("wrong number of arguments for ZADD".into()));
    }
    let mut members = Vec::with_capacity(rest.len() / 2);
    for pair in rest.chunks_exact(2) {
        members.push((parse_f64(&pair[0])?, pair[1].clone()));
    }

    let outcome = mutate_or_create(engine.store(), db, &k, || Value::SortedSet(SortedSet::new()), |v| {
        require_zset(v)?.add_or_update(members, policy, comparison, changed, incr).map_err(|e| Error::InvalidUpdate(e.to_string()))
    })?;
    match outcome {
        AddOutcome::Count(n) => Ok(Reply::Integer(n)),
        AddOutcome::Incremented(Some(score)) => Ok(Reply::bulk(fmt_score(score))),
        AddOutcome::Incremented(None) => Ok(Reply::Nil),
    }
}

fn zrem(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let db = c.database_index();
    let k = key(args, 0);
    let members = &args[1..];
    let removed = engine
        .store()
        .with_value_mut(db, &k, |v| require_zset(v).map(|z| members.iter().filter(|m| z.remove(m)).count()))
        .transpose()?
        .unwrap_or(0);
    Ok(Reply::Integer(removed as i64))
}

fn zscore(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let db = c.database_index();
    let k = key(args, 0);
    let score = engine.store().with_value_mut(db, &k, |v| require_zset(v).map(|z| z.score(&args[1]))).transpose()?.flatten();
    Ok(score.map(|s| Reply::Bulk(fmt_score(s))).unwrap_or(Reply::Nil))
}

fn zmscore(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let db = c.database_index();
    let k = key(args, 0);
    let scores = engine
        .store()
        .with_value_mut(db, &k, |v| require_zset(v).map(|z| args[1..].iter().map(|m| z.score(m)).collect::<Vec<_>>()))
        .transpose()?
        .unwrap_or_else(|| vec![None; args.len() - 1]);
    Ok(Reply::Array(scores.into_iter().map(|s| s.map(|s| Reply::Bulk(fmt_score(s))).unwrap_or(Reply::Nil)).collect()))
}

fn zcard(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let db = c.database_index();
    let k = key(args, 0);
    let n = engine.store().with_value_mut(db, &k, |v| require_zset(v).map(|z| z.len())).transpose()?.unwrap_or(0);
    Ok(Reply::Integer(n as i64))
}

fn zincrby(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let db = c.database_index();
    let k = key(args, 0);
    let delta = parse_f64(&args[1])?;
    let member = args[2].clone();
    let score = mutate_or_create(engine.store(), db, &k, || Value::SortedSet(SortedSet::new()), |v| {
        require_zset(v)?.incr_by(member, delta).map_err(|e| Error::InvalidUpdate(e.to_string()))
    })?;
    Ok(Reply::bulk(fmt_score(score)))
}

fn zrank(engine: &Engine, c: &mut Connection, args: &[Bytes], reverse: bool) -> DispatchResult {
    let db = c.database_index();
    let k = key(args, 0);
    let with_score = args.get(2).map(|a| upper(a) == "WITHSCORE").unwrap_or(false);
    let found = engine
        .store()
        .with_value_mut(db, &k, |v| require_zset(v).map(|z| z.rank(&args[1]).map(|r| (r, z.score(&args[1]).unwrap()))))
        .transpose()?
        .flatten();
    let Some((rank, score)) = found else {
        return Ok(if with_score { Reply::Nil } else { Reply::Nil });
    };
    let rank = if reverse {
        let len = engine.store().with_value_mut(db, &k, |v| require_zset(v).map(|z| z.len())).transpose()?.unwrap_or(0);
        len - 1 - rank
    } else {
        rank
    };
    if with_score {
        Ok(Reply::Array(vec![Reply::Integer(rank as i64), Reply::Bulk(fmt_score(score))]))
    } else {
        Ok(Reply::Integer(rank as i64))
    }
}

fn zrank_cmd(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    zrank(engine, c, args, false)
}

fn zrevrank_cmd(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    zrank(engine, c, args, true)
}

fn members_reply(members: Vec<(Bytes, f64)>, with_scores: bool) -> Reply {
    if with_scores {
        let mut flat = Vec::with_capacity(members.len() * 2);
        for (m, s) in members {
            flat.push(Reply::Bulk(m));
            flat.push(Reply::Bulk(fmt_score(s)));
        }
        Reply::Array(flat)
    } else {
        Reply::Array(members.into_iter().map(|(m, _)| Reply::Bulk(m)).collect())
    }
}

fn zrange(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let db = c.database_index();
    let k = key(args, 0);
    let start = parse_i64(&args[1])?;
    let stop = parse_i64(&args[2])?;
    let mut with_scores = false;
    let mut reverse = false;
    for arg in &args[3..] {
        match upper(arg).as_str() {
            "WITHSCORES" => with_scores = true,
            "REV" => reverse = true,
            _ => {}
        }
    }
    let members = engine
        .store()
        .with_value_mut(db, &k, |v| require_zset(v).map(|z| z.range_by_rank(start, stop, reverse)))
        .transpose()?
        .unwrap_or_default();
    Ok(members_reply(members, with_scores))
}

fn zrevrange(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let db = c.database_index();
    let k = key(args, 0);
    let start = parse_i64(&args[1])?;
    let stop = parse_i64(&args[2])?;
    let with_scores = args.get(3).map(|a| upper(a) == "WITHSCORES").unwrap_or(false);
    let members = engine
        .store()
        .with_value_mut(db, &k, |v| require_zset(v).map(|z| z.range_by_rank(start, stop, true)))
        .transpose()?
        .unwrap_or_default();
    Ok(members_reply(members, with_scores))
}

fn parse_score_bound(arg: &Bytes) -> Result<(f64, bool), Error> {
    let s = std::str::from_utf8(arg).map_err(|_| Error::InvalidScore)?;
    if let Some(rest) = s.strip_prefix('(') {
        Ok((rest.parse().map_err(|_| Error::InvalidScore)?, true))
    } else if s == "-inf" {
        Ok((f64::NEG_INFINITY, false))
    } else if s == "+inf" || s == "inf" {
        Ok((f64::INFINITY, false))
    } else {
        Ok((s.parse().map_err(|_| Error::InvalidScore)?, false))
    }
}

fn parse_lex_bound(arg: &Bytes) -> Result<LexBound, Error> {
    match arg.first() {
        Some(b'-') if arg.len() == 1 => Ok(LexBound::NegInf),
        Some(b'+') if arg.len() == 1 => Ok(LexBound::PosInf),
        Some(b'[') => Ok(LexBound::Inclusive(arg.slice(1..))),
        Some(b'(') => Ok(LexBound::Exclusive(arg.slice(1..))),
        _ => Err(Error::Syntax("min or max not valid string range item".into())),
    }
}

fn zrangebyscore(engine: &Engine, c: &mut Connection, args: &[Bytes], reverse: bool) -> DispatchResult {
    let db = c.database_index();
    let k = key(args, 0);
    let (min, max) = if reverse { (&args[2], &args[1]) } else { (&args[1], &args[2]) };
    let (min, min_ex) = parse_score_bound(min)?;
    let (max, max_ex) = parse_score_bound(max)?;
    let mut with_scores = false;
    let mut limit: Option<(usize, Option<usize>)> = None;
    let mut i = 3;
    while i < args.len() {
        match upper(&args[i]).as_str() {
            "WITHSCORES" => with_scores = true,
            "LIMIT" => {
                let offset = parse_i64(&args[i + 1])?.max(0) as usize;
                let count = parse_i64(&args[i + 2])?;
                limit = Some((offset, if count < 0 { None } else { Some(count as usize) }));
                i += 2;
            }
            _ => {}
        }
        i += 1;
    }
    let (offset, count) = limit.unwrap_or((0, None));
    let members = engine
        .store()
        .with_value_mut(db, &k, |v| require_zset(v).map(|z| z.range_by_score(min, min_ex, max, max_ex, offset, count, reverse)))
        .transpose()?
        .unwrap_or_default();
    Ok(members_reply(members, with_scores))
}

fn zrangebyscore_cmd(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    zrangebyscore(engine, c, args, false)
}

fn zrevrangebyscore_cmd(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    zrangebyscore(engine, c, args, true)
}

fn zrangebylex(engine: &Engine, c: &mut Connection, args: &[Bytes], reverse: bool) -> DispatchResult {
    let db = c.database_index();
    let k = key(args, 0);
    let (min, max) = if reverse { (&args[2], &args[1]) } else { (&args[1], &args[2]) };
    let min = parse_lex_bound(min)?;
    let max = parse_lex_bound(max)?;
    let mut limit: Option<(usize, Option<usize>)> = None;
    let mut i = 3;
    while i < args.len() {
        if upper(&args[i]) == "LIMIT" {
            let offset = parse_i64(&args[i + 1])?.max(0) as usize;
            let count = parse_i64(&args[i + 2])?;
            limit = Some((offset, if count < 0 { None } else { Some(count as usize) }));
            i += 2;
        }
        i += 1;
    }
    let (offset, count) = limit.unwrap_or((0, None));
    let members = engine
        .store()
        .with_value_mut(db, &k, |v| require_zset(v).map(|z| z.range_by_lex(min, max, offset, count, reverse)))
        .transpose()?
        .unwrap_or_default();
    Ok(Reply::Array(members.into_iter().map(Reply::Bulk).collect()))
}

fn zrangebylex_cmd(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    zrangebylex(engine, c, args, false)
}

fn zrevrangebylex_cmd(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    zrangebylex(engine, c, args, true)
}

fn zcount(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let db = c.database_index();
    let k = key(args, 0);
    let (min, min_ex) = parse_score_bound(&args[1])?;
    let (max, max_ex) = parse_score_bound(&args[2])?;
    let count = engine
        .store()
        .with_value_mut(db, &k, |v| require_zset(v).map(|z| z.count_by_score(min, min_ex, max, max_ex)))
        .transpose()?
        .unwrap_or(0);
    Ok(Reply::Integer(count as i64))
}

fn zlexcount(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let db = c.database_index();
    let k = key(args, 0);
    let min = parse_lex_bound(&args[1])?;
    let max = parse_lex_bound(&args[2])?;
    let count = engine.store().with_value_mut(db, &k, |v| require_zset(v).map(|z| z.lex_count(min, max))).transpose()?.unwrap_or(0);
    Ok(Reply::Integer(count as i64))
}

fn zpop(engine: &Engine, c: &mut Connection, args: &[Bytes], max: bool) -> DispatchResult {
    let db = c.database_index();
    let k = key(args, 0);
    let n = args.get(1).map(parse_i64).transpose()?.unwrap_or(1).max(0) as usize;
    let popped = engine
        .store()
        .with_value_mut(db, &k, |v| require_zset(v).map(|z| if max { z.pop_max(n) } else { z.pop_min(n) }))
        .transpose()?
        .unwrap_or_default();
    if engine.store().with_value_mut(db, &k, |v| v.as_sorted_set().map(|z| z.is_empty()).unwrap_or(false)) == Some(true) {
        engine.store().delete(db, &k);
    }
    Ok(members_reply(popped, true))
}

fn zpopmin(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    zpop(engine, c, args, false)
}

fn zpopmax(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    zpop(engine, c, args, true)
}

fn zrandmember(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let db = c.database_index();
    let k = key(args, 0);
    let count = args.get(1).map(parse_i64).transpose()?;
    let with_scores = args.get(2).map(|a| upper(a) == "WITHSCORES").unwrap_or(false);
    let picked = engine.store().with_value_mut(db, &k, |v| require_zset(v).map(|z| z.random(count.unwrap_or(1)))).transpose()?.unwrap_or_default();
    match count {
        Some(_) => Ok(members_reply(picked, with_scores)),
        None => Ok(picked.into_iter().next().map(|(m, _)| Reply::Bulk(m)).unwrap_or(Reply::Nil)),
    }
}

fn read_weighted_sets(engine: &Engine, db: ember_core::DbIndex, args: &[Bytes]) -> Result<(Vec<(SortedSet, f64)>, Aggregate), Error> {
    let numkeys = parse_i64(&args[0])?.max(0) as usize;
    let keys = &args[1..1 + numkeys.min(args.len().saturating_sub(1))];
    let mut weights = vec![1.0; keys.len()];
    let mut aggregate = Aggregate::Sum;
    let mut i = 1 + keys.len();
    while i < args.len() {
        match upper(&args[i]).as_str() {
            "WEIGHTS" => {
                for (slot, w) in weights.iter_mut().enumerate() {
                    *w = parse_f64(&args[i + 1 + slot])?;
                }
                i += keys.len();
            }
            "AGGREGATE" => {
                aggregate = match upper(&args[i + 1]).as_str() {
                    "MIN" => Aggregate::Min,
                    "MAX" => Aggregate::Max,
                    _ => Aggregate::Sum,
                };
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }
    let sets = keys
        .iter()
        .map(|raw| {
            let k = Key::from(raw.clone());
            match engine.store().get(db, &k) {
                Some(Value::SortedSet(z)) => Ok(z),
                Some(Value::Set(s)) => {
                    let mut z = SortedSet::new();
                    z.add_or_update(s.members().map(|m| (1.0, m.clone())).collect(), UpdatePolicy::None, Comparison::None, false, false)
                        .map_err(|e| Error::InvalidUpdate(e.to_string()))?;
                    Ok(z)
                }
                Some(_) => Err(Error::WrongType),
                None => Ok(SortedSet::new()),
            }
        })
        .collect::<Result<Vec<_>, Error>>()?;
    Ok((sets.into_iter().zip(weights).collect(), aggregate))
}

fn zset_combine(engine: &Engine, db: ember_core::DbIndex, args: &[Bytes], op: SetOp) -> Result<SortedSet, Error> {
    let (weighted, aggregate) = read_weighted_sets(engine, db, args)?;
    let refs: Vec<(&SortedSet, f64)> = weighted.iter().map(|(z, w)| (z, *w)).collect();
    Ok(SortedSet::combine(&refs, op, aggregate))
}

fn zunion(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let with_scores = args.last().map(|a| upper(a) == "WITHSCORES").unwrap_or(false);
    let result = zset_combine(engine, c.database_index(), args, SetOp::Union)?;
    Ok(members_reply(result.iter().map(|(m, s)| (m.clone(), s)).collect(), with_scores))
}

fn zinter(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let with_scores = args.last().map(|a| upper(a) == "WITHSCORES").unwrap_or(false);
    let result = zset_combine(engine, c.database_index(), args, SetOp::Inter)?;
    Ok(members_reply(result.iter().map(|(m, s)| (m.clone(), s)).collect(), with_scores))
}

fn zdiff(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let with_scores = args.last().map(|a| upper(a) == "WITHSCORES").unwrap_or(false);
    let result = zset_combine(engine, c.database_index(), args, SetOp::Diff)?;
    Ok(members_reply(result.iter().map(|(m, s)| (m.clone(), s)).collect(), with_scores))
}

fn store_variant(engine: &Engine, c: &mut Connection, args: &[Bytes], op: SetOp) -> DispatchResult {
    let db = c.database_index();
    let dest = key(args, 0);
    let result = zset_combine(engine, db, &args[1..], op)?;
    let card = result.len();
    if card == 0 {
        engine.store().delete(db, &dest);
    } else {
        engine.store().set(db, dest, Value::SortedSet(result));
    }
    Ok(Reply::Integer(card as i64))
}

fn zunionstore(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    store_variant(engine, c, args, SetOp::Union)
}

fn zinterstore(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    store_variant(engine, c, args, SetOp::Inter)
}

fn zdiffstore(engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    store_variant(engine, c, args, SetOp::Diff)
}

/// Key indices for ZUNION/ZINTER/ZDIFF: `numkeys key [key ...] ...`.
fn zset_read_keys(args: &[Bytes]) -> Vec<usize> {
    let numkeys = std::str::from_utf8(&args[0]).ok().and_then(|s| s.parse::<usize>().ok()).unwrap_or(0);
    (1..(1 + numkeys).min(args.len())).collect()
}

/// Key indices for the `*STORE` variants: `dest numkeys key [key ...] ...`.
fn zset_store_keys(args: &[Bytes]) -> Vec<usize> {
    let numkeys = std::str::from_utf8(&args[1]).ok().and_then(|s| s.parse::<usize>().ok()).unwrap_or(0);
    let mut idxs = vec![0];
    idxs.extend(2..(2 + numkeys).min(args.len()));
    idxs
}

pub fn specs() -> Vec<CommandSpec> {
    vec![
        CommandSpec { name: "ZADD", module: "zset", categories: &["write", "sortedset"], description: "Add or update members in a sorted set", sync_flag: SyncFlag::Write, key_extraction_fn: first_key, handler_fn: zadd, arity_min: 3 },
        CommandSpec { name: "ZREM", module: "zset", categories: &["write", "sortedset"], description: "Remove members from a sorted set", sync_flag: SyncFlag::Write, key_extraction_fn: first_key, handler_fn: zrem, arity_min: 2 },
        CommandSpec { name: "ZSCORE", module: "zset", categories: &["read", "sortedset"], description: "Get the score of a member", sync_flag: SyncFlag::ReadOnly, key_extraction_fn: first_key, handler_fn: zscore, arity_min: 2 },
        CommandSpec { name: "ZMSCORE", module: "zset", categories: &["read", "sortedset"], description: "Get the scores of multiple members", sync_flag: SyncFlag::ReadOnly, key_extraction_fn: first_key, handler_fn: zmscore, arity_min: 2 },
        CommandSpec { name: "ZCARD", module: "zset", categories: &["read", "sortedset"], description: "Get the number of members in a sorted set", sync_flag: SyncFlag::ReadOnly, key_extraction_fn: first_key, handler_fn: zcard, arity_min: 1 },
        CommandSpec { name: "ZINCRBY", module: "zset", categories: &["write", "sortedset"], description: "Increment a member's score", sync_flag: SyncFlag::Write, key_extraction_fn: first_key, handler_fn: zincrby, arity_min: 3 },
        CommandSpec { name: "ZRANK", module: "zset", categories: &["read", "sortedset"], description: "Get the rank of a member, lowest score first", sync_flag: SyncFlag::ReadOnly, key_extraction_fn: first_key, handler_fn: zrank_cmd, arity_min: 2 },
        CommandSpec { name: "ZREVRANK", module: "zset", categories: &["read", "sortedset"], description: "Get the rank of a member, highest score first", sync_flag: SyncFlag::ReadOnly, key_extraction_fn: first_key, handler_fn: zrevrank_cmd, arity_min: 2 },
        CommandSpec { name: "ZRANGE", module: "zset", categories: &["read", "sortedset"], description: "Return a range of members by rank", sync_flag: SyncFlag::ReadOnly, key_extraction_fn: first_key, handler_fn: zrange, arity_min: 3 },
        CommandSpec { name: "ZREVRANGE", module: "zset", categories: &["read", "sortedset"], description: "Return a range of members by rank, highest score first", sync_flag: SyncFlag::ReadOnly, key_extraction_fn: first_key, handler_fn: zrevrange, arity_min: 3 },
        CommandSpec { name: "ZRANGEBYSCORE", module: "zset", categories: &["read", "sortedset"], description: "Return members with scores within a range", sync_flag: SyncFlag::ReadOnly, key_extraction_fn: first_key, handler_fn: zrangebyscore_cmd, arity_min: 3 },
        CommandSpec { name: "ZREVRANGEBYSCORE", module: "zset", categories: &["read", "sortedset"], description: "Return members with scores within a range, highest first", sync_flag: SyncFlag::ReadOnly, key_extraction_fn: first_key, handler_fn: zrevrangebyscore_cmd, arity_min: 3 },
        CommandSpec { name: "ZRANGEBYLEX", module: "zset", categories: &["read", "sortedset"], description: "Return members within a lexicographic range", sync_flag: SyncFlag::ReadOnly, key_extraction_fn: first_key, handler_fn: zrangebylex_cmd, arity_min: 3 },
        CommandSpec { name: "ZREVRANGEBYLEX", module: "zset", categories: &["read", "sortedset"], description: "Return members within a lexicographic range, reversed", sync_flag: SyncFlag::ReadOnly, key_extraction_fn: first_key, handler_fn: zrevrangebylex_cmd, arity_min: 3 },
        CommandSpec { name: "ZCOUNT", module: "zset", categories: &["read", "sortedset"], description: "Count members with scores within a range", sync_flag: SyncFlag::ReadOnly, key_extraction_fn: first_key, handler_fn: zcount, arity_min: 3 },
        CommandSpec { name: "ZLEXCOUNT", module: "zset", categories: &["read", "sortedset"], description: "Count members within a lexicographic range", sync_flag: SyncFlag::ReadOnly, key_extraction_fn: first_key, handler_fn: zlexcount, arity_min: 3 },
        CommandSpec { name: "ZPOPMIN", module: "zset", categories: &["write", "sortedset"], description: "Remove and return members with the lowest scores", sync_flag: SyncFlag::Write, key_extraction_fn: first_key, handler_fn: zpopmin, arity_min: 1 },
        CommandSpec { name: "ZPOPMAX", module: "zset", categories: &["write", "sortedset"], description: "Remove and return members with the highest scores", sync_flag: SyncFlag::Write, key_extraction_fn: first_key, handler_fn: zpopmax, arity_min: 1 },
        CommandSpec { name: "ZRANDMEMBER", module: "zset", categories: &["read", "sortedset"], description: "Get random members from a sorted set", sync_flag: SyncFlag::ReadOnly, key_extraction_fn: first_key, handler_fn: zrandmember, arity_min: 1 },
        CommandSpec { name: "ZUNION", module: "zset", categories: &["read", "sortedset"], description: "Union of multiple sorted sets", sync_flag: SyncFlag::ReadOnly, key_extraction_fn: zset_read_keys, handler_fn: zunion, arity_min: 2 },
        CommandSpec { name: "ZINTER", module: "zset", categories: &["read", "sortedset"], description: "Intersection of multiple sorted sets", sync_flag: SyncFlag::ReadOnly, key_extraction_fn: zset_read_keys, handler_fn: zinter, arity_min: 2 },
        CommandSpec { name: "ZDIFF", module: "zset", categories: &["read", "sortedset"], description: "Difference of multiple sorted sets", sync_flag: SyncFlag::ReadOnly, key_extraction_fn: zset_read_keys, handler_fn: zdiff, arity_min: 2 },
        CommandSpec { name: "ZUNIONSTORE", module: "zset", categories: &["write", "sortedset"], description: "Store the union of multiple sorted sets", sync_flag: SyncFlag::Write, key_extraction_fn: zset_store_keys, handler_fn: zunionstore, arity_min: 3 },
        CommandSpec { name: "ZINTERSTORE", module: "zset", categories: &["write", "sortedset"], description: "Store the intersection of multiple sorted sets", sync_flag: SyncFlag::Write, key_extraction_fn: zset_store_keys, handler_fn: zinterstore, arity_min: 3 },
        CommandSpec { name: "ZDIFFSTORE", module: "zset", categories: &["write", "sortedset"], description: "Store the difference of multiple sorted sets", sync_flag: SyncFlag::Write, key_extraction_fn: zset_store_keys, handler_fn: zdiffstore, arity_min: 3 },
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
    fn zadd_then_zscore_and_zrank() {
        let engine = Engine::in_memory(StorageConfig::default());
        let mut c = engine.embedded_connection();
        zadd(&engine, &mut c, &[bytes("z"), bytes("1"), bytes("a"), bytes("2"), bytes("b")]).unwrap();
        assert_eq!(zscore(&engine, &mut c, &[bytes("z"), bytes("b")]).unwrap(), Reply::Bulk(bytes("2")));
        assert_eq!(zrank_cmd(&engine, &mut c, &[bytes("z"), bytes("a")]).unwrap(), Reply::Integer(0));
    }

    #[test]
    fn zrange_withscores() {
        let engine = Engine::in_memory(StorageConfig::default());
        let mut c = engine.embedded_connection();
        zadd(&engine, &mut c, &[bytes("z"), bytes("1"), bytes("a"), bytes("2"), bytes("b")]).unwrap();
        let reply = zrange(&engine, &mut c, &[bytes("z"), bytes("0"), bytes("-1"), bytes("WITHSCORES")]).unwrap();
        assert_eq!(reply, Reply::Array(vec![Reply::Bulk(bytes("a")), Reply::Bulk(bytes("1")), Reply::Bulk(bytes("b")), Reply::Bulk(bytes("2"))]));
    }

    #[test]
    fn zpopmin_removes_lowest() {
        let engine = Engine::in_memory(StorageConfig::default());
        let mut c = engine.embedded_connection();
        zadd(&engine, &mut c, &[bytes("z"), bytes("5"), bytes("a"), bytes("1"), bytes("b")]).unwrap();
        assert_eq!(zpopmin(&engine, &mut c, &[bytes("z")]).unwrap(), Reply::Array(vec![Reply::Bulk(bytes("b")), Reply::Bulk(bytes("1"))]));
    }

    #[test]
    fn zunionstore_aggregates_scores() {
        let engine = Engine::in_memory(StorageConfig::default());
        let mut c = engine.embedded_connection();
        zadd(&engine, &mut c, &[bytes("a"), bytes("1"), bytes("m")]).unwrap();
        zadd(&engine, &mut c, &[bytes("b"), bytes("2"), bytes("m")]).unwrap();
        assert_eq!(zunionstore(&engine, &mut c, &[bytes("dest"), bytes("2"), bytes("a"), bytes("b")]).unwrap(), Reply::Integer(1));
        assert_eq!(zscore(&engine, &mut c, &[bytes("dest"), bytes("m")]).unwrap(), Reply::Bulk(bytes("3")));
    }
}
