//! Connection-scoped bookkeeping: naming, protocol negotiation, and
//! command introspection. None of these touch the keyspace, so every
//! command here is registered with [`SyncFlag::Admin`].

use crate::connection::Connection;
use crate::engine::Engine;
use crate::registry::{no_keys, CommandSpec, SyncFlag};
use crate::reply::{DispatchResult, Reply};
use bytes::Bytes;
use ember_core::Error;

fn client_setname(_engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let name = std::str::from_utf8(&args[0]).map_err(|_| Error::Syntax("client name must be valid UTF-8".into()))?;
    if name.contains(char::is_whitespace) {
        return Err(Error::Syntax("client names cannot contain spaces".into()));
    }
    c.set_name(name.to_string());
    Ok(Reply::ok())
}

fn client_getname(_engine: &Engine, c: &mut Connection, _args: &[Bytes]) -> DispatchResult {
    Ok(c.name().map(|n| Reply::bulk(n.to_string())).unwrap_or(Reply::Nil))
}

fn client_id(_engine: &Engine, c: &mut Connection, _args: &[Bytes]) -> DispatchResult {
    Ok(Reply::Integer(c.id() as i64))
}

fn hello(_engine: &Engine, c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    if let Some(raw) = args.first() {
        let version: u8 = std::str::from_utf8(raw).ok().and_then(|s| s.parse().ok()).ok_or(Error::Syntax("NOPROTO unsupported protocol version".into()))?;
        if version != 2 && version != 3 {
            return Err(Error::Syntax("NOPROTO unsupported protocol version".into()));
        }
        c.set_protocol_version(version);
    }
    Ok(Reply::Array(vec![
        Reply::bulk("proto"),
        Reply::Integer(c.protocol_version() as i64),
        Reply::bulk("mode"),
        Reply::bulk("standalone"),
        Reply::bulk("id"),
        Reply::Integer(c.id() as i64),
    ]))
}

fn command_list(engine: &Engine, _c: &mut Connection, _args: &[Bytes]) -> DispatchResult {
    Ok(Reply::Array(engine.registry().names().into_iter().map(Reply::bulk).collect()))
}

fn command_count(engine: &Engine, _c: &mut Connection, _args: &[Bytes]) -> DispatchResult {
    Ok(Reply::Integer(engine.registry().count() as i64))
}

fn ping(_engine: &Engine, _c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    match args.first() {
        Some(msg) => Ok(Reply::bulk(msg.clone())),
        None => Ok(Reply::Simple("PONG")),
    }
}

fn echo(_engine: &Engine, _c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    Ok(Reply::bulk(args[0].clone()))
}

pub fn specs() -> Vec<CommandSpec> {
    vec![
        CommandSpec { name: "PING", module: "connection", categories: &["connection"], description: "Ping the server", sync_flag: SyncFlag::Admin, key_extraction_fn: no_keys, handler_fn: ping, arity_min: 0 },
        CommandSpec { name: "ECHO", module: "connection", categories: &["connection"], description: "Echo the given message", sync_flag: SyncFlag::Admin, key_extraction_fn: no_keys, handler_fn: echo, arity_min: 1 },
        CommandSpec { name: "HELLO", module: "connection", categories: &["connection"], description: "Negotiate protocol version and return server info", sync_flag: SyncFlag::Admin, key_extraction_fn: no_keys, handler_fn: hello, arity_min: 0 },
        CommandSpec { name: "CLIENT SETNAME", module: "connection", categories: &["connection"], description: "Set the current connection's name", sync_flag: SyncFlag::Admin, key_extraction_fn: no_keys, handler_fn: client_setname, arity_min: 1 },
        CommandSpec { name: "CLIENT GETNAME", module: "connection", categories: &["connection"], description: "Get the current connection's name", sync_flag: SyncFlag::Admin, key_extraction_fn: no_keys, handler_fn: client_getname, arity_min: 0 },
        CommandSpec { name: "CLIENT ID", module: "connection", categories: &["connection"], description: "Get the current connection's id", sync_flag: SyncFlag::Admin, key_extraction_fn: no_keys, handler_fn: client_id, arity_min: 0 },
        CommandSpec { name: "COMMAND LIST", module: "connection", categories: &["connection"], description: "List every registered command name", sync_flag: SyncFlag::Admin, key_extraction_fn: no_keys, handler_fn: command_list, arity_min: 0 },
        CommandSpec { name: "COMMAND COUNT", module: "connection", categories: &["connection"], description: "Count the registered commands", sync_flag: SyncFlag::Admin, key_extraction_fn: no_keys, handler_fn: command_count, arity_min: 0 },
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
    fn setname_then_getname() {
        let engine = Engine::in_memory(StorageConfig::default());
        let mut c = engine.embedded_connection();
        client_setname(&engine, &mut c, &[bytes("scripter")]).unwrap();
        assert_eq!(client_getname(&engine, &mut c, &[]).unwrap(), Reply::Bulk(bytes("scripter")));
    }

    #[test]
    fn setname_rejects_whitespace() {
        let engine = Engine::in_memory(StorageConfig::default());
        let mut c = engine.embedded_connection();
        assert!(client_setname(&engine, &mut c, &[bytes("bad name")]).is_err());
    }

    #[test]
    fn hello_negotiates_protocol_version() {
        let engine = Engine::in_memory(StorageConfig::default());
        let mut c = engine.embedded_connection();
        hello(&engine, &mut c, &[bytes("3")]).unwrap();
        assert_eq!(c.protocol_version(), 3);
    }

    #[test]
    fn command_count_matches_registry() {
        let engine = Engine::in_memory(StorageConfig::default());
        let mut c = engine.embedded_connection();
        let reply = command_count(&engine, &mut c, &[]).unwrap();
        assert_eq!(reply, Reply::Integer(engine.registry().count() as i64));
    }
}
