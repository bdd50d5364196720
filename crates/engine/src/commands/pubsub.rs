//! PUBLISH/SUBSCRIBE registration. Actually fanning a message out to
//! subscribed connections needs a wire listener, which is out of
//! scope here; PUBLISH still forwards through [`crate::pubsub::PubSubSink`]
//! so an embedding caller can wire up real delivery.

use crate::connection::Connection;
use crate::engine::Engine;
use crate::registry::{first_key, no_keys, CommandSpec, SyncFlag};
use crate::reply::{DispatchResult, Reply};
use bytes::Bytes;

fn publish(engine: &Engine, _c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    let count = engine.pubsub().publish(&args[0], &args[1]);
    Ok(Reply::Integer(count))
}

fn subscribe(_engine: &Engine, _c: &mut Connection, args: &[Bytes]) -> DispatchResult {
    Ok(Reply::Array(args.iter().map(|channel| Reply::bulk(channel.clone())).collect()))
}

pub fn specs() -> Vec<CommandSpec> {
    vec![
        CommandSpec { name: "PUBLISH", module: "pubsub", categories: &["pubsub"], description: "Post a message to a channel", sync_flag: SyncFlag::Admin, key_extraction_fn: first_key, handler_fn: publish, arity_min: 2 },
        CommandSpec { name: "SUBSCRIBE", module: "pubsub", categories: &["pubsub"], description: "Subscribe to one or more channels", sync_flag: SyncFlag::Admin, key_extraction_fn: no_keys, handler_fn: subscribe, arity_min: 1 },
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
    fn publish_with_no_subscribers_returns_zero() {
        let engine = Engine::in_memory(StorageConfig::default());
        let mut c = engine.embedded_connection();
        assert_eq!(publish(&engine, &mut c, &[bytes("chan"), bytes("hello")]).unwrap(), Reply::Integer(0));
    }

    #[test]
    fn subscribe_echoes_channel_names() {
        let engine = Engine::in_memory(StorageConfig::default());
        let mut c = engine.embedded_connection();
        let reply = subscribe(&engine, &mut c, &[bytes("a"), bytes("b")]).unwrap();
        assert_eq!(reply, Reply::Array(vec![Reply::Bulk(bytes("a")), Reply::Bulk(bytes("b"))]));
    }
}
