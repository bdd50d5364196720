//! Pub/sub is represented only at the registry boundary: `SUBSCRIBE`
//! and `PUBLISH` are valid commands with correctly extracted keys, but
//! actually fanning a published message out to subscribers is out of
//! scope. [`NoopPubSub`] is the shipped default.

pub trait PubSubSink: Send + Sync {
    /// Called for a `PUBLISH channel message`. Returns the number of
    /// subscribers the message was delivered to.
    fn publish(&self, channel: &[u8], message: &[u8]) -> i64;
}

#[derive(Debug, Default)]
pub struct NoopPubSub;

impl PubSubSink for NoopPubSub {
    fn publish(&self, _channel: &[u8], _message: &[u8]) -> i64 {
        0
    }
}
