//! Session wrapper pairing an embedded [`Engine`] with the [`Connection`]
//! the CLI drives it through.

use bytes::Bytes;
use ember_core::Error;
use ember_engine::{Connection, Engine, Reply};

pub struct SessionState {
    engine: Engine,
    connection: Connection,
}

impl SessionState {
    pub fn in_memory() -> Self {
        let engine = Engine::in_memory(Default::default());
        let connection = engine.embedded_connection();
        Self { engine, connection }
    }

    pub fn open(dir: &str) -> Result<Self, Error> {
        let engine = Engine::open(dir)?;
        let connection = engine.embedded_connection();
        Ok(Self { engine, connection })
    }

    pub fn execute(&mut self, tokens: &[String]) -> Result<Reply, Error> {
        let args: Vec<Bytes> = tokens.iter().map(|t| Bytes::copy_from_slice(t.as_bytes())).collect();
        self.engine.dispatch(&mut self.connection, &args)
    }

    pub fn prompt(&self) -> String {
        format!("ember[{}]> ", self.connection.database_index())
    }
}
