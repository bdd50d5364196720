//! Command registration: the static table the dispatcher consults to
//! find a handler, decide whether the write-serialization gate and
//! durability logging apply, and answer `COMMAND LIST`/`COMMAND COUNT`.

use crate::connection::Connection;
use crate::engine::Engine;
use crate::reply::DispatchResult;
use bytes::Bytes;
use std::collections::HashMap;

/// Whether a command mutates the keyspace (and so must hold the write
/// gate and produce a durability record) or only reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncFlag {
    Write,
    ReadOnly,
    /// Connection- or server-level bookkeeping that touches neither the
    /// keyspace nor durability (`PING`, `CLIENT *`, `HELLO`, ...).
    Admin,
}

pub type HandlerFn = fn(&Engine, &mut Connection, &[Bytes]) -> DispatchResult;
pub type KeyExtractionFn = fn(&[Bytes]) -> Vec<usize>;

pub struct CommandSpec {
    pub name: &'static str,
    pub module: &'static str,
    pub categories: &'static [&'static str],
    pub description: &'static str,
    pub sync_flag: SyncFlag,
    pub key_extraction_fn: KeyExtractionFn,
    pub handler_fn: HandlerFn,
    pub arity_min: usize,
}

pub fn no_keys(_args: &[Bytes]) -> Vec<usize> {
    Vec::new()
}

pub fn first_key(_args: &[Bytes]) -> Vec<usize> {
    vec![0]
}

pub fn first_two_keys(_args: &[Bytes]) -> Vec<usize> {
    vec![0, 1]
}

pub fn all_keys(args: &[Bytes]) -> Vec<usize> {
    (0..args.len()).collect()
}

/// Every even-indexed argument: `MSET`'s `key value [key value ...]`
/// alternation, where reusing `all_keys` would feed value bytes into
/// ACL checks and durability logging as if they were keys.
pub fn paired_keys(args: &[Bytes]) -> Vec<usize> {
    (0..args.len()).step_by(2).collect()
}

pub struct Registry {
    commands: HashMap<&'static str, CommandSpec>,
}

impl Registry {
    pub fn build() -> Self {
        let mut commands = HashMap::new();
        for spec in crate::commands::all_specs() {
            commands.insert(spec.name, spec);
        }
        Registry { commands }
    }

    pub fn lookup(&self, name: &str) -> Option<&CommandSpec> {
        self.commands.get(name)
    }

    pub fn count(&self) -> usize {
        self.commands.len()
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.commands.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_finds_get_and_set() {
        let registry = Registry::build();
        assert!(registry.lookup("GET").is_some());
        assert!(registry.lookup("SET").is_some());
        assert!(registry.lookup("NOSUCHCOMMAND").is_none());
    }

    #[test]
    fn count_matches_names_len() {
        let registry = Registry::build();
        assert_eq!(registry.count(), registry.names().len());
    }
}
