//! The tagged union stored behind every key.

use crate::hash::Hash;
use crate::list::List;
use crate::set::Set;
use crate::sorted_set::SortedSet;
use bytes::Bytes;

/// One of the five data types a key can hold.
///
/// There is deliberately no `Nil`/`None` variant: absence is
/// represented by the key not being present in the keyspace at all.
#[derive(Debug, Clone)]
pub enum Value {
    Str(Bytes),
    List(List),
    Set(Set),
    Hash(Hash),
    SortedSet(SortedSet),
}

/// The type tag reported by the `TYPE` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    String,
    List,
    Set,
    Hash,
    ZSet,
}

impl Value {
    pub fn type_tag(&self) -> ValueType {
        match self {
            Value::Str(_) => ValueType::String,
            Value::List(_) => ValueType::List,
            Value::Set(_) => ValueType::Set,
            Value::Hash(_) => ValueType::Hash,
            Value::SortedSet(_) => ValueType::ZSet,
        }
    }

    pub fn as_str(&self) -> Option<&Bytes> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&List> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut List> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&Set> {
        match self {
            Value::Set(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_set_mut(&mut self) -> Option<&mut Set> {
        match self {
            Value::Set(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_hash(&self) -> Option<&Hash> {
        match self {
            Value::Hash(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_hash_mut(&mut self) -> Option<&mut Hash> {
        match self {
            Value::Hash(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_sorted_set(&self) -> Option<&SortedSet> {
        match self {
            Value::SortedSet(z) => Some(z),
            _ => None,
        }
    }

    pub fn as_sorted_set_mut(&mut self) -> Option<&mut SortedSet> {
        match self {
            Value::SortedSet(z) => Some(z),
            _ => None,
        }
    }

    /// Approximate resident size in bytes, used by the memory governor.
    pub fn memory_usage(&self) -> usize {
        match self {
            Value::Str(s) => s.len(),
            Value::List(l) => l.memory_usage(),
            Value::Set(s) => s.memory_usage(),
            Value::Hash(h) => h.memory_usage(),
            Value::SortedSet(z) => z.memory_usage(),
        }
    }
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::List => "list",
            ValueType::Set => "set",
            ValueType::Hash => "hash",
            ValueType::ZSet => "zset",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_tag_matches_variant() {
        assert_eq!(Value::Str(Bytes::from_static(b"x")).type_tag(), ValueType::String);
        assert_eq!(Value::Set(Set::new()).type_tag(), ValueType::Set);
        assert_eq!(ValueType::ZSet.as_str(), "zset");
    }
}
