//! Ordered block registry used by template inheritance.
//!
//! A template compiled in extends mode yields its named blocks interleaved
//! with the anonymous code between them. Anonymous segments are keyed by
//! position, assigned sequentially as they are appended.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::ast::Node;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKey {
    Name(String),
    Position(usize),
}

/// A block is either still a node list or already generated code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockBody {
    Nodes(Vec<Node>),
    Code(String),
}

/// Persisted form of one block map entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockEntry {
    #[serde(flatten)]
    key: BlockKey,
    #[serde(flatten)]
    body: BlockBody,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<BlockEntry>", into = "Vec<BlockEntry>")]
pub struct BlockMap {
    entries: IndexMap<BlockKey, BlockBody>,
    next_position: usize,
}

impl BlockMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Register a named block. A later definition under the same name
    /// replaces the body but keeps the original slot.
    pub fn insert_named(&mut self, name: impl Into<String>, body: BlockBody) {
        self.entries.insert(BlockKey::Name(name.into()), body);
    }

    /// Append an anonymous segment of code.
    pub fn push_code(&mut self, code: String) {
        self.entries
            .insert(BlockKey::Position(self.next_position), BlockBody::Code(code));
        self.next_position += 1;
    }

    pub fn get_named(&self, name: &str) -> Option<&BlockBody> {
        self.entries.get(&BlockKey::Name(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BlockKey, &BlockBody)> {
        self.entries.iter()
    }

    /// Named block keys in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().filter_map(|key| match key {
            BlockKey::Name(name) => Some(name.as_str()),
            BlockKey::Position(_) => None,
        })
    }
}

// Order matters: two maps with the same entries in a different order merge
// into different output.
impl PartialEq for BlockMap {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len() && self.entries.iter().eq(other.entries.iter())
    }
}

impl From<Vec<BlockEntry>> for BlockMap {
    fn from(entries: Vec<BlockEntry>) -> Self {
        let mut map = BlockMap::new();
        for entry in entries {
            if let BlockKey::Position(position) = entry.key {
                map.next_position = map.next_position.max(position + 1);
            }
            map.entries.insert(entry.key, entry.body);
        }
        map
    }
}

impl From<BlockMap> for Vec<BlockEntry> {
    fn from(map: BlockMap) -> Self {
        map.entries
            .into_iter()
            .map(|(key, body)| BlockEntry { key, body })
            .collect()
    }
}
