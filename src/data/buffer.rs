//! Per-block keyed store of named series.

use super::SharedBlock;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    #[error("no block stored under key '{0}'")]
    NotFound(String),

    #[error("buffer is empty")]
    Empty,
}

/// Insertion-ordered mapping from key to the latest block stored under it.
///
/// Pushing an existing key replaces its block and moves it to the most
/// recent position, so [`latest`](Self::latest) always returns the last push.
/// The pipeline clears the buffer at the start of every block.
#[derive(Debug, Default, Clone)]
pub struct KeyedBlockBuffer {
    entries: Vec<(String, SharedBlock)>,
}

impl KeyedBlockBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, block: SharedBlock) {
        let key = key.into();
        if let Some(pos) = self.position(&key) {
            self.entries.remove(pos);
        }
        self.entries.push((key, block));
    }

    pub fn get(&self, key: &str) -> Result<&SharedBlock, BufferError> {
        self.position(key)
            .map(|pos| &self.entries[pos].1)
            .ok_or_else(|| BufferError::NotFound(key.to_string()))
    }

    pub fn pop(&mut self, key: &str) -> Result<SharedBlock, BufferError> {
        let pos = self
            .position(key)
            .ok_or_else(|| BufferError::NotFound(key.to_string()))?;
        Ok(self.entries.remove(pos).1)
    }

    /// Most recently pushed block.
    pub fn latest(&self) -> Result<&SharedBlock, BufferError> {
        self.entries
            .last()
            .map(|(_, block)| block)
            .ok_or(BufferError::Empty)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn contains(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SharedBlock)> {
        self.entries.iter().map(|(k, b)| (k.as_str(), b))
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }
}
