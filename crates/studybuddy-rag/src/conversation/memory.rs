//! In-process conversation store

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::VecDeque;

use crate::error::Result;
use crate::types::ConversationTurn;

use super::ConversationStore;

/// Conversation logs held in memory, partitioned by owner
///
/// Lost on restart. Owners never contend on a shared lock.
#[derive(Default)]
pub struct InMemoryConversationStore {
    logs: DashMap<String, VecDeque<ConversationTurn>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of turns held for an owner
    pub fn turn_count(&self, owner_id: &str) -> usize {
        self.logs.get(owner_id).map_or(0, |log| log.len())
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn append(&self, owner_id: &str, turn: ConversationTurn) -> Result<()> {
        self.logs
            .entry(owner_id.to_string())
            .or_default()
            .push_back(turn);
        Ok(())
    }

    async fn recent(&self, owner_id: &str, limit: usize) -> Result<Vec<ConversationTurn>> {
        Ok(self
            .logs
            .get(owner_id)
            .map(|log| {
                log.iter()
                    .skip(log.len().saturating_sub(limit))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn evict_beyond(&self, owner_id: &str, keep: usize) -> Result<usize> {
        let Some(mut log) = self.logs.get_mut(owner_id) else {
            return Ok(0);
        };
        let excess = log.len().saturating_sub(keep);
        log.drain(..excess);
        Ok(excess)
    }

    fn name(&self) -> &str {
        "memory"
    }
}
