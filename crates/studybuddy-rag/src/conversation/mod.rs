//! Per-owner conversation history
//!
//! History lives behind `ConversationStore` so it can be kept in memory or
//! mirrored into SQLite without changing call sites. `ConversationManager`
//! enforces the two caps: how many turns reach a prompt, and how many are
//! kept at all.

mod memory;

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::config::ConversationConfig;
use crate::error::Result;
use crate::types::ConversationTurn;

pub use memory::InMemoryConversationStore;

/// Owner-keyed append-only turn log
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Append a turn to the owner's log
    async fn append(&self, owner_id: &str, turn: ConversationTurn) -> Result<()>;

    /// The last `limit` turns of the owner, oldest first
    async fn recent(&self, owner_id: &str, limit: usize) -> Result<Vec<ConversationTurn>>;

    /// Drop the owner's oldest turns until at most `keep` remain
    ///
    /// Returns how many turns were dropped.
    async fn evict_beyond(&self, owner_id: &str, keep: usize) -> Result<usize>;

    /// Get store name for logging
    fn name(&self) -> &str;
}

type OwnerLocks = DashMap<String, Arc<Mutex<()>>>;

/// Holds one owner's lock; the map entry goes away with the last holder
struct OwnerLease<'a> {
    locks: &'a OwnerLocks,
    owner_id: &'a str,
    guard: Option<OwnedMutexGuard<()>>,
}

impl<'a> OwnerLease<'a> {
    async fn acquire(locks: &'a OwnerLocks, owner_id: &'a str) -> OwnerLease<'a> {
        let lock = locks.entry(owner_id.to_string()).or_default().clone();
        OwnerLease {
            locks,
            owner_id,
            guard: Some(lock.lock_owned().await),
        }
    }
}

impl Drop for OwnerLease<'_> {
    fn drop(&mut self) {
        self.guard.take();
        self.locks
            .remove_if(self.owner_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Bounded conversation context
pub struct ConversationManager {
    store: Arc<dyn ConversationStore>,
    /// Serializes append + evict per owner; entries live only while held
    owner_locks: OwnerLocks,
    prompt_turns: usize,
    retention_cap: usize,
    transcript_max_chars: usize,
}

impl ConversationManager {
    pub fn new(store: Arc<dyn ConversationStore>, config: &ConversationConfig) -> Self {
        Self {
            store,
            owner_locks: DashMap::new(),
            prompt_turns: config.prompt_turns,
            retention_cap: config.retention_cap,
            transcript_max_chars: config.transcript_max_chars,
        }
    }

    /// Record an exchange, then enforce the retention cap
    ///
    /// Only the append can fail; eviction failures are logged.
    pub async fn append(
        &self,
        owner_id: &str,
        user_message: &str,
        assistant_message: &str,
    ) -> Result<()> {
        let _lease = OwnerLease::acquire(&self.owner_locks, owner_id).await;

        self.store
            .append(owner_id, ConversationTurn::new(user_message, assistant_message))
            .await?;

        match self.store.evict_beyond(owner_id, self.retention_cap).await {
            Ok(0) => {}
            Ok(evicted) => {
                tracing::debug!("Evicted {} old turns for owner {}", evicted, owner_id)
            }
            Err(e) => tracing::warn!(
                "Failed to enforce history cap for owner {} ({}): {}",
                owner_id,
                self.store.name(),
                e
            ),
        }
        Ok(())
    }

    /// Last `n` turns (never more than the retention cap), oldest first
    pub async fn recent(&self, owner_id: &str, n: usize) -> Result<Vec<ConversationTurn>> {
        self.store.recent(owner_id, n.min(self.retention_cap)).await
    }

    /// Turns that go into a prompt
    pub async fn prompt_turns(&self, owner_id: &str) -> Result<Vec<ConversationTurn>> {
        self.recent(owner_id, self.prompt_turns).await
    }

    /// Prompt-ready transcript of the recent turns
    pub async fn transcript(&self, owner_id: &str) -> Result<String> {
        let turns = self.prompt_turns(owner_id).await?;
        Ok(render_transcript(&turns, self.transcript_max_chars))
    }
}

/// Render turns as `User:`/`Assistant:` lines, keeping at most `max_chars`
/// characters from the end
pub fn render_transcript(turns: &[ConversationTurn], max_chars: usize) -> String {
    let transcript = turns
        .iter()
        .map(ConversationTurn::render)
        .collect::<Vec<_>>()
        .join("\n");

    let total = transcript.chars().count();
    if total <= max_chars {
        return transcript;
    }
    transcript.chars().skip(total - max_chars).collect()
}
