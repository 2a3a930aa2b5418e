//! Server state management.

use std::collections::HashMap;
use std::sync::Arc;

use garden_core::{Garden, GardenConfig, GardenResult};
use tokio::sync::{Mutex, RwLock};

use crate::conversation::{self, ConversationState};
use crate::error::{ApiError, ApiResult};

/// One conversation. Its lock is held for a whole turn.
type SessionSlot = Arc<Mutex<ConversationState>>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub garden: Arc<Garden>,
    /// Chat sessions keyed by user and session id.
    sessions: Arc<RwLock<HashMap<String, SessionSlot>>>,
}

impl AppState {
    /// Create a new application state around an opened garden.
    pub fn new(garden: Garden) -> Self {
        Self {
            garden: Arc::new(garden),
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// State backed by an in-memory store.
    pub fn in_memory(config: GardenConfig) -> GardenResult<Self> {
        Ok(Self::new(Garden::in_memory(config)?))
    }

    /// Run a garden operation on the blocking pool.
    pub async fn with_garden<F, T>(&self, f: F) -> ApiResult<T>
    where
        F: FnOnce(&Garden) -> GardenResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let garden = Arc::clone(&self.garden);
        tokio::task::spawn_blocking(move || f(&garden))
            .await
            .map_err(|e| ApiError::internal(format!("Garden task failed: {}", e)))?
            .map_err(ApiError::from)
    }

    fn session_key(user_id: &str, session_id: &str) -> String {
        format!("{}:{}", user_id, session_id)
    }

    /// Current conversation state, `Idle` for unknown sessions.
    pub async fn session(&self, user_id: &str, session_id: &str) -> ConversationState {
        let slot = self
            .sessions
            .read()
            .await
            .get(&Self::session_key(user_id, session_id))
            .cloned();
        match slot {
            Some(slot) => slot.lock().await.clone(),
            None => ConversationState::Idle,
        }
    }

    /// Answer one chat message and advance the session.
    ///
    /// Turns on the same session run one at a time: the state is read,
    /// answered and written back under the session's lock. Returns the
    /// reply text.
    pub async fn chat_turn(
        &self,
        user_id: &str,
        session_id: &str,
        text: String,
    ) -> ApiResult<String> {
        let key = Self::session_key(user_id, session_id);
        let slot = self
            .sessions
            .write()
            .await
            .entry(key.clone())
            .or_default()
            .clone();

        let mut current = slot.lock().await;
        let state = current.clone();
        let user = user_id.to_string();
        let result = self
            .with_garden(move |garden| conversation::respond(garden, &user, state, &text))
            .await;

        let outcome = match result {
            Ok(reply) => {
                *current = reply.next;
                Ok(reply.text)
            }
            Err(e) => Err(e),
        };
        drop(current);
        drop(slot);

        self.prune_idle(&key).await;
        outcome
    }

    /// Drop an idle session nobody else is waiting on.
    async fn prune_idle(&self, key: &str) {
        let mut sessions = self.sessions.write().await;
        let idle = sessions.get(key).is_some_and(|slot| {
            Arc::strong_count(slot) == 1
                && slot
                    .try_lock()
                    .is_ok_and(|state| *state == ConversationState::Idle)
        });
        if idle {
            sessions.remove(key);
        }
    }

    #[cfg(test)]
    async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
