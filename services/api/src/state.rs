//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds the content
//! generator and the registry of live learning sessions. Configuration is
//! consumed at startup by the `api` binary and is not kept here.

use sikho_core::{ContentGenerator, LearningSession};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory registry of learning sessions. Sessions live until deleted or
/// until the process exits.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, LearningSession>>,
}

impl SessionRegistry {
    pub async fn insert(&self, session: LearningSession) -> Uuid {
        let id = Uuid::new_v4();
        self.sessions.write().await.insert(id, session);
        id
    }

    pub async fn get(&self, id: Uuid) -> Option<LearningSession> {
        self.sessions.read().await.get(&id).cloned()
    }

    pub async fn remove(&self, id: Uuid) -> Option<LearningSession> {
        self.sessions.write().await.remove(&id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// The shared application state, created once at startup and passed to all handlers.
/// All fields are public to be accessible from other modules.
#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<dyn ContentGenerator>,
    pub sessions: Arc<SessionRegistry>,
}

impl AppState {
    pub fn new(generator: Arc<dyn ContentGenerator>) -> Self {
        Self {
            generator,
            sessions: Arc::new(SessionRegistry::default()),
        }
    }
}
