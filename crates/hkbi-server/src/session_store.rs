//! Per-camera streaming session store.
//!
//! The map lock only guards membership. Everything a command does to a session
//! (spawn, signal, wait) happens under that session's own async lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex as AsyncMutex, MutexGuard};
use utoipa::ToSchema;

use hkbi_types::{SessionId, SetupEndpoints, SetupEndpointsResponse};

use crate::transcoder::TranscoderProcess;

/// Setup request and the response the accessory answered with.
#[derive(Clone, Debug)]
pub struct Negotiated {
    pub request: SetupEndpoints,
    pub response: SetupEndpointsResponse,
}

/// Mutable part of a session, only reachable through [`Session::lock`].
#[derive(Default)]
pub struct SessionState {
    pub negotiated: Option<Negotiated>,
    pub transcoder: Option<Box<dyn TranscoderProcess>>,
    pub suspended: bool,
}

impl SessionState {
    pub fn phase(&self) -> SessionPhase {
        match (&self.transcoder, self.suspended) {
            (None, _) => SessionPhase::Configured,
            (Some(_), false) => SessionPhase::Running,
            (Some(_), true) => SessionPhase::Suspended,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Configured,
    Running,
    Suspended,
    /// A command currently holds the session lock.
    Busy,
}

pub struct Session {
    id: SessionId,
    state: AsyncMutex<SessionState>,
}

impl Session {
    fn new(id: SessionId) -> Self {
        Self {
            id,
            state: AsyncMutex::new(SessionState::default()),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Acquire the session lock; held for a whole lifecycle transition.
    pub async fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().await
    }

    /// Current phase without waiting for an in-flight transition.
    pub fn phase_now(&self) -> SessionPhase {
        match self.state.try_lock() {
            Ok(state) => state.phase(),
            Err(_) => SessionPhase::Busy,
        }
    }
}

#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<SessionId, Arc<Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &SessionId) -> Option<Arc<Session>> {
        let sessions = self.sessions.lock().unwrap_or_else(|err| err.into_inner());
        sessions.get(id).cloned()
    }

    /// Return the session for `id`, creating an empty one if needed. The flag is
    /// true when the session was created by this call.
    pub fn get_or_create(&self, id: &SessionId) -> (Arc<Session>, bool) {
        let mut sessions = self.sessions.lock().unwrap_or_else(|err| err.into_inner());
        if let Some(existing) = sessions.get(id) {
            return (existing.clone(), false);
        }
        let session = Arc::new(Session::new(id.clone()));
        sessions.insert(id.clone(), session.clone());
        (session, true)
    }

    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clone out every session so callers can inspect them without the map lock.
    pub fn snapshot(&self) -> Vec<Arc<Session>> {
        let sessions = self.sessions.lock().unwrap_or_else(|err| err.into_inner());
        sessions.values().cloned().collect()
    }
}
