//! Session manager: the stream id → session registration map.
//!
//! This map is the only state shared across sessions. It enforces the
//! at-most-one-live-session-per-stream invariant at connect time and is the
//! release point of every session's terminal cleanup. Lock scopes are
//! synchronous and never cross an await.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::oneshot;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::identifiers::StreamId;
use crate::source::FrameSource;

use super::session::{Session, StreamSocket};

// ============================================================================
// SessionHandle
// ============================================================================

/// Registration entry for one live session.
///
/// Dropping the handle (or sending on it) tells the session task to detach;
/// the session observes either outcome the same way.
struct SessionHandle {
    /// Identity of the registered session, distinct from the stream id.
    ///
    /// Guards release: a late cleanup from an old session must not evict a
    /// newer session registered under the same stream id.
    session_uuid: Uuid,
    detach_tx: oneshot::Sender<()>,
}

// ============================================================================
// SessionManager
// ============================================================================

/// Owns the stream id → session map and creates sessions.
///
/// Cheap to clone; all clones share the same map and frame source.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<ManagerInner>,
}

struct ManagerInner {
    /// The decode engine handed to every session this manager creates.
    source: Arc<dyn FrameSource>,
    /// Registered live sessions.
    sessions: Mutex<FxHashMap<StreamId, SessionHandle>>,
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("session_count", &self.session_count())
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Creates a manager whose sessions read from `source`.
    #[must_use]
    pub fn new(source: Arc<dyn FrameSource>) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                source,
                sessions: Mutex::new(FxHashMap::default()),
            }),
        }
    }

    /// Registers and creates a session for a newly accepted transport.
    ///
    /// The returned session must be driven to completion with
    /// [`Session::run`], which also releases the registration. If the
    /// stream id already has a live session, the new transport is told so
    /// (an `error` event) and closed; the existing session is unaffected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionActive`] for a duplicate connect.
    pub async fn connect(&self, stream_id: StreamId, transport: StreamSocket) -> Result<Session> {
        let session_uuid = Uuid::new_v4();
        let (detach_tx, detach_rx) = oneshot::channel();

        let claimed = {
            let mut sessions = self.inner.sessions.lock();
            if sessions.contains_key(&stream_id) {
                false
            } else {
                sessions.insert(
                    stream_id,
                    SessionHandle {
                        session_uuid,
                        detach_tx,
                    },
                );
                true
            }
        };

        if !claimed {
            Session::reject(transport, stream_id).await;
            return Err(Error::session_active(stream_id));
        }

        debug!(stream_id = %stream_id, "session registered");
        Ok(Session::new(
            stream_id,
            session_uuid,
            transport,
            Arc::clone(&self.inner.source),
            self.clone(),
            detach_rx,
        ))
    }

    /// Removes a stream's registration, detaching its session if one is
    /// live.
    ///
    /// Idempotent: removing an absent id is a no-op. Returns whether a
    /// registration was actually removed.
    pub fn remove(&self, stream_id: StreamId) -> bool {
        let removed = self.inner.sessions.lock().remove(&stream_id);

        match removed {
            Some(handle) => {
                // Either the signal or the implied drop detaches the task.
                let _ = handle.detach_tx.send(());
                debug!(stream_id = %stream_id, "session removed");
                true
            }
            None => false,
        }
    }

    /// Releases a registration on behalf of a terminating session.
    ///
    /// Only removes the entry if it still belongs to that session, so a
    /// stale cleanup cannot evict a successor registered under the same
    /// stream id.
    pub(crate) fn release(&self, stream_id: StreamId, session_uuid: Uuid) {
        let mut sessions = self.inner.sessions.lock();
        if sessions
            .get(&stream_id)
            .is_some_and(|handle| handle.session_uuid == session_uuid)
        {
            sessions.remove(&stream_id);
        }
    }

    /// Returns `true` if a session is registered for the stream.
    #[inline]
    #[must_use]
    pub fn contains(&self, stream_id: StreamId) -> bool {
        self.inner.sessions.lock().contains_key(&stream_id)
    }

    /// Returns the number of registered sessions.
    #[inline]
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.inner.sessions.lock().len()
    }

    /// Detaches every registered session.
    ///
    /// Sessions run their own cleanup when the detach signal lands; their
    /// late releases are no-ops against the already-drained map. Returns
    /// how many sessions were detached.
    pub fn detach_all(&self) -> usize {
        let drained: Vec<_> = {
            let mut sessions = self.inner.sessions.lock();
            sessions.drain().collect()
        };

        let count = drained.len();
        for (stream_id, handle) in drained {
            let _ = handle.detach_tx.send(());
            debug!(stream_id = %stream_id, "session detached during shutdown");
        }

        if count > 0 {
            info!(count, "detached all sessions");
        }
        count
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::source::{Frame, FrameSubscription, TestPatternSource};

    fn manager() -> SessionManager {
        SessionManager::new(Arc::new(TestPatternSource::default()))
    }

    fn stream_id() -> StreamId {
        StreamId::new(Uuid::new_v4())
    }

    #[test]
    fn test_manager_is_clone_and_debug() {
        fn assert_clone<T: Clone>() {}
        fn assert_debug<T: std::fmt::Debug>() {}
        assert_clone::<SessionManager>();
        assert_debug::<SessionManager>();
    }

    #[test]
    fn test_fresh_manager_is_empty() {
        let manager = manager();
        assert_eq!(manager.session_count(), 0);
        assert!(!manager.contains(stream_id()));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let manager = manager();
        let id = stream_id();

        assert!(!manager.remove(id), "removing an absent id is a no-op");
        assert!(!manager.remove(id));
    }

    #[test]
    fn test_release_requires_matching_session() {
        let manager = manager();
        let id = stream_id();
        let (detach_tx, _detach_rx) = oneshot::channel();
        let owner = Uuid::new_v4();

        manager.inner.sessions.lock().insert(
            id,
            SessionHandle {
                session_uuid: owner,
                detach_tx,
            },
        );

        // A stale session's release must not evict the registration.
        manager.release(id, Uuid::new_v4());
        assert!(manager.contains(id));

        manager.release(id, owner);
        assert!(!manager.contains(id));

        // Releasing again is a no-op.
        manager.release(id, owner);
        assert_eq!(manager.session_count(), 0);
    }

    #[test]
    fn test_detach_all_drains_registrations() {
        let manager = manager();

        for _ in 0..3 {
            let (detach_tx, _rx) = oneshot::channel();
            manager.inner.sessions.lock().insert(
                stream_id(),
                SessionHandle {
                    session_uuid: Uuid::new_v4(),
                    detach_tx,
                },
            );
        }

        assert_eq!(manager.session_count(), 3);
        assert_eq!(manager.detach_all(), 3);
        assert_eq!(manager.session_count(), 0);
        assert_eq!(manager.detach_all(), 0);
    }

    // Keep the trait objects exercised without a socket: the manager clones
    // its source handle into every session it creates.
    #[tokio::test]
    async fn test_manager_source_is_shared() {
        let source: Arc<dyn crate::source::FrameSource> =
            Arc::new(TestPatternSource::new(32, 24, 100.0));
        let manager = SessionManager::new(Arc::clone(&source));

        let mut subscription: Box<dyn FrameSubscription> = manager
            .inner
            .source
            .open("rtsp://check")
            .await
            .expect("open");
        let frame: Option<Frame> = subscription.next_frame().await.expect("next");
        assert!(frame.is_some());
        subscription.close().await;
    }
}
