//! Registry of live sessions, keyed by user.
//!
//! A user may hold several sessions (tabs, devices); every session of the
//! recipient gets a copy of the event. Full or closed session channels lose
//! the event.

use super::{MatchEvent, NotificationPublisher};
use crate::contest::models::UserId;
use std::collections::HashMap;
use std::sync::{
    Mutex, MutexGuard,
    atomic::{AtomicU64, Ordering},
};
use tokio::sync::mpsc::{self, error::TrySendError};

/// Session identifier, unique per hub
pub type SessionId = u64;

struct Session {
    id: SessionId,
    sender: mpsc::Sender<MatchEvent>,
}

/// Live session attached to a user's room
pub struct Subscription {
    pub id: SessionId,
    pub user_id: UserId,
    pub receiver: mpsc::Receiver<MatchEvent>,
}

/// In-process realtime transport
pub struct SessionHub {
    rooms: Mutex<HashMap<UserId, Vec<Session>>>,
    next_id: AtomicU64,
    buffer: usize,
}

impl SessionHub {
    /// Create a hub whose sessions buffer up to `buffer` undelivered events
    pub fn new(buffer: usize) -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            buffer: buffer.max(1),
        }
    }

    fn rooms(&self) -> MutexGuard<'_, HashMap<UserId, Vec<Session>>> {
        // A panic while holding the lock cannot leave the map half-updated
        self.rooms.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Join `user_id`'s room
    pub fn subscribe(&self, user_id: &str) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(self.buffer);

        self.rooms()
            .entry(user_id.to_string())
            .or_default()
            .push(Session { id, sender });

        log::debug!("Session {} joined room for user {}", id, user_id);

        Subscription {
            id,
            user_id: user_id.to_string(),
            receiver,
        }
    }

    /// Leave a room; unknown sessions are ignored
    pub fn unsubscribe(&self, user_id: &str, session_id: SessionId) {
        let mut rooms = self.rooms();
        if let Some(sessions) = rooms.get_mut(user_id) {
            sessions.retain(|s| s.id != session_id);
            if sessions.is_empty() {
                rooms.remove(user_id);
            }
        }
    }

    /// Number of live sessions across all users
    pub fn session_count(&self) -> usize {
        self.rooms().values().map(Vec::len).sum()
    }

    pub fn is_connected(&self, user_id: &str) -> bool {
        self.rooms().contains_key(user_id)
    }

    /// Push `event` to every session of its recipient, returning how many
    /// sessions accepted it
    pub fn deliver(&self, event: &MatchEvent) -> usize {
        let mut rooms = self.rooms();
        let Some(sessions) = rooms.get_mut(&event.recipient_id) else {
            log::debug!(
                "No live session for {}, dropping event for match {}",
                event.recipient_id,
                event.match_id
            );
            return 0;
        };

        let mut delivered = 0;
        sessions.retain(|session| match session.sender.try_send(event.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                log::warn!(
                    "Session {} of {} is lagging, dropping event for match {}",
                    session.id,
                    event.recipient_id,
                    event.match_id
                );
                true
            }
            Err(TrySendError::Closed(_)) => false,
        });

        if sessions.is_empty() {
            rooms.remove(&event.recipient_id);
        }

        delivered
    }
}

impl Default for SessionHub {
    fn default() -> Self {
        Self::new(32)
    }
}

impl NotificationPublisher for SessionHub {
    fn publish(&self, event: MatchEvent) {
        self.deliver(&event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contest::models::MatchStatus;
    use crate::notify::Outcome;

    fn event_for(recipient: &str) -> MatchEvent {
        MatchEvent {
            contest_id: "c".to_string(),
            match_id: "c-1-1".to_string(),
            round: 1,
            status: MatchStatus::Completed,
            outcome: Outcome::Won,
            recipient_id: recipient.to_string(),
            opponent_id: "bob".to_string(),
        }
    }

    #[tokio::test]
    async fn test_delivers_to_every_session() {
        let hub = SessionHub::new(4);
        let mut first = hub.subscribe("alice");
        let mut second = hub.subscribe("alice");
        assert_eq!(hub.session_count(), 2);

        assert_eq!(hub.deliver(&event_for("alice")), 2);
        assert_eq!(first.receiver.recv().await.unwrap().recipient_id, "alice");
        assert_eq!(second.receiver.recv().await.unwrap().recipient_id, "alice");
    }

    #[test]
    fn test_offline_recipient_misses_event() {
        let hub = SessionHub::new(4);
        assert_eq!(hub.deliver(&event_for("alice")), 0);
    }

    #[test]
    fn test_closed_sessions_are_pruned() {
        let hub = SessionHub::new(4);
        let sub = hub.subscribe("alice");
        drop(sub);

        assert_eq!(hub.deliver(&event_for("alice")), 0);
        assert!(!hub.is_connected("alice"));
        assert_eq!(hub.session_count(), 0);
    }

    #[test]
    fn test_full_session_drops_event() {
        let hub = SessionHub::new(1);
        let _sub = hub.subscribe("alice");

        assert_eq!(hub.deliver(&event_for("alice")), 1);
        assert_eq!(hub.deliver(&event_for("alice")), 0);
        assert!(hub.is_connected("alice"));
    }

    #[test]
    fn test_unsubscribe() {
        let hub = SessionHub::default();
        let sub = hub.subscribe("alice");
        hub.unsubscribe("alice", sub.id);
        assert!(!hub.is_connected("alice"));

        // Unknown ids are ignored
        hub.unsubscribe("alice", 999);
        hub.unsubscribe("nobody", 1);
    }
}
