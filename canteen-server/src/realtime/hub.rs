//! In-process room router
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                  RoomHub                      │
//! │  rooms: RwLock<Room -> {session_id}>          │
//! │  sessions: DashMap<session_id, Sender>        │
//! └───────────────┬──────────────────────────────┘
//!                 │ try_send (never blocks)
//!     ┌───────────┼───────────┐
//!     ▼           ▼           ▼
//!  Session     Session     Session
//!  (mpsc rx)   (mpsc rx)   (mpsc rx)
//! ```
//!
//! Each session has its own bounded queue. A full queue drops the push
//! with a warning; sessions whose receiver is gone are pruned on push.

use dashmap::DashMap;
use parking_lot::RwLock;
use shared::message::{PushEvent, Room};
use shared::order::Actor;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::FanoutRouter;

/// Default per-session buffer
pub const DEFAULT_SESSION_BUFFER: usize = 64;

struct SessionEntry {
    identity: Actor,
    tx: mpsc::Sender<Arc<PushEvent>>,
}

/// Connected session (receiving end)
pub struct Session {
    pub id: u64,
    pub rx: mpsc::Receiver<Arc<PushEvent>>,
}

/// Room router, the in-process `FanoutRouter`
#[derive(Clone)]
pub struct RoomHub {
    inner: Arc<HubInner>,
}

struct HubInner {
    sessions: DashMap<u64, SessionEntry>,
    rooms: RwLock<HashMap<Room, HashSet<u64>>>,
    next_id: AtomicU64,
    buffer: usize,
}

impl RoomHub {
    pub fn new(buffer: usize) -> Self {
        Self {
            inner: Arc::new(HubInner {
                sessions: DashMap::new(),
                rooms: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                buffer: buffer.max(1),
            }),
        }
    }

    /// Rooms an identity joins by default
    pub fn rooms_for(actor: &Actor) -> Vec<Room> {
        match actor {
            Actor::User(id) => vec![Room::User(id.clone())],
            Actor::DeliveryStaff(id) => vec![Room::Delivery(id.clone())],
            Actor::Admin(_) => vec![Room::AdminPool],
            Actor::System => Vec::new(),
        }
    }

    /// Connect a new session and join the identity's rooms
    pub fn connect(&self, actor: &Actor) -> Session {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.inner.buffer);
        self.inner.sessions.insert(
            id,
            SessionEntry {
                identity: actor.clone(),
                tx,
            },
        );
        {
            let mut rooms = self.inner.rooms.write();
            for room in Self::rooms_for(actor) {
                rooms.entry(room).or_default().insert(id);
            }
        }
        tracing::debug!(session_id = id, identity = %actor, "Realtime session connected");
        Session { id, rx }
    }

    /// Join one more room; false when the session is unknown
    pub fn join(&self, session_id: u64, room: Room) -> bool {
        if !self.inner.sessions.contains_key(&session_id) {
            return false;
        }
        self.inner
            .rooms
            .write()
            .entry(room)
            .or_default()
            .insert(session_id);
        true
    }

    /// Disconnect a session and leave every room
    pub fn disconnect(&self, session_id: u64) {
        let removed = self.inner.sessions.remove(&session_id);
        let mut rooms = self.inner.rooms.write();
        rooms.retain(|_, members| {
            members.remove(&session_id);
            !members.is_empty()
        });
        if let Some((_, entry)) = removed {
            tracing::debug!(session_id, identity = %entry.identity, "Realtime session disconnected");
        }
    }

    pub fn room_size(&self, room: &Room) -> usize {
        self.inner.rooms.read().get(room).map_or(0, HashSet::len)
    }

    pub fn session_count(&self) -> usize {
        self.inner.sessions.len()
    }
}

impl Default for RoomHub {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_BUFFER)
    }
}

impl FanoutRouter for RoomHub {
    fn push(&self, room: &Room, event: Arc<PushEvent>) {
        let members: Vec<u64> = match self.inner.rooms.read().get(room) {
            Some(members) => members.iter().copied().collect(),
            None => return,
        };

        let mut closed = Vec::new();
        for session_id in members {
            let Some(entry) = self.inner.sessions.get(&session_id) else {
                continue;
            };
            match entry.tx.try_send(event.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(
                        session_id,
                        room = %room,
                        event = event.name(),
                        "Session buffer full, dropping push"
                    );
                }
                Err(TrySendError::Closed(_)) => closed.push(session_id),
            }
        }

        for session_id in closed {
            self.disconnect(session_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn broadcast(title: &str) -> Arc<PushEvent> {
        Arc::new(PushEvent::Broadcast {
            title: title.to_string(),
            message: "m".to_string(),
        })
    }

    #[tokio::test]
    async fn test_push_reaches_room_members_only() {
        let hub = RoomHub::new(8);
        let mut alice = hub.connect(&Actor::User("alice".into()));
        let mut bob = hub.connect(&Actor::User("bob".into()));
        let mut admin = hub.connect(&Actor::Admin("root".into()));

        hub.push_to_user("alice", broadcast("hi"));
        hub.push_to_admin_pool(broadcast("pool"));

        assert_eq!(alice.rx.recv().await.unwrap().name(), "broadcast");
        assert!(bob.rx.try_recv().is_err());
        match admin.rx.recv().await.unwrap().as_ref() {
            PushEvent::Broadcast { title, .. } => assert_eq!(title, "pool"),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_push_to_empty_room_is_noop() {
        let hub = RoomHub::default();
        hub.push_to_staff("nobody", broadcast("x"));
        assert_eq!(hub.room_size(&Room::Delivery("nobody".into())), 0);
    }

    #[test]
    fn test_full_buffer_drops_without_blocking() {
        let hub = RoomHub::new(1);
        let mut session = hub.connect(&Actor::DeliveryStaff("s1".into()));
        hub.push_to_staff("s1", broadcast("first"));
        hub.push_to_staff("s1", broadcast("second"));

        match session.rx.try_recv().unwrap().as_ref() {
            PushEvent::Broadcast { title, .. } => assert_eq!(title, "first"),
            other => panic!("unexpected event {:?}", other),
        }
        assert!(session.rx.try_recv().is_err());
        assert_eq!(hub.session_count(), 1);
    }

    #[test]
    fn test_closed_session_is_pruned() {
        let hub = RoomHub::new(4);
        let session = hub.connect(&Actor::User("u1".into()));
        drop(session);
        hub.push_to_user("u1", broadcast("gone"));
        assert_eq!(hub.session_count(), 0);
        assert_eq!(hub.room_size(&Room::User("u1".into())), 0);
    }

    #[test]
    fn test_join_and_disconnect() {
        let hub = RoomHub::new(4);
        let mut session = hub.connect(&Actor::Admin("a1".into()));
        assert!(hub.join(session.id, Room::User("u9".into())));
        assert!(!hub.join(999, Room::AdminPool));

        hub.push_to_user("u9", broadcast("watch"));
        assert!(session.rx.try_recv().is_ok());

        hub.disconnect(session.id);
        assert_eq!(hub.room_size(&Room::AdminPool), 0);
        assert_eq!(hub.room_size(&Room::User("u9".into())), 0);
    }

    #[test]
    fn test_system_actor_joins_nothing() {
        let hub = RoomHub::new(4);
        hub.connect(&Actor::System);
        assert_eq!(hub.session_count(), 1);
        assert_eq!(hub.room_size(&Room::AdminPool), 0);
    }
}
