//! Who is looking at what. Informational only: presence never gates or
//! orders writes.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PresenceEvent {
    Joined { entity_id: String, user: String },
    Left { entity_id: String, user: String },
}

#[derive(Default)]
struct Board {
    viewers: HashMap<String, BTreeSet<String>>,
    subscribers: Vec<Sender<PresenceEvent>>,
}

/// Cheap to clone; clones share one board.
#[derive(Clone, Default)]
pub struct PresenceBoard {
    inner: Arc<Mutex<Board>>,
}

impl PresenceBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if `user` was already viewing `entity_id`.
    pub fn join(&self, entity_id: &str, user: &str) -> bool {
        let mut board = self.lock();
        let added = board
            .viewers
            .entry(entity_id.to_string())
            .or_default()
            .insert(user.to_string());
        if added {
            broadcast(
                &mut board,
                PresenceEvent::Joined {
                    entity_id: entity_id.to_string(),
                    user: user.to_string(),
                },
            );
        }
        added
    }

    pub fn leave(&self, entity_id: &str, user: &str) -> bool {
        let mut board = self.lock();
        let removed = match board.viewers.get_mut(entity_id) {
            Some(set) => {
                let removed = set.remove(user);
                if set.is_empty() {
                    board.viewers.remove(entity_id);
                }
                removed
            }
            None => false,
        };
        if removed {
            broadcast(
                &mut board,
                PresenceEvent::Left {
                    entity_id: entity_id.to_string(),
                    user: user.to_string(),
                },
            );
        }
        removed
    }

    /// Sorted user names.
    pub fn viewers(&self, entity_id: &str) -> Vec<String> {
        self.lock()
            .viewers
            .get(entity_id)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Receive every later join/leave. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> Receiver<PresenceEvent> {
        let (tx, rx) = channel();
        self.lock().subscribers.push(tx);
        rx
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Board> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn broadcast(board: &mut Board, event: PresenceEvent) {
    board
        .subscribers
        .retain(|tx| tx.send(event.clone()).is_ok());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_and_leave_are_broadcast_once() {
        let board = PresenceBoard::new();
        let rx = board.subscribe();

        assert!(board.join("wo-1", "ana"));
        assert!(!board.join("wo-1", "ana"));
        assert!(board.join("wo-1", "ben"));
        assert_eq!(board.viewers("wo-1"), vec!["ana", "ben"]);

        assert!(board.leave("wo-1", "ana"));
        assert!(!board.leave("wo-1", "ana"));

        let events: Vec<PresenceEvent> = rx.try_iter().collect();
        assert_eq!(events.len(), 3);
        assert_eq!(
            events[2],
            PresenceEvent::Left {
                entity_id: "wo-1".into(),
                user: "ana".into()
            }
        );
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let board = PresenceBoard::new();
        drop(board.subscribe());
        board.join("item-9", "cy");
        assert!(board.lock().subscribers.is_empty());
    }
}
