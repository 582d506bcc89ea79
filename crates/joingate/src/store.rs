//! Pending verification store.
//!
//! A sharded map from user to open verification record. Every operation on a
//! key is linearizable with every other operation on the same key; operations
//! on different keys only contend when they hash to the same shard, and never
//! across an `.await`.

use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use crate::core::{PendingVerification, UserId};

#[derive(Debug, Default)]
pub struct PendingStore {
    pending: DashMap<UserId, PendingVerification>,
}

impl PendingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the record for `user_id`.
    ///
    /// Returns the record that was displaced, if any.
    pub fn put(&self, user_id: UserId, record: PendingVerification) -> Option<PendingVerification> {
        let request_id = record.request_id;
        let displaced = self.pending.insert(user_id, record);
        debug!(
            user_id = %user_id,
            request_id = %request_id,
            overwrote = displaced.is_some(),
            "Stored pending verification"
        );
        displaced
    }

    /// Atomically remove and return the record for `user_id`.
    ///
    /// Of any number of concurrent `take`s for the same user, at most one
    /// gets the record.
    pub fn take(&self, user_id: UserId) -> Option<PendingVerification> {
        self.pending.remove(&user_id).map(|(_, record)| record)
    }

    /// Remove the record for `user_id` only if it is the one issued for
    /// `request_id`.
    pub fn take_if_request(&self, user_id: UserId, request_id: Uuid) -> Option<PendingVerification> {
        self.pending
            .remove_if(&user_id, |_, record| record.request_id == request_id)
            .map(|(_, record)| record)
    }

    /// A copy of the record for `user_id`, leaving it in place.
    pub fn peek(&self, user_id: UserId) -> Option<PendingVerification> {
        self.pending.get(&user_id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, user_id: UserId) -> bool {
        self.pending.contains_key(&user_id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Applicant, ChatId};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn record(user: i64, title: &str) -> PendingVerification {
        PendingVerification::new(Applicant::new(UserId(user), "Ada"), ChatId(-100), title)
    }

    #[test]
    fn put_then_peek_then_take() {
        let store = PendingStore::new();
        assert!(store.put(UserId(42), record(42, "Acme")).is_none());

        assert_eq!(store.peek(UserId(42)).unwrap().group_title, "Acme");
        assert_eq!(store.len(), 1);

        assert_eq!(store.take(UserId(42)).unwrap().group_title, "Acme");
        assert!(store.take(UserId(42)).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn put_overwrites_and_returns_displaced_record() {
        let store = PendingStore::new();
        store.put(UserId(42), record(42, "Acme"));
        let displaced = store.put(UserId(42), record(42, "Globex")).unwrap();

        assert_eq!(displaced.group_title, "Acme");
        assert_eq!(store.peek(UserId(42)).unwrap().group_title, "Globex");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn take_if_request_leaves_newer_records_alone() {
        let store = PendingStore::new();
        let first = record(42, "Acme");
        let stale_id = first.request_id;
        store.put(UserId(42), first);
        store.put(UserId(42), record(42, "Globex"));

        assert!(store.take_if_request(UserId(42), stale_id).is_none());
        assert!(store.contains(UserId(42)));

        let current_id = store.peek(UserId(42)).unwrap().request_id;
        assert!(store.take_if_request(UserId(42), current_id).is_some());
        assert!(store.is_empty());
    }

    #[test]
    fn absence_is_empty_not_an_error() {
        let store = PendingStore::new();
        assert!(store.peek(UserId(7)).is_none());
        assert!(store.take(UserId(7)).is_none());
        assert!(store.take_if_request(UserId(7), Uuid::new_v4()).is_none());
    }

    #[test]
    fn concurrent_takes_have_a_single_winner() {
        for _ in 0..50 {
            let store = Arc::new(PendingStore::new());
            store.put(UserId(42), record(42, "Acme"));
            let winners = Arc::new(AtomicUsize::new(0));

            let threads: Vec<_> = (0..8)
                .map(|_| {
                    let store = Arc::clone(&store);
                    let winners = Arc::clone(&winners);
                    std::thread::spawn(move || {
                        if store.take(UserId(42)).is_some() {
                            winners.fetch_add(1, Ordering::SeqCst);
                        }
                    })
                })
                .collect();
            for thread in threads {
                thread.join().unwrap();
            }

            assert_eq!(winners.load(Ordering::SeqCst), 1);
        }
    }
}
