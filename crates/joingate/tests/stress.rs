//! Randomised concurrent interleavings.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use joingate::{ChatId, EngineBuilder, UserId, VerificationOutcome};
use joingate_testing::fixtures::{contact_update, join_request_update, text_update};
use joingate_testing::RecordingOutbound;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_join_requests_never_create_two_records() -> Result<()> {
    for round in 0..20 {
        let outbound = RecordingOutbound::new();
        outbound.with_latency(Duration::from_micros(fastrand::u64(0..500)));
        let handle = EngineBuilder::new(outbound.clone()).build().start();

        let done = Arc::new(AtomicBool::new(false));
        let watcher = {
            let store = Arc::clone(handle.store());
            let done = Arc::clone(&done);
            tokio::spawn(async move {
                let mut max_seen = 0;
                while !done.load(Ordering::SeqCst) {
                    max_seen = max_seen.max(store.len());
                    tokio::task::yield_now().await;
                }
                max_seen
            })
        };

        let count = fastrand::usize(2..16);
        let updates: Vec<_> = (0..count)
            .map(|i| {
                let group = -1000 - fastrand::i64(0..5);
                join_request_update(round * 100 + i as i64, 42, group, &format!("Group{group}"))
            })
            .collect();

        let results = handle.emit_all(updates).await;
        done.store(true, Ordering::SeqCst);

        let mut prompted = Vec::new();
        for result in results {
            if let Some(routed) = result? {
                if let VerificationOutcome::Prompted { request_id, .. } = routed.outcome {
                    prompted.push(request_id);
                }
            }
        }

        assert_eq!(prompted.len(), count);
        assert!(watcher.await? <= 1);
        assert_eq!(handle.store().len(), 1);
        let survivor = handle.store().peek(UserId(42)).unwrap();
        assert!(prompted.contains(&survivor.request_id));
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_contact_shares_approve_exactly_once() -> Result<()> {
    for _ in 0..20 {
        let outbound = RecordingOutbound::new();
        outbound.with_latency(Duration::from_micros(fastrand::u64(0..300)));
        let handle = EngineBuilder::new(outbound.clone()).build().start();
        handle
            .emit_and_await(join_request_update(1, 42, -1001, "Acme"))
            .await?;

        let shares = (0..fastrand::usize(2..10))
            .map(|i| contact_update(10 + i as i64, 42, Some(42), "+15550100"));
        let results = handle.emit_all(shares).await;

        let mut approved = 0;
        for result in results {
            if let Some(routed) = result? {
                if matches!(routed.outcome, VerificationOutcome::Approved { .. }) {
                    approved += 1;
                }
            }
        }

        assert_eq!(approved, 1);
        assert_eq!(outbound.approvals().len(), 1);
        assert!(handle.store().is_empty());
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn interleaved_users_each_end_in_their_own_state() -> Result<()> {
    let outbound = RecordingOutbound::new();
    outbound.with_latency(Duration::from_micros(200));
    // Even users get through, odd users share someone else's contact.
    let handle = EngineBuilder::new(outbound.clone())
        .with_admin_chat(Some(ChatId(-500)))
        .build()
        .start();

    let users: Vec<i64> = (1..=24).collect();
    let joins = users
        .iter()
        .map(|&user| join_request_update(user, user, -1001, "Acme"));
    for result in handle.emit_all(joins).await {
        result?;
    }

    let mut followups = Vec::new();
    for &user in &users {
        let subject = if user % 2 == 0 { user } else { user + 1000 };
        followups.push(contact_update(100 + user, user, Some(subject), "+15550100"));
        followups.push(text_update(200 + user, user, "are we there yet"));
    }
    fastrand::shuffle(&mut followups);
    for result in handle.emit_all(followups).await {
        result?;
    }

    for &user in &users {
        let pending = handle.store().contains(UserId(user));
        assert_eq!(pending, user % 2 == 1, "user {user}");
    }
    assert_eq!(outbound.approvals().len(), users.len() / 2);
    assert_eq!(outbound.sent_to(ChatId(-500)).len(), users.len() / 2);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn one_users_updates_apply_in_emit_order() -> Result<()> {
    for round in 0..50 {
        let outbound = RecordingOutbound::new();
        outbound.with_latency(Duration::from_micros(fastrand::u64(0..300)));
        let handle = EngineBuilder::new(outbound.clone()).build().start();

        // No await between the two: the contact must still find the request.
        let join = handle.emit(join_request_update(round * 2, 42, -1001, "Acme"));
        let contact = handle.emit(contact_update(round * 2 + 1, 42, Some(42), "+15550100"));

        let joined = join.await?.expect("join request is routable");
        let shared = contact.await?.expect("contact is routable");

        assert!(matches!(joined.outcome, VerificationOutcome::Prompted { .. }));
        assert!(
            matches!(shared.outcome, VerificationOutcome::Approved { .. }),
            "round {round}: {:?}",
            shared.outcome
        );
        assert_eq!(outbound.approvals().len(), 1);
        assert!(handle.store().is_empty());
    }
    Ok(())
}
