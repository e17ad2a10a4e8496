//! End-to-end tests for the dedup gate and the optimistic sync engine
//!
//! Exercises the public API against the in-memory gateway: the pre-upload
//! existence gate, cache order preservation under single-field patches,
//! per-digest serialization with last-patch-wins, cross-digest independence,
//! and error surfacing without rollback.

use invoice_sync::prelude::*;
use std::sync::Arc;
use std::time::Duration;

fn record(bytes: &[u8], paid: bool) -> InvoiceRecord {
    InvoiceRecord {
        is_paid: paid,
        file_exists: true,
        ..InvoiceRecord::new(ContentHasher::hash_bytes(bytes))
    }
}

struct Harness {
    engine: Arc<OptimisticUpdateEngine>,
    flow: UploadFlow,
    gateway: Arc<InMemoryInvoiceGateway>,
    store: Arc<CacheStore>,
}

fn harness(records: Vec<InvoiceRecord>) -> Harness {
    let config = ClientConfig::default();
    let gateway = Arc::new(InMemoryInvoiceGateway::with_invoices(records.clone()));
    let store = Arc::new(CacheStore::new(config.event_capacity));
    store.replace_all(records);

    let engine = Arc::new(OptimisticUpdateEngine::new(store.clone(), gateway.clone()));
    let flow = UploadFlow::new(config, gateway.clone(), store.clone());
    Harness {
        engine,
        flow,
        gateway,
        store,
    }
}

// ---------------------------------------------------------------------------
// Pre-upload gate
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_digest_lets_the_upload_proceed() {
    let h = harness(vec![]);

    let ticket = h.flow.precheck("invoice.pdf", b"deadbeef").await.unwrap();
    assert!(matches!(ticket, UploadTicket::New { .. }));

    h.flow
        .submit(
            &ticket,
            UploadMetadata::default(),
            "invoice.pdf".into(),
            b"deadbeef".to_vec(),
        )
        .await
        .unwrap();
    assert_eq!(h.gateway.upload_count(), 1);
}

#[tokio::test]
async fn duplicate_is_refused_before_any_upload_call() {
    let h = harness(vec![record(b"deadbeef", false)]);

    let ticket = h.flow.precheck("invoice.pdf", b"deadbeef").await.unwrap();
    assert!(ticket.is_duplicate());

    let err = h
        .flow
        .submit(
            &ticket,
            UploadMetadata::default(),
            "invoice.pdf".into(),
            b"deadbeef".to_vec(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Conflict { .. }));
    // The upload POST was never issued.
    assert_eq!(h.gateway.upload_count(), 0);
}

#[tokio::test]
async fn repair_upload_hands_back_known_metadata() {
    let existing = InvoiceRecord {
        id: Some("INV-2024-009".to_string()),
        amount: Some(420.0),
        file_exists: false,
        ..InvoiceRecord::new(ContentHasher::hash_bytes(b"orphaned metadata"))
    };
    let h = harness(vec![existing.clone()]);

    let ticket = h
        .flow
        .precheck("invoice.pdf", b"orphaned metadata")
        .await
        .unwrap();
    assert!(matches!(ticket, UploadTicket::Repair { .. }));
    assert_eq!(ticket.existing(), Some(&existing));

    // The repair upload itself is allowed through.
    h.flow
        .submit(
            &ticket,
            UploadMetadata {
                id: existing.id.clone(),
                amount: existing.amount,
                ..UploadMetadata::default()
            },
            "invoice.pdf".into(),
            b"orphaned metadata".to_vec(),
        )
        .await
        .unwrap();
    assert_eq!(h.gateway.upload_count(), 1);
}

// ---------------------------------------------------------------------------
// Cache integrity under patches
// ---------------------------------------------------------------------------

#[tokio::test]
async fn patch_leaves_every_other_record_untouched() {
    let h = harness(vec![record(b"a", false), record(b"b", true)]);
    let digest_a = ContentHasher::hash_bytes(b"a");
    let digest_b = ContentHasher::hash_bytes(b"b");

    let before_b = h.store.read().get(&digest_b).cloned().unwrap();

    h.engine
        .apply(&digest_a, InvoicePatch::paid(true))
        .await
        .unwrap();

    let snapshot = h.store.read();
    assert!(snapshot.get(&digest_a).unwrap().is_paid);
    // "b" is field-for-field equal and keeps its position.
    assert_eq!(snapshot.get(&digest_b), Some(&before_b));
    assert_eq!(snapshot.position(&digest_a), Some(0));
    assert_eq!(snapshot.position(&digest_b), Some(1));
}

#[tokio::test]
async fn subscriber_sees_optimistic_write_before_settlement() {
    let h = harness(vec![record(b"a", false)]);
    let digest = ContentHasher::hash_bytes(b"a");
    h.gateway.set_update_delay(Duration::from_millis(100));

    let engine = h.engine.clone();
    let d = digest.clone();
    let task = tokio::spawn(async move { engine.apply(&d, InvoicePatch::paid(true)).await });

    tokio::time::sleep(Duration::from_millis(30)).await;
    // The cache already shows the new value while the remote call is pending.
    assert!(h.store.read().get(&digest).unwrap().is_paid);
    assert_eq!(h.gateway.update_count(), 0);

    task.await.unwrap().unwrap();
    assert_eq!(h.gateway.update_count(), 1);
}

// ---------------------------------------------------------------------------
// Per-key serialization
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rapid_toggles_settle_on_the_last_patch() {
    let h = harness(vec![record(b"a", false)]);
    let digest = ContentHasher::hash_bytes(b"a");
    h.gateway.set_update_delay(Duration::from_millis(50));

    let engine_a = h.engine.clone();
    let d_a = digest.clone();
    let first = tokio::spawn(async move { engine_a.apply(&d_a, InvoicePatch::paid(true)).await });

    // Issue the second toggle while the first is still in flight.
    tokio::time::sleep(Duration::from_millis(10)).await;
    let engine_b = h.engine.clone();
    let d_b = digest.clone();
    let second = tokio::spawn(async move { engine_b.apply(&d_b, InvoicePatch::paid(false)).await });

    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();

    // The last-issued patch is the final state; the first settlement did not
    // flip it back.
    assert!(!h.store.read().get(&digest).unwrap().is_paid);

    // Both patches were committed, in issue order, never overlapping.
    assert_eq!(
        h.gateway.update_log(),
        vec![
            (digest.clone(), FieldPatch::Paid(true)),
            (digest.clone(), FieldPatch::Paid(false)),
        ]
    );
    assert!(!h.gateway.overlap_detected());
}

#[tokio::test]
async fn many_queued_toggles_commit_in_issue_order() {
    let h = harness(vec![record(b"a", false)]);
    let digest = ContentHasher::hash_bytes(b"a");
    h.gateway.set_update_delay(Duration::from_millis(5));

    let mut tasks = Vec::new();
    for i in 0..6 {
        let engine = h.engine.clone();
        let d = digest.clone();
        tasks.push(tokio::spawn(async move {
            engine.apply(&d, InvoicePatch::paid(i % 2 == 0)).await
        }));
        // Stagger issuance so the queue order is deterministic.
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let log: Vec<FieldPatch> = h.gateway.update_log().into_iter().map(|(_, p)| p).collect();
    assert_eq!(
        log,
        vec![
            FieldPatch::Paid(true),
            FieldPatch::Paid(false),
            FieldPatch::Paid(true),
            FieldPatch::Paid(false),
            FieldPatch::Paid(true),
            FieldPatch::Paid(false),
        ]
    );
    assert!(!h.gateway.overlap_detected());
    // Last issued patch (i == 5, odd) is the final cached state.
    assert!(!h.store.read().get(&digest).unwrap().is_paid);
}

#[tokio::test]
async fn unrelated_digests_mutate_concurrently() {
    let h = harness(vec![record(b"a", false), record(b"b", false)]);
    let d1 = ContentHasher::hash_bytes(b"a");
    let d2 = ContentHasher::hash_bytes(b"b");
    h.gateway.set_update_delay(Duration::from_millis(60));

    let (r1, r2) = futures_util::future::join(
        h.engine.apply(&d1, InvoicePatch::paid(true)),
        h.engine.apply(&d2, InvoicePatch::reviewed(true)),
    )
    .await;
    r1.unwrap();
    r2.unwrap();

    // Both calls were in flight at the same time: neither blocked the other.
    assert_eq!(h.gateway.peak_concurrency(), 2);
    assert!(!h.gateway.overlap_detected());

    let snapshot = h.store.read();
    assert!(snapshot.get(&d1).unwrap().is_paid);
    assert!(snapshot.get(&d2).unwrap().is_reviewed);
}

// ---------------------------------------------------------------------------
// Failure handling
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failed_settlement_surfaces_error_and_keeps_optimistic_value() {
    let h = harness(vec![record(b"a", false)]);
    let digest = ContentHasher::hash_bytes(b"a");
    h.gateway.fail_next_update();

    let err = h
        .engine
        .apply(&digest, InvoicePatch::paid(true))
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Server { status: 500, .. }));
    // The engine did not revert the optimistic write.
    assert!(h.store.read().get(&digest).unwrap().is_paid);

    // The key is Idle again: a corrective re-mutation from the caller works.
    h.engine
        .apply(&digest, InvoicePatch::paid(false))
        .await
        .unwrap();
    assert!(!h.store.read().get(&digest).unwrap().is_paid);
}

#[tokio::test]
async fn refresh_is_the_only_removal_path() {
    let h = harness(vec![record(b"a", false), record(b"b", false)]);

    // A patch never removes records, even for digests the gateway dropped.
    h.engine
        .apply(&ContentHasher::hash_bytes(b"a"), InvoicePatch::paid(true))
        .await
        .unwrap();
    assert_eq!(h.store.read().len(), 2);

    let count = h.engine.refresh().await.unwrap();
    assert_eq!(count, 2);
}
