//! History pagination: exact page arithmetic, exhaustion detection, and
//! overlap prevention against a scripted backing list.

mod common;

use std::collections::HashSet;
use std::sync::atomic::Ordering;
use std::time::Duration;

use pretty_assertions::assert_eq;

use common::{harness, history, ScriptedBackend};
use policychat::chat::{Paginator, PAGE_SIZE};
use policychat::ids::ConversationId;
use policychat::sync::Connectivity;

// A 45-message history with page size 20 pages out as 20, 20, 5 with no
// duplicates, then reports exhaustion.
#[tokio::test]
async fn test_three_pages_then_exhausted() {
    let backend = ScriptedBackend::new();
    let conv = ConversationId::random();
    backend.seed_messages(&conv, history(&conv, 45));

    let mut paginator = Paginator::new();
    let mut collected = Vec::new();
    let mut page_sizes = Vec::new();
    while paginator.has_more() {
        let page = paginator.load_more(&backend, &conv).await.unwrap();
        page_sizes.push(page.len());
        collected.extend(page);
    }

    assert_eq!(page_sizes, vec![20, 20, 5]);
    assert!(!paginator.has_more());
    // Further calls are no-ops with no network traffic.
    let calls_before = backend.page_calls.load(Ordering::SeqCst);
    assert!(paginator.load_more(&backend, &conv).await.unwrap().is_empty());
    assert_eq!(backend.page_calls.load(Ordering::SeqCst), calls_before);

    // Each backing message appears exactly once, in order.
    let expected = history(&conv, 45);
    let expected_contents: Vec<_> = expected.iter().map(|m| m.content.clone()).collect();
    let collected_contents: Vec<_> = collected.iter().map(|m| m.content.clone()).collect();
    assert_eq!(collected_contents, expected_contents);
    let ids: HashSet<_> = collected.iter().map(|m| m.id).collect();
    assert_eq!(ids.len(), collected.len());
}

// For any backing size, loads terminate after ceil(M / P) pages and yield
// every message exactly once.
#[tokio::test]
async fn test_termination_after_exact_page_count() {
    for total in [0usize, 1, PAGE_SIZE - 1, PAGE_SIZE, PAGE_SIZE + 1, 3 * PAGE_SIZE] {
        let backend = ScriptedBackend::new();
        let conv = ConversationId::random();
        backend.seed_messages(&conv, history(&conv, total));

        let mut paginator = Paginator::new();
        let mut loads = 0usize;
        let mut collected = 0usize;
        while paginator.has_more() {
            let page = paginator.load_more(&backend, &conv).await.unwrap();
            collected += page.len();
            loads += 1;
            // A full final page costs one extra (empty) confirmation load.
            assert!(loads <= total / PAGE_SIZE + 1, "runaway pagination at {total}");
        }

        assert_eq!(collected, total, "lost or duplicated messages at {total}");
    }
}

// A failed page load does not consume the page; the retry fetches the same
// range.
#[tokio::test]
async fn test_failed_page_is_retried_at_same_offset() {
    let backend = ScriptedBackend::new();
    let conv = ConversationId::random();
    backend.seed_messages(&conv, history(&conv, 25));

    let mut paginator = Paginator::new();
    let first = paginator.load_more(&backend, &conv).await.unwrap();
    assert_eq!(first.len(), 20);

    backend.fail_fetch.store(true, Ordering::SeqCst);
    assert!(paginator.load_more(&backend, &conv).await.is_err());

    backend.fail_fetch.store(false, Ordering::SeqCst);
    let retried = paginator.load_more(&backend, &conv).await.unwrap();
    assert_eq!(retried.len(), 5);
    // The retried page starts right after the first page.
    assert_eq!(retried[0].content, "answer 20");
}

// Through the view model: selection loads the first page, load_more appends
// the rest, and the walk terminates with every message shown exactly once.
#[tokio::test]
async fn test_view_model_pages_history_in() {
    let h = harness(Connectivity::Online).await;
    let conv = ConversationId::random();
    h.backend.seed_messages(&conv, history(&conv, 45));

    h.chat.select_conversation(conv.clone()).await;
    assert_eq!(h.chat.messages().await.len(), 20);
    assert!(h.chat.has_more_history().await);

    assert_eq!(h.chat.load_more_messages().await.unwrap(), 20);
    assert_eq!(h.chat.load_more_messages().await.unwrap(), 5);
    assert!(!h.chat.has_more_history().await);
    assert_eq!(h.chat.load_more_messages().await.unwrap(), 0);

    let shown = h.chat.messages().await;
    assert_eq!(shown.len(), 45);
    let ids: HashSet<_> = shown.iter().map(|m| m.id).collect();
    assert_eq!(ids.len(), 45);
}

// Selecting a short conversation exhausts pagination immediately; no empty
// confirmation page is fetched.
#[tokio::test]
async fn test_short_initial_page_exhausts_immediately() {
    let h = harness(Connectivity::Online).await;
    let conv = ConversationId::random();
    h.backend.seed_messages(&conv, history(&conv, 7));

    h.chat.select_conversation(conv.clone()).await;
    assert_eq!(h.chat.messages().await.len(), 7);
    assert!(!h.chat.has_more_history().await);

    let calls = h.backend.page_calls.load(Ordering::SeqCst);
    assert_eq!(h.chat.load_more_messages().await.unwrap(), 0);
    assert_eq!(h.backend.page_calls.load(Ordering::SeqCst), calls);
}

// A page that arrives after the user switched conversations is dropped
// instead of being appended to the new selection.
#[tokio::test]
async fn test_late_page_for_previous_selection_is_dropped() {
    let h = harness(Connectivity::Online).await;
    let long = ConversationId::random();
    let short = ConversationId::random();
    h.backend.seed_messages(&long, history(&long, 45));
    h.backend.seed_messages(&short, history(&short, 2));

    h.chat.select_conversation(long.clone()).await;
    assert_eq!(h.chat.messages().await.len(), 20);

    h.backend.fetch_delay_ms.store(200, Ordering::SeqCst);
    let page_in = h.chat.load_more_messages();
    let switch = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        h.backend.fetch_delay_ms.store(0, Ordering::SeqCst);
        h.chat.select_conversation(short.clone()).await;
    };
    let (appended, ()) = tokio::join!(page_in, switch);

    assert_eq!(appended.unwrap(), 0);
    let shown = h.chat.messages().await;
    assert_eq!(shown.len(), 2);
    assert!(shown.iter().all(|m| m.conversation_id == short));
}
