//! Integration tests for the deadline-bound path finder.

mod common;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use common::GraphSource;
use huginn::{HuginnError, PathFinder};

const DEADLINE: Duration = Duration::from_secs(30);

fn finder(source: &Arc<GraphSource>) -> PathFinder {
    PathFinder::new(source.clone())
}

#[tokio::test]
async fn direct_link_takes_one_layer() {
    let source = Arc::new(GraphSource::new().link("Start", &["Other", "Target"]));
    let path = finder(&source).search("Start", "Target", DEADLINE).await.unwrap();
    assert_eq!(path, vec!["Start", "Target"]);
    assert_eq!(source.link_fetch_count(), 1);
}

#[tokio::test]
async fn equal_length_paths_pick_smallest_first_hop() {
    let source = Arc::new(
        GraphSource::new()
            .link("Start", &["C", "B"])
            .link("B", &["Target"])
            .link("C", &["Target"]),
    );
    let path = finder(&source).search("Start", "Target", DEADLINE).await.unwrap();
    assert_eq!(path, vec!["Start", "B", "Target"]);
}

#[tokio::test]
async fn tie_break_continues_past_first_hop() {
    let source = Arc::new(
        GraphSource::new()
            .link("Start", &["B"])
            .link("B", &["Y", "X"])
            .link("X", &["Target"])
            .link("Y", &["Target"]),
    );
    let path = finder(&source).search("Start", "Target", DEADLINE).await.unwrap();
    assert_eq!(path, vec!["Start", "B", "X", "Target"]);
}

#[tokio::test]
async fn shared_node_keeps_smallest_prefix() {
    let source = Arc::new(
        GraphSource::new()
            .link("Start", &["C", "B"])
            .link("B", &["X"])
            .link("C", &["X"])
            .link("X", &["Target"]),
    );
    let path = finder(&source).search("Start", "Target", DEADLINE).await.unwrap();
    assert_eq!(path, vec!["Start", "B", "X", "Target"]);
}

#[tokio::test]
async fn fewer_hops_beat_lexicographic_order() {
    let source = Arc::new(
        GraphSource::new()
            .link("S", &["A", "Z"])
            .link("A", &["A2"])
            .link("A2", &["T"])
            .link("Z", &["T"]),
    );
    let path = finder(&source).search("S", "T", DEADLINE).await.unwrap();
    assert_eq!(path, vec!["S", "Z", "T"]);
    // Layer three is never expanded.
    assert!(!source.fetched_nodes().contains(&"A2".to_string()));
}

#[tokio::test]
async fn cycles_do_not_re_expand_nodes() {
    let source = Arc::new(
        GraphSource::new()
            .link("S", &["A"])
            .link("A", &["S", "B", "A"])
            .link("B", &["A", "S", "C"])
            .link("C", &["T"]),
    );
    let path = finder(&source).search("S", "T", DEADLINE).await.unwrap();
    assert_eq!(path, vec!["S", "A", "B", "C", "T"]);

    let fetched = source.fetched_nodes();
    let unique: HashSet<_> = fetched.iter().collect();
    assert_eq!(fetched.len(), unique.len(), "re-expanded a node: {fetched:?}");
}

#[tokio::test]
async fn start_equal_to_target() {
    let source = Arc::new(GraphSource::new());
    let path = finder(&source).search("Same", "Same", DEADLINE).await.unwrap();
    assert_eq!(path, vec!["Same"]);
    assert_eq!(source.link_fetch_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn slow_source_times_out() {
    let source = Arc::new(
        GraphSource::new()
            .link("Start", &["Target"])
            .latency(Duration::from_secs(5)),
    );
    let result = finder(&source)
        .search("Start", "Target", Duration::from_secs(1))
        .await;
    assert!(matches!(result, Err(HuginnError::Timeout)));
}

#[tokio::test(start_paused = true)]
async fn exhausted_graph_reports_timeout_without_waiting() {
    let source = Arc::new(GraphSource::new().link("Start", &["A"]).link("A", &["B"]));
    let began = tokio::time::Instant::now();
    let result = finder(&source)
        .search("Start", "Nowhere", Duration::from_secs(600))
        .await;
    assert!(matches!(result, Err(HuginnError::Timeout)));
    assert!(began.elapsed() < Duration::from_secs(600));
    assert_eq!(source.link_fetch_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn cancelled_search_starts_no_new_fetches() {
    let source = Arc::new(
        GraphSource::new()
            .link("Start", &["A", "B", "C", "D", "E"])
            .latency(Duration::from_secs(1)),
    );
    let result = finder(&source)
        .max_concurrent_fetches(1)
        .search("Start", "Target", Duration::from_millis(1_500))
        .await;
    assert!(matches!(result, Err(HuginnError::Timeout)));

    // Let the in-flight fetch finish and any queued tasks observe the flag.
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(source.link_fetch_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn dropped_search_starts_no_new_fetches() {
    let source = Arc::new(
        GraphSource::new()
            .link("Start", &["A", "B", "C", "D", "E"])
            .latency(Duration::from_secs(1)),
    );
    let single = finder(&source).max_concurrent_fetches(1);
    // An outer timeout shorter than the search deadline drops the search.
    let outer = tokio::time::timeout(
        Duration::from_millis(1_500),
        single.search("Start", "Target", Duration::from_secs(30)),
    )
    .await;
    assert!(outer.is_err());

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(source.link_fetch_count(), 2);
}

#[tokio::test]
async fn upstream_failure_propagates() {
    let source = Arc::new(
        GraphSource::new()
            .link("Start", &["Broken"])
            .failing("Broken"),
    );
    let result = finder(&source).search("Start", "Target", DEADLINE).await;
    assert!(matches!(result, Err(HuginnError::UpstreamUnavailable(_))));
}

#[tokio::test]
async fn wide_layer_with_bounded_concurrency() {
    let hubs: Vec<String> = (0..50).map(|i| format!("N{i:02}")).collect();
    let hub_refs: Vec<&str> = hubs.iter().map(String::as_str).collect();
    let mut graph = GraphSource::new().link("Start", &hub_refs);
    for hub in ["N07", "N31", "N44"] {
        graph = graph.link(hub, &["Target"]);
    }
    let source = Arc::new(graph);
    let path = finder(&source)
        .max_concurrent_fetches(3)
        .search("Start", "Target", DEADLINE)
        .await
        .unwrap();
    assert_eq!(path, vec!["Start", "N07", "Target"]);
    assert_eq!(source.link_fetch_count(), 51);
}
