mod common;

use std::sync::Arc;
use std::time::Duration;

use mockito::Server;

use common::{blog_page_html, passage, test_config, FakeProvider, FakeRetriever};
use recipe_analyzer::cache::{ManualClock, ResultCache};
use recipe_analyzer::model::InputKind;
use recipe_analyzer::Analyzer;

#[tokio::test]
async fn test_repeat_dish_query_is_served_from_cache() {
    let retriever = Arc::new(FakeRetriever::with_passages(vec![passage(
        "cookbook-1",
        "Tiramisu layers mascarpone cream and espresso-soaked savoiardi.",
        0.9,
        0,
    )]));
    let provider = Arc::new(FakeProvider::new());
    // Exactly one reply queued: a second model call would panic
    provider.push_ok("Tiramisu is a layered dessert.");

    let analyzer = Analyzer::with_components(test_config(), provider.clone(), retriever.clone());

    let first = analyzer.analyze("tiramisu").await;
    assert!(first.success);
    assert!(!first.cache_hit);

    // Whitespace differences normalize to the same cache key
    let second = analyzer.analyze("  tiramisu ").await;
    assert!(second.cache_hit);
    assert_eq!(retriever.call_count(), 1);
    assert_eq!(provider.call_count(), 1);

    // Identical to the first result apart from the cache-hit flag
    let mut replayed = second.clone();
    replayed.cache_hit = false;
    assert_eq!(replayed, first);

    let snap = analyzer.telemetry();
    assert_eq!(snap.cache_hits, 1);
    assert_eq!(snap.cache_misses, 1);
}

#[tokio::test]
async fn test_repeat_url_makes_no_second_fetch() {
    let mut server = Server::new_async().await;
    let page = server
        .mock("GET", "/blog")
        .with_status(200)
        .with_body(blog_page_html())
        .expect(1)
        .create_async()
        .await;

    let provider = Arc::new(FakeProvider::new());
    provider.push_ok(r#"{"is_recipe": false, "confidence": 0.85, "rationale": "a blog"}"#);
    let retriever = Arc::new(FakeRetriever::with_passages(Vec::new()));

    let analyzer = Analyzer::with_components(test_config(), provider.clone(), retriever);
    let url = format!("{}/blog", server.url());

    let first = analyzer.analyze(&url).await;
    assert!(first.success);

    let second = analyzer.analyze(&url).await;
    assert!(second.cache_hit);
    assert_eq!(provider.call_count(), 1);
    page.assert_async().await;
}

#[tokio::test]
async fn test_cached_entry_expires_after_ttl() {
    let clock = Arc::new(ManualClock::new());
    let cache = Arc::new(ResultCache::with_clock(clock.clone()));

    let retriever = Arc::new(FakeRetriever::with_passages(vec![passage(
        "cookbook-2",
        "Goulash is a paprika-rich beef stew.",
        0.9,
        0,
    )]));
    let provider = Arc::new(FakeProvider::new());
    provider.push_ok("Goulash is a beef stew.");
    provider.push_ok("Goulash is a beef stew.");

    let mut config = test_config();
    config.cache_ttl_secs = 120;

    let analyzer = Analyzer::with_cache(config, provider.clone(), retriever.clone(), cache);

    analyzer.analyze("goulash").await;
    assert_eq!(retriever.call_count(), 1);

    // Still inside the TTL window
    clock.advance(Duration::from_secs(119));
    let hit = analyzer.analyze("goulash").await;
    assert!(hit.cache_hit);
    assert_eq!(retriever.call_count(), 1);

    // Past the TTL the entry is recomputed
    clock.advance(Duration::from_secs(1));
    let recomputed = analyzer.analyze("goulash").await;
    assert!(!recomputed.cache_hit);
    assert_eq!(retriever.call_count(), 2);
    assert_eq!(provider.call_count(), 2);
}

#[tokio::test]
async fn test_failures_are_not_cached_by_default() {
    let retriever = Arc::new(FakeRetriever::failing());
    let provider = Arc::new(FakeProvider::new());

    let analyzer = Analyzer::with_components(test_config(), provider, retriever.clone());

    let first = analyzer.analyze("bibimbap").await;
    assert!(!first.success);

    let second = analyzer.analyze("bibimbap").await;
    assert!(!second.cache_hit);
    assert_eq!(retriever.call_count(), 2);
}

#[tokio::test]
async fn test_failure_caching_uses_the_shorter_ttl_when_enabled() {
    let clock = Arc::new(ManualClock::new());
    let cache = Arc::new(ResultCache::with_clock(clock.clone()));

    let retriever = Arc::new(FakeRetriever::failing());
    let provider = Arc::new(FakeProvider::new());

    let mut config = test_config();
    config.cache_failures = true;
    config.failure_ttl_secs = 60;

    let analyzer = Analyzer::with_cache(config, provider, retriever.clone(), cache);

    let first = analyzer.analyze("bibimbap").await;
    assert_eq!(first.error.unwrap().kind(), "RetrievalFailed");

    // The failure is replayed from cache instead of hammering the index
    let second = analyzer.analyze("bibimbap").await;
    assert!(second.cache_hit);
    assert!(!second.success);
    assert_eq!(retriever.call_count(), 1);

    // After the failure TTL the index gets another chance
    clock.advance(Duration::from_secs(60));
    let third = analyzer.analyze("bibimbap").await;
    assert!(!third.cache_hit);
    assert_eq!(retriever.call_count(), 2);
}

#[tokio::test]
async fn test_empty_input_fails_without_touching_collaborators() {
    let retriever = Arc::new(FakeRetriever::with_passages(Vec::new()));
    let provider = Arc::new(FakeProvider::new());

    let analyzer = Analyzer::with_components(test_config(), provider, retriever.clone());
    let result = analyzer.analyze("   ").await;

    assert!(!result.success);
    assert_eq!(result.kind, InputKind::DishName);
    assert_eq!(result.error.unwrap().kind(), "UnanalyzableContent");
    assert_eq!(retriever.call_count(), 0);
    // Nothing is cached for empty input
    assert_eq!(analyzer.cache().stats().total_entries, 0);
}
