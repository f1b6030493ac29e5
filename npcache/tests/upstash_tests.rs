//! Integration tests for the Upstash REST store and the tiered cache on top of it

use npcache::{CacheError, KvStore, ManualClock, RateLimiter, TieredCache, UpstashKv};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn store_for(server: &MockServer) -> UpstashKv {
    UpstashKv::new(server.uri(), "secret-token").unwrap()
}

#[tokio::test]
async fn test_get_sends_command_array_with_bearer() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/"))
        .and(header("authorization", "Bearer secret-token"))
        .and(body_json(json!(["GET", "greeting"])))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": "hello" })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = store_for(&mock_server);
    assert_eq!(store.get("greeting").await.unwrap().as_deref(), Some("hello"));
}

#[tokio::test]
async fn test_get_null_result_is_none() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": null })))
        .mount(&mock_server)
        .await;

    let store = store_for(&mock_server);
    assert_eq!(store.get("missing").await.unwrap(), None);
}

#[tokio::test]
async fn test_set_ex_and_counters() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_json(json!(["SET", "k", "v", "EX", "30"])))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": "OK" })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(body_json(json!(["INCR", "hits"])))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": 3 })))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(body_json(json!(["EXPIRE", "hits", "60"])))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": 1 })))
        .mount(&mock_server)
        .await;

    let store = store_for(&mock_server);
    store.set_ex("k", "v", 30).await.unwrap();
    assert_eq!(store.incr("hits").await.unwrap(), 3);
    assert!(store.expire("hits", 60).await.unwrap());
}

#[tokio::test]
async fn test_error_payload_is_reported() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({ "error": "ERR value is not an integer" })),
        )
        .mount(&mock_server)
        .await;

    let store = store_for(&mock_server);
    match store.incr("k").await {
        Err(CacheError::Remote(msg)) => assert!(msg.contains("not an integer")),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_tiered_cache_degrades_to_miss_when_remote_fails() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let clock = ManualClock::starting_now();
    let cache: TieredCache<String> = TieredCache::builder("np")
        .ttl_secs(10)
        .clock(Arc::new(clock))
        .remote(Arc::new(store_for(&mock_server)))
        .build();

    assert_eq!(cache.get("k").await, None);

    // L'écriture distante échoue mais le niveau local reste servi
    cache.put("k", "v".to_string()).await;
    assert_eq!(cache.get("k").await.as_deref(), Some("v"));
}

#[tokio::test]
async fn test_rate_limiter_sets_window_on_first_hit() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_json(json!(["INCR", "rl:1.2.3.4"])))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": 1 })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(body_json(json!(["EXPIRE", "rl:1.2.3.4", "60"])))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": 1 })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let limiter = RateLimiter::new(Arc::new(store_for(&mock_server)), "rl", 5, 60);
    assert!(!limiter.is_limited("1.2.3.4").await.unwrap());
}
