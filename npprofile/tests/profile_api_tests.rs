//! In-process tests of the profile endpoints against mocked Discord and GitHub APIs

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use npcache::{MemoryKv, RateLimiter, TieredCache};
use npprofile::{
    DiscordClient, DiscordSettings, DiscordState, GitHubClient, GitHubSettings, GitHubState,
    create_discord_router, create_github_router,
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DISCORD_ID: &str = "80351110224678912";

fn limiter(name: &str, max: u32) -> RateLimiter {
    RateLimiter::new(Arc::new(MemoryKv::new()), format!("test:{}", name), max, 60)
}

fn discord_router(server: &MockServer, token: Option<&str>, max: u32) -> axum::Router {
    let settings = DiscordSettings {
        user_id: Some(DISCORD_ID.into()),
        bot_token: token.map(String::from),
        api_base_url: format!("{}/api/v10", server.uri()),
        request_timeout: Duration::from_secs(2),
        ..Default::default()
    };
    let cache = TieredCache::builder("test:discord").ttl_secs(3600).build();
    let client = DiscordClient::new(settings, cache).unwrap();
    create_discord_router(DiscordState {
        client: Arc::new(client),
        limiter: limiter("discord", max),
        development: false,
    })
}

fn github_router(
    server: &MockServer,
    token: Option<&str>,
    limiter: Option<RateLimiter>,
) -> axum::Router {
    let settings = GitHubSettings {
        token: token.map(String::from),
        login: "octocat".into(),
        graphql_url: format!("{}/graphql", server.uri()),
        api_base_url: server.uri(),
        request_timeout: Duration::from_secs(2),
        ..Default::default()
    };
    let cache = TieredCache::builder("test:github").ttl_secs(3600).build();
    let client = GitHubClient::new(settings, cache).unwrap();
    create_github_router(GitHubState {
        client: Arc::new(client),
        limiter,
        development: false,
    })
}

async fn get(router: &axum::Router, ip: Option<&str>) -> (StatusCode, Value) {
    let mut request = Request::get("/");
    if let Some(ip) = ip {
        request = request.header("x-forwarded-for", ip);
    }
    let response = router
        .clone()
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap())
}

async fn mount_discord_user(server: &MockServer, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/api/v10/users/{}", DISCORD_ID)))
        .and(header("authorization", "Bot bot-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": DISCORD_ID,
            "username": "owner",
            "avatar": "8342729096ea3675442027381ff50dfe"
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

async fn mount_repositories(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(header("authorization", "Bearer gh-token"))
        .and(body_string_contains("\"login\":\"octocat\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "user": {
                    "repositories": {
                        "nodes": [
                            {
                                "id": "R_1",
                                "name": "site",
                                "description": "Personal site",
                                "url": "https://github.com/octocat/site",
                                "homepageUrl": null,
                                "primaryLanguage": { "name": "TypeScript" },
                                "languages": { "nodes": [{ "name": "TypeScript" }, { "name": "CSS" }] }
                            },
                            {
                                "id": "R_2",
                                "name": "tool",
                                "description": null,
                                "url": "https://github.com/octocat/tool",
                                "homepageUrl": "https://tool.example.org",
                                "primaryLanguage": { "name": "Rust" },
                                "languages": { "nodes": [{ "name": "Rust" }] }
                            },
                            {
                                "id": "R_3",
                                "name": "notes",
                                "description": null,
                                "url": "https://github.com/octocat/notes",
                                "homepageUrl": "",
                                "primaryLanguage": null,
                                "languages": { "nodes": [] }
                            }
                        ]
                    }
                }
            }
        })))
        .expect(expected_calls)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/octocat/site/pages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "html_url": "https://octocat.github.io/site/",
            "status": "built"
        })))
        .mount(server)
        .await;
}

// ============ Discord ============

#[tokio::test]
async fn test_discord_avatar_is_cached() {
    let server = MockServer::start().await;
    mount_discord_user(&server, 1).await;
    let router = discord_router(&server, Some("bot-token"), 5);

    for _ in 0..2 {
        let (status, body) = get(&router, Some("203.0.113.7")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["profilePicUrl"],
            format!(
                "https://cdn.discordapp.com/avatars/{}/8342729096ea3675442027381ff50dfe?size=2048",
                DISCORD_ID
            )
        );
    }
}

#[tokio::test]
async fn test_discord_rate_limit_is_per_client() {
    let server = MockServer::start().await;
    mount_discord_user(&server, 1).await;
    let router = discord_router(&server, Some("bot-token"), 2);

    assert_eq!(get(&router, Some("198.51.100.1, 10.0.0.1")).await.0, StatusCode::OK);
    assert_eq!(get(&router, Some("198.51.100.1")).await.0, StatusCode::OK);

    let (status, body) = get(&router, Some("198.51.100.1, 10.0.0.2")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "Too many requests. Please try again later.");

    // Un autre client n'est pas concerné
    assert_eq!(get(&router, Some("198.51.100.2")).await.0, StatusCode::OK);
}

#[tokio::test]
async fn test_discord_failure_is_not_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/api/v10/users/{}", DISCORD_ID)))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;
    let router = discord_router(&server, Some("bot-token"), 5);

    for _ in 0..2 {
        let (status, body) = get(&router, None).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "Failed to fetch data from Discord");
        assert!(body.get("details").is_none());
    }
}

#[tokio::test]
async fn test_discord_without_token_is_a_server_error() {
    let server = MockServer::start().await;
    let router = discord_router(&server, None, 5);

    let (status, body) = get(&router, None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Discord is not configured");
}

// ============ GitHub ============

#[tokio::test]
async fn test_github_showcase_resolves_pages() {
    let server = MockServer::start().await;
    mount_repositories(&server, 1).await;
    let router = github_router(&server, Some("gh-token"), None);

    let (status, body) = get(&router, None).await;
    assert_eq!(status, StatusCode::OK);

    let repos = body.as_array().unwrap();
    assert_eq!(repos.len(), 3);

    assert_eq!(repos[0]["name"], "site");
    assert_eq!(repos[0]["primaryLanguage"], "TypeScript");
    assert_eq!(repos[0]["languages"], json!(["TypeScript", "CSS"]));
    assert_eq!(repos[0]["pages"]["status"], "BUILT");
    assert_eq!(repos[0]["homepageUrl"], "https://octocat.github.io/site/");

    assert_eq!(repos[1]["pages"]["status"], "CUSTOM");
    assert_eq!(repos[1]["pages"]["url"], "https://tool.example.org");

    assert!(repos[2]["pages"].is_null());
    assert!(repos[2]["homepageUrl"].is_null());

    // Deuxième appel servi par le cache
    let (status, again) = get(&router, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again, body);
}

#[tokio::test]
async fn test_github_limited_client_still_gets_cache() {
    let server = MockServer::start().await;
    mount_repositories(&server, 1).await;
    let router = github_router(&server, Some("gh-token"), Some(limiter("github", 1)));

    assert_eq!(get(&router, Some("192.0.2.1")).await.0, StatusCode::OK);

    let (status, body) = get(&router, Some("192.0.2.1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_github_limited_without_cache_is_429() {
    let server = MockServer::start().await;
    mount_repositories(&server, 0).await;
    let router = github_router(&server, Some("gh-token"), Some(limiter("github", 0)));

    let (status, body) = get(&router, Some("192.0.2.1")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "Too many requests. Please try again later.");
}

#[tokio::test]
async fn test_github_without_token_is_a_server_error() {
    let server = MockServer::start().await;
    mount_repositories(&server, 0).await;
    let router = github_router(&server, None, None);

    let (status, body) = get(&router, None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "GitHub is not configured");
}

#[tokio::test]
async fn test_github_graphql_errors_are_upstream_failures() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": null,
            "errors": [{ "message": "Could not resolve to a User with the login of 'octocat'." }]
        })))
        .expect(1)
        .mount(&server)
        .await;
    let router = github_router(&server, Some("gh-token"), None);

    let (status, body) = get(&router, None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "Failed to fetch data from GitHub");
}
