use std::time::Duration;

use snipnote_core::fetch::AttemptOutcome;
use snipnote_core::*;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header, method, path, path_regex},
};

fn fixture(name: &str) -> String {
    std::fs::read_to_string(format!("../../tests/fixtures/{}", name)).unwrap()
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_bytes(body.as_bytes())
        .insert_header("Content-Type", "text/html; charset=utf-8")
}

fn fast_config(server: &MockServer) -> FetchConfig {
    FetchConfig {
        timeout: 5,
        backoff_base: Duration::ZERO,
        archive_url_template: format!("{}/archive/{{url}}", server.uri()),
        ..Default::default()
    }
}

/// Rules keyed to the mock server's host.
fn rules(extra: &str) -> RuleIndex {
    RuleIndex::from_json_str(&format!(
        r#"[{{"name": "local", "domains": ["127.0.0.1"], "primary_patterns": ["<article\\b[^>]*>"]{}}}]"#,
        extra
    ))
    .unwrap()
}

fn extractor(server: &MockServer, rules: RuleIndex, credentials: StaticCredentials) -> ArticleExtractor {
    ArticleExtractor::builder()
        .rules(rules)
        .fetch_config(fast_config(server))
        .credentials(credentials)
        .cookies(CookieStore::default())
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_extract_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/post"))
        .respond_with(html(&fixture("plain_article.html")))
        .mount(&mock_server)
        .await;

    let url = format!("{}/post", mock_server.uri());
    let result = extractor(&mock_server, rules(""), StaticCredentials::new()).extract(&url).await.unwrap();

    assert_eq!(result.title, "Understanding Ownership");
    assert!(result.markdown.contains("Ownership is a set of rules"));
    assert_eq!(result.source_url, url);
    assert_eq!(result.final_url, url);
    assert_eq!(result.images, vec![format!("{}/images/diagram.png", mock_server.uri())]);
}

#[tokio::test]
async fn test_blocked_status_retries_with_next_profile() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/guarded"))
        .respond_with(ResponseTemplate::new(403))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/guarded"))
        .respond_with(html("<html><body><article><p>Second try worked.</p></article></body></html>"))
        .mount(&mock_server)
        .await;

    let url = format!("{}/guarded", mock_server.uri());
    let result = extractor(&mock_server, rules(""), StaticCredentials::new()).extract(&url).await.unwrap();

    assert_eq!(result.markdown, "Second try worked.");
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_timeout_retries_with_next_profile() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(html("<article><p>slow first.</p></article>").set_delay(Duration::from_secs(3)))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(html("<article><p>fast second.</p></article>"))
        .mount(&mock_server)
        .await;

    let extractor = ArticleExtractor::builder()
        .rules(rules(""))
        .fetch_config(FetchConfig { timeout: 1, ..fast_config(&mock_server) })
        .credentials(StaticCredentials::new())
        .build()
        .unwrap();

    let url = format!("{}/slow", mock_server.uri());
    let result = extractor.extract(&url).await.unwrap();

    assert_eq!(result.markdown, "fast second.");
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let url = format!("{}/missing", mock_server.uri());
    let err = extractor(&mock_server, rules(""), StaticCredentials::new()).extract(&url).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Fetch);
    match err {
        ExtractionError::Fetch(FetchError::Http { status }) => assert_eq!(status.as_u16(), 404),
        other => panic!("Expected HTTP 404 error, got {:?}", other),
    }
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_all_profiles_exhausted() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let url = format!("{}/down", mock_server.uri());
    let err = extractor(&mock_server, rules(""), StaticCredentials::new()).extract(&url).await.unwrap_err();

    match err {
        ExtractionError::Fetch(fetch_error @ FetchError::Exhausted { .. }) => {
            let attempts = fetch_error.attempts();
            assert_eq!(attempts.len(), 2);
            assert_eq!(attempts[0].profile, "desktop");
            assert_eq!(attempts[1].profile, "mobile");
            assert!(matches!(attempts[1].outcome, AttemptOutcome::Status(s) if s.as_u16() == 503));
        }
        other => panic!("Expected exhausted fetch error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_paywall_falls_back_to_archive() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/story"))
        .respond_with(html(&fixture("paywalled.html")))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex("^/archive/"))
        .respond_with(html(&fixture("archived.html")))
        .mount(&mock_server)
        .await;

    let rules = rules(r#", "paywall_prone": true, "paywall_markers": ["Subscribe to continue"]"#);
    let url = format!("{}/story", mock_server.uri());
    let result = extractor(&mock_server, rules, StaticCredentials::new()).extract(&url).await.unwrap();

    assert_eq!(result.source_url, url);
    assert_ne!(result.final_url, result.source_url);
    assert!(result.final_url.contains("/archive/"));
    assert!(result.markdown.contains("Analysts expect volatility"));
    assert!(!result.markdown.contains("archive toolbar"));
}

#[tokio::test]
async fn test_paywall_without_fallback_rule() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/story"))
        .respond_with(html(&fixture("paywalled.html")))
        .mount(&mock_server)
        .await;

    let rules = rules(r#", "paywall_markers": ["subscribe to continue"]"#);
    let url = format!("{}/story", mock_server.uri());
    let err = extractor(&mock_server, rules, StaticCredentials::new()).extract(&url).await.unwrap_err();

    assert!(matches!(err, ExtractionError::Fetch(FetchError::Paywalled { .. })));
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_archive_bot_check_fails_fallback() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/story"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex("^/archive/"))
        .respond_with(html(&fixture("bot_check.html")))
        .mount(&mock_server)
        .await;

    let rules = rules(r#", "paywall_prone": true"#);
    let url = format!("{}/story", mock_server.uri());
    let err = extractor(&mock_server, rules, StaticCredentials::new()).extract(&url).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::PaywallFallbackFailed);
    assert_eq!(err.kind().as_str(), "PaywallFallbackFailed");
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_rule_headers_and_cookie_env() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/members"))
        .and(header("x-api-key", "k-123"))
        .and(header("cookie", "session=abc"))
        .respond_with(html("<article><p>Members only text.</p></article>"))
        .mount(&mock_server)
        .await;

    let rules = rules(r#", "request_headers": {"X-Api-Key": {"env": "SITE_KEY"}}, "cookie_env_var": "SITE_COOKIE""#);
    let credentials = StaticCredentials::new().with("SITE_KEY", "k-123").with("SITE_COOKIE", "session=abc");
    let url = format!("{}/members", mock_server.uri());
    let result = extractor(&mock_server, rules, credentials).extract(&url).await.unwrap();

    assert_eq!(result.markdown, "Members only text.");
}

#[tokio::test]
async fn test_non_html_content_type_is_rejected() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes("{}".as_bytes())
                .insert_header("Content-Type", "application/json"),
        )
        .mount(&mock_server)
        .await;

    let url = format!("{}/data.json", mock_server.uri());
    let err = extractor(&mock_server, rules(""), StaticCredentials::new()).extract(&url).await.unwrap_err();
    assert!(matches!(err, ExtractionError::Fetch(FetchError::UnsupportedContentType(_))));
}

#[tokio::test]
async fn test_legacy_charset_is_decoded() {
    let mock_server = MockServer::start().await;

    let mut body = b"<html><body><article><p>Caf".to_vec();
    body.push(0xe9);
    body.extend_from_slice(b" au lait.</p></article></body></html>");

    Mock::given(method("GET"))
        .and(path("/latin1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(body)
                .insert_header("Content-Type", "text/html; charset=ISO-8859-1"),
        )
        .mount(&mock_server)
        .await;

    let url = format!("{}/latin1", mock_server.uri());
    let result = extractor(&mock_server, rules(""), StaticCredentials::new()).extract(&url).await.unwrap();
    assert_eq!(result.markdown, "Café au lait.");
}
