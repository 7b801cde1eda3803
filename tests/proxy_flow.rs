//! End-to-end behavior against a mock upstream.

mod common;

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use common::{client, start_mock_upstream, start_proxy, test_config, MockReply};
use hn_proxy::http::HttpServer;

const PAGE: &str = r#"<html><head><title>Hacker News</title></head>
<body>
<a href="/item?id=1">comments</a>
<a href="{origin}/news">front</a>
<a href="https://example.com/x">elsewhere</a>
<form action="/login" method="post"><input name="acct"></form>
<p>Stories about Python and Golang.</p>
<script>var silent = "inside";</script>
</body></html>"#;

#[tokio::test]
async fn html_is_rewritten() {
    let upstream = start_mock_upstream(MockReply::html(PAGE)).await;

    let proxy = start_proxy(test_config(&upstream)).await;
    let response = client().get(proxy.url("/news")).send().await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "text/html; charset=utf-8");
    let body = response.text().await.unwrap();
    let base = proxy.base_url();

    assert!(body.contains(&format!(r#"href="{base}/item?id=1""#)), "{body}");
    assert!(body.contains(&format!(r#"href="{base}/news""#)), "{body}");
    assert!(body.contains(r#"href="https://example.com/x""#));
    assert!(body.contains(&format!(r#"action="{base}/login""#)));
    assert!(body.contains("Python™ and Golang™"));
    assert!(body.contains("<title>Hacker™ News</title>"));
    assert!(body.contains(r#"var silent = "inside";"#));

    let seen = upstream.requests();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].method, "GET");
    assert_eq!(seen[0].target, "/news");

    proxy.stop().await;
}

#[tokio::test]
async fn forwarded_proto_sets_link_scheme() {
    let upstream = start_mock_upstream(MockReply::html(r#"<a href="/newest">new</a>"#)).await;
    let proxy = start_proxy(test_config(&upstream)).await;

    let body = client()
        .get(proxy.url("/"))
        .header("x-forwarded-proto", "https")
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert!(
        body.contains(&format!(r#"href="https://{}/newest""#, proxy.addr)),
        "{body}"
    );
    proxy.stop().await;
}

#[tokio::test]
async fn public_url_overrides_request_host() {
    let upstream = start_mock_upstream(MockReply::html(r#"<a href="/newest">new</a>"#)).await;
    let mut config = test_config(&upstream);
    config.listener.public_url = Some("https://proxy.example.org".into());
    let proxy = start_proxy(config).await;

    let body = client().get(proxy.url("/")).send().await.unwrap().text().await.unwrap();
    assert!(body.contains(r#"href="https://proxy.example.org/newest""#), "{body}");
    proxy.stop().await;
}

#[tokio::test]
async fn binary_passes_through_untouched() {
    let png: Vec<u8> = vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0xff];
    let reply = MockReply::html("").content_type("image/png").body(png.clone());
    let upstream = start_mock_upstream(reply).await;
    let proxy = start_proxy(test_config(&upstream)).await;

    let response = client().get(proxy.url("/y18.png")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "image/png");
    assert_eq!(response.bytes().await.unwrap().as_ref(), png.as_slice());
    proxy.stop().await;
}

#[tokio::test]
async fn css_is_not_rewritten() {
    let css = "body { font-family: Verdana; } /* header styles */";
    let upstream = start_mock_upstream(MockReply::html(css).content_type("text/css")).await;
    let proxy = start_proxy(test_config(&upstream)).await;

    let body = client().get(proxy.url("/news.css")).send().await.unwrap().text().await.unwrap();
    assert_eq!(body, css);
    proxy.stop().await;
}

#[tokio::test]
async fn upstream_error_statuses_become_bad_gateway() {
    for status in [404u16, 500, 503] {
        let upstream = start_mock_upstream(MockReply::html("nope").status(status)).await;
        let proxy = start_proxy(test_config(&upstream)).await;

        let response = client().get(proxy.url("/item?id=0")).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY, "upstream {status}");
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["detail"], "Upstream error");
        proxy.stop().await;
    }
}

#[tokio::test]
async fn slow_upstream_times_out() {
    let upstream =
        start_mock_upstream(MockReply::html("<p>late</p>").delay(Duration::from_secs(3))).await;
    let mut config = test_config(&upstream);
    config.upstream.timeout_secs = 0.5;
    let proxy = start_proxy(config).await;

    let response = client().get(proxy.url("/slow")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["detail"], "Upstream timeout");
    proxy.stop().await;
}

#[tokio::test]
async fn unreachable_upstream_is_bad_gateway() {
    let upstream = start_mock_upstream(MockReply::html("")).await;
    let mut config = test_config(&upstream);
    // discard port, nothing listens there
    config.upstream.base_url = "http://127.0.0.1:9".into();
    let proxy = start_proxy(config).await;

    let response = client().get(proxy.url("/")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    proxy.stop().await;
}

#[tokio::test]
async fn oversized_upstream_response_is_rejected() {
    let upstream = start_mock_upstream(MockReply::html(&"x".repeat(4096))).await;
    let mut config = test_config(&upstream);
    config.limits.max_body_size = 1024;
    let proxy = start_proxy(config).await;

    let response = client().get(proxy.url("/big")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["detail"], "Response too large");
    proxy.stop().await;
}

#[tokio::test]
async fn post_forwards_body_and_content_type() {
    let upstream = start_mock_upstream(MockReply::html("<p>logged in</p>")).await;
    let proxy = start_proxy(test_config(&upstream)).await;

    let response = client()
        .post(proxy.url("/login?goto=news"))
        .header("content-type", "application/x-www-form-urlencoded")
        .body("acct=pg&pw=secret")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let seen = upstream.requests();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].method, "POST");
    assert_eq!(seen[0].target, "/login?goto=news");
    assert_eq!(seen[0].body, b"acct=pg&pw=secret");
    assert_eq!(
        seen[0].header("content-type"),
        Some("application/x-www-form-urlencoded")
    );
    proxy.stop().await;
}

#[tokio::test]
async fn oversized_post_never_reaches_upstream() {
    let upstream = start_mock_upstream(MockReply::html("ok")).await;
    let mut config = test_config(&upstream);
    config.limits.max_body_size = 64;
    let proxy = start_proxy(config).await;

    let response = client()
        .post(proxy.url("/comment"))
        .body(vec![b'a'; 1024])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(upstream.hits(), 0);
    proxy.stop().await;
}

#[tokio::test]
async fn other_methods_are_refused() {
    let upstream = start_mock_upstream(MockReply::html("ok")).await;
    let proxy = start_proxy(test_config(&upstream)).await;

    for method in [reqwest::Method::PUT, reqwest::Method::DELETE, reqwest::Method::PATCH] {
        let response = client()
            .request(method.clone(), proxy.url("/item?id=1"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED, "{method}");
        assert_eq!(response.headers()["allow"], "GET, POST");
    }
    assert_eq!(upstream.hits(), 0);
    proxy.stop().await;
}

#[tokio::test]
async fn long_path_is_rejected() {
    let upstream = start_mock_upstream(MockReply::html("ok")).await;
    let proxy = start_proxy(test_config(&upstream)).await;

    let path = format!("/{}", "a".repeat(2049));
    let response = client().get(proxy.url(&path)).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["detail"], "Invalid path");

    let path = format!("/{}", "a".repeat(2048));
    let response = client().get(proxy.url(&path)).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(upstream.hits(), 1);
    proxy.stop().await;
}

#[tokio::test]
async fn repeated_query_keys_are_preserved() {
    let upstream = start_mock_upstream(MockReply::html("ok")).await;
    let proxy = start_proxy(test_config(&upstream)).await;

    let response = client()
        .get(proxy.url("/search?tag=a&tag=b%20c&id=7"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(upstream.requests()[0].target, "/search?tag=a&tag=b+c&id=7");
    proxy.stop().await;
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let upstream = start_mock_upstream(MockReply::html("ok")).await;
    let proxy = start_proxy(test_config(&upstream)).await;

    let response = client().get(proxy.url("/")).send().await.unwrap();
    assert!(response.headers().contains_key("x-request-id"));
    proxy.stop().await;
}

// HTTP clients normalize dot segments before sending, so traversal cases are
// driven through the router directly.
#[tokio::test]
async fn traversal_paths_never_reach_upstream() {
    let upstream = start_mock_upstream(MockReply::html("ok")).await;
    let server = HttpServer::new(test_config(&upstream));
    server.upstream().open(server.config()).unwrap();

    for path in ["/a/../etc/passwd", "/%2e%2e/secret", "//evil.com/x", "/%2Fevil.com"] {
        let request = Request::builder().uri(path).body(Body::empty()).unwrap();
        let response = server.router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{path}");
    }
    assert_eq!(upstream.hits(), 0);
    server.upstream().close();
}

#[tokio::test]
async fn closed_pool_answers_unavailable() {
    let upstream = start_mock_upstream(MockReply::html("ok")).await;
    let server = HttpServer::new(test_config(&upstream));

    let request = Request::builder().uri("/news").body(Body::empty()).unwrap();
    let response = server.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["detail"], "Service Unavailable");
    assert_eq!(upstream.hits(), 0);
}

#[tokio::test]
async fn bad_path_wins_over_oversized_post() {
    let upstream = start_mock_upstream(MockReply::html("ok")).await;
    let mut config = test_config(&upstream);
    config.limits.max_body_size = 8;
    let server = HttpServer::new(config);
    server.upstream().open(server.config()).unwrap();

    let request = Request::builder()
        .method("POST")
        .uri("/a/../b")
        .body(Body::from(vec![b'x'; 64]))
        .unwrap();
    let response = server.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(upstream.hits(), 0);
    server.upstream().close();
}

#[tokio::test]
async fn closed_pool_wins_over_oversized_post() {
    let upstream = start_mock_upstream(MockReply::html("ok")).await;
    let mut config = test_config(&upstream);
    config.limits.max_body_size = 8;
    let server = HttpServer::new(config);

    let request = Request::builder()
        .method("POST")
        .uri("/ok")
        .body(Body::from(vec![b'x'; 64]))
        .unwrap();
    let response = server.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(upstream.hits(), 0);
}

#[tokio::test]
async fn html_keeps_non_200_success_status() {
    for status in [201u16, 203] {
        let reply = MockReply::html(r#"<a href="/newest">recent</a>"#).status(status);
        let upstream = start_mock_upstream(reply).await;
        let proxy = start_proxy(test_config(&upstream)).await;

        let response = client().get(proxy.url("/")).send().await.unwrap();
        assert_eq!(response.status().as_u16(), status);
        assert_eq!(response.headers()["content-type"], "text/html; charset=utf-8");
        let body = response.text().await.unwrap();
        let expected = format!(r#"<a href="{}/newest">recent™</a>"#, proxy.base_url());
        assert_eq!(body, expected);
        proxy.stop().await;
    }
}
