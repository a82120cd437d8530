//! Tests for the per-request context
//!
//! # Test Coverage
//!
//! - Header, cookie, protocol, hostname, subdomain and ip accessors
//! - Trust-proxy behaviour
//! - Response helpers: json/text/html/bytes, redirect, cookies, streams
//! - Single-write guarantee

mod common;

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use common::body_text;
use http::StatusCode;
use switchyard::{ConnectionInfo, Context, ContextSettings, CookieOptions, Error, SameSite};

fn build(builder: http::request::Builder) -> Context {
    Context::new(builder.body(Bytes::new()).unwrap())
}

fn build_trusting(builder: http::request::Builder) -> Context {
    let settings = ContextSettings {
        trust_proxy: true,
        ..ContextSettings::default()
    };
    Context::with_settings(builder.body(Bytes::new()).unwrap(), Arc::new(settings))
}

#[test]
fn test_cookie_parsing() {
    let ctx = build(
        http::Request::get("/")
            .header("cookie", "session=abc123; theme=dark")
            .header("cookie", "name=J%C3%BCrgen; session=ignored"),
    );
    let cookies = ctx.cookies();
    assert_eq!(cookies.get("session").map(String::as_str), Some("abc123"));
    assert_eq!(cookies.get("theme").map(String::as_str), Some("dark"));
    assert_eq!(ctx.cookie("name").as_deref(), Some("Jürgen"));
    assert_eq!(ctx.cookie("missing"), None);
}

#[test]
fn test_header_all_keeps_every_value_in_order() {
    let ctx = build(
        http::Request::get("/")
            .header("accept", "text/html")
            .header("Accept", "application/json"),
    );
    assert_eq!(ctx.header("accept"), Some("text/html"));
    assert_eq!(ctx.header_all("accept"), vec!["text/html", "application/json"]);
    assert!(ctx.header_all("x-missing").is_empty());
}

#[test]
fn test_protocol_from_connection() {
    let mut request = http::Request::get("/").body(Bytes::new()).unwrap();
    request.extensions_mut().insert(ConnectionInfo {
        remote_addr: Some("10.0.0.5:4433".parse::<SocketAddr>().unwrap()),
        secure: true,
    });
    let ctx = Context::new(request);
    assert_eq!(ctx.protocol(), "https");
    assert!(ctx.secure());
    assert_eq!(ctx.ip(), Some("10.0.0.5".parse().unwrap()));
}

#[test]
fn test_forwarded_headers_ignored_without_trust() {
    let ctx = build(
        http::Request::get("/")
            .header("host", "internal.local:8080")
            .header("x-forwarded-proto", "https")
            .header("x-forwarded-host", "public.example.com"),
    );
    assert_eq!(ctx.protocol(), "http");
    assert_eq!(ctx.hostname().as_deref(), Some("internal.local"));
}

#[test]
fn test_forwarded_headers_with_trust() {
    let ctx = build_trusting(
        http::Request::get("/")
            .header("host", "internal.local:8080")
            .header("x-forwarded-proto", "https, http")
            .header("x-forwarded-host", "public.example.com, proxy.local")
            .header("x-forwarded-for", "203.0.113.9, 10.0.0.1"),
    );
    assert_eq!(ctx.protocol(), "https");
    assert!(ctx.secure());
    assert_eq!(ctx.hostname().as_deref(), Some("public.example.com"));
    assert_eq!(ctx.ip(), Some("203.0.113.9".parse().unwrap()));
}

#[test]
fn test_subdomains() {
    let ctx = build(http::Request::get("/").header("host", "tobi.ferrets.example.com"));
    assert_eq!(ctx.subdomains(), vec!["ferrets", "tobi"]);

    let ip = build(http::Request::get("/").header("host", "192.168.1.10:3000"));
    assert!(ip.subdomains().is_empty());

    let v6 = build(http::Request::get("/").header("host", "[::1]:3000"));
    assert_eq!(v6.hostname().as_deref(), Some("[::1]"));
    assert!(v6.subdomains().is_empty());
}

#[test]
fn test_method_path_and_original_url() {
    let ctx = build(http::Request::post("/a/b?x=1"));
    assert_eq!(ctx.method(), http::Method::POST);
    assert_eq!(ctx.path(), "/a/b");
    assert_eq!(ctx.original_url(), "/a/b?x=1");
}

#[test]
fn test_is_json() {
    let json = build(http::Request::post("/").header("content-type", "application/json; charset=utf-8"));
    assert!(json.is_json());
    let problem = build(http::Request::post("/").header("content-type", "application/problem+json"));
    assert!(problem.is_json());
    let text = build(http::Request::post("/").header("content-type", "text/plain"));
    assert!(!text.is_json());
}

#[tokio::test]
async fn test_json_response() {
    let mut ctx = build(http::Request::get("/"));
    ctx.status(StatusCode::CREATED)
        .json(&serde_json::json!({ "id": 7 }))
        .unwrap();
    let response = ctx.into_response();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response.header("content-type"), Some("application/json"));
    assert_eq!(body_text(response).await, r#"{"id":7}"#);
}

#[tokio::test]
async fn test_html_and_bytes_content_types() {
    let mut html = build(http::Request::get("/"));
    html.html("<p>hi</p>").unwrap();
    assert_eq!(
        html.response().header("content-type"),
        Some("text/html; charset=utf-8")
    );

    let mut raw = build(http::Request::get("/"));
    raw.send_bytes(vec![0u8, 1, 2]).unwrap();
    assert_eq!(
        raw.response().header("content-type"),
        Some("application/octet-stream")
    );

    let mut typed = build(http::Request::get("/"));
    typed.set_header("content-type", "image/png").unwrap();
    typed.send_bytes(Bytes::from_static(b"\x89PNG")).unwrap();
    assert_eq!(typed.response().header("content-type"), Some("image/png"));
}

#[tokio::test]
async fn test_redirect() {
    let mut ctx = build(http::Request::get("/old"));
    ctx.redirect("/new").unwrap();
    assert_eq!(ctx.response().status(), StatusCode::FOUND);
    assert_eq!(ctx.response().header("location"), Some("/new"));

    let mut permanent = build(http::Request::get("/old"));
    permanent
        .redirect_with_status(StatusCode::MOVED_PERMANENTLY, "https://example.com/")
        .unwrap();
    assert_eq!(permanent.response().status(), StatusCode::MOVED_PERMANENTLY);
}

#[test]
fn test_set_cookie_appends() {
    let mut ctx = build(http::Request::get("/"));
    ctx.set_cookie("a", "1", &CookieOptions::default())
        .unwrap()
        .set_cookie(
            "b",
            "2",
            &CookieOptions {
                http_only: true,
                same_site: Some(SameSite::Strict),
                ..CookieOptions::default()
            },
        )
        .unwrap();
    ctx.clear_cookie("old", &CookieOptions::default()).unwrap();

    let cookies: Vec<&str> = ctx
        .response()
        .headers()
        .get_all("set-cookie")
        .iter()
        .map(|v| v.to_str().unwrap())
        .collect();
    assert_eq!(
        cookies,
        vec![
            "a=1; Path=/",
            "b=2; Path=/; HttpOnly; SameSite=Strict",
            "old=; Max-Age=0; Path=/",
        ]
    );
}

#[test]
fn test_second_body_write_fails() {
    let mut ctx = build(http::Request::get("/"));
    ctx.text("one").unwrap();
    assert!(ctx.is_sent());
    assert!(matches!(ctx.json(&1), Err(Error::ResponseAlreadySent)));
    assert!(matches!(
        ctx.set_header("x-late", "1"),
        Err(Error::ResponseAlreadySent)
    ));
    // Status changes after send are ignored.
    ctx.status(StatusCode::IM_A_TEAPOT);
    assert_eq!(ctx.response().status(), StatusCode::OK);
}

#[tokio::test]
async fn test_stream_passthrough() {
    let mut ctx = build(http::Request::get("/"));
    let reader = std::io::Cursor::new(b"chunked payload".to_vec());
    ctx.stream(reader, "text/plain").unwrap();
    let response = ctx.into_response();
    assert_eq!(response.header("content-type"), Some("text/plain"));
    assert_eq!(body_text(response).await, "chunked payload");
}

#[test]
fn test_invalid_header_rejected() {
    let mut ctx = build(http::Request::get("/"));
    assert!(matches!(
        ctx.set_header("bad header", "x"),
        Err(Error::InvalidHeader(_))
    ));
}

#[test]
fn test_extensions_side_table() {
    #[derive(Clone, Debug, PartialEq)]
    struct Tenant(&'static str);

    let mut ctx = build(http::Request::get("/"));
    ctx.extensions.insert(Tenant("acme"));
    assert_eq!(ctx.extensions.get::<Tenant>(), Some(&Tenant("acme")));
}

#[tokio::test]
async fn test_into_http_carries_status_headers_and_body() {
    let mut ctx = build(http::Request::get("/"));
    ctx.status(StatusCode::ACCEPTED)
        .append_header("x-trace", "a")
        .unwrap()
        .append_header("x-trace", "b")
        .unwrap();
    ctx.text("queued").unwrap();

    let response = ctx.into_response().into_http();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(response.headers().get_all("x-trace").iter().count(), 2);
    let body = response.into_body().collect().await.unwrap();
    assert_eq!(body.as_ref(), b"queued");
}
