//! End-to-end request processing.

use std::sync::Arc;

use uwsgi_gateway::config::{AppMountConfig, FileServeMode, GatewayConfig};
use uwsgi_gateway::env::RecordingEnvironment;
use uwsgi_gateway::http::StreamSink;
use uwsgi_gateway::request::{Disposition, RequestBody, RequestPipeline};
use uwsgi_gateway::{MemoryCache, WireError};

mod common;

async fn process(
    pipeline: &RequestPipeline,
    payload: &[u8],
    body: &[u8],
) -> (Result<Disposition, WireError>, Vec<u8>) {
    let mut conn = body;
    let mut sink = StreamSink::new(Vec::new());
    let mut env = RecordingEnvironment::default();
    let result = pipeline
        .process(payload, &mut conn, &mut sink, &mut env)
        .await
        .map(|req| req.disposition);
    (result, sink.into_inner())
}

#[tokio::test]
async fn test_plain_request_goes_to_application() {
    let pipeline = RequestPipeline::new(Arc::new(GatewayConfig::default()));
    let payload = common::payload(&[
        ("SCRIPT_NAME", "/app"),
        ("PATH_INFO", "/x"),
        ("CONTENT_LENGTH", "42"),
    ]);

    let mut conn: &[u8] = b"";
    let mut sink = StreamSink::new(Vec::new());
    let mut env = RecordingEnvironment::default();
    let req = pipeline.process(&payload, &mut conn, &mut sink, &mut env).await.unwrap();

    assert_eq!(req.disposition, Disposition::Application);
    assert_eq!(req.vars.vars().script_name, Some(&b"/app"[..]));
    assert_eq!(req.vars.vars().path_info, Some(&b"/x"[..]));
    assert_eq!(req.vars.vars().post_cl, 42);
    assert!(req.body.is_none());
}

#[tokio::test]
async fn test_longest_mount_wins() {
    let mut config = GatewayConfig::default();
    config.vars.manage_script_name = true;
    config.apps = vec![
        AppMountConfig { mountpoint: "/a".into() },
        AppMountConfig { mountpoint: "/app".into() },
    ];
    let pipeline = RequestPipeline::new(Arc::new(config));
    let payload = common::payload(&[("PATH_INFO", "/app/x")]);

    let mut conn: &[u8] = b"";
    let mut sink = StreamSink::new(Vec::new());
    let mut env = RecordingEnvironment::default();
    let req = pipeline.process(&payload, &mut conn, &mut sink, &mut env).await.unwrap();

    assert_eq!(req.vars.vars().script_name, Some(&b"/app"[..]));
    assert_eq!(req.vars.vars().path_info, Some(&b"/x"[..]));
    assert_eq!(req.vars.get(b"SCRIPT_NAME"), Some(&b"/app"[..]));
}

#[tokio::test]
async fn test_synthesized_script_name_needs_a_free_slot() {
    let mut config = GatewayConfig::default();
    config.vars.max_slots = 2;
    config.vars.manage_script_name = true;
    config.apps = vec![AppMountConfig { mountpoint: "/app".into() }];
    let pipeline = RequestPipeline::new(Arc::new(config));
    let payload = common::payload(&[("PATH_INFO", "/app/x")]);

    let (result, written) = process(&pipeline, &payload, b"").await;
    assert!(matches!(result, Err(WireError::CapacityExceeded { capacity: 2 })));
    assert!(written.is_empty());

    // An existing SCRIPT_NAME slot is reused, so a full table still rewrites.
    let mut config = GatewayConfig::default();
    config.vars.max_slots = 4;
    config.vars.manage_script_name = true;
    config.apps = vec![AppMountConfig { mountpoint: "/app".into() }];
    let pipeline = RequestPipeline::new(Arc::new(config));
    let payload = common::payload(&[("SCRIPT_NAME", ""), ("PATH_INFO", "/app/x")]);

    let (result, _) = process(&pipeline, &payload, b"").await;
    assert_eq!(result.unwrap(), Disposition::Application);
}

#[tokio::test]
async fn test_static_map_registration_order() {
    let root_a = tempfile::tempdir().unwrap();
    let root_b = tempfile::tempdir().unwrap();
    std::fs::write(root_a.path().join("img.png"), b"from-a").unwrap();
    std::fs::write(root_b.path().join("img.png"), b"from-b").unwrap();

    let config = common::config_with_maps(&[("/static", root_a.path()), ("/s", root_b.path())]);
    let pipeline = RequestPipeline::new(Arc::new(config));
    let payload = common::payload(&[("PATH_INFO", "/static/img.png")]);

    let (disposition, out) = process(&pipeline, &payload, b"").await;

    assert!(matches!(disposition.unwrap(), Disposition::Static { status: 200, body_size: 6, .. }));
    assert!(out.ends_with(b"from-a"));
}

#[tokio::test]
async fn test_static_miss_falls_through_to_next_map() {
    let root_a = tempfile::tempdir().unwrap();
    let root_b = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(root_b.path().join("tatic")).unwrap();
    std::fs::write(root_b.path().join("tatic").join("only-b.txt"), b"b").unwrap();

    let config = common::config_with_maps(&[("/static", root_a.path()), ("/s", root_b.path())]);
    let pipeline = RequestPipeline::new(Arc::new(config));
    let payload = common::payload(&[("PATH_INFO", "/static/only-b.txt")]);

    let (disposition, out) = process(&pipeline, &payload, b"").await;
    assert!(matches!(disposition.unwrap(), Disposition::Static { status: 200, .. }));
    assert!(out.ends_with(b"\r\n\r\nb"));
}

#[tokio::test]
async fn test_static_escape_is_not_served() {
    let parent = tempfile::tempdir().unwrap();
    let root = parent.path().join("www");
    std::fs::create_dir(&root).unwrap();
    std::fs::write(parent.path().join("secret.txt"), b"secret").unwrap();

    let config = common::config_with_maps(&[("/static", root.as_path())]);
    let pipeline = RequestPipeline::new(Arc::new(config));
    let payload = common::payload(&[("PATH_INFO", "/static/../secret.txt")]);

    let (disposition, out) = process(&pipeline, &payload, b"").await;
    assert_eq!(disposition.unwrap(), Disposition::Application);
    assert!(out.is_empty());
}

#[tokio::test]
async fn test_check_static_with_x_accel() {
    let root = tempfile::tempdir().unwrap();
    std::fs::write(root.path().join("robots.txt"), b"User-agent: *").unwrap();

    let mut config = GatewayConfig::default();
    config.static_files.check_static = Some(root.path().to_str().unwrap().to_string());
    config.static_files.file_serve_mode = FileServeMode::XAccelRedirect;
    config.static_files.additional_headers = vec!["Cache-Control: max-age=60".into()];
    let pipeline = RequestPipeline::new(Arc::new(config));
    let payload = common::payload(&[("PATH_INFO", "/robots.txt"), ("SERVER_PROTOCOL", "HTTP/1.0")]);

    let (disposition, out) = process(&pipeline, &payload, b"").await;
    assert!(matches!(disposition.unwrap(), Disposition::Static { status: 200, body_size: 0, .. }));

    let text = String::from_utf8(out).unwrap();
    let expected = format!(
        "HTTP/1.0 200 OK\r\nCache-Control: max-age=60\r\nX-Accel-Redirect: {}//robots.txt\r\nLast-Modified: ",
        root.path().display()
    );
    assert!(text.starts_with(&expected), "{text}");
    assert!(text.ends_with(" GMT\r\n\r\n"));
}

#[tokio::test]
async fn test_not_modified() {
    let root = tempfile::tempdir().unwrap();
    std::fs::write(root.path().join("a.js"), b"x").unwrap();

    let config = common::config_with_maps(&[("/", root.path())]);
    let pipeline = RequestPipeline::new(Arc::new(config));
    let payload = common::payload(&[
        ("PATH_INFO", "/a.js"),
        ("HTTP_IF_MODIFIED_SINCE", "Fri, 01 Jan 2100 00:00:00 GMT"),
    ]);

    let (disposition, out) = process(&pipeline, &payload, b"").await;
    assert!(matches!(disposition.unwrap(), Disposition::Static { status: 304, .. }));
    assert_eq!(out, b"HTTP/1.1 304 Not Modified\r\n\r\n");
}

#[tokio::test]
async fn test_cache_get_short_circuits() {
    let cache = MemoryCache::new();
    cache.insert(&b"page:1"[..], &b"HTTP/1.1 200 OK\r\n\r\ncached"[..]);

    let mut config = GatewayConfig::default();
    config.cache.enabled = true;
    let pipeline = RequestPipeline::new(Arc::new(config)).with_cache(Arc::new(cache));
    let payload = common::payload(&[("UWSGI_CACHE_GET", "page:1"), ("PATH_INFO", "/")]);

    let (disposition, out) = process(&pipeline, &payload, b"").await;
    assert_eq!(disposition.unwrap(), Disposition::Cached { response_size: out.len() });
    assert!(out.ends_with(b"cached"));
}

#[tokio::test]
async fn test_check_cache_only_for_get() {
    let cache = MemoryCache::new();
    cache.insert(&b"/home"[..], &b"hit"[..]);

    let mut config = GatewayConfig::default();
    config.cache.check_cache = true;
    let pipeline = RequestPipeline::new(Arc::new(config)).with_cache(Arc::new(cache));

    let get = common::payload(&[("REQUEST_METHOD", "GET"), ("REQUEST_URI", "/home")]);
    let (disposition, out) = process(&pipeline, &get, b"").await;
    assert_eq!(disposition.unwrap(), Disposition::Cached { response_size: 3 });
    assert_eq!(out, b"hit");

    let post = common::payload(&[("REQUEST_METHOD", "POST"), ("REQUEST_URI", "/home")]);
    let (disposition, out) = process(&pipeline, &post, b"").await;
    assert_eq!(disposition.unwrap(), Disposition::Application);
    assert!(out.is_empty());
}

#[tokio::test]
async fn test_body_buffering() {
    let mut config = GatewayConfig::default();
    config.limits.post_buffering = 8;
    let pipeline = RequestPipeline::new(Arc::new(config));

    let small = common::payload(&[("CONTENT_LENGTH", "5")]);
    let mut conn: &[u8] = b"hello";
    let mut sink = StreamSink::new(Vec::new());
    let mut env = RecordingEnvironment::default();
    let req = pipeline.process(&small, &mut conn, &mut sink, &mut env).await.unwrap();
    assert!(matches!(req.body, Some(RequestBody::Memory(ref b)) if b == b"hello"));

    let large = common::payload(&[("CONTENT_LENGTH", "12")]);
    let mut conn: &[u8] = b"hello world!";
    let req = pipeline.process(&large, &mut conn, &mut sink, &mut env).await.unwrap();
    assert!(req.body.as_ref().is_some_and(RequestBody::is_file));
}

#[tokio::test]
async fn test_rejections() {
    let mut config = GatewayConfig::default();
    config.limits.limit_post = 100;
    config.vars.max_slots = 4;
    let pipeline = RequestPipeline::new(Arc::new(config));

    let too_big = common::payload(&[("CONTENT_LENGTH", "123abc")]);
    let (result, _) = process(&pipeline, &too_big, b"").await;
    assert!(matches!(result, Err(WireError::BodyTooLarge { size: 123, limit: 100 })));

    let too_many = common::payload(&[("A", "1"), ("B", "2"), ("C", "3")]);
    let (result, _) = process(&pipeline, &too_many, b"").await;
    assert!(matches!(result, Err(WireError::CapacityExceeded { capacity: 4 })));

    let truncated = [5u8, 0, b'K', b'E'];
    let (result, _) = process(&pipeline, &truncated, b"").await;
    assert!(matches!(result, Err(WireError::TruncatedItem { .. })));
}

#[tokio::test]
async fn test_setenv_goes_through_sink() {
    let pipeline = RequestPipeline::new(Arc::new(GatewayConfig::default()));
    let payload = common::payload(&[("UWSGI_SETENV", "APP_MODE=test")]);

    let mut conn: &[u8] = b"";
    let mut sink = StreamSink::new(Vec::new());
    let mut env = RecordingEnvironment::default();
    pipeline.process(&payload, &mut conn, &mut sink, &mut env).await.unwrap();

    assert_eq!(env.assignments, vec![(b"APP_MODE".to_vec(), b"test".to_vec())]);
}
