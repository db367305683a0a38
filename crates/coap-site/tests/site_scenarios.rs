// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test code readability over pedantic

//! End-to-end request scenarios against the standard site.

use std::sync::Arc;

use coap_site::chunked::split_blocks;
use coap_site::{
    BlockOption, ContentFormat, Method, NullSink, RemoteInfo, Request, ResponseCode, Site,
    SiteConfig, TokioScheduler,
};

fn site() -> Site {
    let mut config = SiteConfig::default();
    config.separate.delay_ms = 0;
    Site::demo(
        &config,
        Arc::new(TokioScheduler::current().expect("runtime")),
        Arc::new(NullSink),
    )
    .expect("site")
}

#[tokio::test]
async fn registered_paths_never_not_found() {
    let site = site();
    for link in site.links() {
        let resp = site.handle(Request::get(link.path.clone())).await;
        assert_ne!(resp.code, ResponseCode::NotFound, "GET {}", link.path);
    }
}

#[tokio::test]
async fn unregistered_paths_always_not_found() {
    let site = site();
    for path in ["/welcome", "/other", "/sensor", "/time/extra", "/a/b/c"] {
        for method in [Method::Get, Method::Put, Method::Post] {
            let resp = site
                .handle(Request::new(method, path).with_payload(b"x".to_vec()))
                .await;
            assert_eq!(resp.code, ResponseCode::NotFound, "{} {}", method, path);
        }
    }
}

#[tokio::test]
async fn block_put_then_get_is_padded() {
    let site = site();
    let resp = site.handle(Request::put("/other/block", b"hi".to_vec())).await;
    assert_eq!(resp.code, ResponseCode::Changed);

    let resp = site.handle(Request::get("/other/block")).await;
    assert_eq!(resp.code, ResponseCode::Content);
    assert!(resp.payload.starts_with(b"hi"));
    assert!(resp.payload.len() > 1024);
}

#[tokio::test]
async fn block_windows_reassemble_content() {
    let site = site();
    let full = site.handle(Request::get("/other/block")).await;

    let mut body = Vec::new();
    let mut num = 0;
    loop {
        let block = BlockOption::new(num, false, 2).expect("block");
        let resp = site
            .handle(Request::get("/other/block").with_block2(block))
            .await;
        assert_eq!(resp.code, ResponseCode::Content);
        assert_eq!(resp.etag, full.etag);
        body.extend_from_slice(&resp.payload);
        match resp.block2 {
            Some(served) if served.more => num += 1,
            _ => break,
        }
    }
    assert_eq!(body, full.payload);
}

#[tokio::test]
async fn block1_upload_from_two_peers() {
    let site = site();
    let payload: Vec<u8> = (0..200u8).collect();
    let blocks = split_blocks(&payload, 2).expect("split");
    let peer = |name: &str| RemoteInfo {
        hostinfo: name.to_string(),
        ..RemoteInfo::default()
    };

    // Interleave a second peer's plain GETs between the upload blocks.
    let mut last = None;
    for (block, data) in blocks {
        let resp = site
            .handle(
                Request::put("/other/block", data)
                    .with_block1(block)
                    .with_remote(peer("10.0.0.1:5683")),
            )
            .await;
        let other = site
            .handle(Request::get("/other/block").with_remote(peer("10.0.0.2:5683")))
            .await;
        assert_eq!(other.code, ResponseCode::Content);
        last = Some(resp);
    }

    let last = last.expect("at least one block");
    assert_eq!(last.code, ResponseCode::Changed);
    let resp = site.handle(Request::get("/other/block")).await;
    assert!(resp.payload.starts_with(&payload));
}

#[tokio::test]
async fn sensor_post_then_get() {
    let site = site();
    let resp = site
        .handle(Request::post("/sensor/data", vec![0x01, 0x02]))
        .await;
    assert_eq!(resp.code, ResponseCode::Created);
    assert!(resp.payload_text().contains("#1"));

    let resp = site.handle(Request::get("/sensor/data")).await;
    assert_eq!(resp.content_format, Some(ContentFormat::JSON));
    let json: serde_json::Value = serde_json::from_slice(&resp.payload).expect("json");
    assert_eq!(json["sensor_records"], serde_json::json!(["0102"]));
}

#[tokio::test]
async fn basic_put_then_post_appends() {
    let site = site();
    site.handle(Request::put("/basic", b"x".to_vec())).await;
    site.handle(Request::post("/basic", b"y".to_vec())).await;

    let resp = site.handle(Request::get("/basic")).await;
    assert_eq!(resp.payload, b"x y");
}

#[tokio::test]
async fn welcome_negotiation() {
    let site = site();
    let plain = site.handle(Request::get("/")).await;
    let explicit = site
        .handle(Request::get("/").with_accept(ContentFormat::TEXT))
        .await;
    assert_eq!(plain, explicit);

    let resp = site
        .handle(Request::get("/").with_accept(ContentFormat::JSON))
        .await;
    assert_eq!(resp.code, ResponseCode::UnsupportedContentFormat);
}

#[tokio::test]
async fn whoami_reflects_remote() {
    let site = site();
    let remote = RemoteInfo {
        scheme: "coaps".into(),
        hostinfo: "[::1]:40000".into(),
        hostinfo_local: "[::1]:5684".into(),
        claims: Vec::new(),
    };
    let resp = site
        .handle(Request::get("/whoami").with_remote(remote))
        .await;
    let text = resp.payload_text();
    assert!(text.contains("coaps"));
    assert!(text.contains("[::1]:40000"));
    assert!(text.contains("No claims authenticated."));
}

#[tokio::test(start_paused = true)]
async fn separate_resource_answers_after_delay() {
    let site = Site::demo(
        &SiteConfig::default(),
        Arc::new(TokioScheduler::current().expect("runtime")),
        Arc::new(NullSink),
    )
    .expect("site");

    let start = tokio::time::Instant::now();
    let resp = site.handle(Request::get("/other/separate")).await;
    assert_eq!(resp.code, ResponseCode::Content);
    assert!(start.elapsed() >= std::time::Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn slow_get_does_not_block_other_requests() {
    let site = Arc::new(
        Site::demo(
            &SiteConfig::default(),
            Arc::new(TokioScheduler::current().expect("runtime")),
            Arc::new(NullSink),
        )
        .expect("site"),
    );

    let slow = tokio::spawn({
        let site = Arc::clone(&site);
        async move { site.handle(Request::get("/other/separate")).await }
    });
    tokio::task::yield_now().await;

    let start = tokio::time::Instant::now();
    let resp = site.handle(Request::get("/whoami")).await;
    assert_eq!(resp.code, ResponseCode::Content);
    assert!(start.elapsed() < std::time::Duration::from_secs(1));
    assert!(!slow.is_finished());

    let resp = slow.await.expect("join");
    assert_eq!(resp.code, ResponseCode::Content);
}
