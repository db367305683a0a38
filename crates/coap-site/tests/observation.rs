// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Observation timing on the tokio scheduler (paused clock).

use std::sync::Arc;
use std::time::Duration;

use coap_site::{
    ChannelSink, Request, ResourcePath, ResponseCode, Site, SiteConfig, SubscriberId,
    TokioScheduler,
};

fn site(sink: Arc<ChannelSink>) -> Site {
    Site::demo(
        &SiteConfig::default(),
        Arc::new(TokioScheduler::current().expect("runtime")),
        sink,
    )
    .expect("site")
}

#[tokio::test(start_paused = true)]
async fn two_intervals_two_ordered_notifications() {
    let sink = Arc::new(ChannelSink::new());
    let site = site(sink.clone());
    let peer = SubscriberId::new("peer");
    let mut rx = sink.connect(peer.clone(), 8);

    let resp = site.handle(Request::get("/time").observe(peer)).await;
    assert_eq!(resp.code, ResponseCode::Content);

    tokio::time::sleep(Duration::from_secs(11)).await;

    let first = rx.try_recv().expect("first notification");
    let second = rx.try_recv().expect("second notification");
    assert!(rx.try_recv().is_err());
    assert!(first.version < second.version);
    assert_eq!(second.response.observe, Some(second.version));
}

#[tokio::test(start_paused = true)]
async fn no_notification_after_last_cancel() {
    let sink = Arc::new(ChannelSink::new());
    let site = site(sink.clone());
    let peer = SubscriberId::new("peer");
    let mut rx = sink.connect(peer.clone(), 8);
    let time = ResourcePath::from(["time"]);

    site.handle(Request::get("/time").observe(peer.clone())).await;
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert!(rx.try_recv().is_ok());

    assert!(site.cancel_observation(&time, &peer));
    assert!(!site.registry().has_timer(&time));

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn disconnected_observer_is_dropped() {
    let sink = Arc::new(ChannelSink::new());
    let site = site(sink.clone());
    let gone = SubscriberId::new("gone");
    let stays = SubscriberId::new("stays");
    drop(sink.connect(gone.clone(), 8));
    let mut rx = sink.connect(stays.clone(), 8);

    site.handle(Request::get("/time").observe(gone)).await;
    site.handle(Request::get("/time").observe(stays)).await;

    tokio::time::sleep(Duration::from_secs(11)).await;

    assert_eq!(rx.try_recv().expect("first").version, 1);
    assert_eq!(rx.try_recv().expect("second").version, 2);
    let stats = site.stats();
    assert_eq!(stats.observers, 1);
    assert_eq!(stats.delivery_failures, 1);
    assert_eq!(stats.notifications_delivered, 2);
}

#[tokio::test(start_paused = true)]
async fn stalled_observer_does_not_starve_others() {
    let sink = Arc::new(ChannelSink::new());
    let site = site(sink.clone());
    let stalled = SubscriberId::new("a-stalled");
    let reader = SubscriberId::new("b-reader");
    let _never_read = sink.connect(stalled.clone(), 1);
    let mut rx = sink.connect(reader.clone(), 64);
    let time = ResourcePath::from(["time"]);

    site.handle(Request::get("/time").observe(stalled)).await;
    site.handle(Request::get("/time").observe(reader)).await;

    // Six intervals elapse.
    tokio::time::sleep(Duration::from_secs(31)).await;

    let mut versions = Vec::new();
    while let Ok(notification) = rx.try_recv() {
        versions.push(notification.version);
    }
    assert_eq!(versions, vec![1, 2, 3, 4, 5, 6]);
    assert!(site.registry().has_timer(&time));
    assert_eq!(site.registry().subscriber_count(&time), 1);
}
