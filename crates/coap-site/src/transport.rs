// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Boundary with the transport engine for server-initiated messages.
//!
//! Requests come in through `Site::handle`; notifications go out through a
//! `NotificationSink` the transport provides. Delivery is the only place the
//! observation engine waits on the transport.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::error::SiteError;
use crate::message::{Response, SubscriberId};
use crate::path::ResourcePath;

/// A state-change notification for one observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub path: ResourcePath,
    /// State-version; strictly increasing per resource.
    pub version: u64,
    pub response: Response,
}

/// Outbound path for notifications.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver one notification. Returns
    /// [`SiteError::SubscriberUnreachable`] if the observer is gone.
    ///
    /// Observers are notified one after another, so an implementation must
    /// not wait indefinitely on a single observer.
    async fn deliver(
        &self,
        subscriber: &SubscriberId,
        notification: Notification,
    ) -> Result<(), SiteError>;
}

// ---------------------------------------------------------------------------
// Channel sink
// ---------------------------------------------------------------------------

/// In-process sink: each observer owns the receiving half of a bounded
/// channel. A dropped receiver, or one that lets its channel fill up, makes
/// the observer unreachable.
#[derive(Debug, Default)]
pub struct ChannelSink {
    observers: Mutex<HashMap<SubscriberId, mpsc::Sender<Notification>>>,
}

impl ChannelSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a channel for `subscriber`, replacing any previous one.
    pub fn connect(&self, subscriber: SubscriberId, capacity: usize) -> mpsc::Receiver<Notification> {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        self.observers.lock().insert(subscriber, tx);
        rx
    }

    pub fn disconnect(&self, subscriber: &SubscriberId) -> bool {
        self.observers.lock().remove(subscriber).is_some()
    }

    pub fn is_connected(&self, subscriber: &SubscriberId) -> bool {
        self.observers.lock().contains_key(subscriber)
    }
}

#[async_trait]
impl NotificationSink for ChannelSink {
    async fn deliver(
        &self,
        subscriber: &SubscriberId,
        notification: Notification,
    ) -> Result<(), SiteError> {
        let tx = self
            .observers
            .lock()
            .get(subscriber)
            .cloned()
            .ok_or_else(|| SiteError::SubscriberUnreachable(subscriber.clone()))?;

        match tx.try_send(notification) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) | Err(TrySendError::Closed(_)) => {
                self.observers.lock().remove(subscriber);
                Err(SiteError::SubscriberUnreachable(subscriber.clone()))
            }
        }
    }
}

/// Sink that drops every notification. Useful when nothing observes.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

#[async_trait]
impl NotificationSink for NullSink {
    async fn deliver(&self, _subscriber: &SubscriberId, _notification: Notification) -> Result<(), SiteError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{ContentFormat, Response};

    fn notification(version: u64) -> Notification {
        Notification {
            path: ResourcePath::from(["time"]),
            version,
            response: Response::content(b"now".to_vec(), ContentFormat::TEXT),
        }
    }

    #[tokio::test]
    async fn test_channel_delivery() {
        let sink = ChannelSink::new();
        let peer = SubscriberId::new("peer");
        let mut rx = sink.connect(peer.clone(), 4);

        sink.deliver(&peer, notification(1)).await.expect("deliver");
        assert_eq!(rx.recv().await.expect("recv").version, 1);
    }

    #[tokio::test]
    async fn test_unknown_subscriber_unreachable() {
        let sink = ChannelSink::new();
        let err = sink
            .deliver(&SubscriberId::new("ghost"), notification(1))
            .await
            .unwrap_err();
        assert!(matches!(err, SiteError::SubscriberUnreachable(_)));
    }

    #[tokio::test]
    async fn test_dropped_receiver_unreachable() {
        let sink = ChannelSink::new();
        let peer = SubscriberId::new("peer");
        drop(sink.connect(peer.clone(), 1));

        let err = sink.deliver(&peer, notification(1)).await.unwrap_err();
        assert!(matches!(err, SiteError::SubscriberUnreachable(_)));
        assert!(!sink.is_connected(&peer));
    }

    #[tokio::test]
    async fn test_full_channel_unreachable() {
        let sink = ChannelSink::new();
        let peer = SubscriberId::new("stalled");
        let _rx = sink.connect(peer.clone(), 1);

        sink.deliver(&peer, notification(1)).await.expect("first fits");
        let err = sink.deliver(&peer, notification(2)).await.unwrap_err();
        assert!(matches!(err, SiteError::SubscriberUnreachable(_)));
        assert!(!sink.is_connected(&peer));
    }
}
