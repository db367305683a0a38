// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Site façade: the single entry point a transport engine talks to.

use std::sync::Arc;

use crate::config::SiteConfig;
use crate::diagnostics::Diagnostics;
use crate::error::SiteError;
use crate::message::{Method, Observe, Request, Response, SubscriberId};
use crate::observe::{ObservationRegistry, ObservationStats};
use crate::path::ResourcePath;
use crate::resources::demo_tree;
use crate::router::{LinkEntry, ResourceTree};
use crate::scheduler::Scheduler;
use crate::transport::NotificationSink;

/// A resource tree plus the observation engine serving it.
pub struct Site {
    tree: ResourceTree,
    registry: ObservationRegistry,
    diagnostics: Diagnostics,
}

impl Site {
    pub fn new(tree: ResourceTree, registry: ObservationRegistry, diagnostics: Diagnostics) -> Self {
        Self {
            tree,
            registry,
            diagnostics,
        }
    }

    /// Standard site built from `config`.
    pub fn demo(
        config: &SiteConfig,
        scheduler: Arc<dyn Scheduler>,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<Self, SiteError> {
        config.validate()?;
        let diagnostics = Diagnostics::new(&config.name);
        let tree = demo_tree(config, &diagnostics)?;
        let registry = ObservationRegistry::new(
            scheduler,
            sink,
            config.observe.interval(),
            diagnostics.clone(),
        );
        Ok(Self::new(tree, registry, diagnostics))
    }

    /// Handle one request. Failures become error responses; this never
    /// fails.
    pub async fn handle(&self, request: Request) -> Response {
        self.diagnostics.request(&request);
        let response = match self.try_handle(&request).await {
            Ok(response) => response,
            Err(err) => err.to_response(),
        };
        self.diagnostics.response(&request.path, response.code);
        response
    }

    /// Like [`handle`](Self::handle) but keeps the error typed.
    ///
    /// An observe registration only sticks when the initial GET succeeds.
    /// Observe options on resources that are not observable are ignored.
    pub async fn try_handle(&self, request: &Request) -> Result<Response, SiteError> {
        let resource = self.tree.resolve(&request.path)?;

        match (request.method, request.observe, &request.subscriber) {
            (Method::Get, Some(Observe::Register), Some(subscriber)) if resource.is_observable() => {
                let mut response = resource.handle(request).await?;
                if response.code.is_success() {
                    let version = self.registry.subscribe(
                        &request.path,
                        Arc::clone(resource),
                        subscriber.clone(),
                        request.clone(),
                    )?;
                    response.observe = Some(version);
                }
                Ok(response)
            }
            (Method::Get, Some(Observe::Deregister), Some(subscriber)) => {
                self.registry.unsubscribe(&request.path, subscriber);
                resource.handle(request).await
            }
            _ => resource.handle(request).await,
        }
    }

    /// Transport-initiated cancellation (e.g. RST to a notification).
    pub fn cancel_observation(&self, path: &ResourcePath, subscriber: &SubscriberId) -> bool {
        self.registry.unsubscribe(path, subscriber)
    }

    /// Drop every registration of a peer the transport lost.
    pub fn subscriber_unreachable(&self, subscriber: &SubscriberId) -> usize {
        self.registry.remove_subscriber(subscriber)
    }

    pub fn links(&self) -> Vec<LinkEntry> {
        self.tree.links()
    }

    pub fn tree(&self) -> &ResourceTree {
        &self.tree
    }

    pub fn registry(&self) -> &ObservationRegistry {
        &self.registry
    }

    pub fn stats(&self) -> ObservationStats {
        self.registry.stats()
    }
}
