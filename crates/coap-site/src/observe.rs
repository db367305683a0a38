// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Observation registry.
//!
//! Per observable resource:
//!
//! ```text
//!   Idle (no observers, no timer)
//!     | subscribe: 0 -> 1            arm timer
//!     v
//!   Observing (>= 1 observer, timer armed or firing)
//!     | unsubscribe: 1 -> 0          cancel timer
//!     v
//!   Idle
//! ```
//!
//! Each fire bumps the resource's state-version, renders the resource once
//! per observer (with that observer's registering request), pushes the
//! notifications through the sink, then re-arms the timer. Every armed timer
//! carries a token; a fire whose token no longer matches the armed one is
//! discarded, so a fire racing a cancellation never notifies anybody.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;

use crate::diagnostics::Diagnostics;
use crate::error::SiteError;
use crate::message::{Method, Request, SubscriberId};
use crate::path::ResourcePath;
use crate::resources::SiteResource;
use crate::scheduler::{Scheduler, TimerCallback, TimerHandle};
use crate::transport::{Notification, NotificationSink};

struct Registration {
    request: Request,
    last_version: u64,
}

struct ArmedTimer {
    token: u64,
    handle: TimerHandle,
}

struct Observed {
    resource: Arc<SiteResource>,
    subscribers: BTreeMap<SubscriberId, Registration>,
    version: u64,
    timer: Option<ArmedTimer>,
}

#[derive(Default)]
struct State {
    resources: HashMap<ResourcePath, Observed>,
    next_token: u64,
}

impl State {
    fn take_token(&mut self) -> u64 {
        let token = self.next_token;
        self.next_token += 1;
        token
    }
}

struct Shared {
    state: Mutex<State>,
    scheduler: Arc<dyn Scheduler>,
    sink: Arc<dyn NotificationSink>,
    interval: Duration,
    diagnostics: Diagnostics,
    delivered: AtomicU64,
    failures: AtomicU64,
}

/// Snapshot of observation counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservationStats {
    pub notifications_delivered: u64,
    pub delivery_failures: u64,
    pub observers: usize,
    pub observed_resources: usize,
}

/// Tracks observers per resource and drives their notification timers.
#[derive(Clone)]
pub struct ObservationRegistry {
    shared: Arc<Shared>,
}

impl ObservationRegistry {
    pub fn new(
        scheduler: Arc<dyn Scheduler>,
        sink: Arc<dyn NotificationSink>,
        interval: Duration,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State::default()),
                scheduler,
                sink,
                interval,
                diagnostics,
                delivered: AtomicU64::new(0),
                failures: AtomicU64::new(0),
            }),
        }
    }

    pub fn interval(&self) -> Duration {
        self.shared.interval
    }

    /// Register `subscriber` on `path`. A repeated registration replaces the
    /// stored request without changing the observer count. Returns the
    /// current state-version.
    pub fn subscribe(
        &self,
        path: &ResourcePath,
        resource: Arc<SiteResource>,
        subscriber: SubscriberId,
        request: Request,
    ) -> Result<u64, SiteError> {
        if !resource.is_observable() {
            return Err(SiteError::MethodNotAllowed {
                path: path.clone(),
                method: Method::Get,
            });
        }

        let mut state = self.shared.state.lock();
        let token = state.take_token();
        let entry = state
            .resources
            .entry(path.clone())
            .or_insert_with(|| Observed {
                resource,
                subscribers: BTreeMap::new(),
                version: 0,
                timer: None,
            });

        let version = entry.version;
        let was_idle = entry.subscribers.is_empty();
        entry.subscribers.insert(
            subscriber.clone(),
            Registration {
                request,
                last_version: version,
            },
        );
        let count = entry.subscribers.len();
        self.shared
            .diagnostics
            .subscriber_added(path, &subscriber, count);

        if was_idle && entry.timer.is_none() {
            entry.timer = Some(self.arm(path, token));
            self.shared.diagnostics.observation_started(path);
        }
        Ok(version)
    }

    /// Remove one registration. Cancels the timer when the last observer
    /// leaves.
    pub fn unsubscribe(&self, path: &ResourcePath, subscriber: &SubscriberId) -> bool {
        let mut state = self.shared.state.lock();
        self.remove_locked(&mut state, path, subscriber)
    }

    /// Remove every registration of `subscriber`, e.g. when the transport
    /// reports it unreachable. Returns the number removed.
    pub fn remove_subscriber(&self, subscriber: &SubscriberId) -> usize {
        let mut state = self.shared.state.lock();
        let paths: Vec<ResourcePath> = state
            .resources
            .iter()
            .filter(|(_, o)| o.subscribers.contains_key(subscriber))
            .map(|(p, _)| p.clone())
            .collect();
        paths
            .iter()
            .filter(|path| self.remove_locked(&mut state, path, subscriber))
            .count()
    }

    pub fn subscriber_count(&self, path: &ResourcePath) -> usize {
        self.shared
            .state
            .lock()
            .resources
            .get(path)
            .map_or(0, |o| o.subscribers.len())
    }

    pub fn is_observing(&self, path: &ResourcePath) -> bool {
        self.subscriber_count(path) > 0
    }

    /// True while a timer is armed (not while a fire is in progress).
    pub fn has_timer(&self, path: &ResourcePath) -> bool {
        self.shared
            .state
            .lock()
            .resources
            .get(path)
            .is_some_and(|o| o.timer.is_some())
    }

    /// Current state-version of `path` (0 if never observed).
    pub fn version(&self, path: &ResourcePath) -> u64 {
        self.shared
            .state
            .lock()
            .resources
            .get(path)
            .map_or(0, |o| o.version)
    }

    /// Last state-version delivered to `subscriber` on `path`.
    pub fn last_delivered(&self, path: &ResourcePath, subscriber: &SubscriberId) -> Option<u64> {
        self.shared
            .state
            .lock()
            .resources
            .get(path)
            .and_then(|o| o.subscribers.get(subscriber))
            .map(|r| r.last_version)
    }

    pub fn stats(&self) -> ObservationStats {
        let state = self.shared.state.lock();
        ObservationStats {
            notifications_delivered: self.shared.delivered.load(Ordering::Relaxed),
            delivery_failures: self.shared.failures.load(Ordering::Relaxed),
            observers: state.resources.values().map(|o| o.subscribers.len()).sum(),
            observed_resources: state
                .resources
                .values()
                .filter(|o| !o.subscribers.is_empty())
                .count(),
        }
    }

    /// Notify observers of `path` now and restart the interval.
    pub async fn on_timer_fire(&self, path: &ResourcePath) {
        self.fire(path, None).await;
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn remove_locked(&self, state: &mut State, path: &ResourcePath, subscriber: &SubscriberId) -> bool {
        let Some(entry) = state.resources.get_mut(path) else {
            return false;
        };
        if entry.subscribers.remove(subscriber).is_none() {
            return false;
        }
        let count = entry.subscribers.len();
        self.shared
            .diagnostics
            .subscriber_removed(path, subscriber, count);
        if count == 0 {
            if let Some(armed) = entry.timer.take() {
                armed.handle.cancel();
            }
            self.shared.diagnostics.observation_stopped(path);
        }
        true
    }

    fn arm(&self, path: &ResourcePath, token: u64) -> ArmedTimer {
        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        let path = path.clone();
        let callback: TimerCallback = Box::new(move || {
            Box::pin(async move {
                if let Some(shared) = weak.upgrade() {
                    ObservationRegistry { shared }.fire(&path, Some(token)).await;
                }
            })
        });
        let handle = self
            .shared
            .scheduler
            .schedule_after(self.shared.interval, callback);
        ArmedTimer { token, handle }
    }

    /// `token` is set when the armed timer fired; `None` is an explicit
    /// trigger, which replaces the pending timer.
    async fn fire(&self, path: &ResourcePath, token: Option<u64>) {
        let (version, resource, targets) = {
            let mut state = self.shared.state.lock();
            let Some(entry) = state.resources.get_mut(path) else {
                return;
            };
            match token {
                Some(token) => {
                    if entry.timer.as_ref().map(|armed| armed.token) != Some(token) {
                        return;
                    }
                    // Spent: this fire is the armed timer itself.
                    entry.timer = None;
                }
                None => {
                    if entry.subscribers.is_empty() {
                        return;
                    }
                    if let Some(armed) = entry.timer.take() {
                        armed.handle.cancel();
                    }
                }
            }
            entry.version += 1;
            let targets: Vec<(SubscriberId, Request)> = entry
                .subscribers
                .iter()
                .map(|(id, reg)| (id.clone(), reg.request.clone()))
                .collect();
            (entry.version, Arc::clone(&entry.resource), targets)
        };

        let mut delivered = 0;
        let mut dropped = Vec::new();
        for (subscriber, request) in targets {
            // Skip observers that left while earlier ones were notified.
            if self.last_delivered(path, &subscriber).is_none() {
                continue;
            }

            let (mut response, terminal) = match resource.handle(&request).await {
                Ok(response) => (response, false),
                Err(err) => (err.to_response(), true),
            };
            response.observe = Some(version);
            let notification = Notification {
                path: path.clone(),
                version,
                response,
            };

            match self.shared.sink.deliver(&subscriber, notification).await {
                Ok(()) => {
                    delivered += 1;
                    self.shared.delivered.fetch_add(1, Ordering::Relaxed);
                    self.record_delivered(path, &subscriber, version);
                    if terminal {
                        dropped.push(subscriber);
                    }
                }
                Err(err) => {
                    self.shared.failures.fetch_add(1, Ordering::Relaxed);
                    self.shared
                        .diagnostics
                        .notification_failed(path, &subscriber, &err.to_string());
                    dropped.push(subscriber);
                }
            }
        }
        self.shared.diagnostics.notified(path, version, delivered);

        let mut state = self.shared.state.lock();
        for subscriber in &dropped {
            self.remove_locked(&mut state, path, subscriber);
        }
        let token = state.take_token();
        if let Some(entry) = state.resources.get_mut(path) {
            if entry.timer.is_none() && !entry.subscribers.is_empty() {
                entry.timer = Some(self.arm(path, token));
            }
        }
    }

    fn record_delivered(&self, path: &ResourcePath, subscriber: &SubscriberId, version: u64) {
        let mut state = self.shared.state.lock();
        if let Some(reg) = state
            .resources
            .get_mut(path)
            .and_then(|o| o.subscribers.get_mut(subscriber))
        {
            reg.last_version = reg.last_version.max(version);
        }
    }
}
