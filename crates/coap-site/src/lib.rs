// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! CoAP demonstration site
//!
//! A tree of demonstration resources served behind a transport-agnostic
//! request/response boundary, with periodic observation.
//!
//! # Features
//!
//! - **Resource tree**: exact path resolution, capability-checked dispatch
//! - **Content negotiation**: per-resource representations keyed by format
//! - **Chunked content**: padded, atomically replaced payloads served in
//!   block windows (RFC 7959), with block-wise uploads
//! - **Observation**: per-resource timer that runs only while observed and
//!   pushes versioned notifications through a [`NotificationSink`]
//!
//! # Quick Start
//!
//! ```bash
//! # One request against the in-process site
//! coap-site request GET /whoami
//!
//! # Watch the clock resource
//! coap-site observe /time --count 3
//!
//! # Using config file
//! coap-site --config site.toml links
//! ```
//!
//! # Configuration File
//!
//! ```toml
//! name = "coap-site"
//! log_level = "info"
//!
//! [observe]
//! interval_ms = 5000
//!
//! [block]
//! pad_threshold = 1024
//! filler = "0123456789\n"
//!
//! [separate]
//! delay_ms = 3000
//! ```

pub mod chunked;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod message;
pub mod negotiate;
pub mod observe;
pub mod path;
pub mod resources;
pub mod router;
pub mod scheduler;
pub mod site;
pub mod transport;

pub use chunked::{BlockAssembler, BlockOption, ChunkedContent, ContentSnapshot, PaddingPolicy};
pub use config::{ConfigError, SiteConfig};
pub use diagnostics::Diagnostics;
pub use error::SiteError;
pub use message::{
    ContentFormat, Method, Observe, RemoteInfo, Request, Response, ResponseCode, SubscriberId,
};
pub use negotiate::Representations;
pub use observe::{ObservationRegistry, ObservationStats};
pub use path::ResourcePath;
pub use resources::{demo_tree, Capabilities, SiteResource};
pub use router::{LinkEntry, ResourceTree};
pub use scheduler::{ManualScheduler, Scheduler, TimerHandle, TokioScheduler};
pub use site::Site;
pub use transport::{ChannelSink, Notification, NotificationSink, NullSink};
