// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Resource handlers.
//!
//! The set of resource kinds is closed: [`SiteResource`] tags each variant and
//! exposes its [`Capabilities`], so dispatch checks for a capability before
//! calling a handler instead of guessing at methods.
//!
//! | Path | Kind | GET | PUT | POST | Observe |
//! |------|------|-----|-----|------|---------|
//! | `/` | [`Welcome`] | x | | | |
//! | `/time` | [`TimeResource`] | x | | | x |
//! | `/other/block` | [`BlockResource`] | x | x | | |
//! | `/other/separate` | [`SeparateLargeResource`] | x | | | |
//! | `/whoami` | [`WhoAmI`] | x | | | |
//! | `/basic` | [`BasicResource`] | x | x | x | |
//! | `/sensor/data` | [`SensorDataResource`] | x | | x | |

mod basic;
mod block;
mod sensor;
mod separate;
mod time;
mod welcome;
mod whoami;

pub use basic::BasicResource;
pub use block::BlockResource;
pub use sensor::{RecordLog, SensorDataResource};
pub use separate::SeparateLargeResource;
pub use time::TimeResource;
pub use welcome::Welcome;
pub use whoami::WhoAmI;

use crate::chunked::PaddingPolicy;
use crate::config::SiteConfig;
use crate::diagnostics::Diagnostics;
use crate::error::SiteError;
use crate::message::{ContentFormat, Method, Request, Response};
use crate::path::ResourcePath;
use crate::router::ResourceTree;

/// Operations a resource kind supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub get: bool,
    pub put: bool,
    pub post: bool,
    pub observe: bool,
}

impl Capabilities {
    pub const fn get_only() -> Self {
        Self {
            get: true,
            put: false,
            post: false,
            observe: false,
        }
    }

    pub fn supports(&self, method: Method) -> bool {
        match method {
            Method::Get => self.get,
            Method::Put => self.put,
            Method::Post => self.post,
        }
    }
}

/// Every resource kind the site can host.
#[derive(Debug)]
pub enum SiteResource {
    Welcome(Welcome),
    Block(BlockResource),
    Separate(SeparateLargeResource),
    Time(TimeResource),
    WhoAmI(WhoAmI),
    Basic(BasicResource),
    Sensor(SensorDataResource),
}

impl SiteResource {
    pub fn capabilities(&self) -> Capabilities {
        match self {
            Self::Welcome(_) | Self::Separate(_) | Self::WhoAmI(_) => Capabilities::get_only(),
            Self::Time(_) => Capabilities {
                observe: true,
                ..Capabilities::get_only()
            },
            Self::Block(_) => Capabilities {
                put: true,
                ..Capabilities::get_only()
            },
            Self::Basic(_) => Capabilities {
                put: true,
                post: true,
                ..Capabilities::get_only()
            },
            Self::Sensor(_) => Capabilities {
                post: true,
                ..Capabilities::get_only()
            },
        }
    }

    pub fn is_observable(&self) -> bool {
        self.capabilities().observe
    }

    /// Human-readable title published through discovery.
    pub fn title(&self) -> Option<&str> {
        match self {
            Self::Separate(r) => Some(r.title()),
            _ => None,
        }
    }

    /// Content formats the resource answers GET with.
    pub fn content_formats(&self) -> Vec<ContentFormat> {
        match self {
            Self::Welcome(r) => r.formats(),
            Self::Sensor(_) => vec![ContentFormat::JSON],
            _ => vec![ContentFormat::TEXT],
        }
    }

    /// Run the handler for `request.method`. Unsupported methods are
    /// rejected before any handler runs.
    pub async fn handle(&self, request: &Request) -> Result<Response, SiteError> {
        if !self.capabilities().supports(request.method) {
            return Err(SiteError::MethodNotAllowed {
                path: request.path.clone(),
                method: request.method,
            });
        }
        if let (Method::Get, Some(accept)) = (request.method, request.accept) {
            if !self.content_formats().contains(&accept) {
                return Err(SiteError::UnsupportedContentFormat(accept));
            }
        }
        match (self, request.method) {
            (Self::Welcome(r), Method::Get) => r.get(request),
            (Self::Block(r), Method::Get) => r.get(request),
            (Self::Block(r), Method::Put) => r.put(request),
            (Self::Separate(r), Method::Get) => Ok(r.get().await),
            (Self::Time(r), Method::Get) => Ok(r.get()),
            (Self::WhoAmI(r), Method::Get) => Ok(r.get(request)),
            (Self::Basic(r), Method::Get) => Ok(r.get()),
            (Self::Basic(r), Method::Put) => Ok(r.put(request)),
            (Self::Basic(r), Method::Post) => Ok(r.post(request)),
            (Self::Sensor(r), Method::Get) => r.get(),
            (Self::Sensor(r), Method::Post) => Ok(r.post(request)),
            _ => Err(SiteError::MethodNotAllowed {
                path: request.path.clone(),
                method: request.method,
            }),
        }
    }
}

macro_rules! impl_from_resource {
    ($($ty:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for SiteResource {
                fn from(resource: $ty) -> Self {
                    Self::$variant(resource)
                }
            }
        )*
    };
}

impl_from_resource! {
    Welcome => Welcome,
    BlockResource => Block,
    SeparateLargeResource => Separate,
    TimeResource => Time,
    WhoAmI => WhoAmI,
    BasicResource => Basic,
    SensorDataResource => Sensor,
}

/// Build the standard resource tree.
pub fn demo_tree(config: &SiteConfig, diagnostics: &Diagnostics) -> Result<ResourceTree, SiteError> {
    let padding = PaddingPolicy::new(config.block.filler.as_bytes(), config.block.pad_threshold)?;

    let mut tree = ResourceTree::with_diagnostics(diagnostics.clone());
    tree.register(ResourcePath::root(), Welcome::new()?)?;
    tree.register(ResourcePath::from(["time"]), TimeResource::new())?;
    tree.register(
        ResourcePath::from(["other", "block"]),
        BlockResource::new(
            config.block.initial_content.as_bytes(),
            padding,
            diagnostics.clone(),
        )
        .with_upload_limits(config.block.max_uploads, config.block.upload_timeout()),
    )?;
    tree.register(
        ResourcePath::from(["other", "separate"]),
        SeparateLargeResource::new(config.separate.delay()),
    )?;
    tree.register(ResourcePath::from(["whoami"]), WhoAmI)?;
    tree.register(
        ResourcePath::from(["basic"]),
        BasicResource::new(config.basic.initial_content.as_bytes(), diagnostics.clone()),
    )?;
    tree.register(
        ResourcePath::from(["sensor", "data"]),
        SensorDataResource::new(diagnostics.clone()),
    )?;
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_table() {
        let time = SiteResource::from(TimeResource::new());
        assert!(time.capabilities().supports(Method::Get));
        assert!(!time.capabilities().supports(Method::Put));
        assert!(time.is_observable());

        let basic = SiteResource::from(BasicResource::new(b" ".as_slice(), Diagnostics::disabled()));
        assert!(basic.capabilities().supports(Method::Post));
        assert!(!basic.is_observable());

        assert_eq!(
            SiteResource::from(WhoAmI).capabilities(),
            Capabilities::get_only()
        );
    }

    #[tokio::test]
    async fn test_unsupported_method_rejected_before_handler() {
        let whoami = SiteResource::from(WhoAmI);
        let err = whoami
            .handle(&Request::post("/whoami", b"x".to_vec()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SiteError::MethodNotAllowed {
                method: Method::Post,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_accept_checked_against_formats() {
        let time = SiteResource::from(TimeResource::new());
        let err = time
            .handle(&Request::get("/time").with_accept(ContentFormat::JSON))
            .await
            .unwrap_err();
        assert!(matches!(err, SiteError::UnsupportedContentFormat(_)));

        let resp = time
            .handle(&Request::get("/time").with_accept(ContentFormat::TEXT))
            .await
            .expect("text");
        assert_eq!(resp.content_format, Some(ContentFormat::TEXT));
    }

    #[test]
    fn test_demo_tree_paths() {
        let tree = demo_tree(&SiteConfig::default(), &Diagnostics::disabled()).expect("tree");
        let paths: Vec<String> = tree.paths().iter().map(ToString::to_string).collect();
        assert_eq!(
            paths,
            vec![
                "/",
                "/basic",
                "/other/block",
                "/other/separate",
                "/sensor/data",
                "/time",
                "/whoami",
            ]
        );
    }
}
