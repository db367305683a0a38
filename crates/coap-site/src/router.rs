// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Resource tree.
//!
//! Maps path segments to resources. Resolution is exact: a request for
//! `/other` does not reach `/other/block`, and nothing is wildcarded.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::diagnostics::Diagnostics;
use crate::error::SiteError;
use crate::message::{ContentFormat, Request, Response};
use crate::path::ResourcePath;
use crate::resources::SiteResource;

/// Discovery metadata for one registered resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkEntry {
    pub path: ResourcePath,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub content_formats: Vec<ContentFormat>,
    pub observable: bool,
}

#[derive(Debug, Default)]
struct Node {
    resource: Option<Arc<SiteResource>>,
    children: BTreeMap<String, Node>,
}

/// Hierarchical path -> resource mapping.
#[derive(Debug, Default)]
pub struct ResourceTree {
    root: Node,
    len: usize,
    diagnostics: Diagnostics,
}

impl ResourceTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_diagnostics(diagnostics: Diagnostics) -> Self {
        Self {
            diagnostics,
            ..Self::default()
        }
    }

    /// Bind `resource` at `path`. Paths are registered once, at startup.
    pub fn register(
        &mut self,
        path: ResourcePath,
        resource: impl Into<SiteResource>,
    ) -> Result<(), SiteError> {
        let mut node = &mut self.root;
        for segment in path.segments() {
            node = node.children.entry(segment.clone()).or_default();
        }
        if node.resource.is_some() {
            return Err(SiteError::DuplicatePath(path));
        }
        node.resource = Some(Arc::new(resource.into()));
        self.len += 1;
        self.diagnostics.registered(&path);
        Ok(())
    }

    /// Resource bound exactly at `path`.
    pub fn resolve(&self, path: &ResourcePath) -> Result<&Arc<SiteResource>, SiteError> {
        let mut node = &self.root;
        for segment in path.segments() {
            node = node
                .children
                .get(segment)
                .ok_or_else(|| SiteError::NotFound(path.clone()))?;
        }
        node.resource
            .as_ref()
            .ok_or_else(|| SiteError::NotFound(path.clone()))
    }

    /// Resolve `request.path` and run the method handler. The handler's
    /// response is returned unchanged.
    pub async fn dispatch(&self, request: &Request) -> Result<Response, SiteError> {
        let resource = self.resolve(&request.path)?;
        resource.handle(request).await
    }

    /// Registered paths in depth-first, segment-sorted order.
    pub fn paths(&self) -> Vec<ResourcePath> {
        self.entries().into_iter().map(|(path, _)| path).collect()
    }

    /// Discovery listing for an external link-format renderer.
    pub fn links(&self) -> Vec<LinkEntry> {
        self.entries()
            .into_iter()
            .map(|(path, resource)| LinkEntry {
                path,
                title: resource.title().map(str::to_string),
                content_formats: resource.content_formats(),
                observable: resource.is_observable(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn entries(&self) -> Vec<(ResourcePath, &Arc<SiteResource>)> {
        let mut out = Vec::with_capacity(self.len);
        let mut prefix = Vec::new();
        collect(&self.root, &mut prefix, &mut out);
        out
    }
}

fn collect<'a>(
    node: &'a Node,
    prefix: &mut Vec<String>,
    out: &mut Vec<(ResourcePath, &'a Arc<SiteResource>)>,
) {
    if let Some(resource) = &node.resource {
        out.push((ResourcePath::new(prefix.iter().cloned()), resource));
    }
    for (segment, child) in &node.children {
        prefix.push(segment.clone());
        collect(child, prefix, out);
        prefix.pop();
    }
}
