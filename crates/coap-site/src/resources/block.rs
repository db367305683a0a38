// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Large mutable resource served and updated block-wise.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use crate::chunked::{BlockAssembler, BlockOption, ChunkedContent, ContentSnapshot, PaddingPolicy};
use crate::diagnostics::Diagnostics;
use crate::error::SiteError;
use crate::message::{ContentFormat, Method, Request, Response, ResponseCode};

const DEFAULT_MAX_UPLOADS: usize = 64;
const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(247);

// ---------------------------------------------------------------------------
// Upload table
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct PendingUpload {
    assembler: BlockAssembler,
    last_activity: Instant,
}

/// In-progress Block1 uploads keyed by peer address. Idle uploads expire,
/// and the oldest one is dropped when the table is full.
#[derive(Debug)]
struct UploadTable {
    uploads: HashMap<String, PendingUpload>,
    max_uploads: usize,
    timeout: Duration,
}

impl UploadTable {
    fn new(max_uploads: usize, timeout: Duration) -> Self {
        Self {
            uploads: HashMap::new(),
            max_uploads: max_uploads.max(1),
            timeout,
        }
    }

    fn evict_expired(&mut self, now: Instant) {
        let timeout = self.timeout;
        self.uploads
            .retain(|_, upload| now.duration_since(upload.last_activity) <= timeout);
    }

    /// Feed one block from `peer`. The entry is dropped once the upload
    /// completes or fails.
    fn insert(
        &mut self,
        peer: &str,
        block: BlockOption,
        data: &[u8],
    ) -> Result<Option<Vec<u8>>, SiteError> {
        let now = Instant::now();
        self.evict_expired(now);

        if !self.uploads.contains_key(peer) && self.uploads.len() >= self.max_uploads {
            let oldest = self
                .uploads
                .iter()
                .min_by_key(|(_, upload)| upload.last_activity)
                .map(|(peer, _)| peer.clone());
            if let Some(oldest) = oldest {
                self.uploads.remove(&oldest);
            }
        }

        let upload = self
            .uploads
            .entry(peer.to_string())
            .or_insert_with(|| PendingUpload {
                assembler: BlockAssembler::new(),
                last_activity: now,
            });
        upload.last_activity = now;
        let result = upload.assembler.insert(block, data);
        if !matches!(result, Ok(None)) {
            self.uploads.remove(peer);
        }
        result
    }

    fn len(&self) -> usize {
        self.uploads.len()
    }
}

// ---------------------------------------------------------------------------
// Resource
// ---------------------------------------------------------------------------

/// GET returns the stored blob, PUT replaces it. Content shorter than the
/// padding threshold is padded so every transfer spans several blocks.
#[derive(Debug)]
pub struct BlockResource {
    content: ChunkedContent,
    uploads: Mutex<UploadTable>,
    diagnostics: Diagnostics,
}

impl BlockResource {
    pub fn new(initial: impl Into<Vec<u8>>, padding: PaddingPolicy, diagnostics: Diagnostics) -> Self {
        Self {
            content: ChunkedContent::new(initial, padding),
            uploads: Mutex::new(UploadTable::new(DEFAULT_MAX_UPLOADS, DEFAULT_UPLOAD_TIMEOUT)),
            diagnostics,
        }
    }

    /// Bound the number of concurrent uploads and how long an idle one is
    /// kept.
    pub fn with_upload_limits(self, max_uploads: usize, timeout: Duration) -> Self {
        Self {
            uploads: Mutex::new(UploadTable::new(max_uploads, timeout)),
            ..self
        }
    }

    pub fn content(&self) -> &ChunkedContent {
        &self.content
    }

    /// Unfinished uploads currently held.
    pub fn pending_uploads(&self) -> usize {
        self.uploads.lock().len()
    }

    pub(crate) fn get(&self, request: &Request) -> Result<Response, SiteError> {
        let snapshot = self.content.snapshot();
        let mut response = match request.block2 {
            Some(block) => {
                let (data, served) = snapshot.read_block(block)?;
                let mut response = Response::content(data, ContentFormat::TEXT);
                response.block2 = Some(served);
                response
            }
            None => Response::content(snapshot.bytes(), ContentFormat::TEXT),
        };
        response.etag = Some(snapshot.etag());
        Ok(response)
    }

    pub(crate) fn put(&self, request: &Request) -> Result<Response, SiteError> {
        let Some(block) = request.block1 else {
            return Ok(self.store(request, request.payload.clone()));
        };

        let assembled =
            self.uploads
                .lock()
                .insert(&request.remote.hostinfo, block, &request.payload)?;

        match assembled {
            Some(body) => {
                let mut response = self.store(request, body);
                response.block1 = Some(block);
                Ok(response)
            }
            None => {
                let mut response = Response::new(ResponseCode::Continue);
                response.block1 = Some(block);
                Ok(response)
            }
        }
    }

    fn store(&self, request: &Request, body: Vec<u8>) -> Response {
        self.diagnostics.payload(&request.path, Method::Put, &body);
        let snapshot: Arc<ContentSnapshot> = self.content.replace(body);
        let mut response = Response::new(ResponseCode::Changed).with_payload(snapshot.bytes());
        response.etag = Some(snapshot.etag());
        response
    }
}
