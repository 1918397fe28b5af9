//! Bounded pool of open source handles.
//!
//! Handles are keyed by catalog id and kept in least-recently-used order.
//! Checking a batch out removes its handles from the pool; checking them
//! back in may evict (and so close) handles of sources the batch did not
//! touch.

use std::collections::HashSet;
use std::fmt;
use std::num::NonZeroUsize;

use lru::LruCache;
use vidlane_catalog::Source;
use vidlane_common::error::{VidlaneError, VidlaneResult};

use crate::extractor::FrameExtractor;

pub struct HandlePool<H> {
    cache: LruCache<usize, H>,
    limit: NonZeroUsize,
}

impl<H> HandlePool<H> {
    /// Pool holding at most `limit` open handles.
    pub fn new(limit: usize) -> VidlaneResult<Self> {
        let limit = NonZeroUsize::new(limit)
            .ok_or_else(|| VidlaneError::configuration("handle pool limit must be positive"))?;
        Ok(Self {
            cache: LruCache::new(limit),
            limit,
        })
    }

    pub fn limit(&self) -> usize {
        self.limit.get()
    }

    /// Handles currently parked in the pool.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn contains(&self, source_id: usize) -> bool {
        self.cache.contains(&source_id)
    }

    /// Take one handle per source, opening the ones not already pooled.
    ///
    /// Fails with a resource error when the sources outnumber the pool
    /// limit, before anything is opened.
    pub fn checkout<E>(&mut self, extractor: &E, sources: &[&Source]) -> VidlaneResult<Vec<H>>
    where
        E: FrameExtractor<Handle = H>,
    {
        let distinct: HashSet<usize> = sources.iter().map(|s| s.id).collect();
        if distinct.len() > self.limit() {
            return Err(VidlaneError::resource(format!(
                "batch needs {} open sources but at most {} may be open",
                distinct.len(),
                self.limit()
            )));
        }
        if distinct.len() != sources.len() {
            return Err(VidlaneError::resource(
                "a source cannot be checked out twice for one batch",
            ));
        }

        let mut handles = Vec::with_capacity(sources.len());
        for source in sources {
            let handle = match self.cache.pop(&source.id) {
                Some(handle) => handle,
                None => {
                    tracing::trace!(source_id = source.id, path = %source.path.display(), "Opening source");
                    extractor.open(source).map_err(|e| match e {
                        VidlaneError::Extraction { message } => VidlaneError::extraction(format!(
                            "failed to open {}: {message}",
                            source.path.display()
                        )),
                        other => other,
                    })?
                }
            };
            handles.push(handle);
        }
        Ok(handles)
    }

    /// Return handles after a draw. Least recently used handles beyond the
    /// limit are closed.
    pub fn checkin(&mut self, handles: impl IntoIterator<Item = (usize, H)>) {
        for (source_id, handle) in handles {
            if let Some((evicted, _)) = self.cache.push(source_id, handle) {
                if evicted != source_id {
                    tracing::trace!(source_id = evicted, "Closed idle source");
                }
            }
        }
    }

    /// Close every pooled handle.
    pub fn clear(&mut self) {
        self.cache.clear();
    }
}

impl<H> fmt::Debug for HandlePool<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlePool")
            .field("open", &self.cache.len())
            .field("limit", &self.limit)
            .finish()
    }
}
