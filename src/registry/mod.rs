//! Devfile registry lookups.
//!
//! The index is fetched once per process. Sample devfiles are kept in a
//! bounded LRU so repeated detections of the same stack do not refetch.

pub mod index;

pub use index::{RegistryEntry, RegistryIndex};

use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};
use url::Url;

use crate::devfile::{self, DevfileParser};
use crate::errors::Result;
use crate::fetch::HttpFetcher;

/// A registry sample chosen for a detected language.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleMatch {
    pub name: String,
    pub devfile_url: String,
    pub dockerfile_url: Option<String>,
    pub devfile: Arc<Vec<u8>>,
}

pub struct RegistryMatcher {
    base_url: String,
    http: HttpFetcher,
    parser: Arc<dyn DevfileParser>,
    index: OnceCell<Arc<RegistryIndex>>,
    samples: Mutex<LruCache<String, Arc<Vec<u8>>>>,
}

impl RegistryMatcher {
    pub fn new(
        base_url: impl Into<String>,
        http: HttpFetcher,
        parser: Arc<dyn DevfileParser>,
        cache_capacity: usize,
    ) -> Self {
        let capacity = NonZeroUsize::new(cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
            parser,
            index: OnceCell::new(),
            samples: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// The registry index; fetched on first use. A failed fetch is not
    /// cached.
    pub async fn index(&self) -> Result<Arc<RegistryIndex>> {
        let index = self
            .index
            .get_or_try_init(|| async {
                let url = format!("{}/index", self.base_url);
                let body = self.http.get(&url).await?;
                let index = RegistryIndex::from_json(&body)?;
                info!(url = %url, samples = index.entries.len(), "loaded devfile registry index");
                Ok::<_, crate::errors::DetectionError>(Arc::new(index))
            })
            .await?;
        Ok(Arc::clone(index))
    }

    async fn sample_devfile(&self, url: &str) -> Result<Arc<Vec<u8>>> {
        if let Some(bytes) = self.samples.lock().get(url) {
            debug!(url, "sample devfile cache hit");
            return Ok(Arc::clone(bytes));
        }
        let bytes = Arc::new(self.http.get(url).await?);
        self.samples.lock().put(url.to_string(), Arc::clone(&bytes));
        Ok(bytes)
    }

    /// Sample devfile for a language; `Ok(None)` if the registry has none.
    pub async fn resolve(&self, language: &str, framework: Option<&str>) -> Result<Option<SampleMatch>> {
        let index = self.index().await?;
        let Some(entry) = index.best_match(language, framework) else {
            debug!(language, framework, "no registry sample matches");
            return Ok(None);
        };

        let devfile_url = entry
            .links
            .devfile
            .clone()
            .unwrap_or_else(|| format!("{}/devfiles/{}", self.base_url, entry.name));
        let devfile = self.sample_devfile(&devfile_url).await?;

        let dockerfile_url = match &entry.links.dockerfile {
            Some(url) => Some(url.clone()),
            None => self.dockerfile_from_sample(&devfile, &devfile_url).await?,
        };

        debug!(language, sample = %entry.name, "matched registry sample");
        Ok(Some(SampleMatch {
            name: entry.name.clone(),
            devfile_url,
            dockerfile_url,
            devfile,
        }))
    }

    async fn dockerfile_from_sample(&self, bytes: &[u8], devfile_url: &str) -> Result<Option<String>> {
        let mut parsed = self.parser.parse(bytes).await?;
        // A registry devfile URL is a document, not a directory; resolve
        // relative to its parent.
        let base = Url::parse(devfile_url)
            .ok()
            .and_then(|u| u.join("./").ok())
            .map(|u| u.to_string())
            .unwrap_or_else(|| devfile_url.to_string());
        devfile::rewrite_local_dockerfile_uris(self.parser.as_ref(), &mut parsed, &base)?;
        Ok(devfile::dockerfile_reference(&parsed))
    }
}

impl std::fmt::Debug for RegistryMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryMatcher")
            .field("base_url", &self.base_url)
            .field("cached_samples", &self.samples.lock().len())
            .finish()
    }
}
