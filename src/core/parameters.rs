use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::ports::ParameterStore;
use crate::utils::cache::MemoCache;
use crate::utils::error::Result;

/// Memoizes another parameter store for the life of the container.
pub struct CachedParameters {
    inner: Arc<dyn ParameterStore>,
    cache: MemoCache<String, String>,
}

impl CachedParameters {
    pub fn new(inner: Arc<dyn ParameterStore>, capacity: usize, ttl: Option<Duration>) -> Self {
        Self {
            inner,
            cache: MemoCache::new(capacity, ttl),
        }
    }
}

#[async_trait]
impl ParameterStore for CachedParameters {
    async fn get_parameter(&self, name: &str) -> Result<String> {
        if let Some(value) = self.cache.get(&name.to_string()).await {
            return Ok(value);
        }

        let value = self.inner.get_parameter(name).await?;
        tracing::debug!(parameter = name, "Loaded parameter");
        self.cache.put(name.to_string(), value.clone()).await;
        Ok(value)
    }
}
