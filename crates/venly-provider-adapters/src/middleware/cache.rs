use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;

use venly_provider_core::{JsonRpcRequest, ProviderError};

use crate::engine::{BlockTracker, Middleware, Next};

/// Permanent answers kept before the oldest ones are evicted.
pub const DEFAULT_PERMANENT_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheScope {
    /// Answer can never change.
    Permanent,
    /// Answer is valid until the next block.
    Block,
}

/// Cache scope of `request`, or `None` when it must always reach the node.
pub fn cache_scope(request: &JsonRpcRequest) -> Option<CacheScope> {
    if request
        .params()
        .iter()
        .any(|p| p.as_str() == Some("pending"))
    {
        return None;
    }
    match request.method.as_str() {
        "eth_chainId"
        | "net_version"
        | "eth_getBlockByHash"
        | "eth_getBlockTransactionCountByHash"
        | "eth_getTransactionByHash"
        | "eth_getTransactionByBlockHashAndIndex"
        | "eth_getTransactionReceipt"
        | "eth_getCode" => Some(CacheScope::Permanent),
        "eth_gasPrice"
        | "eth_getBalance"
        | "eth_getStorageAt"
        | "eth_getTransactionCount"
        | "eth_getBlockByNumber"
        | "eth_call"
        | "eth_estimateGas"
        | "eth_getLogs" => Some(CacheScope::Block),
        _ => None,
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    block: Option<u64>,
}

#[derive(Debug, Default)]
struct Entries {
    map: HashMap<String, CacheEntry>,
    // insertion order of permanent keys, oldest first
    permanent: VecDeque<String>,
}

/// Response cache keyed by method and params.
///
/// Block-scoped entries are only served while the block tracker still reports
/// the block they were stored at. Permanent entries are bounded and evicted
/// oldest first. `null` answers are never cached.
#[derive(Debug)]
pub struct CacheMiddleware {
    tracker: BlockTracker,
    permanent_capacity: usize,
    entries: Mutex<Entries>,
}

impl CacheMiddleware {
    pub fn new(tracker: BlockTracker) -> Self {
        Self::with_capacity(tracker, DEFAULT_PERMANENT_CAPACITY)
    }

    pub fn with_capacity(tracker: BlockTracker, permanent_capacity: usize) -> Self {
        Self {
            tracker,
            permanent_capacity,
            entries: Mutex::new(Entries::default()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|g| g.map.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn key(request: &JsonRpcRequest) -> String {
        format!("{}:{}", request.method, request.params)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Entries>, ProviderError> {
        self.entries
            .lock()
            .map_err(|e| ProviderError::Transport(format!("cache lock poisoned: {e}")))
    }

    fn lookup(&self, key: &str, latest: Option<u64>) -> Result<Option<Value>, ProviderError> {
        let g = self.lock()?;
        Ok(g.map.get(key).and_then(|entry| match entry.block {
            None => Some(entry.value.clone()),
            Some(block) if latest == Some(block) => Some(entry.value.clone()),
            Some(_) => None,
        }))
    }

    fn store(&self, key: String, value: Value, block: Option<u64>) -> Result<(), ProviderError> {
        let mut g = self.lock()?;
        match block {
            Some(current) => g
                .map
                .retain(|_, entry| entry.block.map_or(true, |b| b == current)),
            None => {
                if self.permanent_capacity == 0 {
                    return Ok(());
                }
                while g.permanent.len() >= self.permanent_capacity {
                    let Some(oldest) = g.permanent.pop_front() else {
                        break;
                    };
                    g.map.remove(&oldest);
                }
                g.permanent.push_back(key.clone());
            }
        }
        g.map.insert(key, CacheEntry { value, block });
        Ok(())
    }
}

impl Middleware for CacheMiddleware {
    fn name(&self) -> &'static str {
        "cache"
    }

    fn handle(&self, request: &JsonRpcRequest, next: Next<'_>) -> Result<Value, ProviderError> {
        let Some(scope) = cache_scope(request) else {
            return next.call(request);
        };
        let latest = self.tracker.latest();
        if scope == CacheScope::Block && latest.is_none() {
            return next.call(request);
        }

        let key = Self::key(request);
        if let Some(hit) = self.lookup(&key, latest)? {
            return Ok(hit);
        }

        let value = next.call(request)?;
        if !value.is_null() {
            let block = match scope {
                CacheScope::Permanent => None,
                CacheScope::Block => latest,
            };
            self.store(key, value.clone(), block)?;
        }
        Ok(value)
    }
}
