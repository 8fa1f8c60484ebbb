use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;

use venly_provider_core::{JsonRpcRequest, ProviderError};

use crate::engine::{BlockTracker, Middleware, Next};
use crate::middleware::{quantity, to_quantity};

/// Most blocks a single `eth_getFilterChanges` walks back over.
pub const MAX_BLOCK_RANGE: u64 = 100;

#[derive(Debug, Clone)]
enum FilterKind {
    Block,
    PendingTransaction,
    Log(serde_json::Map<String, Value>),
}

#[derive(Debug, Clone)]
struct Filter {
    kind: FilterKind,
    last_block: u64,
}

#[derive(Debug, Default)]
struct FilterTable {
    next_id: u64,
    filters: HashMap<u64, Filter>,
}

/// Filters kept locally and answered by polling the rest of the chain.
///
/// The table lock is never held while requests are dispatched.
#[derive(Debug)]
pub struct FilterMiddleware {
    tracker: BlockTracker,
    table: Mutex<FilterTable>,
}

impl FilterMiddleware {
    pub fn new(tracker: BlockTracker) -> Self {
        Self {
            tracker,
            table: Mutex::new(FilterTable::default()),
        }
    }

    pub fn installed(&self) -> usize {
        self.table.lock().map(|g| g.filters.len()).unwrap_or_default()
    }

    fn table(&self) -> Result<MutexGuard<'_, FilterTable>, ProviderError> {
        self.table
            .lock()
            .map_err(|e| ProviderError::Transport(format!("filter table lock poisoned: {e}")))
    }

    fn current_block(&self, next: Next<'_>) -> Result<u64, ProviderError> {
        if let Some(block) = self.tracker.latest() {
            return Ok(block);
        }
        let latest = next.dispatch(&JsonRpcRequest::new(
            "eth_blockNumber",
            serde_json::json!([]),
        ))?;
        quantity("eth_blockNumber", &latest)
    }

    fn install(&self, kind: FilterKind, last_block: u64) -> Result<Value, ProviderError> {
        let mut g = self.table()?;
        g.next_id += 1;
        let id = g.next_id;
        g.filters.insert(id, Filter { kind, last_block });
        Ok(to_quantity(id))
    }

    fn lookup(&self, id: u64) -> Result<Filter, ProviderError> {
        self.table()?
            .filters
            .get(&id)
            .cloned()
            .ok_or_else(|| ProviderError::Validation(format!("filter not found: 0x{id:x}")))
    }

    fn advance(&self, id: u64, block: u64) -> Result<(), ProviderError> {
        if let Some(filter) = self.table()?.filters.get_mut(&id) {
            filter.last_block = filter.last_block.max(block);
        }
        Ok(())
    }

    fn changes(&self, id: u64, next: Next<'_>) -> Result<Value, ProviderError> {
        let filter = self.lookup(id)?;
        let current = self.current_block(next)?;
        if current <= filter.last_block {
            return Ok(Value::Array(Vec::new()));
        }
        let from = filter
            .last_block
            .saturating_add(1)
            .max(current.saturating_sub(MAX_BLOCK_RANGE - 1));

        let changes = match &filter.kind {
            FilterKind::PendingTransaction => Value::Array(Vec::new()),
            FilterKind::Block => {
                let mut hashes = Vec::new();
                for number in from..=current {
                    let block = next.dispatch(&JsonRpcRequest::new(
                        "eth_getBlockByNumber",
                        serde_json::json!([to_quantity(number), false]),
                    ))?;
                    if let Some(hash) = block.get("hash").filter(|h| !h.is_null()) {
                        hashes.push(hash.clone());
                    }
                }
                Value::Array(hashes)
            }
            FilterKind::Log(criteria) => {
                let mut range = criteria.clone();
                range.insert("fromBlock".to_owned(), to_quantity(from));
                range.insert("toBlock".to_owned(), to_quantity(current));
                next.dispatch(&JsonRpcRequest::new(
                    "eth_getLogs",
                    Value::Array(vec![Value::Object(range)]),
                ))?
            }
        };
        self.advance(id, current)?;
        Ok(changes)
    }
}

impl Middleware for FilterMiddleware {
    fn name(&self) -> &'static str {
        "filter"
    }

    fn handle(&self, request: &JsonRpcRequest, next: Next<'_>) -> Result<Value, ProviderError> {
        match request.method.as_str() {
            "eth_newBlockFilter" => {
                let current = self.current_block(next)?;
                self.install(FilterKind::Block, current)
            }
            "eth_newPendingTransactionFilter" => {
                let current = self.current_block(next)?;
                self.install(FilterKind::PendingTransaction, current)
            }
            "eth_newFilter" => {
                let criteria = request
                    .param(0)
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default();
                let current = self.current_block(next)?;
                self.install(FilterKind::Log(criteria), current)
            }
            "eth_getFilterChanges" => self.changes(filter_id(request)?, next),
            "eth_getFilterLogs" => match self.lookup(filter_id(request)?)?.kind {
                FilterKind::Log(criteria) => next.dispatch(&JsonRpcRequest::new(
                    "eth_getLogs",
                    Value::Array(vec![Value::Object(criteria)]),
                )),
                _ => Ok(Value::Array(Vec::new())),
            },
            "eth_uninstallFilter" => {
                let id = filter_id(request)?;
                Ok(Value::Bool(self.table()?.filters.remove(&id).is_some()))
            }
            _ => next.call(request),
        }
    }
}

fn filter_id(request: &JsonRpcRequest) -> Result<u64, ProviderError> {
    let raw = request.param(0).ok_or_else(|| {
        ProviderError::Validation(format!("{}: filter id expected", request.method))
    })?;
    quantity("filter id", raw)
}
