//! Ordered JSON-RPC middleware chain with a block-polling lifecycle.
//!
//! Every request enters at the first middleware. A middleware answers it,
//! rewrites it and calls [`Next::call`], or re-enters the chain from the top
//! with [`Next::dispatch`] to issue requests of its own.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use serde_json::Value;

use venly_provider_core::{
    parse_hex_quantity, JsonRpcRequest, JsonRpcResponse, ProviderError, RpcError,
};

pub trait Middleware: Send + Sync {
    fn name(&self) -> &'static str;

    fn handle(&self, request: &JsonRpcRequest, next: Next<'_>) -> Result<Value, ProviderError>;
}

/// Position of a request inside the chain.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    root: &'a [Arc<dyn Middleware>],
    rest: &'a [Arc<dyn Middleware>],
}

impl<'a> Next<'a> {
    pub fn call(self, request: &JsonRpcRequest) -> Result<Value, ProviderError> {
        match self.rest.split_first() {
            Some((head, tail)) => head.handle(
                request,
                Next {
                    root: self.root,
                    rest: tail,
                },
            ),
            None => Err(ProviderError::Rpc(RpcError::method_not_found(
                &request.method,
            ))),
        }
    }

    /// Sends `request` through the whole chain, starting at the first middleware.
    pub fn dispatch(self, request: &JsonRpcRequest) -> Result<Value, ProviderError> {
        run_chain(self.root, request)
    }
}

pub fn run_chain(
    chain: &[Arc<dyn Middleware>],
    request: &JsonRpcRequest,
) -> Result<Value, ProviderError> {
    Next {
        root: chain,
        rest: chain,
    }
    .call(request)
}

/// Latest block number seen by the poller, shared with block-aware middleware.
#[derive(Debug, Clone, Default)]
pub struct BlockTracker {
    latest: Arc<Mutex<Option<u64>>>,
}

impl BlockTracker {
    pub fn latest(&self) -> Option<u64> {
        match self.latest.lock() {
            Ok(g) => *g,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Records `block`; returns true when it moves the tracker forward.
    pub fn update(&self, block: u64) -> bool {
        let mut g = match self.latest.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        if g.map_or(true, |current| block > current) {
            *g = Some(block);
            return true;
        }
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Stopped,
    Running,
}

struct Poller {
    stop: mpsc::Sender<()>,
    handle: thread::JoinHandle<()>,
}

pub struct ProviderEngine {
    chain: Arc<Vec<Arc<dyn Middleware>>>,
    polling_interval: Duration,
    block_tracker: BlockTracker,
    poller: Option<Poller>,
}

impl ProviderEngine {
    pub fn new(polling_interval: Duration) -> Self {
        Self {
            chain: Arc::new(Vec::new()),
            polling_interval,
            block_tracker: BlockTracker::default(),
            poller: None,
        }
    }

    pub fn block_tracker(&self) -> BlockTracker {
        self.block_tracker.clone()
    }

    pub fn add_middleware(&mut self, middleware: Arc<dyn Middleware>) -> Result<(), ProviderError> {
        if self.is_running() {
            return Err(ProviderError::Validation(
                "middleware cannot be added to a running engine".to_owned(),
            ));
        }
        Arc::make_mut(&mut self.chain).push(middleware);
        Ok(())
    }

    pub fn middleware(&self) -> &[Arc<dyn Middleware>] {
        &self.chain
    }

    pub fn middleware_names(&self) -> Vec<&'static str> {
        self.chain.iter().map(|m| m.name()).collect()
    }

    pub fn state(&self) -> EngineState {
        if self.poller.is_some() {
            EngineState::Running
        } else {
            EngineState::Stopped
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == EngineState::Running
    }

    /// Starts block polling. Connectivity errors are logged and polling goes on.
    pub fn start(&mut self) -> Result<(), ProviderError> {
        if self.is_running() {
            return Ok(());
        }
        let chain = Arc::clone(&self.chain);
        let tracker = self.block_tracker.clone();
        let interval = self.polling_interval;
        let (stop, stopped) = mpsc::channel::<()>();

        let handle = thread::Builder::new()
            .name("venly-block-poller".to_owned())
            .spawn(move || loop {
                poll_latest_block(&chain, &tracker);
                match stopped.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    _ => break,
                }
            })
            .map_err(|e| ProviderError::Transport(format!("failed to spawn block poller: {e}")))?;

        self.poller = Some(Poller { stop, handle });
        tracing::info!(
            middleware = self.chain.len(),
            polling_interval_ms = interval.as_millis() as u64,
            "provider engine started"
        );
        Ok(())
    }

    pub fn stop(&mut self) {
        let Some(poller) = self.poller.take() else {
            return;
        };
        let _ = poller.stop.send(());
        if poller.handle.join().is_err() {
            tracing::error!("block poller panicked");
        }
        tracing::info!("provider engine stopped");
    }

    /// Runs `request` through the chain. A stopped engine refuses requests.
    pub fn handle(&self, request: &JsonRpcRequest) -> Result<Value, ProviderError> {
        if !self.is_running() {
            return Err(ProviderError::NotInitialised(
                "provider engine is stopped".to_owned(),
            ));
        }
        run_chain(&self.chain, request)
    }

    pub fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        self.handle(&JsonRpcRequest::new(method, params))
    }

    pub fn send(&self, request: &JsonRpcRequest) -> JsonRpcResponse {
        JsonRpcResponse::from_outcome(request.id.clone(), self.handle(request))
    }
}

impl Drop for ProviderEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

fn poll_latest_block(chain: &[Arc<dyn Middleware>], tracker: &BlockTracker) {
    let request = JsonRpcRequest::new("eth_blockNumber", serde_json::json!([]));
    let block = run_chain(chain, &request).and_then(|value| {
        let raw = value.as_str().ok_or_else(|| {
            ProviderError::Validation(format!("eth_blockNumber: hex string expected, got {value}"))
        })?;
        let block = parse_hex_quantity("block number", raw)?;
        u64::try_from(block)
            .map_err(|_| ProviderError::Validation(format!("block number out of range: {block}")))
    });
    match block {
        Ok(block) => {
            if tracker.update(block) {
                tracing::debug!(block, "new block");
            }
        }
        Err(err) => tracing::error!(error = %err, "provider engine connectivity error"),
    }
}
