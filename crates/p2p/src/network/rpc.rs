//! Per-method throttled RPC dispatch.
//!
//! Every RPC method registered on a peer gets its own
//! [`ThrottlingTaskQueue`], so a burst of requests for one method cannot
//! starve another method on the same peer.

use super::throttle::ThrottlingTaskQueue;
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::FutureExt;
use meridian_core::{Connection, RpcError, RpcHandler, RpcResponseHandler, RpcStreamController};
use meridian_types::RpcMethod;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// A request that has been admitted to (or is waiting in) its method's queue.
pub type PendingRequest = BoxFuture<'static, Result<Box<dyn RpcStreamController>, RpcError>>;

/// One RPC method's delegate behind its own concurrency budget.
pub struct ThrottledRpcMethodHandler<C: Connection> {
    delegate: Arc<dyn RpcHandler<C>>,
    requests: ThrottlingTaskQueue,
}

impl<C: Connection> ThrottledRpcMethodHandler<C> {
    /// Wrap `delegate`, allowing `max_concurrent` outstanding requests.
    pub fn new(delegate: Arc<dyn RpcHandler<C>>, max_concurrent: usize) -> Self {
        Self {
            delegate,
            requests: ThrottlingTaskQueue::new(max_concurrent),
        }
    }

    /// The method this handler serves.
    pub fn method(&self) -> RpcMethod {
        self.delegate.method()
    }

    /// Queue a request. It is admitted immediately if the method has budget
    /// left, otherwise after the requests queued before it.
    ///
    /// Failures of the delegate come back through the returned future and
    /// free the slot like any other completion.
    pub fn send_request(
        &self,
        connection: Arc<C>,
        request: Bytes,
        response_handler: Arc<dyn RpcResponseHandler>,
    ) -> PendingRequest {
        let delegate = Arc::clone(&self.delegate);
        let queued = self.requests.queue_task(move || async move {
            delegate
                .send_request(&connection, request, response_handler)
                .await
        });

        async move { queued.await.map_err(|_| RpcError::Aborted)? }.boxed()
    }

    /// Requests currently on the wire for this method.
    pub fn in_flight(&self) -> usize {
        self.requests.in_flight()
    }

    /// Requests waiting for budget.
    pub fn queued(&self) -> usize {
        self.requests.queued()
    }
}

/// The methods a peer supports, each behind its own throttle.
///
/// Built once per connection and never modified afterwards.
pub struct RpcMethodTable<C: Connection> {
    handlers: HashMap<RpcMethod, ThrottledRpcMethodHandler<C>>,
}

impl<C: Connection> RpcMethodTable<C> {
    /// Build the table from the delegates this connection supports.
    ///
    /// If two delegates claim the same method, the first one wins.
    pub fn new(delegates: Vec<Arc<dyn RpcHandler<C>>>, max_concurrent: usize) -> Self {
        let mut handlers = HashMap::with_capacity(delegates.len());
        for delegate in delegates {
            let method = delegate.method();
            if handlers.contains_key(&method) {
                warn!(%method, "Ignoring duplicate rpc handler registration");
                continue;
            }
            handlers.insert(method, ThrottledRpcMethodHandler::new(delegate, max_concurrent));
        }
        Self { handlers }
    }

    /// Look up the handler for `method`.
    pub fn get(&self, method: RpcMethod) -> Option<&ThrottledRpcMethodHandler<C>> {
        self.handlers.get(&method)
    }

    /// Whether `method` is registered.
    pub fn supports(&self, method: RpcMethod) -> bool {
        self.handlers.contains_key(&method)
    }

    /// Registered methods, in declaration order.
    pub fn methods(&self) -> Vec<RpcMethod> {
        let mut methods: Vec<_> = self.handlers.keys().copied().collect();
        methods.sort();
        methods
    }
}
