use std::any::Any;
use std::sync::Arc;
use std::time::Instant;

use kameo::actor::{ActorRef, WeakActorRef};
use kameo::error::{ActorStopReason, BoxError};
use kameo::message::{Context, Message};
use kameo::request::MessageSend;
use kameo::{Actor, mailbox::unbounded::UnboundedMailbox};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::market_profile::structs::MarketProfileConfig;
use super::errors::{ComputationError, DispatchError};
use super::messages::{ComputationRequest, ComputationResponse, DispatcherStats, DispatcherTell, GetStats};
use super::registry::ComputationRegistry;

/// Single worker that runs computations one at a time, in mailbox order.
///
/// Each computation runs on the blocking pool and is awaited before the next
/// message is taken, so replies leave in the order requests arrived.
pub struct ComputationActor {
    registry: Arc<ComputationRegistry>,
    responses: Option<mpsc::UnboundedSender<ComputationResponse>>,
    stats: DispatcherStats,
}

impl ComputationActor {
    pub fn new(registry: Arc<ComputationRegistry>) -> Self {
        Self {
            registry,
            responses: None,
            stats: DispatcherStats::default(),
        }
    }

    /// Replies to posted requests are pushed into `sender`.
    pub fn with_response_channel(mut self, sender: mpsc::UnboundedSender<ComputationResponse>) -> Self {
        self.responses = Some(sender);
        self
    }

    async fn process(&mut self, request: ComputationRequest) -> ComputationResponse {
        let ComputationRequest { id, kind, data, options } = request;
        let started = Instant::now();

        let outcome = match self.registry.get(&kind) {
            None => Err(ComputationError::UnknownType(kind.clone())),
            Some(computation) => {
                match tokio::task::spawn_blocking(move || computation.compute(&data, &options)).await {
                    Ok(result) => result,
                    Err(join_error) if join_error.is_panic() => {
                        Err(ComputationError::Panicked(panic_message(join_error.into_panic())))
                    }
                    Err(join_error) => Err(ComputationError::Panicked(join_error.to_string())),
                }
            }
        };

        self.stats.processed += 1;
        match outcome {
            Ok(result) => {
                self.stats.succeeded += 1;
                debug!("Request {} ({}) completed in {:?}", id, kind, started.elapsed());
                ComputationResponse::success(id, result)
            }
            Err(e) => {
                self.stats.failed += 1;
                error!("Request {} ({}) failed: {}", id, kind, e);
                ComputationResponse::failure(id, &e)
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

impl Actor for ComputationActor {
    type Mailbox = UnboundedMailbox<Self>;

    fn name() -> &'static str {
        "ComputationActor"
    }

    async fn on_start(&mut self, _actor_ref: ActorRef<Self>) -> Result<(), BoxError> {
        info!("Starting computation worker with types {:?}", self.registry.kinds());
        Ok(())
    }

    async fn on_stop(&mut self, _actor_ref: WeakActorRef<Self>, reason: ActorStopReason) -> Result<(), BoxError> {
        info!(
            "Stopping computation worker: {:?} ({} processed, {} failed)",
            reason, self.stats.processed, self.stats.failed
        );
        Ok(())
    }
}

impl Message<ComputationRequest> for ComputationActor {
    type Reply = ComputationResponse;

    async fn handle(&mut self, msg: ComputationRequest, _ctx: Context<'_, Self, Self::Reply>) -> Self::Reply {
        self.process(msg).await
    }
}

impl Message<DispatcherTell> for ComputationActor {
    type Reply = ();

    async fn handle(&mut self, msg: DispatcherTell, _ctx: Context<'_, Self, Self::Reply>) -> Self::Reply {
        match msg {
            DispatcherTell::Post(request) => {
                let response = self.process(request).await;
                match &self.responses {
                    Some(sender) => {
                        if sender.send(response).is_err() {
                            warn!("Response stream receiver dropped; discarding reply");
                        }
                    }
                    None => warn!("No response stream attached; discarding reply to {}", response.id),
                }
            }
        }
    }
}

impl Message<GetStats> for ComputationActor {
    type Reply = DispatcherStats;

    async fn handle(&mut self, _msg: GetStats, _ctx: Context<'_, Self, Self::Reply>) -> Self::Reply {
        self.stats
    }
}

/// Caller-side handle to the computation worker.
///
/// `compute` resolves to the reply of one request. `post` queues a request
/// whose reply is read later from `next_response`; both share one FIFO
/// mailbox. No timeout is applied; race `compute` against a timer if needed.
pub struct ComputationDispatcher {
    actor_ref: ActorRef<ComputationActor>,
    responses: mpsc::UnboundedReceiver<ComputationResponse>,
}

impl ComputationDispatcher {
    /// Spawn a worker over `registry`. Must be called inside a tokio runtime.
    pub fn spawn(registry: ComputationRegistry) -> Self {
        let (sender, responses) = mpsc::unbounded_channel();
        let actor = ComputationActor::new(Arc::new(registry)).with_response_channel(sender);
        let actor_ref = kameo::spawn(actor);
        Self { actor_ref, responses }
    }

    /// Worker serving `"tpo"` and `"volumeProfile"` with `config` defaults.
    pub fn with_config(config: &MarketProfileConfig) -> Self {
        Self::spawn(ComputationRegistry::with_market_profile(config.clone()))
    }

    pub async fn compute(&self, request: ComputationRequest) -> Result<ComputationResponse, DispatchError> {
        self.actor_ref
            .ask(request)
            .await
            .map_err(|e| DispatchError::WorkerStopped(e.to_string()))
    }

    pub async fn post(&self, request: ComputationRequest) -> Result<(), DispatchError> {
        self.actor_ref
            .tell(DispatcherTell::Post(request))
            .send()
            .await
            .map_err(|e| DispatchError::WorkerStopped(e.to_string()))
    }

    /// Next reply to a posted request, in posting order.
    pub async fn next_response(&mut self) -> Result<ComputationResponse, DispatchError> {
        self.responses.recv().await.ok_or(DispatchError::ChannelClosed)
    }

    pub async fn stats(&self) -> Result<DispatcherStats, DispatchError> {
        self.actor_ref
            .ask(GetStats)
            .await
            .map_err(|e| DispatchError::WorkerStopped(e.to_string()))
    }

    pub async fn shutdown(self) -> Result<(), DispatchError> {
        self.actor_ref
            .stop_gracefully()
            .await
            .map_err(|e| DispatchError::WorkerStopped(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::registry::Computation;
    use serde_json::{json, Value};
    use std::time::Duration;

    struct Panicking;

    impl Computation for Panicking {
        fn kind(&self) -> &'static str {
            "boom"
        }

        fn compute(&self, _data: &Value, _options: &Value) -> Result<Value, ComputationError> {
            panic!("exploded while computing");
        }
    }

    struct Slow;

    impl Computation for Slow {
        fn kind(&self) -> &'static str {
            "slow"
        }

        fn compute(&self, _data: &Value, _options: &Value) -> Result<Value, ComputationError> {
            std::thread::sleep(Duration::from_millis(200));
            Ok(json!("done"))
        }
    }

    fn dispatcher() -> ComputationDispatcher {
        let mut registry = ComputationRegistry::with_market_profile(MarketProfileConfig::default());
        registry.register(Panicking);
        registry.register(Slow);
        ComputationDispatcher::spawn(registry)
    }

    #[tokio::test]
    async fn test_compute_echoes_id() {
        let dispatcher = dispatcher();
        let response = dispatcher
            .compute(ComputationRequest::new("x1", "tpo", json!([]), Value::Null))
            .await
            .unwrap();

        assert_eq!(response.id.to_string(), "x1");
        assert!(response.success);
        assert_eq!(response.result, Some(json!({ "sessions": [] })));
    }

    #[tokio::test]
    async fn test_unknown_type_is_a_failure_reply() {
        let dispatcher = dispatcher();
        let response = dispatcher
            .compute(ComputationRequest::new("u", "macd", json!([]), Value::Null))
            .await
            .unwrap();

        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("unknown type: macd"));
        assert!(response.result.is_none());
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let dispatcher = dispatcher();
        let response = dispatcher
            .compute(ComputationRequest::new("p", "boom", Value::Null, Value::Null))
            .await
            .unwrap();
        assert!(!response.success);
        assert!(response.error.unwrap().contains("exploded while computing"));

        // worker still answers afterwards
        let response = dispatcher
            .compute(ComputationRequest::new("after", "tpo", json!([]), Value::Null))
            .await
            .unwrap();
        assert!(response.success);

        let stats = dispatcher.stats().await.unwrap();
        assert_eq!(stats, DispatcherStats { processed: 2, succeeded: 1, failed: 1 });
    }

    #[tokio::test]
    async fn test_posted_responses_keep_order() {
        let mut dispatcher = dispatcher();
        let kinds = ["tpo", "volumeProfile", "macd", "tpo"];

        for (i, kind) in kinds.iter().enumerate() {
            dispatcher
                .post(ComputationRequest::new(format!("req-{}", i), *kind, json!([]), Value::Null))
                .await
                .unwrap();
        }

        for (i, kind) in kinds.iter().enumerate() {
            let response = dispatcher.next_response().await.unwrap();
            assert_eq!(response.id.to_string(), format!("req-{}", i));
            assert_eq!(response.success, *kind != "macd");
        }
    }

    #[tokio::test]
    async fn test_caller_side_timeout() {
        let dispatcher = dispatcher();

        let timed_out = tokio::time::timeout(
            Duration::from_millis(20),
            dispatcher.compute(ComputationRequest::new("slow-1", "slow", Value::Null, Value::Null)),
        )
        .await;
        assert!(timed_out.is_err());

        // the abandoned request still runs to completion ahead of this one
        let response = dispatcher
            .compute(ComputationRequest::new("next", "tpo", json!([]), Value::Null))
            .await
            .unwrap();
        assert_eq!(response.id.to_string(), "next");
        assert_eq!(dispatcher.stats().await.unwrap().processed, 2);
    }

    #[tokio::test]
    async fn test_shutdown() {
        let dispatcher = dispatcher();
        dispatcher
            .compute(ComputationRequest::new("last", "tpo", json!([]), Value::Null))
            .await
            .unwrap();
        assert!(dispatcher.shutdown().await.is_ok());
    }
}
