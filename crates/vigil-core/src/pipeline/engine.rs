//! Pipeline execution: ordering, timeouts and the fail-open/fail-closed contract.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, warn};

use super::{HookPhase, Plugin, PluginError, PluginFault, PluginOutcome, RequestPhaseOutcome};
use crate::domain::{RequestContext, ResponseCompleteContext};
use crate::events::GatewayEvent;
use crate::ports::GatewayEventEmitter;
use crate::settings::{FailMode, Settings, TimeoutPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    pub fail_mode: FailMode,
    pub plugin_timeout: Duration,
    pub timeout_policy: TimeoutPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from(&Settings::with_defaults())
    }
}

impl From<&Settings> for PipelineConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            fail_mode: settings.effective_fail_mode(),
            plugin_timeout: settings.effective_plugin_timeout(),
            timeout_policy: settings.effective_timeout_policy(),
        }
    }
}

/// Ordered plugin set plus the policy for running it.
///
/// Built once at startup and shared behind an `Arc`; each request runs its
/// own pass over it with no shared mutable state.
pub struct PluginPipeline {
    plugins: Vec<Arc<dyn Plugin>>,
    config: PipelineConfig,
    emitter: Arc<dyn GatewayEventEmitter>,
    tracker: TaskTracker,
}

impl PluginPipeline {
    pub fn new(config: PipelineConfig, emitter: Arc<dyn GatewayEventEmitter>) -> Self {
        Self {
            plugins: Vec::new(),
            config,
            emitter,
            tracker: TaskTracker::new(),
        }
    }

    /// Add a plugin, keeping the list sorted by priority.
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) {
        debug!(plugin = plugin.name(), priority = plugin.priority(), "Registered plugin");
        self.plugins.push(plugin);
        // Stable sort: equal priorities stay in registration order.
        self.plugins.sort_by_key(|p| p.priority());
    }

    /// Plugin names in execution order.
    pub fn plugin_names(&self) -> Vec<String> {
        self.plugins.iter().map(|p| p.name().to_string()).collect()
    }

    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Tracker holding detached hooks and background response phases.
    pub const fn tracker(&self) -> &TaskTracker {
        &self.tracker
    }

    /// Run the request hooks in order until one of them ends the chain.
    pub async fn run_request_phase(&self, mut ctx: RequestContext) -> RequestPhaseOutcome {
        let mut skipped = Vec::new();

        for plugin in &self.plugins {
            let name = plugin.name().to_string();
            let hook = {
                let plugin = Arc::clone(plugin);
                let snapshot = ctx.clone();
                async move { plugin.on_request(&snapshot).await }
            };

            match self.guarded(hook).await {
                Ok(PluginOutcome::Continue) => {}
                Ok(PluginOutcome::ModifiedBody(body)) => {
                    debug!(request_id = %ctx.id, plugin = %name, "Plugin rewrote request body");
                    ctx.apply_modified_body(body);
                }
                Ok(PluginOutcome::ShortCircuit(response)) => {
                    debug!(request_id = %ctx.id, plugin = %name, status = response.status, "Plugin short-circuited request");
                    self.emitter.emit(GatewayEvent::ShortCircuited {
                        request_id: ctx.id,
                        plugin: name.clone(),
                        status: response.status,
                    });
                    return RequestPhaseOutcome::ShortCircuit {
                        ctx,
                        plugin: name,
                        response,
                    };
                }
                Ok(PluginOutcome::Blocked { reason }) => {
                    warn!(request_id = %ctx.id, plugin = %name, reason = %reason, "Request blocked");
                    self.emitter.emit(GatewayEvent::RequestBlocked {
                        request_id: ctx.id,
                        plugin: name.clone(),
                        reason: reason.clone(),
                    });
                    return RequestPhaseOutcome::Blocked {
                        ctx,
                        plugin: name,
                        reason,
                    };
                }
                Err(e) => {
                    let fault = PluginFault {
                        plugin: name,
                        error: e.to_string(),
                    };
                    self.emit_fault(&ctx, &fault, HookPhase::Request);

                    match self.config.fail_mode {
                        FailMode::Closed => {
                            error!(request_id = %ctx.id, plugin = %fault.plugin, error = %fault.error, "Plugin failed; refusing request");
                            return RequestPhaseOutcome::Failed { ctx, fault };
                        }
                        FailMode::Open => {
                            warn!(request_id = %ctx.id, plugin = %fault.plugin, error = %fault.error, "Plugin failed; skipping");
                            skipped.push(fault);
                        }
                    }
                }
            }
        }

        RequestPhaseOutcome::Proceed { ctx, skipped }
    }

    /// Run every completion hook. Failures are logged and returned, and
    /// never stop the remaining hooks.
    pub async fn run_response_phase(&self, ctx: Arc<ResponseCompleteContext>) -> Vec<PluginFault> {
        let request = &ctx.request;
        self.emitter.emit(GatewayEvent::ResponseCompleted {
            request_id: request.id,
            provider: request.provider.clone(),
            model: request.model.clone(),
            status: ctx.status,
            latency_ms: u64::try_from(ctx.latency.as_millis()).unwrap_or(u64::MAX),
            usage: ctx.usage,
            streaming: ctx.streaming,
        });

        let mut faults = Vec::new();
        for plugin in &self.plugins {
            let hook = {
                let plugin = Arc::clone(plugin);
                let ctx = Arc::clone(&ctx);
                async move { plugin.on_response_complete(&ctx).await }
            };

            if let Err(e) = self.guarded(hook).await {
                let fault = PluginFault {
                    plugin: plugin.name().to_string(),
                    error: e.to_string(),
                };
                warn!(request_id = %ctx.request.id, plugin = %fault.plugin, error = %fault.error, "Response hook failed");
                self.emit_fault(&ctx.request, &fault, HookPhase::Response);
                faults.push(fault);
            }
        }
        faults
    }

    /// Run the response phase on the tracker without waiting for it.
    pub fn spawn_response_phase(self: &Arc<Self>, ctx: ResponseCompleteContext) {
        let pipeline = Arc::clone(self);
        self.tracker.spawn(async move {
            pipeline.run_response_phase(Arc::new(ctx)).await;
        });
    }

    /// Stop accepting tracked work and wait up to `grace` for what is in
    /// flight. Returns `false` if the grace period ran out.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        self.tracker.close();
        let drained = tokio::time::timeout(grace, self.tracker.wait()).await.is_ok();
        if !drained {
            warn!(
                pending = self.tracker.len(),
                grace_ms = u64::try_from(grace.as_millis()).unwrap_or(u64::MAX),
                "Plugin work still running after shutdown grace period"
            );
        }
        drained
    }

    /// Run one hook under the configured timeout and policy.
    ///
    /// `Detach` runs the hook on a tracked task and stops waiting at the
    /// deadline; the task keeps running and its result is dropped. `Cancel`
    /// drops the hook future at the deadline.
    async fn guarded<T, F>(&self, hook: F) -> Result<T, PluginError>
    where
        F: Future<Output = Result<T, PluginError>> + Send + 'static,
        T: Send + 'static,
    {
        let limit = self.config.plugin_timeout;
        match self.config.timeout_policy {
            TimeoutPolicy::Detach => {
                let handle = self.tracker.spawn(hook);
                match tokio::time::timeout(limit, handle).await {
                    Ok(Ok(result)) => result,
                    Ok(Err(join)) => Err(PluginError::Panicked(join.to_string())),
                    Err(_) => Err(PluginError::Timeout(limit)),
                }
            }
            TimeoutPolicy::Cancel => {
                match tokio::time::timeout(limit, AssertUnwindSafe(hook).catch_unwind()).await {
                    Ok(Ok(result)) => result,
                    Ok(Err(panic)) => Err(PluginError::Panicked(panic_message(panic.as_ref()))),
                    Err(_) => Err(PluginError::Timeout(limit)),
                }
            }
        }
    }

    fn emit_fault(&self, ctx: &RequestContext, fault: &PluginFault, phase: HookPhase) {
        self.emitter.emit(GatewayEvent::PluginFault {
            request_id: ctx.id,
            plugin: fault.plugin.clone(),
            phase,
            error: fault.error.clone(),
            fail_mode: self.config.fail_mode,
        });
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ResponseSource;
    use crate::pipeline::ShortCircuitResponse;
    use crate::ports::CollectingEmitter;
    use crate::providers::AnthropicAdapter;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    type Log = Arc<Mutex<Vec<String>>>;

    enum Behaviour {
        Pass,
        Fail,
        Panic,
        Hang(Arc<AtomicBool>),
        Rewrite(&'static str),
        Answer,
        Block,
    }

    struct TestPlugin {
        name: &'static str,
        priority: i32,
        behaviour: Behaviour,
        log: Log,
    }

    #[async_trait]
    impl Plugin for TestPlugin {
        fn name(&self) -> &str {
            self.name
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        async fn on_request(&self, ctx: &RequestContext) -> Result<PluginOutcome, PluginError> {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.name, ctx.body_text()));
            match &self.behaviour {
                Behaviour::Pass => Ok(PluginOutcome::Continue),
                Behaviour::Fail => Err(PluginError::Internal("boom".to_string())),
                Behaviour::Panic => panic!("plugin exploded"),
                Behaviour::Hang(finished) => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    finished.store(true, Ordering::SeqCst);
                    Ok(PluginOutcome::Continue)
                }
                Behaviour::Rewrite(body) => Ok(PluginOutcome::ModifiedBody((*body).to_string())),
                Behaviour::Answer => Ok(PluginOutcome::ShortCircuit(ShortCircuitResponse::json(
                    200,
                    "{}",
                ))),
                Behaviour::Block => Ok(PluginOutcome::Blocked {
                    reason: "no".to_string(),
                }),
            }
        }

        async fn on_response_complete(
            &self,
            _ctx: &ResponseCompleteContext,
        ) -> Result<(), PluginError> {
            self.log.lock().unwrap().push(format!("done:{}", self.name));
            match self.behaviour {
                Behaviour::Fail => Err(PluginError::Internal("boom".to_string())),
                _ => Ok(()),
            }
        }
    }

    fn plugin(name: &'static str, priority: i32, behaviour: Behaviour, log: &Log) -> Arc<dyn Plugin> {
        Arc::new(TestPlugin {
            name,
            priority,
            behaviour,
            log: Arc::clone(log),
        })
    }

    fn pipeline(fail_mode: FailMode, policy: TimeoutPolicy) -> (PluginPipeline, Arc<CollectingEmitter>) {
        let emitter = Arc::new(CollectingEmitter::new());
        let config = PipelineConfig {
            fail_mode,
            plugin_timeout: Duration::from_millis(100),
            timeout_policy: policy,
        };
        (PluginPipeline::new(config, emitter.clone()), emitter)
    }

    fn request() -> RequestContext {
        RequestContext::new(
            &AnthropicAdapter,
            "POST",
            "/v1/messages",
            BTreeMap::new(),
            Bytes::from_static(b"orig"),
        )
    }

    fn names(log: &Log) -> Vec<String> {
        log.lock()
            .unwrap()
            .iter()
            .map(|entry| entry.split(':').next().unwrap_or_default().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_runs_in_priority_then_registration_order() {
        let log = Log::default();
        let (mut p, _) = pipeline(FailMode::Open, TimeoutPolicy::Detach);
        p.register(plugin("late", 50, Behaviour::Pass, &log));
        p.register(plugin("tie-a", 10, Behaviour::Pass, &log));
        p.register(plugin("early", -5, Behaviour::Pass, &log));
        p.register(plugin("tie-b", 10, Behaviour::Pass, &log));

        assert_eq!(p.plugin_names(), vec!["early", "tie-a", "tie-b", "late"]);
        assert!(p.run_request_phase(request()).await.proceeds());
        assert_eq!(names(&log), vec!["early", "tie-a", "tie-b", "late"]);
    }

    #[tokio::test]
    async fn test_fail_closed_aborts_chain() {
        let log = Log::default();
        let (mut p, emitter) = pipeline(FailMode::Closed, TimeoutPolicy::Detach);
        p.register(plugin("first", 1, Behaviour::Fail, &log));
        p.register(plugin("second", 2, Behaviour::Pass, &log));

        let outcome = p.run_request_phase(request()).await;
        let RequestPhaseOutcome::Failed { fault, .. } = outcome else {
            panic!("expected failure, got {outcome:?}");
        };
        assert_eq!(fault.plugin, "first");
        assert_eq!(fault.error, "boom");
        assert_eq!(names(&log), vec!["first"]);
        assert!(matches!(
            emitter.events()[0],
            GatewayEvent::PluginFault { phase: HookPhase::Request, fail_mode: FailMode::Closed, .. }
        ));
    }

    #[tokio::test]
    async fn test_fail_open_skips_faulty_plugin() {
        let log = Log::default();
        let (mut p, _) = pipeline(FailMode::Open, TimeoutPolicy::Detach);
        p.register(plugin("first", 1, Behaviour::Fail, &log));
        p.register(plugin("second", 2, Behaviour::Panic, &log));
        p.register(plugin("third", 3, Behaviour::Pass, &log));

        let RequestPhaseOutcome::Proceed { skipped, .. } = p.run_request_phase(request()).await
        else {
            panic!("expected pass-through");
        };
        assert_eq!(skipped.len(), 2);
        assert!(skipped[1].error.contains("panicked"));
        assert_eq!(names(&log), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_cancel_policy_contains_panics() {
        let log = Log::default();
        let (mut p, _) = pipeline(FailMode::Closed, TimeoutPolicy::Cancel);
        p.register(plugin("bad", 1, Behaviour::Panic, &log));

        let RequestPhaseOutcome::Failed { fault, .. } = p.run_request_phase(request()).await else {
            panic!("expected failure");
        };
        assert!(fault.error.contains("plugin exploded"));
    }

    #[tokio::test]
    async fn test_modified_body_is_visible_downstream() {
        let log = Log::default();
        let (mut p, _) = pipeline(FailMode::Open, TimeoutPolicy::Detach);
        p.register(plugin("rewrite", 1, Behaviour::Rewrite("{\"a\":1}"), &log));
        p.register(plugin("reader", 2, Behaviour::Pass, &log));

        let outcome = p.run_request_phase(request()).await;
        assert_eq!(outcome.context().body_text(), "{\"a\":1}");
        assert!(outcome.context().parsed_body.is_some());
        assert_eq!(log.lock().unwrap()[1], "reader:{\"a\":1}");
    }

    #[tokio::test]
    async fn test_short_circuit_and_block_stop_chain() {
        let log = Log::default();
        let (mut p, emitter) = pipeline(FailMode::Open, TimeoutPolicy::Detach);
        p.register(plugin("answer", 1, Behaviour::Answer, &log));
        p.register(plugin("never", 2, Behaviour::Pass, &log));
        assert!(matches!(
            p.run_request_phase(request()).await,
            RequestPhaseOutcome::ShortCircuit { ref plugin, .. } if plugin == "answer"
        ));
        assert!(matches!(emitter.events()[0], GatewayEvent::ShortCircuited { .. }));

        let (mut p, _) = pipeline(FailMode::Open, TimeoutPolicy::Detach);
        p.register(plugin("guard", 1, Behaviour::Block, &log));
        p.register(plugin("never", 2, Behaviour::Pass, &log));
        assert!(matches!(
            p.run_request_phase(request()).await,
            RequestPhaseOutcome::Blocked { ref reason, .. } if reason == "no"
        ));
        assert!(!names(&log).contains(&"never".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_detach_timeout_leaves_hook_running() {
        let log = Log::default();
        let finished = Arc::new(AtomicBool::new(false));
        let (mut p, _) = pipeline(FailMode::Open, TimeoutPolicy::Detach);
        p.register(plugin("slow", 1, Behaviour::Hang(Arc::clone(&finished)), &log));

        let RequestPhaseOutcome::Proceed { skipped, .. } = p.run_request_phase(request()).await
        else {
            panic!("expected pass-through");
        };
        assert!(skipped[0].error.contains("timed out"));
        assert!(!finished.load(Ordering::SeqCst));

        assert!(p.shutdown(Duration::from_secs(120)).await);
        assert!(finished.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_timeout_drops_hook() {
        let log = Log::default();
        let finished = Arc::new(AtomicBool::new(false));
        let (mut p, _) = pipeline(FailMode::Closed, TimeoutPolicy::Cancel);
        p.register(plugin("slow", 1, Behaviour::Hang(Arc::clone(&finished)), &log));

        assert!(matches!(
            p.run_request_phase(request()).await,
            RequestPhaseOutcome::Failed { .. }
        ));
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(!finished.load(Ordering::SeqCst));
        assert!(p.shutdown(Duration::from_secs(1)).await);
    }

    #[tokio::test]
    async fn test_response_phase_runs_every_hook() {
        let log = Log::default();
        let (mut p, emitter) = pipeline(FailMode::Closed, TimeoutPolicy::Detach);
        p.register(plugin("a", 1, Behaviour::Fail, &log));
        p.register(plugin("b", 2, Behaviour::Pass, &log));
        p.register(plugin("c", 3, Behaviour::Fail, &log));

        let ctx = ResponseCompleteContext::buffered(
            request(),
            &AnthropicAdapter,
            200,
            Bytes::from_static(b"{}"),
            ResponseSource::Upstream,
        );
        let faults = p.run_response_phase(Arc::new(ctx)).await;

        assert_eq!(faults.len(), 2);
        assert_eq!(
            log.lock().unwrap().clone(),
            vec!["done:a", "done:b", "done:c"]
        );
        let events = emitter.events();
        assert!(matches!(events[0], GatewayEvent::ResponseCompleted { status: 200, .. }));
        assert!(matches!(
            events[1],
            GatewayEvent::PluginFault { phase: HookPhase::Response, .. }
        ));
    }

    #[tokio::test]
    async fn test_spawned_response_phase_is_tracked() {
        let log = Log::default();
        let (mut p, _) = pipeline(FailMode::Open, TimeoutPolicy::Detach);
        p.register(plugin("a", 1, Behaviour::Pass, &log));
        let p = Arc::new(p);

        let ctx = ResponseCompleteContext::streamed(request(), 200, Default::default(), String::new());
        p.spawn_response_phase(ctx);
        assert!(p.shutdown(Duration::from_secs(5)).await);
        assert_eq!(log.lock().unwrap().clone(), vec!["done:a"]);
    }
}
