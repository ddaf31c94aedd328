//! Cross-context eval with request/response correlation.
//!
//! The engine usually runs in an isolated script context that cannot see
//! page globals. [`EvalBridge::request_eval`] posts an `eval` message to the
//! host and parks a oneshot receiver in the pending map until the matching
//! `evalResp` arrives through [`EvalBridge::resolve_eval`].
//!
//! # Correlation
//!
//! | Step | Effect |
//! |------|--------|
//! | request | fresh v4 id, never one that is still outstanding |
//! | response | entry removed, result delivered once |
//! | timeout | entry removed, caller sees [`Error::EvalTimeout`] |
//! | request future dropped | entry removed |
//! | late response | unknown id, logged and dropped |
//!
//! In main-world mode a [`MainWorldExecutor`] runs snippets synchronously
//! with the same boolean coercion.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::engine::LogsConfig;
use crate::error::{Error, Result};
use crate::identifiers::EvalId;
use crate::protocol::{Messenger, OutboundMessage};

use super::snippets;

// ============================================================================
// Constants
// ============================================================================

/// Default eval round-trip timeout.
pub const DEFAULT_EVAL_TIMEOUT: Duration = Duration::from_millis(1000);

// ============================================================================
// Types
// ============================================================================

/// Map of eval ids to result channels.
type PendingMap = FxHashMap<EvalId, oneshot::Sender<bool>>;

/// Removes a pending entry when its request stops waiting, including when
/// the request future is dropped mid-flight.
struct PendingGuard<'a> {
    pending: &'a Mutex<PendingMap>,
    id: EvalId,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.lock().remove(&self.id);
    }
}

/// Runs a snippet directly in the page's own script context.
///
/// Implemented by hosts that inject the engine into the main world.
pub trait MainWorldExecutor: Send + Sync {
    /// Evaluates `code` (an immediately invoked expression) and returns its
    /// result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EvalFailed`] when the snippet throws.
    fn execute(&self, snippet_id: &str, code: &str) -> Result<Value>;
}

/// JavaScript truthiness of a JSON value.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[derive(Clone, Copy)]
struct Settings {
    main_world: bool,
    logs: LogsConfig,
}

struct Inner {
    messenger: Messenger,
    pending: Mutex<PendingMap>,
    timeout: Duration,
    executor: Option<Arc<dyn MainWorldExecutor>>,
    settings: RwLock<Settings>,
}

// ============================================================================
// EvalBridge
// ============================================================================

/// Cheap-clone handle owning the pending-eval map.
#[derive(Clone)]
pub struct EvalBridge {
    inner: Arc<Inner>,
}

impl fmt::Debug for EvalBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvalBridge")
            .field("timeout", &self.inner.timeout)
            .field("pending", &self.pending_count())
            .field("main_world", &self.inner.settings.read().main_world)
            .finish()
    }
}

impl EvalBridge {
    /// Creates a bridge sending `eval` requests through `messenger`.
    #[must_use]
    pub fn new(messenger: Messenger, timeout: Duration) -> Self {
        Self::build(messenger, timeout, None)
    }

    /// Creates a bridge that can also run snippets in the main world.
    #[must_use]
    pub fn with_executor(messenger: Messenger, timeout: Duration, executor: Arc<dyn MainWorldExecutor>) -> Self {
        Self::build(messenger, timeout, Some(executor))
    }

    fn build(messenger: Messenger, timeout: Duration, executor: Option<Arc<dyn MainWorldExecutor>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                messenger,
                pending: Mutex::new(PendingMap::default()),
                timeout,
                executor,
                settings: RwLock::new(Settings {
                    main_world: false,
                    logs: LogsConfig::default(),
                }),
            }),
        }
    }

    /// Applies the host configuration.
    pub fn configure(&self, main_world: bool, logs: LogsConfig) {
        *self.inner.settings.write() = Settings { main_world, logs };
    }

    /// Round-trip timeout.
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }

    /// Number of outstanding requests.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.pending.lock().len()
    }

    /// Sends `code` to the page context and waits for its result.
    ///
    /// # Errors
    ///
    /// - [`Error::ChannelClosed`] if the host channel is gone
    /// - [`Error::EvalTimeout`] if no response arrives in time
    pub async fn request_eval(&self, code: String, snippet_id: &str) -> Result<bool> {
        let (tx, rx) = oneshot::channel();
        let id = {
            let mut pending = self.inner.pending.lock();
            let mut id = EvalId::generate();
            while pending.contains_key(&id) {
                id = EvalId::generate();
            }
            pending.insert(id, tx);
            id
        };
        let _guard = PendingGuard {
            pending: &self.inner.pending,
            id,
        };

        self.inner.messenger.send(OutboundMessage::Eval {
            id,
            code,
            snippet_id: snippet_id.to_string(),
        })?;

        match timeout(self.inner.timeout, rx).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(_)) => Err(Error::ChannelClosed),
            Err(_) => Err(Error::eval_timeout(id, self.inner.timeout.as_millis() as u64)),
        }
    }

    /// Delivers an `evalResp`. Returns `false` if the id is not outstanding.
    pub fn resolve_eval(&self, id: EvalId, result: &Value) -> bool {
        let tx = self.inner.pending.lock().remove(&id);
        match tx {
            Some(tx) => {
                let value = is_truthy(result);
                if self.inner.settings.read().logs.evals {
                    debug!(%id, value, "Eval response");
                }
                let _ = tx.send(value);
                true
            }
            None => {
                warn!(%id, "no eval #{id}");
                false
            }
        }
    }

    /// Runs a registered snippet and coerces the result to a boolean.
    ///
    /// Unknown snippets, timeouts and snippet errors all yield `false`.
    pub async fn eval_snippet(&self, snippet_id: &str) -> bool {
        let source = match snippets::snippet(snippet_id) {
            Ok(source) => source,
            Err(e) => {
                warn!(error = %e, "Skipping eval");
                return false;
            }
        };
        let Settings { main_world, logs } = *self.inner.settings.read();
        let code = snippets::function_body(source);

        if main_world && let Some(executor) = &self.inner.executor {
            if logs.evals {
                debug!(snippet_id, "inline eval");
            }
            return match executor.execute(snippet_id, &code) {
                Ok(value) => is_truthy(&value),
                Err(e) => {
                    if logs.evals {
                        warn!(snippet_id, error = %e, "Error evaluating rule");
                    }
                    false
                }
            };
        }

        if logs.evals {
            debug!(snippet_id, "async eval");
        }
        self.request_or_false(code, snippet_id, logs).await
    }

    /// Runs arbitrary code from a consent-o-matic `eval` action.
    ///
    /// Same coercion and error handling as [`eval_snippet`](Self::eval_snippet);
    /// `label` identifies the request in the outbound message.
    pub async fn eval_code(&self, code: &str, label: &str) -> bool {
        let Settings { main_world, logs } = *self.inner.settings.read();
        if main_world && let Some(executor) = &self.inner.executor {
            return executor.execute(label, code).is_ok_and(|value| is_truthy(&value));
        }
        self.request_or_false(code.to_string(), label, logs).await
    }

    async fn request_or_false(&self, code: String, snippet_id: &str, logs: LogsConfig) -> bool {
        match self.request_eval(code, snippet_id).await {
            Ok(value) => value,
            Err(e) => {
                if logs.evals {
                    warn!(snippet_id, error = %e, "Error evaluating rule");
                }
                false
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct FixedExecutor(Result<Value>);

    impl MainWorldExecutor for FixedExecutor {
        fn execute(&self, _snippet_id: &str, _code: &str) -> Result<Value> {
            match &self.0 {
                Ok(v) => Ok(v.clone()),
                Err(_) => Err(Error::eval_failed("boom")),
            }
        }
    }

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(&Value::Null));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(is_truthy(&json!(1)));
        assert!(is_truthy(&json!("x")));
        assert!(is_truthy(&json!([])));
        assert!(is_truthy(&json!({})));
    }

    #[tokio::test]
    async fn test_request_resolved() {
        let (messenger, mut rx) = Messenger::channel();
        let bridge = EvalBridge::new(messenger, DEFAULT_EVAL_TIMEOUT);

        let responder = bridge.clone();
        let handle = tokio::spawn(async move {
            let Some(OutboundMessage::Eval { id, code, snippet_id }) = rx.recv().await else {
                panic!("expected eval");
            };
            assert_eq!(snippet_id, "EVAL_COOKIEBOT_1");
            assert!(code.starts_with("(() =>"));
            assert!(responder.resolve_eval(id, &json!(true)));
        });

        assert!(bridge.eval_snippet("EVAL_COOKIEBOT_1").await);
        handle.await.expect("responder");
        assert_eq!(bridge.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_removes_entry_and_ignores_late_response() {
        let (messenger, mut rx) = Messenger::channel();
        let bridge = EvalBridge::new(messenger, DEFAULT_EVAL_TIMEOUT);

        let err = bridge
            .request_eval("(() => 1)()".into(), "EVAL_0")
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(bridge.pending_count(), 0);

        let Some(OutboundMessage::Eval { id, .. }) = rx.recv().await else {
            panic!("expected eval");
        };
        assert!(!bridge.resolve_eval(id, &json!(true)));
    }

    #[tokio::test]
    async fn test_concurrent_requests_resolved_out_of_order() {
        let (messenger, mut rx) = Messenger::channel();
        let bridge = EvalBridge::new(messenger, DEFAULT_EVAL_TIMEOUT);

        let responder = bridge.clone();
        let handle = tokio::spawn(async move {
            let mut requests = Vec::new();
            while requests.len() < 3 {
                let Some(OutboundMessage::Eval { id, snippet_id, .. }) = rx.recv().await else {
                    panic!("expected eval");
                };
                requests.push((id, snippet_id));
            }
            for (id, snippet_id) in requests.into_iter().rev() {
                let value = match snippet_id.as_str() {
                    "EVAL_FIRST" => json!(1),
                    "EVAL_SECOND" => json!(""),
                    _ => json!(0),
                };
                assert!(responder.resolve_eval(id, &value));
            }
        });

        let (first, second, third) = tokio::join!(
            bridge.request_eval("(() => 1)()".into(), "EVAL_FIRST"),
            bridge.request_eval("(() => '')()".into(), "EVAL_SECOND"),
            bridge.request_eval("(() => 0)()".into(), "EVAL_THIRD"),
        );
        handle.await.expect("responder");

        assert!(first.expect("first"));
        assert!(!second.expect("second"));
        assert!(!third.expect("third"));
        assert_eq!(bridge.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_request_removes_entry() {
        let (messenger, mut rx) = Messenger::channel();
        let bridge = EvalBridge::new(messenger, DEFAULT_EVAL_TIMEOUT);

        let abandoned = timeout(
            Duration::from_millis(100),
            bridge.request_eval("(() => 1)()".into(), "EVAL_0"),
        )
        .await;
        assert!(abandoned.is_err());
        assert_eq!(bridge.pending_count(), 0);

        let Some(OutboundMessage::Eval { id, .. }) = rx.recv().await else {
            panic!("expected eval");
        };
        assert!(!bridge.resolve_eval(id, &json!(true)));
    }

    #[tokio::test]
    async fn test_unknown_snippet_sends_nothing() {
        let (messenger, mut rx) = Messenger::channel();
        let bridge = EvalBridge::new(messenger, DEFAULT_EVAL_TIMEOUT);
        assert!(!bridge.eval_snippet("EVAL_NOPE").await);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_main_world_executor() {
        let (messenger, mut rx) = Messenger::channel();
        let bridge = EvalBridge::with_executor(
            messenger.clone(),
            DEFAULT_EVAL_TIMEOUT,
            Arc::new(FixedExecutor(Ok(json!("yes")))),
        );
        bridge.configure(true, LogsConfig::default());
        assert!(bridge.eval_snippet("EVAL_0").await);
        assert!(rx.try_recv().is_err());

        let failing = EvalBridge::with_executor(
            messenger,
            DEFAULT_EVAL_TIMEOUT,
            Arc::new(FixedExecutor(Err(Error::eval_failed("x")))),
        );
        failing.configure(true, LogsConfig::verbose());
        assert!(!failing.eval_snippet("EVAL_0").await);
    }

    #[tokio::test]
    async fn test_closed_channel_is_error() {
        let (messenger, rx) = Messenger::channel();
        drop(rx);
        let bridge = EvalBridge::new(messenger, DEFAULT_EVAL_TIMEOUT);
        let err = bridge.request_eval("x".into(), "EVAL_0").await.unwrap_err();
        assert!(matches!(err, Error::ChannelClosed));
        assert_eq!(bridge.pending_count(), 0);
    }
}
