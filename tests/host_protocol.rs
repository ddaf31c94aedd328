//! End-to-end runs driven over the host message channel.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use consent_engine::{AutoConsent, ElementSpec, InboundMessage, Lifecycle, MemoryDom, Messenger, OutboundMessage};
use serde_json::{Value, json};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing_subscriber::EnvFilter;

const URL: &str = "https://news.test/article";

/// Snippet the self-test relies on; the simulated page answers it truthy.
const TEST_SNIPPET: &str = "EVAL_KLARO_1";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_test_writer()
        .try_init();
}

fn init_resp() -> anyhow::Result<InboundMessage> {
    let message = json!({
        "type": "initResp",
        "config": {"autoAction": "optOut", "detectRetries": 3},
        "rules": {"autoconsent": [{
            "name": "news-banner",
            "prehideSelectors": ["#consent"],
            "detectCmp": [{"exists": "#consent"}],
            "detectPopup": [{"visible": "#consent"}],
            "optOut": [{"waitForThenClick": "#reject"}],
            "optIn": [{"click": "#agree"}],
            "test": [{"eval": TEST_SNIPPET}]
        }]}
    });
    Ok(InboundMessage::from_json(&message.to_string())?)
}

/// Plays the host: answers `init`, resolves evals and collects everything
/// until `until` arrives.
async fn serve(
    engine: &AutoConsent,
    rx: &mut UnboundedReceiver<OutboundMessage>,
    until: &str,
) -> anyhow::Result<Vec<OutboundMessage>> {
    let mut seen = Vec::new();
    loop {
        let message = tokio::time::timeout(Duration::from_secs(60), rx.recv())
            .await
            .context("engine went quiet")?
            .context("channel closed")?;
        match &message {
            OutboundMessage::Init { .. } => {
                engine.receive_message(init_resp()?);
            }
            OutboundMessage::Eval { id, snippet_id, .. } => {
                let result = Value::Bool(snippet_id == TEST_SNIPPET);
                assert!(engine.receive_message(InboundMessage::EvalResp { id: *id, result }).is_none());
            }
            _ => {}
        }
        let done = message.kind() == until;
        seen.push(message);
        if done {
            return Ok(seen);
        }
    }
}

fn news_page() -> (MemoryDom, consent_engine::NodeId, consent_engine::NodeId) {
    let dom = MemoryDom::new().with_location(URL);
    let banner = dom.append(None, ElementSpec::new("div").id("consent"));
    let reject = dom.append(Some(banner), ElementSpec::new("button").id("reject"));
    let agree = dom.append(Some(banner), ElementSpec::new("button").id("agree"));
    dom.on_click(reject, move |page| page.remove(banner));
    (dom, reject, agree)
}

#[tokio::test(start_paused = true)]
async fn test_full_opt_out_then_self_test() -> anyhow::Result<()> {
    init_tracing();
    let (dom, reject, agree) = news_page();
    let (messenger, mut rx) = Messenger::channel();
    let engine = AutoConsent::new(Arc::new(dom.clone()), messenger);

    let messages = serve(&engine, &mut rx, "autoconsentDone").await?;
    assert_eq!(dom.click_count(reject), 1);
    assert_eq!(dom.click_count(agree), 0);

    let results: Vec<_> = messages.iter().filter(|m| m.kind() == "optOutResult").collect();
    assert_eq!(
        results,
        [&OutboundMessage::OptOutResult {
            cmp: "news-banner".into(),
            result: true,
            schedule_self_test: true,
            url: URL.into(),
        }]
    );
    assert!(messages.iter().all(|m| m.kind() != "autoconsentError"));

    let handle = engine.receive_message(InboundMessage::SelfTest).context("self-test spawned")?;
    let messages = serve(&engine, &mut rx, "selfTestResult").await?;
    assert!(handle.await?);
    assert!(matches!(
        messages.last(),
        Some(OutboundMessage::SelfTestResult { result: true, .. })
    ));
    assert_eq!(engine.state().self_test, Some(true));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_reports_follow_lifecycle() -> anyhow::Result<()> {
    init_tracing();
    let (dom, _, _) = news_page();
    let (messenger, mut rx) = Messenger::channel();
    let engine = AutoConsent::new(Arc::new(dom), messenger);

    let messages = serve(&engine, &mut rx, "autoconsentDone").await?;
    let mut lifecycles: Vec<Lifecycle> = messages
        .iter()
        .filter_map(|m| match m {
            OutboundMessage::Report { state, .. } => Some(state.lifecycle),
            _ => None,
        })
        .collect();
    lifecycles.dedup();
    assert_eq!(lifecycles.first(), Some(&Lifecycle::Loading));
    assert!(lifecycles.contains(&Lifecycle::WaitingForInitResponse));
    assert!(lifecycles.contains(&Lifecycle::RunningOptOut));

    // The final report can trail `autoconsentDone`.
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(engine.state().lifecycle, Lifecycle::Done);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_unanswered_eval_times_out() -> anyhow::Result<()> {
    let dom = MemoryDom::new().with_location(URL);
    let (messenger, mut rx) = Messenger::channel();
    let engine = AutoConsent::new(Arc::new(dom), messenger);
    let bridge = engine.bridge();

    let pending = tokio::spawn(async move { bridge.eval_snippet(TEST_SNIPPET).await });
    let mut saw_eval = false;
    while let Some(message) = rx.recv().await {
        if message.kind() == "eval" {
            saw_eval = true;
            break;
        }
    }
    assert!(saw_eval);
    assert!(!pending.await?);
    assert_eq!(engine.bridge().pending_count(), 0);
    Ok(())
}
