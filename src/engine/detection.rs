//! Popup detection race.
//!
//! Every candidate is checked concurrently. The first confirmed popup fires
//! `on_first` right away; the other checks still run to completion so the
//! caller learns about every popup on the page.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;

use crate::cmps::{CmpContext, CmpStrategy};
use crate::dom::wait::wait_for_async;

/// Polls `cmp.detect_popup` once plus `retries` more times, `interval`
/// apart.
pub async fn poll_popup(cmp: &dyn CmpStrategy, cx: &CmpContext, retries: u32, interval: Duration) -> bool {
    wait_for_async(|| cmp.detect_popup(cx), retries, interval).await
}

/// Runs `check` for every candidate and returns those confirmed, in
/// completion order.
///
/// `on_first` is called at most once, with the first confirmed candidate,
/// while the remaining checks keep running.
pub async fn race_popups<P, Fut, F>(cmps: &[Arc<dyn CmpStrategy>], check: P, on_first: F) -> Vec<Arc<dyn CmpStrategy>>
where
    P: Fn(Arc<dyn CmpStrategy>) -> Fut,
    Fut: Future<Output = bool>,
    F: FnOnce(Arc<dyn CmpStrategy>),
{
    let mut checks: FuturesUnordered<_> = cmps
        .iter()
        .map(|cmp| {
            let check = check(Arc::clone(cmp));
            let cmp = Arc::clone(cmp);
            async move { (cmp, check.await) }
        })
        .collect();

    let mut on_first = Some(on_first);
    let mut confirmed = Vec::new();
    while let Some((cmp, open)) = checks.next().await {
        if !open {
            continue;
        }
        if let Some(callback) = on_first.take() {
            callback(Arc::clone(&cmp));
        }
        confirmed.push(cmp);
    }
    confirmed
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use tokio::time::{Instant, sleep};

    use crate::cmps::vendors::tests::context;
    use crate::dom::{ElementSpec, MemoryDom};

    /// Reports a popup after `delay`, or never.
    struct Delayed {
        name: &'static str,
        delay: Duration,
        open: bool,
    }

    #[async_trait]
    impl CmpStrategy for Delayed {
        fn name(&self) -> &str {
            self.name
        }

        fn has_self_test(&self) -> bool {
            false
        }

        async fn detect_cmp(&self, _cx: &CmpContext) -> bool {
            true
        }

        async fn detect_popup(&self, _cx: &CmpContext) -> bool {
            sleep(self.delay).await;
            self.open
        }

        async fn opt_out(&self, _cx: &CmpContext) -> bool {
            true
        }

        async fn opt_in(&self, _cx: &CmpContext) -> bool {
            true
        }
    }

    fn delayed(name: &'static str, delay_ms: u64, open: bool) -> Arc<dyn CmpStrategy> {
        Arc::new(Delayed {
            name,
            delay: Duration::from_millis(delay_ms),
            open,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_confirmed_wins_and_all_collected() {
        let cmps = [delayed("slow", 300, true), delayed("never", 10, false), delayed("fast", 100, true)];
        let first = Mutex::new(Vec::new());

        let confirmed = race_popups(
            &cmps,
            |cmp| async move { cmp.detect_popup(&context(&MemoryDom::new())).await },
            |cmp| first.lock().push(cmp.name().to_string()),
        )
        .await;

        assert_eq!(*first.lock(), ["fast"]);
        let names: Vec<&str> = confirmed.iter().map(|c| c.name()).collect();
        assert_eq!(names, ["fast", "slow"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_confirmed() {
        let cmps = [delayed("a", 10, false)];
        let mut called = false;
        let confirmed = race_popups(&cmps, |cmp| async move { cmp.name() == "b" }, |_| called = true).await;
        assert!(confirmed.is_empty());
        assert!(!called);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_retries_until_visible() {
        let dom = MemoryDom::new();
        let banner = dom.append(None, ElementSpec::new("div").id("banner").hidden());
        let cx = context(&dom);
        let rule = crate::rules::Rule {
            detect_popup: Some(vec![crate::rules::ActionStep::visible("#banner")]),
            ..crate::rules::Rule::new("banner")
        };
        let cmp = crate::cmps::DeclarativeCmp::new(rule);

        let reveal = dom.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(1200)).await;
            reveal.set_hidden(banner, false);
        });

        let start = Instant::now();
        assert!(poll_popup(&cmp, &cx, 5, Duration::from_millis(500)).await);
        assert_eq!(start.elapsed(), Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_gives_up() {
        let dom = MemoryDom::new();
        let cx = context(&dom);
        let start = Instant::now();
        assert!(!poll_popup(&*delayed("closed", 0, false), &cx, 5, Duration::from_millis(500)).await);
        assert_eq!(start.elapsed(), Duration::from_millis(2500));
    }
}
