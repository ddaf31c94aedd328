//! The orchestrator.
//!
//! [`AutoConsent`] owns one page's run: it builds the candidate list,
//! finds CMPs, races their popup checks, hides banners while a decision is
//! pending and dispatches the configured action. Every state change is
//! mirrored to the host as a `report` message.
//!
//! # Flow
//!
//! | Step | Lifecycle |
//! |------|-----------|
//! | construction | `loading`, then `waitingForInitResponse` |
//! | [`initialize`](AutoConsent::initialize) | `initialized` |
//! | [`start`](AutoConsent::start) | `started`, `cmpDetected` |
//! | popup confirmed | `openPopupDetected` |
//! | [`do_opt_out`](AutoConsent::do_opt_out) / [`do_opt_in`](AutoConsent::do_opt_in) | `runningOptOut` / `runningOptIn`, then a result state |
//!
//! Handles are cheap to clone; clones drive the same run.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::bridge::{EvalBridge, MainWorldExecutor};
use crate::cmps::registry::{filter_cmps, parse_rules};
use crate::cmps::{CmpContext, CmpStrategy};
use crate::dom::style::{COSMETICS_STYLE_ID, filter_list_selectors, hiding_rule};
use crate::dom::wait::wait_for;
use crate::dom::{DomActions, DomEnvironment, HideMethod, ReadyState, VisibilityCheck};
use crate::identifiers::InstanceId;
use crate::protocol::{ErrorDetails, InboundMessage, Messenger, OutboundMessage};
use crate::rules::RuleSet;

use super::builder::EngineBuilder;
use super::config::{AutoAction, Config, EngineOptions, LogsConfig};
use super::detection::{poll_popup, race_popups};
use super::heuristics::check_heuristic_patterns;
use super::state::{EngineState, Lifecycle};

// ============================================================================
// Constants
// ============================================================================

/// Always prehidden, regardless of the rules in play.
const GLOBAL_PREHIDE: &str = "#didomi-popup,.didomi-popup-container,.didomi-popup-notice,.didomi-consent-popup-preferences,#didomi-notice,.didomi-popup-backdrop,.didomi-screen-medium";

/// CMP name used when reporting filter-list matches.
pub const FILTER_LIST_CMP: &str = "filterList";

/// Prehide timeout used when the config carries zero.
const FALLBACK_PREHIDE_TIMEOUT: Duration = Duration::from_millis(2000);

// ============================================================================
// Types
// ============================================================================

/// Shared state of one engine.
struct EngineInner {
    /// Instance id carried in reports.
    id: InstanceId,
    /// Host channel.
    messenger: Messenger,
    /// Timing tunables.
    options: EngineOptions,
    /// Context handed to strategies; rebuilt when the log channels change.
    cx: RwLock<CmpContext>,
    /// Active configuration.
    config: RwLock<Config>,
    /// Candidates, in detection order.
    cmps: RwLock<Vec<Arc<dyn CmpStrategy>>>,
    /// CMP whose popup is being handled.
    found_cmp: Mutex<Option<Arc<dyn CmpStrategy>>>,
    /// Installed filter-list style text.
    cosmetic_styles: Mutex<String>,
    /// Reported state.
    state: Mutex<EngineState>,
    /// Handler spawned for the first confirmed popup.
    popup_task: Mutex<Option<JoinHandle<bool>>>,
}

// ============================================================================
// AutoConsent
// ============================================================================

/// Consent engine for one page.
#[derive(Clone)]
pub struct AutoConsent {
    inner: Arc<EngineInner>,
}

impl fmt::Debug for AutoConsent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoConsent")
            .field("id", &self.inner.id)
            .field("lifecycle", &self.inner.state.lock().lifecycle)
            .field("cmps", &self.inner.cmps.read().len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// AutoConsent - Constructor
// ============================================================================

impl AutoConsent {
    /// Creates a builder for an engine over `env`, reporting to `messenger`.
    #[inline]
    #[must_use]
    pub fn builder(env: Arc<dyn DomEnvironment>, messenger: Messenger) -> EngineBuilder {
        EngineBuilder::new(env, messenger)
    }

    /// Creates an engine that asks the host for its configuration.
    #[must_use]
    pub fn new(env: Arc<dyn DomEnvironment>, messenger: Messenger) -> Self {
        let engine = Self::from_parts(env, messenger, EngineOptions::default(), None);
        engine.request_config();
        engine
    }

    pub(crate) fn from_parts(
        env: Arc<dyn DomEnvironment>,
        messenger: Messenger,
        options: EngineOptions,
        executor: Option<Arc<dyn MainWorldExecutor>>,
    ) -> Self {
        let config = Config::default();
        let bridge = match executor {
            Some(executor) => EvalBridge::with_executor(messenger.clone(), options.eval_timeout, executor),
            None => EvalBridge::new(messenger.clone(), options.eval_timeout),
        };
        bridge.configure(config.is_main_world, config.logs);
        let cx = CmpContext::new(DomActions::new(env, config.logs), bridge);

        let engine = Self {
            inner: Arc::new(EngineInner {
                id: InstanceId::generate(),
                messenger,
                options,
                cx: RwLock::new(cx),
                config: RwLock::new(config),
                cmps: RwLock::new(Vec::new()),
                found_cmp: Mutex::new(None),
                cosmetic_styles: Mutex::new(String::new()),
                state: Mutex::new(EngineState::new()),
                popup_task: Mutex::new(None),
            }),
        };
        engine.update_state(|s| s.lifecycle = Lifecycle::Loading);
        engine
    }

    /// Sends `init` and waits for `initResp`.
    pub(crate) fn request_config(&self) {
        self.send(OutboundMessage::Init { url: self.url() });
        self.update_state(|s| s.lifecycle = Lifecycle::WaitingForInitResponse);
    }
}

// ============================================================================
// AutoConsent - Accessors
// ============================================================================

impl AutoConsent {
    /// Instance id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> InstanceId {
        self.inner.id
    }

    /// Snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> EngineState {
        self.inner.state.lock().clone()
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> Config {
        self.inner.config.read().clone()
    }

    /// Names of the candidates, in detection order.
    #[must_use]
    pub fn cmp_names(&self) -> Vec<String> {
        self.inner.cmps.read().iter().map(|c| c.name().to_string()).collect()
    }

    /// Name of the CMP whose popup is being handled.
    #[must_use]
    pub fn found_cmp(&self) -> Option<String> {
        self.inner.found_cmp.lock().as_ref().map(|c| c.name().to_string())
    }

    /// The eval bridge.
    #[must_use]
    pub fn bridge(&self) -> EvalBridge {
        self.inner.cx.read().bridge().clone()
    }

    fn context(&self) -> CmpContext {
        self.inner.cx.read().clone()
    }

    fn logs(&self) -> LogsConfig {
        self.inner.config.read().logs
    }

    fn url(&self) -> String {
        self.inner.cx.read().location()
    }

    fn send(&self, message: OutboundMessage) {
        if let Err(e) = self.inner.messenger.send(message)
            && self.logs().errors
        {
            warn!(error = %e, "Failed to send message");
        }
    }

    /// Applies `change` to the state and reports the result.
    fn update_state<F>(&self, change: F)
    where
        F: FnOnce(&mut EngineState),
    {
        let snapshot = {
            let mut state = self.inner.state.lock();
            change(&mut state);
            state.clone()
        };
        let cx = self.context();
        self.send(OutboundMessage::Report {
            instance_id: self.inner.id,
            url: cx.location(),
            main_frame: cx.is_top_frame(),
            state: snapshot,
        });
    }
}

// ============================================================================
// AutoConsent - Initialization
// ============================================================================

impl AutoConsent {
    /// Applies configuration and rules. Returns `false` if the engine is
    /// disabled.
    ///
    /// Builds the candidate list, installs the filter list and prehide
    /// styles as configured. Detection is started separately with
    /// [`start`](Self::start).
    pub fn initialize(&self, config: Config, rules: &RuleSet) -> bool {
        let logs = config.logs;
        if logs.lifecycle {
            debug!(url = %self.url(), "autoconsent init");
        }

        {
            let mut cx = self.inner.cx.write();
            cx.bridge().configure(config.is_main_world, logs);
            let rebuilt = CmpContext::new(cx.dom().with_logs(logs), cx.bridge().clone());
            *cx = rebuilt;
        }
        *self.inner.config.write() = config.clone();

        if !config.enabled {
            if logs.lifecycle {
                debug!("autoconsent is disabled");
            }
            return false;
        }

        let cmps = parse_rules(rules);
        if config.enable_filter_list {
            self.apply_cosmetic_filters(&rules.filter_list);
        }
        *self.inner.cmps.write() = filter_cmps(cmps, &config);

        if config.enable_prehide {
            self.prehide_elements();
        }
        self.update_state(|s| s.lifecycle = Lifecycle::Initialized);
        true
    }

    /// Spawns [`start`](Self::start) on the current runtime.
    pub fn spawn_start(&self) -> JoinHandle<bool> {
        let engine = self.clone();
        tokio::spawn(async move { engine.start().await })
    }

    /// Runs detection and handles the first popup found.
    ///
    /// Yields once, then waits for the document to leave the `loading`
    /// state. Returns the handler's result, or `false` when no popup was
    /// found.
    pub async fn start(&self) -> bool {
        tokio::task::yield_now().await;
        let cx = self.context();
        let options = self.inner.options;
        wait_for(
            || cx.env().ready_state() != ReadyState::Loading,
            options.dom_ready_retries,
            options.dom_ready_interval,
        )
        .await;
        self.run().await
    }

    async fn run(&self) -> bool {
        let config = self.config();
        let logs = config.logs;
        if logs.lifecycle {
            debug!(url = %self.url(), "Detecting CMPs");
        }
        self.update_state(|s| s.lifecycle = Lifecycle::Started);

        let found = self.find_cmp(config.detect_retries).await;
        let names: Vec<String> = found.iter().map(|c| c.name().to_string()).collect();
        self.update_state(|s| s.detected_cmps = names);

        if found.is_empty() {
            if logs.lifecycle {
                debug!(url = %self.url(), "no CMP found");
            }
            if config.enable_prehide {
                self.undo_prehide();
            }
            return self.filter_list_fallback();
        }
        self.update_state(|s| s.lifecycle = Lifecycle::CmpDetected);

        let (cosmetic, regular): (Vec<_>, Vec<_>) = found.into_iter().partition(|c| c.is_cosmetic());
        let mut popups = self.detect_popups(&regular).await;
        if popups.is_empty() {
            popups = self.detect_popups(&cosmetic).await;
        }
        if popups.is_empty() {
            if logs.lifecycle {
                debug!("no popup found");
            }
            if config.enable_prehide {
                self.undo_prehide();
            }
            return false;
        }

        if popups.len() > 1 {
            let details = ErrorDetails {
                msg: "Found multiple CMPs, check the detection rules.".to_string(),
                cmps: popups.iter().map(|c| c.name().to_string()).collect(),
            };
            if logs.errors {
                warn!(cmps = ?details.cmps, "{}", details.msg);
            }
            self.send(OutboundMessage::AutoconsentError { details });
        }

        let task = self.inner.popup_task.lock().take();
        match task {
            Some(task) => match task.await {
                Ok(result) => result,
                Err(e) => {
                    if logs.errors {
                        warn!(error = %e, "Popup handler failed");
                    }
                    false
                }
            },
            None => false,
        }
    }
}

// ============================================================================
// AutoConsent - Detection
// ============================================================================

impl AutoConsent {
    /// Runs detection rounds until a CMP is found, retrying up to `retries`
    /// more times.
    pub async fn find_cmp(&self, retries: u32) -> Vec<Arc<dyn CmpStrategy>> {
        let cx = self.context();
        let logs = self.logs();
        let mut remaining = retries;
        loop {
            self.update_state(|s| s.find_cmp_attempts += 1);
            let cmps = self.inner.cmps.read().clone();
            let mut found = Vec::new();
            for cmp in cmps {
                if !cmp.check_run_context(&cx) {
                    continue;
                }
                if cmp.detect_cmp(&cx).await {
                    let url = cx.location();
                    if logs.lifecycle {
                        debug!(cmp = cmp.name(), %url, "Found CMP");
                    }
                    self.send(OutboundMessage::CmpDetected {
                        url,
                        cmp: cmp.name().to_string(),
                    });
                    found.push(cmp);
                }
            }
            self.detect_heuristics();

            if !found.is_empty() || remaining == 0 {
                return found;
            }
            remaining -= 1;
            sleep(self.inner.options.find_cmp_interval).await;
        }
    }

    /// Records heuristic matches when detection is enabled and the matched
    /// pattern set changed.
    fn detect_heuristics(&self) {
        let config = self.config();
        if !config.enable_heuristic_detection {
            return;
        }
        let found = check_heuristic_patterns(&self.context().env().inner_text());
        if found.is_empty() || self.inner.state.lock().heuristic_patterns == found.patterns {
            return;
        }
        if config.logs.lifecycle {
            debug!(patterns = ?found.patterns, snippets = ?found.snippets, "Heuristic patterns found");
        }
        self.update_state(|s| {
            s.heuristic_patterns = found.patterns;
            s.heuristic_snippets = found.snippets;
        });
    }

    /// Checks one CMP for an open popup and reports a hit.
    pub async fn detect_popup(&self, cmp: &dyn CmpStrategy) -> bool {
        let cx = self.context();
        let logs = self.logs();
        let options = self.inner.options;
        if logs.lifecycle {
            debug!(cmp = cmp.name(), "checking if popup is open...");
        }
        let open = poll_popup(cmp, &cx, options.popup_retries, options.popup_interval).await;
        if logs.lifecycle {
            debug!(cmp = cmp.name(), open, "Popup check finished");
        }
        if open {
            let name = cmp.name().to_string();
            self.update_state(|s| s.detected_popups.push(name.clone()));
            self.send(OutboundMessage::PopupFound {
                cmp: name,
                url: cx.location(),
            });
        }
        open
    }

    /// Races popup checks; the first hit is handled in a spawned task.
    async fn detect_popups(&self, cmps: &[Arc<dyn CmpStrategy>]) -> Vec<Arc<dyn CmpStrategy>> {
        race_popups(
            cmps,
            |cmp| async move { self.detect_popup(&*cmp).await },
            |cmp| {
                self.detect_heuristics();
                let engine = self.clone();
                let task = tokio::spawn(async move { engine.handle_popup(cmp).await });
                *self.inner.popup_task.lock() = Some(task);
            },
        )
        .await
    }
}

// ============================================================================
// AutoConsent - Actions
// ============================================================================

impl AutoConsent {
    /// Takes over a confirmed popup and runs the configured action.
    ///
    /// Without an automatic action this only records the CMP and returns
    /// `true`; the host later sends `optOut` or `optIn`.
    pub async fn handle_popup(&self, cmp: Arc<dyn CmpStrategy>) -> bool {
        self.update_state(|s| s.lifecycle = Lifecycle::OpenPopupDetected);
        let config = self.config();
        let (prehide_on, cosmetics_on) = {
            let state = self.inner.state.lock();
            (state.prehide_on, state.cosmetic_filters_on)
        };
        if config.enable_prehide && !prehide_on {
            self.prehide_elements();
        }
        if cosmetics_on {
            self.undo_cosmetics();
        }
        *self.inner.found_cmp.lock() = Some(cmp);

        match config.auto_action {
            Some(AutoAction::OptOut) => self.do_opt_out().await,
            Some(AutoAction::OptIn) => self.do_opt_in().await,
            None => {
                if config.logs.lifecycle {
                    debug!(url = %self.url(), "waiting for opt-out signal...");
                }
                true
            }
        }
    }

    /// Opts out of the found CMP and reports the outcome.
    pub async fn do_opt_out(&self) -> bool {
        self.run_opt_action(AutoAction::OptOut).await
    }

    /// Opts in to the found CMP and reports the outcome.
    pub async fn do_opt_in(&self) -> bool {
        self.run_opt_action(AutoAction::OptIn).await
    }

    async fn run_opt_action(&self, action: AutoAction) -> bool {
        let config = self.config();
        let logs = config.logs;
        let (running, label) = match action {
            AutoAction::OptOut => (Lifecycle::RunningOptOut, "opt out"),
            AutoAction::OptIn => (Lifecycle::RunningOptIn, "opt in"),
        };
        self.update_state(|s| s.lifecycle = running);

        let cx = self.context();
        let found = self.inner.found_cmp.lock().clone();
        let result = match &found {
            None => {
                if logs.errors {
                    warn!("no CMP to {label}");
                }
                false
            }
            Some(cmp) => {
                if logs.lifecycle {
                    debug!(cmp = cmp.name(), url = %cx.location(), "{label}");
                }
                let result = match action {
                    AutoAction::OptOut => cmp.opt_out(&cx).await,
                    AutoAction::OptIn => cmp.opt_in(&cx).await,
                };
                if logs.lifecycle {
                    debug!(cmp = cmp.name(), result, "{label} result");
                }
                result
            }
        };

        if config.enable_prehide {
            self.undo_prehide();
        }

        let cmp_name = found.as_ref().map_or_else(|| "none".to_string(), |c| c.name().to_string());
        let url = cx.location();
        self.send(match action {
            AutoAction::OptOut => OutboundMessage::OptOutResult {
                cmp: cmp_name,
                result,
                schedule_self_test: found.as_ref().is_some_and(|c| c.has_self_test()),
                url: url.clone(),
            },
            AutoAction::OptIn => OutboundMessage::OptInResult {
                cmp: cmp_name,
                result,
                schedule_self_test: false,
                url: url.clone(),
            },
        });

        match found {
            Some(cmp) if result && !cmp.is_intermediate() => {
                self.send(OutboundMessage::AutoconsentDone {
                    cmp: cmp.name().to_string(),
                    is_cosmetic: cmp.is_cosmetic(),
                    url,
                });
                self.update_state(|s| s.lifecycle = Lifecycle::Done);
            }
            _ => {
                let next = match (action, result) {
                    (AutoAction::OptOut, true) => Lifecycle::OptOutSucceeded,
                    (AutoAction::OptOut, false) => Lifecycle::OptOutFailed,
                    (AutoAction::OptIn, true) => Lifecycle::OptInSucceeded,
                    (AutoAction::OptIn, false) => Lifecycle::OptInFailed,
                };
                self.update_state(|s| s.lifecycle = next);
            }
        }
        result
    }

    /// Runs the found CMP's self-test and reports the outcome.
    pub async fn do_self_test(&self) -> bool {
        let logs = self.logs();
        let cx = self.context();
        let found = self.inner.found_cmp.lock().clone();
        let result = match &found {
            None => {
                if logs.errors {
                    warn!("no CMP to self test");
                }
                false
            }
            Some(cmp) => {
                if logs.lifecycle {
                    debug!(cmp = cmp.name(), url = %cx.location(), "self-test");
                }
                cmp.test(&cx).await
            }
        };
        self.send(OutboundMessage::SelfTestResult {
            cmp: found.map_or_else(|| "none".to_string(), |c| c.name().to_string()),
            result,
            url: cx.location(),
        });
        self.update_state(|s| s.self_test = Some(result));
        result
    }
}

// ============================================================================
// AutoConsent - Prehide & Cosmetics
// ============================================================================

impl AutoConsent {
    /// Hides every known banner selector until an action starts or the
    /// prehide timeout fires.
    pub fn prehide_elements(&self) -> bool {
        let cx = self.context();
        let config = self.config();
        let mut selectors = vec![GLOBAL_PREHIDE.to_string()];
        for cmp in self.inner.cmps.read().iter() {
            let own = cmp.prehide_selectors();
            if !own.is_empty() && cmp.check_run_context(&cx) {
                selectors.extend(own);
            }
        }
        self.update_state(|s| s.prehide_on = true);

        let timeout = match config.prehide_timeout() {
            t if t.is_zero() => FALLBACK_PREHIDE_TIMEOUT,
            t => t,
        };
        let engine = self.clone();
        tokio::spawn(async move {
            sleep(timeout).await;
            let config = engine.config();
            let (on, lifecycle) = {
                let state = engine.inner.state.lock();
                (state.prehide_on, state.lifecycle)
            };
            if config.enable_prehide && on && !lifecycle.is_running_opt_action() {
                if config.logs.lifecycle {
                    debug!("Process is taking too long, unhiding elements");
                }
                engine.undo_prehide();
            }
        });

        cx.dom().prehide(&selectors.join(","))
    }

    /// Removes the prehide styles.
    pub fn undo_prehide(&self) -> bool {
        self.update_state(|s| s.prehide_on = false);
        self.context().dom().undo_prehide()
    }

    /// Installs filter-list rules (`selector` or `selector { style }`).
    ///
    /// Plain selectors are hidden with opacity so a later visibility check
    /// can tell whether they matched. After the check delay a visible match
    /// is reported once as the `filterList` CMP.
    pub fn apply_cosmetic_filters(&self, filters: &[String]) -> bool {
        if filters.is_empty() {
            return false;
        }
        let styles: String = filters
            .iter()
            .map(|f| {
                if f.contains('{') {
                    format!("{} ", f.trim())
                } else {
                    hiding_rule(f.trim(), HideMethod::Opacity)
                }
            })
            .collect();
        *self.inner.cosmetic_styles.lock() = styles.clone();

        let engine = self.clone();
        let delay = self.inner.options.filter_list_check_delay;
        tokio::spawn(async move {
            sleep(delay).await;
            let (on, reported) = {
                let state = engine.inner.state.lock();
                (state.cosmetic_filters_on, state.filter_list_reported)
            };
            if on && !reported {
                let matched = engine.cosmetic_filters_matched();
                if engine.logs().lifecycle {
                    debug!(matched, url = %engine.url(), "Prehide cosmetic filters checked");
                }
                if matched {
                    engine.report_filter_list();
                }
            }
        });

        self.update_state(|s| s.cosmetic_filters_on = true);
        let cx = self.context();
        let applied = cx.env().append_style_rule(COSMETICS_STYLE_ID, &styles);
        if !applied && self.logs().errors {
            warn!("Error applying cosmetic filters");
        }
        applied
    }

    /// Removes the filter-list styles.
    pub fn undo_cosmetics(&self) {
        self.update_state(|s| s.cosmetic_filters_on = false);
        if self.logs().lifecycle {
            debug!(url = %self.url(), "[undocosmetics]");
        }
        self.context().env().remove_style(COSMETICS_STYLE_ID);
    }

    fn cosmetic_filters_matched(&self) -> bool {
        let selectors = filter_list_selectors(&self.inner.cosmetic_styles.lock());
        if selectors.is_empty() {
            return false;
        }
        self.context()
            .dom()
            .element_visible(&selectors.into(), VisibilityCheck::Any)
    }

    fn report_filter_list(&self) {
        let url = self.url();
        self.send(OutboundMessage::CmpDetected {
            url: url.clone(),
            cmp: FILTER_LIST_CMP.to_string(),
        });
        self.send(OutboundMessage::PopupFound {
            cmp: FILTER_LIST_CMP.to_string(),
            url,
        });
        self.update_state(|s| s.filter_list_reported = true);
    }

    /// Ends a run without a CMP.
    fn filter_list_fallback(&self) -> bool {
        let (on, reported) = {
            let state = self.inner.state.lock();
            (state.cosmetic_filters_on, state.filter_list_reported)
        };
        if !on || !self.cosmetic_filters_matched() {
            if on && self.logs().lifecycle {
                debug!(url = %self.url(), "Cosmetic filters didn't match");
            }
            self.update_state(|s| s.lifecycle = Lifecycle::NothingDetected);
            return false;
        }
        if self.logs().lifecycle {
            debug!(url = %self.url(), "Cosmetic filters matched");
        }
        self.update_state(|s| s.lifecycle = Lifecycle::CosmeticFiltersDetected);
        if !reported {
            self.report_filter_list();
        }
        true
    }
}

// ============================================================================
// AutoConsent - Messages
// ============================================================================

impl AutoConsent {
    /// Handles a message from the host.
    ///
    /// Work that may wait on the page (detection, opt actions, self-test)
    /// is spawned so `evalResp` messages keep flowing; the handle is
    /// returned. Must be called inside a tokio runtime.
    pub fn receive_message(&self, message: InboundMessage) -> Option<JoinHandle<bool>> {
        if self.logs().messages {
            debug!(kind = message.kind(), url = %self.url(), "received from background");
        }
        match message {
            InboundMessage::InitResp { config, rules } => {
                if self.initialize(config, &rules) {
                    Some(self.spawn_start())
                } else {
                    None
                }
            }
            InboundMessage::OptIn => {
                let engine = self.clone();
                Some(tokio::spawn(async move { engine.do_opt_in().await }))
            }
            InboundMessage::OptOut => {
                let engine = self.clone();
                Some(tokio::spawn(async move { engine.do_opt_out().await }))
            }
            InboundMessage::SelfTest => {
                let engine = self.clone();
                Some(tokio::spawn(async move { engine.do_self_test().await }))
            }
            InboundMessage::EvalResp { id, result } => {
                self.bridge().resolve_eval(id, &result);
                None
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
