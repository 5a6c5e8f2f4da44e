// Lifecycle controller module
// Owns the scan, the watchers, and the single zoom session

use std::collections::HashMap;

use log::{debug, info};

use crate::config::ZoomConfig;
use crate::eligibility::{self, Eligibility};
use crate::host::{Host, ListenKind, TimerId};
use crate::navigation::{NavigationWatcher, NAV_POLL_INTERVAL_MS, SETTLE_DELAY_MS};
use crate::session::{CloseReason, Phase, ZoomSession, TRANSITION_MS};
use crate::wrapper::{self, Wrapped, LOADING_CLASS};

/// What a pending timer will do when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerTask {
    /// Entry transition complete; the session becomes fully open
    SessionOpened,
    /// Exit transition complete; the session's elements are removed
    SessionRemoval,
    /// Settle delay after a route change elapsed; re-scan
    NavigationSettle,
    /// Recurring fallback poll comparing the location path
    NavigationPoll,
}

/// Process-wide controller owning the host, the configuration, the
/// installed wrappers, and the (at most one) live zoom session.
///
/// All environment events funnel through the `on_*` entry points; the
/// host adapter calls them when the corresponding event fires. Every
/// entry point is a no-op until [`init`](ZoomRuntime::init) has run and
/// after [`teardown`](ZoomRuntime::teardown), and `init` itself degrades
/// to a no-op when the host has no document.
#[derive(Debug)]
pub struct ZoomRuntime<H: Host> {
    host: H,
    config: ZoomConfig,
    initialized: bool,
    wrapped: Vec<Wrapped<H::Node>>,
    session: Option<ZoomSession<H::Node>>,
    navigation: NavigationWatcher,
    timers: HashMap<TimerId, TimerTask>,
}

impl<H: Host> ZoomRuntime<H> {
    /// Create a runtime over a host. No DOM work happens until `init`.
    pub fn new(host: H, config: ZoomConfig) -> Self {
        Self {
            host,
            config,
            initialized: false,
            wrapped: Vec::new(),
            session: None,
            navigation: NavigationWatcher::default(),
            timers: HashMap::new(),
        }
    }

    /// Start the runtime: install the watchers and perform the initial
    /// scan. Idempotent — calling it again first tears the previous
    /// watchers and listeners down, then reinitializes.
    pub fn init(&mut self) {
        if self.initialized {
            debug!("re-initializing; stopping previous watchers");
            self.stop_watchers();
        }
        if !self.host.has_document() {
            debug!("no document available; init skipped");
            return;
        }

        info!(
            "initializing zoom runtime (selector {:?})",
            self.config.selector
        );
        self.initialized = true;
        self.navigation = NavigationWatcher::new(self.host.location_path());
        self.host.observe_subtree(true);
        self.host.observe_navigation(true);
        let poll = self.host.set_interval(NAV_POLL_INTERVAL_MS);
        self.timers.insert(poll, TimerTask::NavigationPoll);
        self.scan();
    }

    /// Stop the runtime: disconnect observers, cancel timers, destroy any
    /// open session, and restore every wrapped image to its original
    /// state. Safe to call at any time, including before `init`.
    pub fn teardown(&mut self) {
        if !self.initialized {
            return;
        }
        info!("tearing down zoom runtime");
        self.stop_watchers();
        if let Some(session) = self.session.take() {
            session.destroy(&mut self.host);
        }
        for wrapped in std::mem::take(&mut self.wrapped) {
            wrapper::uninstall(&mut self.host, &wrapped);
        }
        self.initialized = false;
    }

    /// Scan the document for candidate images and wrap the eligible ones.
    /// Repeat scans are no-ops for anything already processed.
    pub fn scan(&mut self) {
        if !self.initialized {
            return;
        }
        let candidates = self.host.query_selector_all(&self.config.selector);
        debug!("scan: {} candidate(s)", candidates.len());
        for image in candidates {
            match eligibility::evaluate(&self.host, &image) {
                Eligibility::Eligible => self.install(&image),
                Eligibility::Deferred => {
                    debug!("deferring {:?} until it finishes loading", image);
                    self.host.listen(&image, ListenKind::ImageLoad);
                }
                Eligibility::Rejected(reason) => {
                    debug!("skipping {:?}: {:?}", image, reason);
                }
            }
        }
    }

    /// Activation event from a wrapper container (click or Enter/Space).
    pub fn on_activate(&mut self, wrapper_node: &H::Node) {
        if !self.initialized {
            return;
        }
        if self.session.as_ref().is_some_and(|s| s.is_transitioning()) {
            debug!("activation dropped mid-transition");
            return;
        }
        let Some(image) = self
            .wrapped
            .iter()
            .find(|w| w.wrapper == *wrapper_node)
            .map(|w| w.image.clone())
        else {
            return;
        };
        let Some(info) = self.host.image_info(&image) else {
            return;
        };

        // Any previous session is fully gone before the new one is built:
        // no two overlay/enlarged-image pairs ever coexist in the document.
        if let Some(previous) = self.session.take() {
            self.cancel_session_timers();
            previous.destroy(&mut self.host);
        }
        self.session = Some(ZoomSession::begin(&mut self.host, &self.config, &info));
    }

    /// Dismissal request from a click on the overlay or the enlarged image.
    pub fn on_dismiss(&mut self) {
        if !self.initialized {
            return;
        }
        self.request_close(CloseReason::Backdrop);
    }

    /// Dismissal request from the Escape key.
    pub fn on_escape(&mut self) {
        if !self.initialized {
            return;
        }
        self.request_close(CloseReason::Escape);
    }

    /// Load completion for an image that was deferred or is showing the
    /// loading state.
    pub fn on_image_loaded(&mut self, image: &H::Node) {
        if !self.initialized {
            return;
        }
        self.host.unlisten(image, ListenKind::ImageLoad);

        // Already wrapped: the load event clears the loading visual state.
        if let Some(wrapper_node) = self
            .wrapped
            .iter()
            .find(|w| w.image == *image)
            .map(|w| w.wrapper.clone())
        {
            self.host.remove_class(&wrapper_node, LOADING_CLASS);
            return;
        }

        // Deferred eligibility: dimensions are known now.
        if eligibility::evaluate(&self.host, image) == Eligibility::Eligible {
            self.install(image);
        }
    }

    /// Subtree-change notification with the nodes added since the last
    /// report. Re-scans when any of them brings new images along.
    pub fn on_subtree_changed(&mut self, added: &[H::Node]) {
        if !self.initialized {
            return;
        }
        if added.iter().any(|node| self.host.node_adds_images(node)) {
            debug!("subtree change added images; rescanning");
            self.scan();
        }
    }

    /// Navigation-intent signal from the host (history-mutation
    /// interception or the back/forward event).
    pub fn on_history_changed(&mut self) {
        if !self.initialized {
            return;
        }
        self.check_navigation();
    }

    /// Animation-frame callback.
    pub fn on_frame(&mut self) {
        if !self.initialized {
            return;
        }
        if let Some(session) = &mut self.session {
            if session.activate(&mut self.host) {
                let timer = self.host.set_timeout(TRANSITION_MS);
                self.timers.insert(timer, TimerTask::SessionOpened);
            }
        }
    }

    /// A timer scheduled through the host has fired.
    pub fn on_timer(&mut self, id: TimerId) {
        if !self.initialized {
            return;
        }
        let Some(task) = self.timers.get(&id).copied() else {
            return;
        };
        match task {
            TimerTask::SessionOpened => {
                self.timers.remove(&id);
                if let Some(session) = &mut self.session {
                    session.mark_open(&mut self.host);
                }
            }
            TimerTask::SessionRemoval => {
                self.timers.remove(&id);
                if let Some(session) = self.session.take() {
                    session.finish_close(&mut self.host);
                }
            }
            TimerTask::NavigationSettle => {
                self.timers.remove(&id);
                debug!("settle delay elapsed; rescanning");
                self.scan();
            }
            TimerTask::NavigationPoll => self.check_navigation(),
        }
    }

    /// Current session phase, or `None` when no session exists.
    pub fn session_phase(&self) -> Option<Phase> {
        self.session.as_ref().map(|s| s.phase())
    }

    /// Number of images currently wrapped.
    pub fn wrapped_count(&self) -> usize {
        self.wrapped.len()
    }

    /// Whether `init` has run (and `teardown` has not).
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// The active configuration.
    pub fn config(&self) -> &ZoomConfig {
        &self.config
    }

    /// The underlying host.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Mutable access to the underlying host, for embedders that drive
    /// the document and the clock themselves.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    fn install(&mut self, image: &H::Node) {
        if let Some(wrapped) = wrapper::install(&mut self.host, image) {
            self.wrapped.push(wrapped);
        }
    }

    fn request_close(&mut self, reason: CloseReason) {
        if let Some(session) = &mut self.session {
            if session.begin_close(&mut self.host, reason) {
                let timer = self.host.set_timeout(TRANSITION_MS);
                self.timers.insert(timer, TimerTask::SessionRemoval);
            }
        }
    }

    /// Compare the current location path against the last observed one and
    /// react to a change: force the session closed and re-scan once the
    /// new page has had a moment to mount.
    fn check_navigation(&mut self) {
        let path = self.host.location_path();
        if !self.navigation.observe(path) {
            return;
        }
        info!("route change detected ({})", self.navigation.last_path());
        self.force_close();
        self.cancel_timers_for(TimerTask::NavigationSettle);
        let settle = self.host.set_timeout(SETTLE_DELAY_MS);
        self.timers.insert(settle, TimerTask::NavigationSettle);
    }

    /// Close the session on behalf of the navigation watcher: an open
    /// session exits through the normal animated path, while one still
    /// opening is destroyed outright since its page is going away.
    fn force_close(&mut self) {
        match self.session_phase() {
            Some(Phase::Open) => self.request_close(CloseReason::Navigation),
            Some(Phase::Opening) => {
                self.cancel_session_timers();
                if let Some(session) = self.session.take() {
                    session.destroy(&mut self.host);
                }
            }
            _ => {}
        }
    }

    fn stop_watchers(&mut self) {
        self.host.observe_subtree(false);
        self.host.observe_navigation(false);
        for (id, _) in self.timers.drain() {
            self.host.clear_timer(id);
        }
    }

    fn cancel_session_timers(&mut self) {
        self.cancel_timers_for(TimerTask::SessionOpened);
        self.cancel_timers_for(TimerTask::SessionRemoval);
    }

    fn cancel_timers_for(&mut self, task: TimerTask) {
        let ids: Vec<TimerId> = self
            .timers
            .iter()
            .filter(|(_, t)| **t == task)
            .map(|(id, _)| *id)
            .collect();
        for id in ids {
            self.timers.remove(&id);
            self.host.clear_timer(id);
        }
    }
}
