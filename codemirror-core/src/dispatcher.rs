//! Turns configuration and content changes into ordered runtime calls.
//!
//! The dispatcher is synchronous and clock-agnostic: every time-dependent
//! operation takes `now`, and the owner asks [`Dispatcher::next_deadline`]
//! when to call [`Dispatcher::on_timer`] next. Cancelling a timer is just
//! clearing its deadline, so a superseded write can never fire.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;

use codemirror_editor::{EditorCall, RemoteCall};

use crate::config::{BridgeSettings, EditorConfiguration};
use crate::error::BridgeError;
use crate::runtime::{CallId, EditorRuntime, RuntimeRequest};
use crate::state::{BridgeState, PendingCall, Readiness, ReadinessSignal, ReplySender};

#[derive(Debug)]
struct DebouncedWrite {
    content: String,
    deadline: Instant,
}

pub struct Dispatcher {
    runtime: Box<dyn EditorRuntime>,
    state: BridgeState,
    next_id: u64,
    outstanding: HashMap<CallId, ReplySender>,
    content_debounce: Duration,
    flush_interval: Duration,
    debounced: Option<DebouncedWrite>,
    next_flush_at: Option<Instant>,
}

impl Dispatcher {
    pub fn new(
        runtime: Box<dyn EditorRuntime>,
        settings: &BridgeSettings,
        initial_content: String,
    ) -> Self {
        Dispatcher {
            runtime,
            state: BridgeState::new(initial_content),
            next_id: 1,
            outstanding: HashMap::new(),
            content_debounce: settings.content_debounce(),
            flush_interval: settings.flush_interval(),
            debounced: None,
            next_flush_at: None,
        }
    }

    pub fn state(&self) -> &BridgeState {
        &self.state
    }

    pub fn readiness(&self) -> Readiness {
        self.state.readiness()
    }

    pub fn outstanding_calls(&self) -> usize {
        self.outstanding.len()
    }

    /// Send now, queue, or reject depending on readiness.
    ///
    /// While a post-ready flush is still draining, new calls join the back
    /// of the queue so request order is kept. `setContent` goes through the
    /// same path as [`Dispatcher::set_content`], so it is debounced and the
    /// binding follows it; its reply resolves once the write is accepted.
    pub fn request_call(&mut self, call: RemoteCall, reply: Option<ReplySender>, now: Instant) {
        if let Some(content) = call.content_write().map(str::to_string) {
            if self.state.readiness() == Readiness::Failed {
                PendingCall::new(call, reply).reject(BridgeError::RuntimeUnavailable);
                return;
            }
            self.set_content(content, now);
            if let Some(reply) = reply {
                let _ = reply.send(Ok(Value::Null));
            }
            return;
        }
        self.route(PendingCall::new(call, reply));
    }

    fn route(&mut self, pending: PendingCall) {
        match self.state.readiness() {
            Readiness::Failed => {
                log::debug!(
                    "Editor runtime unavailable, dropping {}",
                    pending.function_name()
                );
                pending.reject(BridgeError::RuntimeUnavailable);
            }
            Readiness::Loading => {
                log::debug!("Editor runtime loading, queueing {}", pending.function_name());
                self.state.enqueue(pending);
            }
            Readiness::Ready => self.submit(pending),
        }
    }

    /// Diff a full configuration snapshot against what the runtime was last
    /// told and request a call for each field that differs.
    ///
    /// Returns the number of calls requested.
    pub fn apply_configuration(&mut self, config: &EditorConfiguration) -> usize {
        let mut requested = 0;
        for (field, value, call) in config.entries() {
            if !self.state.has_changed(field, &value) {
                continue;
            }
            self.state.record_applied(field, value);
            self.route(PendingCall::new(call.into(), None));
            requested += 1;
        }
        requested
    }

    /// Host-side content write.
    ///
    /// Before readiness the value is only recorded; it goes out as the
    /// initial content once the runtime is ready. Afterwards writes are
    /// debounced and coalesced so only the latest value in the window is sent.
    pub fn set_content(&mut self, content: String, now: Instant) {
        self.state.set_host_content(content.clone());
        if self.state.last_content() == Some(content.as_str()) {
            return;
        }
        self.state.set_last_content(content.clone());

        match self.state.readiness() {
            Readiness::Loading => {}
            Readiness::Failed => log::debug!("Editor runtime unavailable, content kept host-side"),
            Readiness::Ready if self.content_debounce.is_zero() => {
                self.submit(PendingCall::new(EditorCall::SetContent(content).into(), None));
            }
            Readiness::Ready => {
                if self.debounced.is_some() {
                    log::trace!("Coalescing content write");
                }
                self.debounced = Some(DebouncedWrite {
                    content,
                    deadline: now + self.content_debounce,
                });
            }
        }
    }

    /// `Loading → Ready`: queue the initial content behind everything
    /// requested so far and start flushing.
    ///
    /// Returns `false` if the runtime was not loading (duplicate ready
    /// signal, or already failed).
    pub fn mark_ready(&mut self, now: Instant) -> bool {
        if self.state.readiness() != Readiness::Loading {
            return false;
        }
        self.state.transition_readiness(ReadinessSignal::Ready);

        let initial = self.state.host_content().to_string();
        self.state.set_last_content(initial.clone());
        self.state
            .enqueue(PendingCall::new(EditorCall::SetContent(initial).into(), None));
        log::debug!(
            "Editor runtime ready, flushing {} call(s)",
            self.state.pending_len()
        );
        self.flush_step(now);
        true
    }

    /// Pin readiness to `Failed` and resolve every waiter.
    ///
    /// Returns `false` if the bridge had already failed.
    pub fn mark_failed(&mut self, reason: &str) -> bool {
        if self.state.readiness() == Readiness::Failed {
            return false;
        }
        self.state.transition_readiness(ReadinessSignal::LoadFailed);
        self.debounced = None;
        self.next_flush_at = None;

        for pending in self.state.drain_pending() {
            pending.reject(BridgeError::RuntimeUnavailable);
        }
        if !self.outstanding.is_empty() {
            log::warn!(
                "Failing {} outstanding editor call(s) after load failure",
                self.outstanding.len()
            );
        }
        for (_, reply) in self.outstanding.drain() {
            let _ = reply.send(Err(BridgeError::LoadFailure(reason.to_string())));
        }
        true
    }

    /// Content that originated in the editor. Recorded as already known to
    /// the runtime so it is not echoed back, and it supersedes any pending
    /// host write.
    ///
    /// Returns `false` if the change was ignored: before the runtime is
    /// ready its document is not yet the one the bridge will send, and after
    /// a failure nothing is tracked.
    pub fn accept_editor_content(&mut self, content: String) -> bool {
        match self.state.readiness() {
            Readiness::Ready => {}
            Readiness::Loading => {
                log::debug!("Ignoring editor content change before ready");
                return false;
            }
            Readiness::Failed => return false,
        }
        if self.debounced.take().is_some() {
            log::debug!("Editor change supersedes pending host content write");
        }
        self.state.set_last_content(content.clone());
        self.state.set_host_content(content);
        true
    }

    pub fn complete_call(&mut self, id: CallId, result: Result<Value, String>) {
        match self.outstanding.remove(&id) {
            Some(reply) => {
                let _ = reply.send(result.map_err(BridgeError::Transport));
            }
            None => log::debug!("Dropping result for unknown editor call {}", id),
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.debounced.as_ref().map(|d| d.deadline), self.next_flush_at) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn on_timer(&mut self, now: Instant) {
        if self.debounced.as_ref().is_some_and(|d| d.deadline <= now) {
            if let Some(write) = self.debounced.take() {
                self.submit(PendingCall::new(
                    EditorCall::SetContent(write.content).into(),
                    None,
                ));
            }
        }
        if self.next_flush_at.is_some_and(|at| at <= now) {
            self.flush_step(now);
        }
    }

    /// Drop pending timers and unresolved replies without invoking them.
    pub fn shutdown(&mut self) {
        self.debounced = None;
        self.next_flush_at = None;
        let queued = self.state.drain_pending().count();
        let outstanding = self.outstanding.len();
        self.outstanding.clear();
        if queued + outstanding > 0 {
            log::debug!(
                "Bridge shut down with {} queued and {} outstanding call(s)",
                queued,
                outstanding
            );
        }
    }

    fn submit(&mut self, pending: PendingCall) {
        if self.state.has_pending() {
            self.state.enqueue(pending);
        } else {
            self.dispatch(pending);
        }
    }

    fn flush_step(&mut self, now: Instant) {
        if self.flush_interval.is_zero() {
            while let Some(pending) = self.state.next_pending() {
                self.dispatch(pending);
            }
            self.next_flush_at = None;
            return;
        }
        if let Some(pending) = self.state.next_pending() {
            self.dispatch(pending);
        }
        let interval = self.flush_interval;
        self.next_flush_at = self.state.has_pending().then(|| now + interval);
    }

    fn dispatch(&mut self, pending: PendingCall) {
        let id = CallId(self.next_id);
        self.next_id += 1;

        let PendingCall { call, reply } = pending;
        let function = call.function.clone();
        let wants_reply = reply.is_some();
        if let Some(reply) = reply {
            self.outstanding.insert(id, reply);
        }

        log::trace!("Dispatching editor call {} {}", id, function);
        let request = RuntimeRequest {
            id,
            call,
            wants_reply,
        };
        if let Err(e) = self.runtime.evaluate(request) {
            match self.outstanding.remove(&id) {
                Some(reply) => {
                    let _ = reply.send(Err(BridgeError::Transport(e)));
                }
                None => log::warn!("Editor call {} failed: {}", function, e),
            }
        }
    }
}
