use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::oneshot;

use codemirror_editor::RemoteCall;

use crate::error::BridgeError;

pub type CallResult = Result<Value, BridgeError>;
pub type ReplySender = oneshot::Sender<CallResult>;

/// Whether the embedded runtime can accept calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Readiness {
    Loading,
    Ready,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessSignal {
    Ready,
    LoadFailed,
}

/// Configuration properties tracked for change suppression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigField {
    Theme,
    LineWrapping,
    LineNumbers,
    FoldGutter,
    ReadOnly,
    HighlightActiveLine,
    SearchEnabled,
    Language,
    Placeholder,
    FontSize,
    Focused,
}

/// A call waiting for the runtime to become ready (or for an in-progress
/// flush to reach it).
#[derive(Debug)]
pub struct PendingCall {
    pub call: RemoteCall,
    pub reply: Option<ReplySender>,
}

impl PendingCall {
    pub fn new(call: RemoteCall, reply: Option<ReplySender>) -> Self {
        PendingCall { call, reply }
    }

    pub fn function_name(&self) -> &str {
        &self.call.function
    }

    /// Resolve the reply (if any) without dispatching.
    pub fn reject(self, error: BridgeError) {
        if let Some(reply) = self.reply {
            let _ = reply.send(Err(error));
        }
    }
}

/// What has already been told to the runtime, and whether it is listening.
///
/// Owned by the bridge task; never shared.
#[derive(Debug)]
pub struct BridgeState {
    readiness: Readiness,
    applied: HashMap<ConfigField, Value>,
    pending: VecDeque<PendingCall>,
    host_content: String,
    // Echo suppression: the last content either side is known to hold.
    last_content: Option<String>,
}

impl BridgeState {
    pub fn new(initial_content: String) -> Self {
        BridgeState {
            readiness: Readiness::Loading,
            applied: HashMap::new(),
            pending: VecDeque::new(),
            host_content: initial_content,
            last_content: None,
        }
    }

    pub fn readiness(&self) -> Readiness {
        self.readiness
    }

    /// Apply a readiness signal. `Failed` is absorbing.
    pub fn transition_readiness(&mut self, signal: ReadinessSignal) -> Readiness {
        self.readiness = match (self.readiness, signal) {
            (Readiness::Failed, _) => Readiness::Failed,
            (_, ReadinessSignal::LoadFailed) => Readiness::Failed,
            (_, ReadinessSignal::Ready) => Readiness::Ready,
        };
        self.readiness
    }

    pub fn record_applied(&mut self, field: ConfigField, value: Value) {
        self.applied.insert(field, value);
    }

    /// Never-applied fields count as changed.
    pub fn has_changed(&self, field: ConfigField, value: &Value) -> bool {
        self.applied.get(&field) != Some(value)
    }

    pub fn enqueue(&mut self, call: PendingCall) {
        self.pending.push_back(call);
    }

    pub fn next_pending(&mut self) -> Option<PendingCall> {
        self.pending.pop_front()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn drain_pending(&mut self) -> impl Iterator<Item = PendingCall> + '_ {
        self.pending.drain(..)
    }

    pub fn host_content(&self) -> &str {
        &self.host_content
    }

    pub fn set_host_content(&mut self, content: String) {
        self.host_content = content;
    }

    pub fn last_content(&self) -> Option<&str> {
        self.last_content.as_deref()
    }

    pub fn set_last_content(&mut self, content: String) {
        self.last_content = Some(content);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codemirror_editor::EditorCall;

    #[test]
    fn readiness_loading_to_ready() {
        let mut state = BridgeState::new(String::new());
        assert_eq!(state.readiness(), Readiness::Loading);
        assert_eq!(
            state.transition_readiness(ReadinessSignal::Ready),
            Readiness::Ready
        );
        assert_eq!(
            state.transition_readiness(ReadinessSignal::Ready),
            Readiness::Ready
        );
    }

    #[test]
    fn failed_is_terminal() {
        let mut state = BridgeState::new(String::new());
        state.transition_readiness(ReadinessSignal::Ready);
        assert_eq!(
            state.transition_readiness(ReadinessSignal::LoadFailed),
            Readiness::Failed
        );
        assert_eq!(
            state.transition_readiness(ReadinessSignal::Ready),
            Readiness::Failed
        );
    }

    #[test]
    fn loading_can_fail_directly() {
        let mut state = BridgeState::new(String::new());
        assert_eq!(
            state.transition_readiness(ReadinessSignal::LoadFailed),
            Readiness::Failed
        );
    }

    #[test]
    fn change_tracking() {
        let mut state = BridgeState::new(String::new());
        let nord = Value::from("nord");
        assert!(state.has_changed(ConfigField::Theme, &nord));
        state.record_applied(ConfigField::Theme, nord.clone());
        assert!(!state.has_changed(ConfigField::Theme, &nord));
        state.record_applied(ConfigField::Theme, nord.clone());
        assert!(!state.has_changed(ConfigField::Theme, &nord));
        assert!(state.has_changed(ConfigField::Theme, &Value::from("dracula")));
        assert!(state.has_changed(ConfigField::Language, &nord));
    }

    #[test]
    fn pending_queue_is_fifo() {
        let mut state = BridgeState::new(String::new());
        state.enqueue(PendingCall::new(EditorCall::SetFocus.into(), None));
        state.enqueue(PendingCall::new(EditorCall::SetBlur.into(), None));
        assert_eq!(state.pending_len(), 2);
        assert_eq!(state.next_pending().unwrap().function_name(), "setFocus");
        assert_eq!(state.next_pending().unwrap().function_name(), "setBlur");
        assert!(!state.has_pending());
    }

    #[test]
    fn reject_resolves_reply() {
        let (tx, mut rx) = oneshot::channel();
        PendingCall::new(EditorCall::GetContent.into(), Some(tx))
            .reject(BridgeError::RuntimeUnavailable);
        assert_eq!(rx.try_recv().unwrap(), Err(BridgeError::RuntimeUnavailable));
    }
}
