use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::Instant;

use codemirror_editor::EditorEvent;

use crate::bridge::BridgeMessage;
use crate::dispatcher::Dispatcher;
use crate::runtime::CallId;

/// Something the embedded runtime reported.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeEvent {
    Ready,
    ContentChanged(String),
    /// Initialisation or navigation failed.
    LoadFailed(String),
    CallCompleted {
        id: CallId,
        result: Result<Value, String>,
    },
}

impl From<EditorEvent> for RuntimeEvent {
    fn from(event: EditorEvent) -> Self {
        match event {
            EditorEvent::Ready => RuntimeEvent::Ready,
            EditorEvent::ContentChanged { content } => RuntimeEvent::ContentChanged(content),
        }
    }
}

/// Notifications for the host UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HostEvent {
    LoadSucceeded,
    LoadFailed { reason: String },
    ContentChanged { content: String },
}

/// Feeds runtime events into a bridge. Cheap to clone; hand one to whatever
/// owns the web view.
#[derive(Clone)]
pub struct RelaySender {
    tx: mpsc::UnboundedSender<BridgeMessage>,
}

impl RelaySender {
    pub(crate) fn new(tx: mpsc::UnboundedSender<BridgeMessage>) -> Self {
        RelaySender { tx }
    }

    /// Returns `false` once the bridge has shut down.
    pub fn send(&self, event: RuntimeEvent) -> bool {
        self.tx.send(BridgeMessage::Runtime(event)).is_ok()
    }

    pub fn ready(&self) -> bool {
        self.send(RuntimeEvent::Ready)
    }

    pub fn content_changed(&self, content: impl Into<String>) -> bool {
        self.send(RuntimeEvent::ContentChanged(content.into()))
    }

    pub fn load_failed(&self, reason: impl Into<String>) -> bool {
        self.send(RuntimeEvent::LoadFailed(reason.into()))
    }

    pub fn call_completed(&self, id: CallId, result: Result<Value, String>) -> bool {
        self.send(RuntimeEvent::CallCompleted { id, result })
    }

    /// Decode and forward a raw script message. Returns `false` if the
    /// message was not recognised or the bridge is gone.
    pub fn script_message(&self, name: &str, body: &Value) -> bool {
        match EditorEvent::from_script_message(name, body) {
            Some(event) => self.send(event.into()),
            None => false,
        }
    }
}

/// Reconciles runtime events into bridge state and host notifications.
pub struct EventRelay {
    host_tx: mpsc::UnboundedSender<HostEvent>,
}

impl EventRelay {
    pub fn new(host_tx: mpsc::UnboundedSender<HostEvent>) -> Self {
        EventRelay { host_tx }
    }

    pub fn handle(&mut self, dispatcher: &mut Dispatcher, event: RuntimeEvent, now: Instant) {
        match event {
            RuntimeEvent::Ready => self.on_ready(dispatcher, now),
            RuntimeEvent::LoadFailed(reason) => self.on_load_failed(dispatcher, reason),
            RuntimeEvent::ContentChanged(content) => self.on_content_changed(dispatcher, content),
            RuntimeEvent::CallCompleted { id, result } => dispatcher.complete_call(id, result),
        }
    }

    fn on_ready(&mut self, dispatcher: &mut Dispatcher, now: Instant) {
        if dispatcher.mark_ready(now) {
            log::info!("Editor runtime loaded");
            self.notify(HostEvent::LoadSucceeded);
        } else {
            log::debug!(
                "Ignoring ready signal in state {:?}",
                dispatcher.readiness()
            );
        }
    }

    fn on_load_failed(&mut self, dispatcher: &mut Dispatcher, reason: String) {
        if dispatcher.mark_failed(&reason) {
            log::error!("Editor runtime failed to load: {}", reason);
            self.notify(HostEvent::LoadFailed { reason });
        } else {
            log::debug!("Ignoring repeated load failure: {}", reason);
        }
    }

    fn on_content_changed(&mut self, dispatcher: &mut Dispatcher, content: String) {
        if dispatcher.accept_editor_content(content.clone()) {
            self.notify(HostEvent::ContentChanged { content });
        }
    }

    fn notify(&self, event: HostEvent) {
        if self.host_tx.send(event).is_err() {
            log::trace!("Host event receiver dropped");
        }
    }
}
