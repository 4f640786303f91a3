use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use codemirror_editor::RemoteCall;

/// Correlates a result-bearing call with the runtime's eventual answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(pub u64);

impl std::fmt::Display for CallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One call handed to the runtime.
///
/// When `wants_reply` is set, the runtime must answer exactly once through
/// [`crate::RelaySender::call_completed`] with the same `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeRequest {
    pub id: CallId,
    pub call: RemoteCall,
    pub wants_reply: bool,
}

/// The embedded editor as seen from the bridge.
///
/// `evaluate` must not block: it hands the request off (to a web view, a
/// message port, a channel) and returns. An `Err` means the request could
/// not be handed off at all.
pub trait EditorRuntime: Send + 'static {
    fn evaluate(&mut self, request: RuntimeRequest) -> Result<(), String>;
}

/// Runtime that forwards requests over a channel, for hosts that pump
/// requests out of the bridge on their own thread (e.g. a web view owner
/// behind the C ABI).
pub struct ChannelRuntime {
    sender: mpsc::UnboundedSender<RuntimeRequest>,
}

impl ChannelRuntime {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RuntimeRequest>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (ChannelRuntime { sender }, receiver)
    }
}

impl EditorRuntime for ChannelRuntime {
    fn evaluate(&mut self, request: RuntimeRequest) -> Result<(), String> {
        self.sender
            .send(request)
            .map_err(|_| "runtime request channel closed".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codemirror_editor::EditorCall;

    #[test]
    fn channel_runtime_forwards_in_order() {
        let (mut runtime, mut rx) = ChannelRuntime::new();
        for id in 1..=3 {
            runtime
                .evaluate(RuntimeRequest {
                    id: CallId(id),
                    call: EditorCall::SetFocus.into(),
                    wants_reply: false,
                })
                .unwrap();
        }
        let ids: Vec<u64> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|r| r.id.0)
            .collect();
        assert_eq!(ids, [1, 2, 3]);
    }

    #[test]
    fn channel_runtime_reports_closed_receiver() {
        let (mut runtime, rx) = ChannelRuntime::new();
        drop(rx);
        let err = runtime
            .evaluate(RuntimeRequest {
                id: CallId(1),
                call: EditorCall::GetContent.into(),
                wants_reply: true,
            })
            .unwrap_err();
        assert!(err.contains("closed"));
    }

    #[test]
    fn request_wire_format() {
        let request = RuntimeRequest {
            id: CallId(7),
            call: EditorCall::SetReadOnly(true).into(),
            wants_reply: false,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({
                "id": 7,
                "call": {"function": "setReadOnly", "args": {"value": true}},
                "wantsReply": false,
            })
        );
    }
}
