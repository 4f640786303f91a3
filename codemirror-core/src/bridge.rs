//! The bridge actor: one task per embedded editor owns the dispatcher and
//! the relay, and is the only writer of bridge state. Host calls and
//! runtime events reach it as messages on a single channel, so they are
//! handled in arrival order.

use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{sleep_until, Instant};

use codemirror_editor::{EditorCall, RemoteCall};

use crate::config::{BridgeSettings, EditorConfiguration};
use crate::dispatcher::Dispatcher;
use crate::error::{BridgeError, BridgeResult};
use crate::relay::{EventRelay, HostEvent, RelaySender, RuntimeEvent};
use crate::runtime::EditorRuntime;
use crate::state::{Readiness, ReplySender};

pub(crate) enum BridgeMessage {
    Configure(EditorConfiguration),
    SetContent(String),
    Call {
        call: RemoteCall,
        reply: Option<ReplySender>,
    },
    Runtime(RuntimeEvent),
    Shutdown,
}

/// Host-side handle to a running bridge.
///
/// Clones share the same bridge. Dropping every handle and every
/// [`RelaySender`] stops it, as does [`BridgeHandle::shutdown`].
#[derive(Clone)]
pub struct BridgeHandle {
    tx: mpsc::UnboundedSender<BridgeMessage>,
    content: watch::Receiver<String>,
    readiness: watch::Receiver<Readiness>,
}

impl BridgeHandle {
    /// Push the host's current configuration. Only fields that differ from
    /// what the runtime was last told produce calls.
    pub fn configure(&self, config: EditorConfiguration) -> bool {
        self.tx.send(BridgeMessage::Configure(config)).is_ok()
    }

    /// Host-side write of the bound content.
    pub fn set_content(&self, content: impl Into<String>) -> bool {
        self.tx
            .send(BridgeMessage::SetContent(content.into()))
            .is_ok()
    }

    /// The host-visible value of the content binding.
    pub fn content(&self) -> String {
        self.content.borrow().clone()
    }

    /// A receiver that observes every change to the content binding.
    pub fn watch_content(&self) -> watch::Receiver<String> {
        self.content.clone()
    }

    pub fn readiness(&self) -> Readiness {
        *self.readiness.borrow()
    }

    /// Wait until the runtime has either loaded or failed.
    pub async fn wait_loaded(&self) -> BridgeResult<()> {
        let mut readiness = self.readiness.clone();
        let state = *readiness
            .wait_for(|r| *r != Readiness::Loading)
            .await
            .map_err(|_| BridgeError::Closed)?;
        match state {
            Readiness::Failed => Err(BridgeError::RuntimeUnavailable),
            _ => Ok(()),
        }
    }

    /// Fire-and-forget call.
    pub fn notify(&self, call: impl Into<RemoteCall>) -> bool {
        self.tx
            .send(BridgeMessage::Call {
                call: call.into(),
                reply: None,
            })
            .is_ok()
    }

    /// Result-bearing call. Resolves once the runtime answers; calls made
    /// while the runtime is loading wait in the queue.
    pub async fn call(&self, call: impl Into<RemoteCall>) -> BridgeResult<Value> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(BridgeMessage::Call {
                call: call.into(),
                reply: Some(tx),
            })
            .map_err(|_| BridgeError::Closed)?;
        rx.await.map_err(|_| BridgeError::Closed)?
    }

    /// Read the document straight from the runtime.
    pub async fn get_content(&self) -> BridgeResult<String> {
        match self.call(EditorCall::GetContent).await? {
            Value::String(content) => Ok(content),
            other => Err(BridgeError::InvalidResponse(format!(
                "getContent returned {}",
                other
            ))),
        }
    }

    /// Stop the bridge. Pending timers are discarded and unresolved calls
    /// observe [`BridgeError::Closed`].
    pub fn shutdown(&self) {
        let _ = self.tx.send(BridgeMessage::Shutdown);
    }
}

/// Start a bridge for `runtime` on the current tokio runtime.
///
/// Returns the host handle, the sender the runtime glue feeds events into,
/// and the stream of host notifications.
pub fn spawn_bridge<R: EditorRuntime>(
    runtime: R,
    settings: &BridgeSettings,
    initial_content: impl Into<String>,
) -> (BridgeHandle, RelaySender, mpsc::UnboundedReceiver<HostEvent>) {
    let initial_content = initial_content.into();
    let (tx, rx) = mpsc::unbounded_channel();
    let (host_tx, host_rx) = mpsc::unbounded_channel();
    let (content_tx, content_rx) = watch::channel(initial_content.clone());
    let (readiness_tx, readiness_rx) = watch::channel(Readiness::Loading);

    let dispatcher = Dispatcher::new(Box::new(runtime), settings, initial_content);
    let relay = EventRelay::new(host_tx);

    tokio::spawn(run(dispatcher, relay, rx, content_tx, readiness_tx));

    let handle = BridgeHandle {
        tx: tx.clone(),
        content: content_rx,
        readiness: readiness_rx,
    };
    (handle, RelaySender::new(tx), host_rx)
}

async fn run(
    mut dispatcher: Dispatcher,
    mut relay: EventRelay,
    mut rx: mpsc::UnboundedReceiver<BridgeMessage>,
    content_tx: watch::Sender<String>,
    readiness_tx: watch::Sender<Readiness>,
) {
    log::debug!("Bridge started");
    loop {
        let deadline = dispatcher.next_deadline();
        let timer = async move {
            match deadline {
                Some(at) => sleep_until(at).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            _ = timer => dispatcher.on_timer(Instant::now()),
            message = rx.recv() => match message {
                None | Some(BridgeMessage::Shutdown) => break,
                Some(BridgeMessage::Configure(config)) => {
                    dispatcher.apply_configuration(&config);
                }
                Some(BridgeMessage::SetContent(content)) => {
                    dispatcher.set_content(content, Instant::now());
                }
                Some(BridgeMessage::Call { call, reply }) => {
                    dispatcher.request_call(call, reply, Instant::now());
                }
                Some(BridgeMessage::Runtime(event)) => {
                    relay.handle(&mut dispatcher, event, Instant::now());
                }
            },
        }

        publish(&dispatcher, &content_tx, &readiness_tx);
    }
    dispatcher.shutdown();
    log::debug!("Bridge stopped");
}

fn publish(
    dispatcher: &Dispatcher,
    content_tx: &watch::Sender<String>,
    readiness_tx: &watch::Sender<Readiness>,
) {
    let content = dispatcher.state().host_content();
    content_tx.send_if_modified(|current| {
        if current != content {
            *current = content.to_string();
            true
        } else {
            false
        }
    });
    let readiness = dispatcher.readiness();
    readiness_tx.send_if_modified(|current| {
        if *current != readiness {
            *current = readiness;
            true
        } else {
            false
        }
    });
}
