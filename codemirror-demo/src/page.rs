//! Stand-in for the editor page inside a web view: evaluates the calls the
//! bridge sends, answers getters, and plays one user edit once it goes idle.

use std::time::Duration;

use codemirror_core::{RelaySender, RuntimeRequest};
use codemirror_editor::Language;
use serde_json::Value;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;

const IDLE: Duration = Duration::from_millis(60);

/// Returns the scripts the page evaluated, in order.
pub async fn run(
    mut requests: UnboundedReceiver<RuntimeRequest>,
    relay: RelaySender,
    load_time: Duration,
    mut user_edit: Option<String>,
) -> Vec<String> {
    tokio::time::sleep(load_time).await;
    relay.ready();

    let mut document = String::new();
    let mut evaluated = Vec::new();
    loop {
        let request = match timeout(IDLE, requests.recv()).await {
            Ok(Some(request)) => request,
            Ok(None) => break,
            Err(_) => {
                if let Some(edit) = user_edit.take() {
                    log::info!("page: user edit");
                    document = edit.clone();
                    relay.content_changed(edit);
                }
                continue;
            }
        };

        let script = request.call.to_script();
        log::debug!("page: {}", script);
        evaluated.push(script);

        let result = match request.call.function.as_str() {
            "setContent" => {
                if let Some(Value::String(content)) = request.call.value() {
                    document = content.clone();
                }
                Value::Null
            }
            "getContent" => Value::from(document.clone()),
            "getSupportedLanguages" => {
                Value::from(Language::ALL.iter().map(|l| l.id()).collect::<Vec<_>>())
            }
            _ => Value::Null,
        };
        if request.wants_reply {
            relay.call_completed(request.id, Ok(result));
        }
    }
    evaluated
}
