//! C-compatible FFI wrappers around codemirror-core.
//!
//! A native host (typically the owner of a WKWebView) creates a bridge, then
//! pumps it: remote calls come out of `codemirror_bridge_poll_request` and
//! are evaluated in the web view, while script messages, navigation failures
//! and call results go back in. Host notifications are polled as JSON.
//!
//! All functions use C strings for input/output and JSON encoding for
//! complex types. Callers must free returned strings with
//! `codemirror_free_string`.
//!
//! All extern "C" functions are wrapped in `ffi_catch` so Rust panics never
//! cross the FFI boundary. Panic payloads are logged before returning the
//! fallback value.
#![allow(clippy::not_unsafe_ptr_arg_deref)]

use std::collections::HashMap;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};

use codemirror_core::{
    config, spawn_bridge, BridgeHandle, BridgeSettings, CallId, ChannelRuntime,
    EditorConfiguration, HostEvent, Readiness, RelaySender, RuntimeRequest,
};
use codemirror_editor::RemoteCall;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;

/// Run `f` inside `catch_unwind`, logging the panic payload before returning the
/// fallback value.
fn ffi_catch<T>(fallback: T, f: impl FnOnce() -> T + std::panic::UnwindSafe) -> T {
    match catch_unwind(f) {
        Ok(v) => v,
        Err(payload) => {
            let msg = if let Some(s) = payload.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = payload.downcast_ref::<String>() {
                s.clone()
            } else {
                "unknown panic payload".to_string()
            };
            log::error!("FFI panic caught: {}", msg);
            fallback
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn to_rust_str(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    // SAFETY: Caller guarantees `ptr` is a valid, null-terminated C string
    // whose memory remains valid for the duration of this call.
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .ok()
        .map(String::from)
}

fn to_c_string(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cs) => cs.into_raw(),
        Err(_) => {
            log::warn!(
                "String contains interior NUL bytes, sanitizing ({} chars)",
                s.len()
            );
            let sanitized: String = s.chars().filter(|&c| c != '\0').collect();
            CString::new(sanitized).unwrap_or_default().into_raw()
        }
    }
}

fn parse_json<T: DeserializeOwned>(ptr: *const c_char, what: &str) -> Option<T> {
    let raw = to_rust_str(ptr)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("Invalid {} JSON: {}", what, e);
            None
        }
    }
}

fn init_logging() {
    static LOGGER: OnceLock<()> = OnceLock::new();
    LOGGER.get_or_init(|| {
        let _ = env_logger::try_init();
    });
}

// ---------------------------------------------------------------------------
// Memory management
// ---------------------------------------------------------------------------

/// Free a string previously returned by a `codemirror_*` function.
#[no_mangle]
pub extern "C" fn codemirror_free_string(s: *mut c_char) {
    ffi_catch(
        (),
        AssertUnwindSafe(|| {
            if !s.is_null() {
                // SAFETY: `s` was previously returned by `CString::into_raw` from
                // one of the `codemirror_*` functions, so it is valid to reclaim it.
                unsafe {
                    drop(CString::from_raw(s));
                }
            }
        }),
    );
}

// ---------------------------------------------------------------------------
// Bridge handles
// ---------------------------------------------------------------------------

/// Inner data for a bridge handle, stored in the global registry.
struct BridgeInner {
    runtime: Runtime,
    bridge: BridgeHandle,
    relay: RelaySender,
    requests: parking_lot::Mutex<mpsc::UnboundedReceiver<RuntimeRequest>>,
    events: parking_lot::Mutex<mpsc::UnboundedReceiver<HostEvent>>,
    replies_tx: mpsc::UnboundedSender<Value>,
    replies: parking_lot::Mutex<mpsc::UnboundedReceiver<Value>>,
}

/// Global registry mapping handle addresses to their inner data. The handle
/// pointer is only ever used as an opaque key.
fn bridge_registry() -> &'static parking_lot::Mutex<HashMap<usize, Arc<BridgeInner>>> {
    static REGISTRY: OnceLock<parking_lot::Mutex<HashMap<usize, Arc<BridgeInner>>>> =
        OnceLock::new();
    REGISTRY.get_or_init(|| parking_lot::Mutex::new(HashMap::new()))
}

/// Look up a handle in the global registry and run `f` with the inner data.
/// Returns `default` if the handle is null or freed.
fn with_bridge<T>(
    handle: *mut CodeMirrorBridge,
    default: T,
    f: impl FnOnce(&BridgeInner) -> T,
) -> T {
    if handle.is_null() {
        return default;
    }
    let key = handle as usize;
    let guard = bridge_registry().lock();
    match guard.get(&key) {
        Some(inner) => {
            let inner = Arc::clone(inner);
            drop(guard);
            f(&inner)
        }
        None => {
            log::warn!("Attempted to use invalid or freed bridge handle");
            default
        }
    }
}

/// Opaque handle token for the C API. Never dereferenced. Not zero-sized,
/// so every handle gets a distinct address.
pub struct CodeMirrorBridge {
    _private: u8,
}

/// Create a bridge for one embedded editor.
///
/// `settings_json` is a JSON-encoded `BridgeSettings`; pass null to load the
/// user's settings file. `initial_content` may be null for an empty document.
/// The settings' editor configuration is queued as the initial configuration.
///
/// Returns an opaque handle. The caller must free it with
/// `codemirror_bridge_free`.
#[no_mangle]
pub extern "C" fn codemirror_bridge_new(
    settings_json: *const c_char,
    initial_content: *const c_char,
) -> *mut CodeMirrorBridge {
    ffi_catch(
        std::ptr::null_mut(),
        AssertUnwindSafe(|| {
            init_logging();
            let settings: BridgeSettings = if settings_json.is_null() {
                config::load()
            } else {
                match parse_json(settings_json, "settings") {
                    Some(s) => s,
                    None => return std::ptr::null_mut(),
                }
            };
            let initial_content = to_rust_str(initial_content).unwrap_or_default();

            let runtime = match Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    log::error!("Failed to create Tokio runtime for bridge: {}", e);
                    return std::ptr::null_mut();
                }
            };

            let (editor_runtime, requests) = ChannelRuntime::new();
            let (bridge, relay, events) = {
                let _guard = runtime.enter();
                spawn_bridge(editor_runtime, &settings, initial_content)
            };
            bridge.configure(settings.editor.clone());

            let (replies_tx, replies) = mpsc::unbounded_channel();
            let inner = Arc::new(BridgeInner {
                runtime,
                bridge,
                relay,
                requests: parking_lot::Mutex::new(requests),
                events: parking_lot::Mutex::new(events),
                replies_tx,
                replies: parking_lot::Mutex::new(replies),
            });

            let handle = Box::into_raw(Box::new(CodeMirrorBridge { _private: 0 }));
            bridge_registry().lock().insert(handle as usize, inner);
            handle
        }),
    )
}

/// Push a JSON-encoded `EditorConfiguration`. Missing keys take defaults.
///
/// Returns 0 on success, -1 on error.
#[no_mangle]
pub extern "C" fn codemirror_bridge_configure(
    handle: *mut CodeMirrorBridge,
    config_json: *const c_char,
) -> i32 {
    ffi_catch(
        -1,
        AssertUnwindSafe(|| {
            let config: EditorConfiguration = match parse_json(config_json, "configuration") {
                Some(c) => c,
                None => return -1,
            };
            with_bridge(handle, -1, |inner| {
                if inner.bridge.configure(config) {
                    0
                } else {
                    -1
                }
            })
        }),
    )
}

/// Host-side write of the bound content.
///
/// Returns 0 on success, -1 on error.
#[no_mangle]
pub extern "C" fn codemirror_bridge_set_content(
    handle: *mut CodeMirrorBridge,
    content: *const c_char,
) -> i32 {
    ffi_catch(
        -1,
        AssertUnwindSafe(|| {
            let content = match to_rust_str(content) {
                Some(s) => s,
                None => return -1,
            };
            with_bridge(handle, -1, |inner| {
                if inner.bridge.set_content(content) {
                    0
                } else {
                    -1
                }
            })
        }),
    )
}

/// Current value of the content binding. The caller must free it.
#[no_mangle]
pub extern "C" fn codemirror_bridge_content(handle: *mut CodeMirrorBridge) -> *mut c_char {
    ffi_catch(
        std::ptr::null_mut(),
        AssertUnwindSafe(|| {
            with_bridge(handle, std::ptr::null_mut(), |inner| {
                to_c_string(&inner.bridge.content())
            })
        }),
    )
}

/// Returns 0 while loading, 1 when ready, 2 after a load failure, -1 for an
/// invalid handle.
#[no_mangle]
pub extern "C" fn codemirror_bridge_readiness(handle: *mut CodeMirrorBridge) -> i32 {
    ffi_catch(
        -1,
        AssertUnwindSafe(|| {
            with_bridge(handle, -1, |inner| match inner.bridge.readiness() {
                Readiness::Loading => 0,
                Readiness::Ready => 1,
                Readiness::Failed => 2,
            })
        }),
    )
}

/// Queue a fire-and-forget call, e.g. `{"function":"setFocus"}`.
///
/// Returns 0 on success, -1 on error.
#[no_mangle]
pub extern "C" fn codemirror_bridge_notify(
    handle: *mut CodeMirrorBridge,
    call_json: *const c_char,
) -> i32 {
    ffi_catch(
        -1,
        AssertUnwindSafe(|| {
            let call: RemoteCall = match parse_json(call_json, "call") {
                Some(c) => c,
                None => return -1,
            };
            with_bridge(handle, -1, |inner| {
                if inner.bridge.notify(call) {
                    0
                } else {
                    -1
                }
            })
        }),
    )
}

/// Queue a result-bearing call. Does not block: the result is delivered
/// later through `codemirror_bridge_poll_reply` tagged with `ticket`.
///
/// Returns 0 on success, -1 on error.
#[no_mangle]
pub extern "C" fn codemirror_bridge_call(
    handle: *mut CodeMirrorBridge,
    call_json: *const c_char,
    ticket: u64,
) -> i32 {
    ffi_catch(
        -1,
        AssertUnwindSafe(|| {
            let call: RemoteCall = match parse_json(call_json, "call") {
                Some(c) => c,
                None => return -1,
            };
            with_bridge(handle, -1, |inner| {
                let bridge = inner.bridge.clone();
                let replies = inner.replies_tx.clone();
                inner.runtime.spawn(async move {
                    let reply = match bridge.call(call).await {
                        Ok(result) => serde_json::json!({"ticket": ticket, "result": result}),
                        Err(e) => serde_json::json!({"ticket": ticket, "error": e.to_string()}),
                    };
                    let _ = replies.send(reply);
                });
                0
            })
        }),
    )
}

/// Poll for a completed `codemirror_bridge_call`.
///
/// Returns `{"ticket":n,"result":...}` or `{"ticket":n,"error":"..."}`, or
/// null if nothing has completed. The caller must free the returned string.
#[no_mangle]
pub extern "C" fn codemirror_bridge_poll_reply(handle: *mut CodeMirrorBridge) -> *mut c_char {
    ffi_catch(
        std::ptr::null_mut(),
        AssertUnwindSafe(|| {
            with_bridge(handle, std::ptr::null_mut(), |inner| {
                match inner.replies.lock().try_recv() {
                    Ok(reply) => to_c_string(&reply.to_string()),
                    Err(_) => std::ptr::null_mut(),
                }
            })
        }),
    )
}

/// Poll for the next call the web view should evaluate.
///
/// Returns `{"id","function","args","wantsReply","script"}` where `script`
/// is ready for `evaluateJavaScript`, or null if nothing is waiting. When
/// `wantsReply` is true the host must answer with
/// `codemirror_bridge_complete_call`. The caller must free the returned
/// string.
#[no_mangle]
pub extern "C" fn codemirror_bridge_poll_request(handle: *mut CodeMirrorBridge) -> *mut c_char {
    ffi_catch(
        std::ptr::null_mut(),
        AssertUnwindSafe(|| {
            with_bridge(handle, std::ptr::null_mut(), |inner| {
                match inner.requests.lock().try_recv() {
                    Ok(request) => {
                        let script = request.call.to_script();
                        let json = serde_json::json!({
                            "id": request.id,
                            "function": request.call.function,
                            "args": request.call.args,
                            "wantsReply": request.wants_reply,
                            "script": script,
                        });
                        to_c_string(&json.to_string())
                    }
                    Err(_) => std::ptr::null_mut(),
                }
            })
        }),
    )
}

/// Answer a request returned by `codemirror_bridge_poll_request`.
///
/// If `error` is non-null the call failed with that message; otherwise
/// `result_json` is the JSON-encoded value (null means JSON null).
///
/// Returns 0 on success, -1 on error.
#[no_mangle]
pub extern "C" fn codemirror_bridge_complete_call(
    handle: *mut CodeMirrorBridge,
    id: u64,
    result_json: *const c_char,
    error: *const c_char,
) -> i32 {
    ffi_catch(
        -1,
        AssertUnwindSafe(|| {
            let result = match to_rust_str(error) {
                Some(e) => Err(e),
                None if result_json.is_null() => Ok(Value::Null),
                None => match parse_json(result_json, "result") {
                    Some(v) => Ok(v),
                    None => return -1,
                },
            };
            with_bridge(handle, -1, |inner| {
                if inner.relay.call_completed(CallId(id), result) {
                    0
                } else {
                    -1
                }
            })
        }),
    )
}

/// Forward a script message posted by the page (`codeMirrorDidReady`,
/// `codeMirrorContentDidChange`). `body_json` may be null.
///
/// Returns 0 if the message was recognised and delivered, -1 otherwise.
#[no_mangle]
pub extern "C" fn codemirror_bridge_script_message(
    handle: *mut CodeMirrorBridge,
    name: *const c_char,
    body_json: *const c_char,
) -> i32 {
    ffi_catch(
        -1,
        AssertUnwindSafe(|| {
            let name = match to_rust_str(name) {
                Some(s) => s,
                None => return -1,
            };
            let body: Value = if body_json.is_null() {
                Value::Null
            } else {
                match parse_json(body_json, "script message body") {
                    Some(v) => v,
                    None => return -1,
                }
            };
            with_bridge(handle, -1, |inner| {
                if inner.relay.script_message(&name, &body) {
                    0
                } else {
                    -1
                }
            })
        }),
    )
}

/// Report that the web view failed to load the editor page.
///
/// Returns 0 on success, -1 on error.
#[no_mangle]
pub extern "C" fn codemirror_bridge_load_failed(
    handle: *mut CodeMirrorBridge,
    reason: *const c_char,
) -> i32 {
    ffi_catch(
        -1,
        AssertUnwindSafe(|| {
            let reason = to_rust_str(reason).unwrap_or_else(|| "unknown error".to_string());
            with_bridge(handle, -1, |inner| {
                if inner.relay.load_failed(reason) {
                    0
                } else {
                    -1
                }
            })
        }),
    )
}

/// Poll for host notifications (`loadSucceeded`, `loadFailed`,
/// `contentChanged`).
///
/// Returns a JSON string describing the event, or null if none are pending.
/// The caller must free the returned string with `codemirror_free_string`.
#[no_mangle]
pub extern "C" fn codemirror_bridge_poll_event(handle: *mut CodeMirrorBridge) -> *mut c_char {
    ffi_catch(
        std::ptr::null_mut(),
        AssertUnwindSafe(|| {
            with_bridge(handle, std::ptr::null_mut(), |inner| {
                match inner.events.lock().try_recv() {
                    Ok(event) => match serde_json::to_string(&event) {
                        Ok(json) => to_c_string(&json),
                        Err(e) => {
                            log::error!("JSON serialization failed: {}", e);
                            std::ptr::null_mut()
                        }
                    },
                    Err(_) => std::ptr::null_mut(),
                }
            })
        }),
    )
}

/// Tear down a bridge. Pending calls and timers are dropped.
#[no_mangle]
pub extern "C" fn codemirror_bridge_free(handle: *mut CodeMirrorBridge) {
    ffi_catch(
        (),
        AssertUnwindSafe(|| {
            if handle.is_null() {
                return;
            }
            let key = handle as usize;
            // The Arc keeps the inner data alive if another thread is
            // currently inside with_bridge.
            let inner = bridge_registry().lock().remove(&key);
            match inner {
                Some(inner) => inner.bridge.shutdown(),
                None => {
                    log::warn!("codemirror_bridge_free called on already-freed handle");
                    return;
                }
            }
            // SAFETY: `handle` was allocated by `Box::into_raw` in
            // `codemirror_bridge_new`. The registry removal above ensures this
            // only happens once per handle.
            unsafe {
                drop(Box::from_raw(handle));
            }
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn c(s: &str) -> CString {
        CString::new(s).unwrap()
    }

    /// Take ownership of a returned string, freeing it.
    fn take(ptr: *mut c_char) -> Option<String> {
        if ptr.is_null() {
            return None;
        }
        let s = to_rust_str(ptr);
        codemirror_free_string(ptr);
        s
    }

    fn poll_json(mut f: impl FnMut() -> *mut c_char) -> Value {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(s) = take(f()) {
                return serde_json::from_str(&s).unwrap();
            }
            assert!(Instant::now() < deadline, "timed out polling bridge");
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    fn new_bridge(initial: &str) -> *mut CodeMirrorBridge {
        let settings = c(r#"{"contentDebounceMs": 0, "flushIntervalMs": 0}"#);
        let initial = c(initial);
        let handle = codemirror_bridge_new(settings.as_ptr(), initial.as_ptr());
        assert!(!handle.is_null());
        handle
    }

    #[test]
    fn ready_flushes_configuration_then_content() {
        let handle = new_bridge("hello");
        assert_eq!(codemirror_bridge_readiness(handle), 0);

        let ready = c("codeMirrorDidReady");
        assert_eq!(
            codemirror_bridge_script_message(handle, ready.as_ptr(), std::ptr::null()),
            0
        );

        let mut functions = Vec::new();
        loop {
            let request = poll_json(|| codemirror_bridge_poll_request(handle));
            let function = request["function"].as_str().unwrap().to_string();
            functions.push(function.clone());
            if function == "setContent" {
                assert_eq!(request["script"], r#"CodeMirror.setContent("hello")"#);
                break;
            }
        }
        assert_eq!(functions.len(), 12);
        assert_eq!(functions[0], "setTheme");

        let event = poll_json(|| codemirror_bridge_poll_event(handle));
        assert_eq!(event, serde_json::json!({"type": "loadSucceeded"}));
        assert_eq!(codemirror_bridge_readiness(handle), 1);
        codemirror_bridge_free(handle);
    }

    #[test]
    fn call_results_are_delivered_by_ticket() {
        let handle = new_bridge("");
        let ready = c("codeMirrorDidReady");
        codemirror_bridge_script_message(handle, ready.as_ptr(), std::ptr::null());

        let call = c(r#"{"function": "getContent"}"#);
        assert_eq!(codemirror_bridge_call(handle, call.as_ptr(), 42), 0);

        let request = loop {
            let request = poll_json(|| codemirror_bridge_poll_request(handle));
            if request["function"] == "getContent" {
                break request;
            }
        };
        assert_eq!(request["wantsReply"], true);
        let id = request["id"].as_u64().unwrap();
        let result = c(r#""doc""#);
        assert_eq!(
            codemirror_bridge_complete_call(handle, id, result.as_ptr(), std::ptr::null()),
            0
        );

        let reply = poll_json(|| codemirror_bridge_poll_reply(handle));
        assert_eq!(reply, serde_json::json!({"ticket": 42, "result": "doc"}));
        codemirror_bridge_free(handle);
    }

    #[test]
    fn load_failure_is_reported() {
        let handle = new_bridge("");
        let reason = c("net::ERR_FILE_NOT_FOUND");
        assert_eq!(codemirror_bridge_load_failed(handle, reason.as_ptr()), 0);
        let event = poll_json(|| codemirror_bridge_poll_event(handle));
        assert_eq!(
            event,
            serde_json::json!({"type": "loadFailed", "reason": "net::ERR_FILE_NOT_FOUND"})
        );
        assert_eq!(codemirror_bridge_readiness(handle), 2);
        codemirror_bridge_free(handle);
    }

    #[test]
    fn editor_content_updates_binding() {
        let handle = new_bridge("");
        let ready = c("codeMirrorDidReady");
        let changed = c("codeMirrorContentDidChange");
        let body = c(r#""typed""#);
        codemirror_bridge_script_message(handle, ready.as_ptr(), std::ptr::null());
        codemirror_bridge_script_message(handle, changed.as_ptr(), body.as_ptr());

        let event = loop {
            let event = poll_json(|| codemirror_bridge_poll_event(handle));
            if event["type"] == "contentChanged" {
                break event;
            }
        };
        assert_eq!(event["content"], "typed");
        assert_eq!(
            take(codemirror_bridge_content(handle)).as_deref(),
            Some("typed")
        );
        codemirror_bridge_free(handle);
    }

    #[test]
    fn unknown_script_message_is_rejected() {
        let handle = new_bridge("");
        let name = c("codeMirrorDidScroll");
        assert_eq!(
            codemirror_bridge_script_message(handle, name.as_ptr(), std::ptr::null()),
            -1
        );
        codemirror_bridge_free(handle);
    }

    #[test]
    fn invalid_handles_are_ignored() {
        assert_eq!(codemirror_bridge_readiness(std::ptr::null_mut()), -1);
        assert!(codemirror_bridge_poll_event(std::ptr::null_mut()).is_null());
        let content = c("x");
        assert_eq!(
            codemirror_bridge_set_content(std::ptr::null_mut(), content.as_ptr()),
            -1
        );
        codemirror_bridge_free(std::ptr::null_mut());
    }

    #[test]
    fn malformed_configuration_is_rejected() {
        let handle = new_bridge("");
        let bad = c("{not json");
        assert_eq!(codemirror_bridge_configure(handle, bad.as_ptr()), -1);
        let partial = c(r#"{"theme": "nord"}"#);
        assert_eq!(codemirror_bridge_configure(handle, partial.as_ptr()), 0);
        codemirror_bridge_free(handle);
    }
}
