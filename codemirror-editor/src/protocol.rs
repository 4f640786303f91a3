use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::language::Language;
use crate::theme::Theme;

/// Object the bundled editor script exports its functions on.
pub const RUNTIME_NAMESPACE: &str = "CodeMirror";

/// Script-message channel the runtime posts to once the editor view exists.
pub const READY_MESSAGE: &str = "codeMirrorDidReady";

/// Script-message channel carrying the full document after every edit.
pub const CONTENT_CHANGED_MESSAGE: &str = "codeMirrorContentDidChange";

// ---------------------------------------------------------------------------
// Calls: host → runtime
// ---------------------------------------------------------------------------

/// Typed view of the functions the embedded runtime exposes.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorCall {
    SetContent(String),
    GetContent,
    SetLanguage(Language),
    SetTheme(Theme),
    SetReadOnly(bool),
    SetLineWrapping(bool),
    SetLineNumber(bool),
    SetFoldGutter(bool),
    SetEnabledSearch(bool),
    SetHighlightActiveLine(bool),
    SetPlaceholder(String),
    SetFontSize(f64),
    SetFocus,
    SetBlur,
}

impl EditorCall {
    pub fn function_name(&self) -> &'static str {
        match self {
            EditorCall::SetContent(_) => "setContent",
            EditorCall::GetContent => "getContent",
            EditorCall::SetLanguage(_) => "setLanguage",
            EditorCall::SetTheme(_) => "setTheme",
            EditorCall::SetReadOnly(_) => "setReadOnly",
            EditorCall::SetLineWrapping(_) => "setLineWrapping",
            EditorCall::SetLineNumber(_) => "setLineNumber",
            EditorCall::SetFoldGutter(_) => "setFoldGutter",
            EditorCall::SetEnabledSearch(_) => "setEnabledSearch",
            EditorCall::SetHighlightActiveLine(_) => "setHighlightActiveLine",
            EditorCall::SetPlaceholder(_) => "setPlaceholder",
            EditorCall::SetFontSize(_) => "setFontSize",
            EditorCall::SetFocus => "setFocus",
            EditorCall::SetBlur => "setBlur",
        }
    }

    fn value(&self) -> Option<Value> {
        match self {
            EditorCall::SetContent(text) | EditorCall::SetPlaceholder(text) => {
                Some(Value::String(text.clone()))
            }
            EditorCall::SetLanguage(language) => Some(Value::String(language.id().to_string())),
            EditorCall::SetTheme(theme) => Some(Value::String(theme.id().to_string())),
            EditorCall::SetReadOnly(v)
            | EditorCall::SetLineWrapping(v)
            | EditorCall::SetLineNumber(v)
            | EditorCall::SetFoldGutter(v)
            | EditorCall::SetEnabledSearch(v)
            | EditorCall::SetHighlightActiveLine(v) => Some(Value::Bool(*v)),
            EditorCall::SetFontSize(size) => Some(Value::from(*size)),
            EditorCall::GetContent | EditorCall::SetFocus | EditorCall::SetBlur => None,
        }
    }
}

/// A function invocation as it travels to the runtime: a name plus named
/// arguments. Every built-in function takes at most one argument, `value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteCall {
    pub function: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub args: Map<String, Value>,
}

impl RemoteCall {
    pub fn new(function: impl Into<String>) -> Self {
        RemoteCall {
            function: function.into(),
            args: Map::new(),
        }
    }

    pub fn with_arg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(name.into(), value.into());
        self
    }

    /// The conventional single argument, if present.
    pub fn value(&self) -> Option<&Value> {
        self.args.get("value")
    }

    /// The text carried by a `setContent` call.
    pub fn content_write(&self) -> Option<&str> {
        if self.function != "setContent" {
            return None;
        }
        self.value().and_then(Value::as_str)
    }

    /// Render the call as a script expression for hosts that can only
    /// evaluate source text, e.g. `CodeMirror.setTheme("nord")`.
    ///
    /// Arguments are passed positionally in key order. Values are JSON
    /// encoded, which is valid script syntax once the two line separators
    /// JSON permits inside strings are escaped.
    pub fn to_script(&self) -> String {
        let args: Vec<String> = self
            .args
            .values()
            .map(|v| {
                serde_json::to_string(v)
                    .unwrap_or_else(|_| "null".to_string())
                    .replace('\u{2028}', "\\u2028")
                    .replace('\u{2029}', "\\u2029")
            })
            .collect();
        format!("{}.{}({})", RUNTIME_NAMESPACE, self.function, args.join(", "))
    }
}

impl From<EditorCall> for RemoteCall {
    fn from(call: EditorCall) -> Self {
        let remote = RemoteCall::new(call.function_name());
        match call.value() {
            Some(value) => remote.with_arg("value", value),
            None => remote,
        }
    }
}

// ---------------------------------------------------------------------------
// Events: runtime → host (posted as script messages)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EditorEvent {
    Ready,
    ContentChanged { content: String },
}

impl EditorEvent {
    /// Decode a script message posted by the runtime.
    ///
    /// Returns `None` for unknown channels and malformed bodies.
    pub fn from_script_message(name: &str, body: &Value) -> Option<Self> {
        match name {
            READY_MESSAGE => Some(EditorEvent::Ready),
            CONTENT_CHANGED_MESSAGE => match body {
                Value::String(content) => Some(EditorEvent::ContentChanged {
                    content: content.clone(),
                }),
                other => {
                    log::warn!("Ignoring {} with non-string body: {}", name, other);
                    None
                }
            },
            _ => {
                log::debug!("Unhandled script message {}: {}", name, body);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn typed_calls_carry_a_single_value_argument() {
        let call = RemoteCall::from(EditorCall::SetTheme(Theme::Nord));
        assert_eq!(call.function, "setTheme");
        assert_eq!(call.value(), Some(&json!("nord")));

        let call = RemoteCall::from(EditorCall::SetLineWrapping(true));
        assert_eq!(call.function, "setLineWrapping");
        assert_eq!(call.value(), Some(&json!(true)));

        let call = RemoteCall::from(EditorCall::SetFontSize(13.5));
        assert_eq!(call.value(), Some(&json!(13.5)));
    }

    #[test]
    fn argumentless_calls_have_empty_args() {
        for call in [EditorCall::GetContent, EditorCall::SetFocus, EditorCall::SetBlur] {
            let remote = RemoteCall::from(call);
            assert!(remote.args.is_empty(), "{} has args", remote.function);
        }
    }

    #[test]
    fn empty_args_are_omitted_on_the_wire() {
        let json = serde_json::to_string(&RemoteCall::from(EditorCall::SetFocus)).unwrap();
        assert_eq!(json, r#"{"function":"setFocus"}"#);

        let parsed: RemoteCall = serde_json::from_str(r#"{"function":"getContent"}"#).unwrap();
        assert_eq!(parsed, RemoteCall::new("getContent"));
    }

    #[test]
    fn script_rendering_quotes_strings() {
        let call = RemoteCall::from(EditorCall::SetContent("say \"hi\"\n".to_string()));
        assert_eq!(call.to_script(), r#"CodeMirror.setContent("say \"hi\"\n")"#);
        assert_eq!(
            RemoteCall::from(EditorCall::SetBlur).to_script(),
            "CodeMirror.setBlur()"
        );
    }

    #[test]
    fn script_rendering_escapes_line_separators() {
        let call = RemoteCall::from(EditorCall::SetPlaceholder("a\u{2028}b".to_string()));
        assert_eq!(call.to_script(), r#"CodeMirror.setPlaceholder("a\u2028b")"#);
    }

    #[test]
    fn content_write_carries_text() {
        let call = RemoteCall::from(EditorCall::SetContent("abc".to_string()));
        assert_eq!(call.content_write(), Some("abc"));
        assert_eq!(RemoteCall::from(EditorCall::GetContent).content_write(), None);
        let placeholder = RemoteCall::from(EditorCall::SetPlaceholder("abc".to_string()));
        assert_eq!(placeholder.content_write(), None);
    }

    #[test]
    fn script_messages_decode() {
        assert_eq!(
            EditorEvent::from_script_message(READY_MESSAGE, &Value::Null),
            Some(EditorEvent::Ready)
        );
        assert_eq!(
            EditorEvent::from_script_message(CONTENT_CHANGED_MESSAGE, &json!("abc")),
            Some(EditorEvent::ContentChanged {
                content: "abc".to_string()
            })
        );
    }

    #[test]
    fn malformed_or_unknown_messages_are_dropped() {
        assert_eq!(
            EditorEvent::from_script_message(CONTENT_CHANGED_MESSAGE, &json!(42)),
            None
        );
        assert_eq!(EditorEvent::from_script_message("somethingElse", &json!("x")), None);
    }
}
