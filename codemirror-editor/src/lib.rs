pub mod language;
pub mod protocol;
pub mod theme;

pub use language::Language;
pub use protocol::{EditorCall, EditorEvent, RemoteCall};
pub use theme::Theme;
