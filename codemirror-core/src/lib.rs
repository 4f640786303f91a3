pub mod bridge;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod relay;
pub mod runtime;
pub mod state;

pub use bridge::{spawn_bridge, BridgeHandle};
pub use config::{BridgeSettings, EditorConfiguration};
pub use error::{BridgeError, BridgeResult};
pub use relay::{HostEvent, RelaySender, RuntimeEvent};
pub use runtime::{CallId, ChannelRuntime, EditorRuntime, RuntimeRequest};
pub use state::Readiness;
