//! Registry of attached game controllers that fans out per-frame input
//! state to subscribed listeners.

mod config;
mod directory;
mod dispatcher;
mod error;
mod events;
mod frame;
mod handle;
mod listener;
mod manager;
mod runtime;
mod types;

pub use crate::config::{DeliveryPolicy, DispatchConfig};
pub use crate::directory::DeviceDirectory;
pub use crate::dispatcher::{DispatchReport, Dispatcher};
pub use crate::error::{Error, Result};
pub use crate::events::SourceEvent;
pub use crate::frame::{Frame, FrameError};
pub use crate::handle::{SourceHandle, SourceSender};
pub use crate::listener::{DeviceListener, ListenerRef, ListenerSnapshot};
pub use crate::manager::Registry;
pub use crate::types::{Device, DeviceId, FrameDevice};
