use serde::{Deserialize, Serialize};

use crate::error::Result;

/// What the dispatcher does with a frame whose device is not attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryPolicy {
    /// Deliver the frame with a missing-device marker.
    #[default]
    BestEffort,
    /// Drop the frame without calling any listener.
    DropUnknown,
}

/// Dispatcher behavior switches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatchConfig {
    pub delivery: DeliveryPolicy,
    /// Merge every dispatched frame into the stored device record.
    pub track_state: bool,
}

impl DispatchConfig {
    /// Configuration that drops frames for unknown devices.
    pub fn strict() -> Self {
        Self {
            delivery: DeliveryPolicy::DropUnknown,
            ..Self::default()
        }
    }

    pub fn from_yaml_str(input: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(input)?)
    }
}
