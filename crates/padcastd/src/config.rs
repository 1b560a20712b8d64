use std::fs;
use std::path::Path;

use padcast_registry::{DeliveryPolicy, DispatchConfig};

/// Loads the dispatcher config, then applies command line overrides.
pub(crate) fn resolve_config(
    path: Option<&Path>,
    strict: bool,
    track_state: bool,
) -> Result<DispatchConfig, crate::AppError> {
    let mut config = match path {
        Some(path) => DispatchConfig::from_yaml_str(&fs::read_to_string(path)?)?,
        None => DispatchConfig::default(),
    };
    if strict {
        config.delivery = DeliveryPolicy::DropUnknown;
    }
    if track_state {
        config.track_state = true;
    }
    Ok(config)
}
