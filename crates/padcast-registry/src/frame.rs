use thiserror::Error;

use crate::types::DeviceId;

/// Raw button values above this level decode as pressed.
const BUTTON_PRESSED_THRESHOLD: f32 = 0.5;

/// One polling tick worth of state reported for a single device.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    pub device_id: DeviceId,
    pub buttons: Vec<bool>,
    pub axes: Vec<f32>,
}

/// Error decoding a frame from the row-based numeric envelope.
#[derive(Debug, Error, PartialEq)]
pub enum FrameError {
    #[error("frame has no device id row")]
    MissingDeviceId,
    #[error("invalid device id value: {0}")]
    InvalidDeviceId(f32),
}

impl Frame {
    pub fn new(
        device_id: DeviceId,
        buttons: impl Into<Vec<bool>>,
        axes: impl Into<Vec<f32>>,
    ) -> Self {
        Self {
            device_id,
            buttons: buttons.into(),
            axes: axes.into(),
        }
    }

    /// Decodes the legacy three-row frame layout used by native pollers:
    /// row 0 carries the device id, row 1 the button values, row 2 the axes.
    /// Missing button or axis rows decode as empty.
    pub fn from_rows<R: AsRef<[f32]>>(rows: &[R]) -> Result<Self, FrameError> {
        let raw_id = rows
            .first()
            .and_then(|row| row.as_ref().first().copied())
            .ok_or(FrameError::MissingDeviceId)?;
        let device_id = decode_device_id(raw_id)?;
        let buttons = rows
            .get(1)
            .map(|row| {
                row.as_ref()
                    .iter()
                    .map(|v| *v > BUTTON_PRESSED_THRESHOLD)
                    .collect()
            })
            .unwrap_or_default();
        let axes = rows
            .get(2)
            .map(|row| row.as_ref().to_vec())
            .unwrap_or_default();
        Ok(Self {
            device_id,
            buttons,
            axes,
        })
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn decode_device_id(value: f32) -> Result<DeviceId, FrameError> {
    let in_range = value.is_finite()
        && value >= 0.0
        && value.fract() == 0.0
        && f64::from(value) <= f64::from(DeviceId::MAX);
    if !in_range {
        return Err(FrameError::InvalidDeviceId(value));
    }
    Ok(value as DeviceId)
}
