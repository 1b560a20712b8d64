use std::borrow::Cow;
use std::sync::Arc;

use smallvec::{Array, SmallVec};

/// Identifier of an attached device, assigned by the polling source.
pub type DeviceId = u32;

pub(crate) type ButtonStates = SmallVec<[bool; 16]>;
pub(crate) type AxisStates = SmallVec<[f32; 8]>;

/// Capability shape and last known input state of an attached controller.
///
/// The declared button and axis counts are the lengths of the stored state
/// slices. A record never changes once it is published to the directory;
/// updates replace it as a whole.
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    id: DeviceId,
    buttons: ButtonStates,
    axes: AxisStates,
}

impl Device {
    /// Creates a device record, fitting the initial state to the declared counts.
    /// Extra values are dropped and missing ones read as released / centered.
    /// A count that cannot be allocated falls back to the reported values.
    pub fn new(
        id: DeviceId,
        button_count: usize,
        axis_count: usize,
        buttons: &[bool],
        axes: &[f32],
    ) -> Self {
        Self {
            id,
            buttons: fit_state(id, buttons, button_count),
            axes: fit_state(id, axes, axis_count),
        }
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    pub fn button_count(&self) -> usize {
        self.buttons.len()
    }

    pub fn axis_count(&self) -> usize {
        self.axes.len()
    }

    pub fn buttons(&self) -> &[bool] {
        &self.buttons
    }

    pub fn axes(&self) -> &[f32] {
        &self.axes
    }

    /// Returns the state of a button, `false` when out of range.
    pub fn button(&self, index: usize) -> bool {
        self.buttons.get(index).copied().unwrap_or(false)
    }

    /// Returns the value of an axis, `0.0` when out of range.
    pub fn axis(&self, index: usize) -> f32 {
        self.axes.get(index).copied().unwrap_or(0.0)
    }

    /// Builds a copy of this record with new state, keeping the declared shape.
    pub(crate) fn with_state(&self, buttons: &[bool], axes: &[f32]) -> Self {
        Self::new(self.id, self.button_count(), self.axis_count(), buttons, axes)
    }
}

/// Device reference handed to listeners for a frame.
///
/// Frames for ids that are not in the directory are still delivered with
/// [`FrameDevice::Missing`], so listeners must handle both cases.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameDevice {
    Attached(Arc<Device>),
    Missing(DeviceId),
}

impl FrameDevice {
    /// Id the frame was reported for, known even when the device is missing.
    pub fn id(&self) -> DeviceId {
        match self {
            FrameDevice::Attached(device) => device.id(),
            FrameDevice::Missing(id) => *id,
        }
    }

    pub fn device(&self) -> Option<&Device> {
        match self {
            FrameDevice::Attached(device) => Some(device),
            FrameDevice::Missing(_) => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, FrameDevice::Missing(_))
    }
}

fn fit_state<A>(id: DeviceId, values: &[A::Item], len: usize) -> SmallVec<A>
where
    A: Array,
    A::Item: Copy + Default,
{
    let mut state = SmallVec::new();
    if let Err(e) = state.try_reserve_exact(len) {
        log::error!(
            "device {id}: cannot allocate {len} controls ({e:?}), keeping {} reported",
            values.len()
        );
        state.extend_from_slice(values);
        return state;
    }
    state.extend_from_slice(&values[..values.len().min(len)]);
    state.resize(len, A::Item::default());
    state
}

/// Fits `values` to exactly `len` entries, borrowing when no change is needed.
pub(crate) fn fit<T: Copy + Default>(values: &[T], len: usize) -> Cow<'_, [T]> {
    match values.len() {
        n if n == len => Cow::Borrowed(values),
        n if n > len => Cow::Borrowed(&values[..len]),
        _ => {
            let mut owned = values.to_vec();
            owned.resize(len, T::default());
            Cow::Owned(owned)
        }
    }
}
