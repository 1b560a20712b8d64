use crate::frame::Frame;
use crate::types::DeviceId;

/// Events reported by a platform polling source.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    /// A device was connected with the given shape and initial state.
    Attached {
        id: DeviceId,
        button_count: usize,
        axis_count: usize,
        buttons: Vec<bool>,
        axes: Vec<f32>,
    },
    /// A previously attached device went away.
    Detached(DeviceId),
    /// One polled frame of state for a device.
    Frame(Frame),
}

impl SourceEvent {
    /// Attach event whose counts are taken from the initial state lengths.
    pub fn attached(id: DeviceId, buttons: Vec<bool>, axes: Vec<f32>) -> Self {
        SourceEvent::Attached {
            id,
            button_count: buttons.len(),
            axis_count: axes.len(),
            buttons,
            axes,
        }
    }

    /// Id of the device the event refers to.
    pub fn device_id(&self) -> DeviceId {
        match self {
            SourceEvent::Attached { id, .. } | SourceEvent::Detached(id) => *id,
            SourceEvent::Frame(frame) => frame.device_id,
        }
    }
}

impl From<Frame> for SourceEvent {
    fn from(frame: Frame) -> Self {
        SourceEvent::Frame(frame)
    }
}
