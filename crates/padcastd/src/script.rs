use std::fs;
use std::path::Path;
use std::time::Duration;

use ahash::AHashSet;
use serde::Deserialize;
use thiserror::Error;

use padcast_registry::{DeviceId, Frame, SourceEvent};

const DEFAULT_TICK_MS: u64 = 16;

#[derive(Debug, Error)]
pub(crate) enum ScriptError {
    #[error("yaml deserialize error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("unsupported version: {0}")]
    UnsupportedVersion(u8),
    #[error("script has no events")]
    Empty,
    #[error("read error: {0}")]
    Io(#[from] std::io::Error),
}

/// One step of a replay.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Step {
    Event(SourceEvent),
    Wait(Duration),
}

/// Parsed device session to feed through the registry.
#[derive(Debug, Clone)]
pub(crate) struct Script {
    /// Pause after every frame.
    pub tick: Duration,
    pub steps: Vec<Step>,
}

/// Counts reported by `check`.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Summary {
    pub attaches: usize,
    pub detaches: usize,
    pub frames: usize,
    pub waits: usize,
    pub devices: usize,
    /// Frames for an id that is not attached at that point of the script.
    pub unknown_frames: usize,
}

#[derive(Debug, Deserialize)]
struct VersionedScript {
    version: u8,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScriptV1 {
    #[allow(dead_code)]
    version: u8,
    tick_ms: Option<u64>,
    #[serde(with = "serde_yaml::with::singleton_map_recursive")]
    events: Vec<StepV1>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum StepV1 {
    Attach(DeviceV1),
    Detach(DeviceId),
    Frame(FrameV1),
    Wait(u64),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DeviceV1 {
    id: DeviceId,
    #[serde(default)]
    buttons: Vec<bool>,
    #[serde(default)]
    axes: Vec<f32>,
    button_count: Option<usize>,
    axis_count: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FrameV1 {
    id: DeviceId,
    #[serde(default)]
    buttons: Vec<bool>,
    #[serde(default)]
    axes: Vec<f32>,
}

impl StepV1 {
    fn into_step(self) -> Step {
        match self {
            StepV1::Attach(device) => Step::Event(SourceEvent::Attached {
                id: device.id,
                button_count: device.button_count.unwrap_or(device.buttons.len()),
                axis_count: device.axis_count.unwrap_or(device.axes.len()),
                buttons: device.buttons,
                axes: device.axes,
            }),
            StepV1::Detach(id) => Step::Event(SourceEvent::Detached(id)),
            StepV1::Frame(frame) => {
                Step::Event(SourceEvent::Frame(Frame::new(frame.id, frame.buttons, frame.axes)))
            }
            StepV1::Wait(ms) => Step::Wait(Duration::from_millis(ms)),
        }
    }
}

/// Parse a yaml replay script.
pub(crate) fn parse_script(input: &str) -> Result<Script, ScriptError> {
    let version: VersionedScript = serde_yaml::from_str(input)?;
    match version.version {
        1 => {
            let raw: ScriptV1 = serde_yaml::from_str(input)?;
            if raw.events.is_empty() {
                return Err(ScriptError::Empty);
            }
            Ok(Script {
                tick: Duration::from_millis(raw.tick_ms.unwrap_or(DEFAULT_TICK_MS)),
                steps: raw.events.into_iter().map(StepV1::into_step).collect(),
            })
        }
        other => Err(ScriptError::UnsupportedVersion(other)),
    }
}

pub(crate) fn load_script(path: &Path) -> Result<Script, ScriptError> {
    let content = fs::read_to_string(path)?;
    parse_script(&content)
}

impl Script {
    /// Walks the script tracking which ids are attached at each step.
    pub fn summary(&self) -> Summary {
        let mut summary = Summary::default();
        let mut attached: AHashSet<DeviceId> = AHashSet::new();
        let mut seen: AHashSet<DeviceId> = AHashSet::new();
        for step in &self.steps {
            match step {
                Step::Event(SourceEvent::Attached { id, .. }) => {
                    summary.attaches += 1;
                    attached.insert(*id);
                    seen.insert(*id);
                }
                Step::Event(SourceEvent::Detached(id)) => {
                    summary.detaches += 1;
                    attached.remove(id);
                }
                Step::Event(SourceEvent::Frame(frame)) => {
                    summary.frames += 1;
                    if !attached.contains(&frame.device_id) {
                        summary.unknown_frames += 1;
                    }
                }
                Step::Wait(_) => summary.waits += 1,
            }
        }
        summary.devices = seen.len();
        summary
    }
}
