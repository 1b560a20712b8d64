use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::thread::{self, ThreadId};

use ahash::AHashMap;
use colored::Colorize;

use padcast_registry::{DeviceId, DeviceListener, FrameDevice};

use crate::{print_debug, print_warning};

#[derive(Debug, Default)]
struct PendingFrame {
    device: Option<DeviceId>,
    missing: bool,
    buttons: String,
    axes: String,
}

/// Listener that logs every frame it receives.
///
/// A frame's callbacks all run on the dispatching thread, so partial frames
/// are buffered per thread.
#[derive(Debug, Default)]
pub(crate) struct FrameLogger {
    pending: Mutex<AHashMap<ThreadId, PendingFrame>>,
    frames: AtomicU64,
    missing: AtomicU64,
}

impl FrameLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    pub fn missing(&self) -> u64 {
        self.missing.load(Ordering::Relaxed)
    }

    fn with_pending(&self, f: impl FnOnce(&mut PendingFrame)) {
        if let Ok(mut pending) = self.pending.lock() {
            f(pending.entry(thread::current().id()).or_default());
        }
    }

    /// Takes the frame buffered by the calling thread.
    fn take_frame(&self) -> PendingFrame {
        self.pending
            .lock()
            .ok()
            .and_then(|mut pending| pending.remove(&thread::current().id()))
            .unwrap_or_default()
    }
}

/// Renders pressed buttons as `x` and released ones as `.`.
pub(crate) fn format_buttons(buttons: &[bool]) -> String {
    buttons.iter().map(|pressed| if *pressed { 'x' } else { '.' }).collect()
}

pub(crate) fn format_axes(axes: &[f32]) -> String {
    let mut out = String::new();
    for (i, value) in axes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{value:+.2}");
    }
    out
}

impl DeviceListener for FrameLogger {
    fn handle_buttons(&self, device: &FrameDevice, buttons: &[bool]) {
        self.with_pending(|pending| {
            pending.device = Some(device.id());
            pending.missing = device.is_missing();
            pending.buttons = format_buttons(buttons);
        });
    }

    fn handle_axes(&self, _: &FrameDevice, axes: &[f32]) {
        self.with_pending(|pending| pending.axes = format_axes(axes));
    }

    fn end_of_frame(&self) {
        self.frames.fetch_add(1, Ordering::Relaxed);
        let frame = self.take_frame();

        let id = frame.device.map_or_else(|| "?".to_string(), |id| id.to_string());
        if frame.missing {
            self.missing.fetch_add(1, Ordering::Relaxed);
            print_warning!(
                "frame for detached device id={id} buttons=[{}] axes=[{}]",
                frame.buttons,
                frame.axes
            );
        } else {
            print_debug!("frame id={id} buttons=[{}] axes=[{}]", frame.buttons, frame.axes);
        }
    }
}
