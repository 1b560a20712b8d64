use std::thread::JoinHandle;

use crossbeam_channel::Sender;

use crate::error::{Error, Result};
use crate::events::SourceEvent;
use crate::frame::Frame;
use crate::types::DeviceId;

/// Sending side of the source pump, usable from any thread.
pub type SourceSender = Sender<SourceEvent>;

/// Handle to a running source pump.
///
/// Events sent through the handle are applied in send order on the pump
/// thread. Dropping the handle stops the pump after the queued events.
pub struct SourceHandle {
    pub(crate) tx: Option<SourceSender>,
    pub(crate) thread: Option<JoinHandle<()>>,
}

impl SourceHandle {
    pub fn send(&self, event: SourceEvent) -> Result<()> {
        let Some(tx) = self.tx.as_ref() else {
            return Err(Error::SourceClosed);
        };
        tx.send(event).map_err(|_| Error::SourceClosed)
    }

    pub fn attach(&self, id: DeviceId, buttons: Vec<bool>, axes: Vec<f32>) -> Result<()> {
        self.send(SourceEvent::attached(id, buttons, axes))
    }

    pub fn detach(&self, id: DeviceId) -> Result<()> {
        self.send(SourceEvent::Detached(id))
    }

    pub fn frame(&self, frame: Frame) -> Result<()> {
        self.send(frame.into())
    }

    /// Returns an extra sender for another producer thread.
    /// [`SourceHandle::shutdown`] waits until every such sender is dropped.
    pub fn sender(&self) -> Option<SourceSender> {
        self.tx.clone()
    }

    /// Closes the channel and waits for the pump to drain it.
    pub fn shutdown(mut self) -> Result<()> {
        self.stop()
    }

    fn stop(&mut self) -> Result<()> {
        self.tx.take();
        match self.thread.take() {
            Some(thread) => thread.join().map_err(|_| Error::PumpPanicked),
            None => Ok(()),
        }
    }
}

impl Drop for SourceHandle {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::error!("source pump shutdown failed: {e}");
        }
    }
}
