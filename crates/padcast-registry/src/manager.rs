use std::sync::Arc;

use crossbeam_channel::unbounded;

use crate::config::DispatchConfig;
use crate::dispatcher::{DispatchReport, Dispatcher};
use crate::error::{Error, Result};
use crate::events::SourceEvent;
use crate::frame::Frame;
use crate::handle::SourceHandle;
use crate::listener::{ListenerRef, ListenerSnapshot};
use crate::runtime::{apply, start_source_thread};
use crate::types::{Device, DeviceId};

/// Application-wide controller registry.
///
/// Build one at the composition root and hand clones to every collaborator;
/// clones share the same directory and subscriber list.
#[derive(Clone, Default)]
pub struct Registry {
    pub(crate) inner: Arc<Dispatcher>,
}

impl Registry {
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            inner: Arc::new(Dispatcher::new(config)),
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        self.inner.config()
    }

    /// Records a connected device, replacing any record with the same id.
    pub fn attach(
        &self,
        id: DeviceId,
        button_count: usize,
        axis_count: usize,
        buttons: &[bool],
        axes: &[f32],
    ) {
        self.apply(SourceEvent::Attached {
            id,
            button_count,
            axis_count,
            buttons: buttons.to_vec(),
            axes: axes.to_vec(),
        });
    }

    /// Forgets a device. Unknown ids are ignored.
    pub fn detach(&self, id: DeviceId) {
        self.apply(SourceEvent::Detached(id));
    }

    pub fn device_count(&self) -> usize {
        self.inner.directory().count()
    }

    pub fn lookup(&self, id: DeviceId) -> Option<Arc<Device>> {
        self.inner.directory().lookup(id)
    }

    pub fn device_ids(&self) -> Vec<DeviceId> {
        self.inner.directory().ids()
    }

    pub fn subscribe(&self, listener: ListenerRef) {
        self.inner.subscribe(listener);
    }

    pub fn unsubscribe(&self, listener: &ListenerRef) -> bool {
        self.inner.unsubscribe(listener)
    }

    pub fn listeners(&self) -> ListenerSnapshot {
        self.inner.listeners()
    }

    pub fn dispatch_frame(&self, frame: &Frame) -> DispatchReport {
        self.inner.dispatch_frame(frame)
    }

    /// Decodes a row-based frame and dispatches it.
    pub fn dispatch_rows<R: AsRef<[f32]>>(&self, rows: &[R]) -> Result<DispatchReport> {
        let frame = Frame::from_rows(rows)?;
        Ok(self.inner.dispatch_frame(&frame))
    }

    /// Applies one source event on the calling thread.
    pub fn apply(&self, event: SourceEvent) {
        apply(&self.inner, event);
    }

    /// Starts a background pump that applies queued source events in order.
    pub fn spawn_source(&self) -> Result<SourceHandle> {
        let (tx, rx) = unbounded::<SourceEvent>();
        let thread = start_source_thread(Arc::clone(&self.inner), rx)
            .map_err(Error::ThreadSpawn)?;
        Ok(SourceHandle {
            tx: Some(tx),
            thread: Some(thread),
        })
    }
}
