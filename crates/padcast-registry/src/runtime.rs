use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::Receiver;

use crate::dispatcher::{guarded, Dispatcher};
use crate::events::SourceEvent;

const SOURCE_THREAD_NAME: &str = "padcast-source";

/// Starts the thread that applies source events to the dispatcher in order.
/// The thread exits once every sender of `events` is dropped.
pub(crate) fn start_source_thread(
    dispatcher: Arc<Dispatcher>,
    events: Receiver<SourceEvent>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(SOURCE_THREAD_NAME.into())
        .spawn(move || {
            log::debug!("source pump started");
            while let Ok(event) = events.recv() {
                let id = event.device_id();
                guarded(id, "source event", || apply(&dispatcher, event));
            }
            log::debug!("source pump stopped");
        })
}

/// Applies one source event through the synchronous dispatcher API.
pub(crate) fn apply(dispatcher: &Dispatcher, event: SourceEvent) {
    match event {
        SourceEvent::Attached {
            id,
            button_count,
            axis_count,
            buttons,
            axes,
        } => {
            let replaced = dispatcher
                .directory()
                .attach(id, button_count, axis_count, &buttons, &axes);
            if replaced.is_some() {
                log::debug!("device {id} re-attached, previous record replaced");
            } else {
                log::debug!("device {id} attached: {button_count} buttons, {axis_count} axes");
            }
        }
        SourceEvent::Detached(id) => {
            if dispatcher.directory().detach(id).is_some() {
                log::debug!("device {id} detached");
            } else {
                log::debug!("detach for unknown device {id} ignored");
            }
        }
        SourceEvent::Frame(frame) => {
            dispatcher.dispatch_frame(&frame);
        }
    }
}
