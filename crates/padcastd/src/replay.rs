use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};

use padcast_registry::{Registry, SourceEvent};

use crate::script::{Script, Step};

/// Totals of one replay run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ReplayStats {
    pub passes: usize,
    pub events: usize,
    pub interrupted: bool,
}

/// Feeds the script through a source pump on `registry`.
///
/// Frames are followed by the script tick, waits pause for their duration.
/// A message on `stop` ends the replay at the next step boundary.
pub(crate) fn replay(
    registry: &Registry,
    script: &Script,
    repeat: bool,
    stop: &Receiver<()>,
) -> padcast_registry::Result<ReplayStats> {
    let source = registry.spawn_source()?;
    let mut stats = ReplayStats::default();

    'passes: loop {
        for step in &script.steps {
            let pause = match step {
                Step::Event(event) => {
                    source.send(event.clone())?;
                    stats.events += 1;
                    if matches!(event, SourceEvent::Frame(_)) {
                        script.tick
                    } else {
                        Duration::ZERO
                    }
                }
                Step::Wait(duration) => *duration,
            };
            if wait_or_stop(stop, pause) {
                stats.interrupted = true;
                break 'passes;
            }
        }
        stats.passes += 1;
        if !repeat {
            break;
        }
    }

    source.shutdown()?;
    Ok(stats)
}

/// Sleeps for `pause`, returning true if a stop was requested meanwhile.
fn wait_or_stop(stop: &Receiver<()>, pause: Duration) -> bool {
    match stop.recv_timeout(pause) {
        Ok(()) => true,
        Err(RecvTimeoutError::Timeout) => false,
        Err(RecvTimeoutError::Disconnected) => {
            thread::sleep(pause);
            false
        }
    }
}
