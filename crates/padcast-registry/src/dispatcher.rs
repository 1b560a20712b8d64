use std::any::Any;
use std::borrow::Cow;
use std::panic::{self, AssertUnwindSafe};

use crate::config::{DeliveryPolicy, DispatchConfig};
use crate::directory::DeviceDirectory;
use crate::frame::Frame;
use crate::listener::{ListenerRef, ListenerSnapshot, SubscriberList};
use crate::types::{fit, DeviceId, FrameDevice};

/// Outcome of a single frame dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    pub device_id: DeviceId,
    /// Whether the device was attached when the frame was processed.
    pub device_found: bool,
    /// Set when the frame was dropped by [`DeliveryPolicy::DropUnknown`].
    pub dropped: bool,
    /// Listeners whose three callbacks all returned normally.
    pub delivered: usize,
    /// Listeners with at least one panicking callback.
    pub failed: usize,
}

/// Routes frames from the polling source to the registered listeners.
///
/// Owns the device directory and the subscriber list. All methods take
/// `&self` and may be called from any thread.
pub struct Dispatcher {
    directory: DeviceDirectory,
    subscribers: SubscriberList,
    config: DispatchConfig,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(DispatchConfig::default())
    }
}

impl Dispatcher {
    pub fn new(config: DispatchConfig) -> Self {
        if config.delivery == DeliveryPolicy::DropUnknown {
            log::debug!("frames for unknown devices will be dropped");
        }
        Self {
            directory: DeviceDirectory::new(),
            subscribers: SubscriberList::new(),
            config,
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn directory(&self) -> &DeviceDirectory {
        &self.directory
    }

    /// Appends a listener. The same listener may be registered more than once.
    pub fn subscribe(&self, listener: ListenerRef) {
        self.subscribers.push(listener);
    }

    /// Removes the first registration of `listener`. Returns false if it was absent.
    pub fn unsubscribe(&self, listener: &ListenerRef) -> bool {
        self.subscribers.remove(listener)
    }

    /// Returns the subscribers as of now.
    pub fn listeners(&self) -> ListenerSnapshot {
        self.subscribers.snapshot()
    }

    /// Delivers `frame` to every listener registered when the call starts.
    ///
    /// Deltas for an attached device are fitted to its declared counts.
    /// Frames for unknown ids are delivered with [`FrameDevice::Missing`]
    /// unless the config asks to drop them. A panicking callback is logged
    /// and does not stop delivery to anyone else.
    pub fn dispatch_frame(&self, frame: &Frame) -> DispatchReport {
        let id = frame.device_id;
        let mut report = DispatchReport {
            device_id: id,
            device_found: false,
            dropped: false,
            delivered: 0,
            failed: 0,
        };

        let (device, buttons, axes) = match self.directory.lookup(id) {
            Some(device) => {
                report.device_found = true;
                let buttons = fit(&frame.buttons, device.button_count());
                let axes = fit(&frame.axes, device.axis_count());
                let device = if self.config.track_state {
                    self.directory
                        .replace_state(id, &buttons, &axes)
                        .unwrap_or(device)
                } else {
                    device
                };
                (FrameDevice::Attached(device), buttons, axes)
            }
            None => match self.config.delivery {
                DeliveryPolicy::BestEffort => {
                    log::debug!("frame for unknown device {id}, delivering as missing");
                    (
                        FrameDevice::Missing(id),
                        Cow::Borrowed(frame.buttons.as_slice()),
                        Cow::Borrowed(frame.axes.as_slice()),
                    )
                }
                DeliveryPolicy::DropUnknown => {
                    log::debug!("frame for unknown device {id} dropped");
                    report.dropped = true;
                    return report;
                }
            },
        };

        let listeners = self.subscribers.snapshot();
        for listener in &listeners {
            let mut ok = guarded(id, "listener handle_buttons", || {
                listener.handle_buttons(&device, &buttons);
            });
            ok &= guarded(id, "listener handle_axes", || {
                listener.handle_axes(&device, &axes);
            });
            ok &= guarded(id, "listener end_of_frame", || listener.end_of_frame());
            if ok {
                report.delivered += 1;
            } else {
                report.failed += 1;
            }
        }
        report
    }
}

/// Runs `callback`, containing a panic. Returns false if it panicked.
pub(crate) fn guarded(id: DeviceId, stage: &str, callback: impl FnOnce()) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(callback)) {
        Ok(()) => true,
        Err(payload) => {
            log::error!(
                "{stage} panicked on device {id}: {}",
                panic_message(&*payload)
            );
            false
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::listener::DeviceListener;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Buttons {
            tag: &'static str,
            device: Option<DeviceId>,
            missing: bool,
            values: Vec<bool>,
        },
        Axes {
            tag: &'static str,
            device: Option<DeviceId>,
            values: Vec<f32>,
        },
        End {
            tag: &'static str,
        },
    }

    type CallLog = Arc<Mutex<Vec<Call>>>;

    struct Recorder {
        tag: &'static str,
        log: CallLog,
    }

    impl Recorder {
        fn new(tag: &'static str, log: &CallLog) -> Arc<Self> {
            Arc::new(Self { tag, log: Arc::clone(log) })
        }

        fn push(&self, call: Call) {
            self.log.lock().unwrap().push(call);
        }
    }

    impl DeviceListener for Recorder {
        fn handle_buttons(&self, device: &FrameDevice, buttons: &[bool]) {
            self.push(Call::Buttons {
                tag: self.tag,
                device: device.device().map(|d| d.id()),
                missing: device.is_missing(),
                values: buttons.to_vec(),
            });
        }

        fn handle_axes(&self, device: &FrameDevice, axes: &[f32]) {
            self.push(Call::Axes {
                tag: self.tag,
                device: device.device().map(|d| d.id()),
                values: axes.to_vec(),
            });
        }

        fn end_of_frame(&self) {
            self.push(Call::End { tag: self.tag });
        }
    }

    fn tags(log: &CallLog) -> Vec<(&'static str, &'static str)> {
        log.lock()
            .unwrap()
            .iter()
            .map(|call| match call {
                Call::Buttons { tag, .. } => (*tag, "buttons"),
                Call::Axes { tag, .. } => (*tag, "axes"),
                Call::End { tag } => (*tag, "end"),
            })
            .collect()
    }

    #[test]
    fn delivers_buttons_axes_and_end_for_attached_device() {
        let dispatcher = Dispatcher::default();
        let log = CallLog::default();
        dispatcher.directory().attach(1, 2, 2, &[false, false], &[0.0, 0.0]);
        dispatcher.subscribe(Recorder::new("x", &log));

        let report = dispatcher.dispatch_frame(&Frame::new(1, [true, false], [0.5, -0.5]));
        assert_eq!(report.delivered, 1);
        assert!(report.device_found);

        let calls = log.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![
                Call::Buttons {
                    tag: "x",
                    device: Some(1),
                    missing: false,
                    values: vec![true, false],
                },
                Call::Axes {
                    tag: "x",
                    device: Some(1),
                    values: vec![0.5, -0.5],
                },
                Call::End { tag: "x" },
            ]
        );
    }

    #[test]
    fn listeners_are_called_in_registration_order_without_interleaving() {
        let dispatcher = Dispatcher::default();
        let log = CallLog::default();
        dispatcher.directory().attach(1, 1, 1, &[false], &[0.0]);
        for tag in ["a", "b", "c"] {
            dispatcher.subscribe(Recorder::new(tag, &log));
        }

        dispatcher.dispatch_frame(&Frame::new(1, [true], [1.0]));
        let expected: Vec<_> = ["a", "b", "c"]
            .into_iter()
            .flat_map(|tag| [(tag, "buttons"), (tag, "axes"), (tag, "end")])
            .collect();
        assert_eq!(tags(&log), expected);
    }

    #[test]
    fn detached_device_is_delivered_as_missing() {
        let dispatcher = Dispatcher::default();
        let log = CallLog::default();
        dispatcher.directory().attach(1, 2, 2, &[false, false], &[0.0, 0.0]);
        dispatcher.subscribe(Recorder::new("x", &log));
        dispatcher.directory().detach(1);

        let report = dispatcher.dispatch_frame(&Frame::new(1, [true, false], [0.5, -0.5]));
        assert!(!report.device_found);
        assert!(!report.dropped);
        assert_eq!(report.delivered, 1);

        let calls = log.lock().unwrap().clone();
        assert_eq!(calls.len(), 3);
        assert_eq!(
            calls[0],
            Call::Buttons {
                tag: "x",
                device: None,
                missing: true,
                values: vec![true, false],
            }
        );
        assert_eq!(calls[2], Call::End { tag: "x" });
    }

    #[test]
    fn strict_mode_drops_frames_for_unknown_devices() {
        let dispatcher = Dispatcher::new(DispatchConfig::strict());
        let log = CallLog::default();
        dispatcher.subscribe(Recorder::new("x", &log));

        let report = dispatcher.dispatch_frame(&Frame::new(4, [true], [0.0]));
        assert!(report.dropped);
        assert_eq!(report.delivered, 0);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn malformed_deltas_are_fitted_to_declared_shape() {
        let dispatcher = Dispatcher::default();
        let log = CallLog::default();
        dispatcher.directory().attach(2, 3, 1, &[false; 3], &[0.0]);
        dispatcher.subscribe(Recorder::new("x", &log));

        dispatcher.dispatch_frame(&Frame::new(2, [true], [0.3, 0.9, 0.1]));
        let calls = log.lock().unwrap().clone();
        assert!(matches!(
            &calls[0],
            Call::Buttons { values, .. } if values == &[true, false, false]
        ));
        assert!(matches!(&calls[1], Call::Axes { values, .. } if values == &[0.3]));
    }

    struct SelfRemover {
        dispatcher: Arc<Dispatcher>,
        me: Mutex<Option<ListenerRef>>,
        log: CallLog,
    }

    impl DeviceListener for SelfRemover {
        fn handle_buttons(&self, _: &FrameDevice, _: &[bool]) {
            if let Some(me) = self.me.lock().unwrap().take() {
                assert!(self.dispatcher.unsubscribe(&me));
            }
            self.log.lock().unwrap().push(Call::End { tag: "remover-buttons" });
        }

        fn handle_axes(&self, _: &FrameDevice, _: &[f32]) {}

        fn end_of_frame(&self) {}
    }

    #[test]
    fn unsubscribing_during_dispatch_keeps_the_in_flight_snapshot() {
        let dispatcher = Arc::new(Dispatcher::default());
        let log = CallLog::default();
        let remover = Arc::new(SelfRemover {
            dispatcher: Arc::clone(&dispatcher),
            me: Mutex::new(None),
            log: Arc::clone(&log),
        });
        let remover_ref: ListenerRef = remover.clone();
        *remover.me.lock().unwrap() = Some(remover_ref.clone());

        dispatcher.subscribe(Recorder::new("a", &log));
        dispatcher.subscribe(remover_ref.clone());
        dispatcher.subscribe(Recorder::new("c", &log));

        let report = dispatcher.dispatch_frame(&Frame::new(1, [true], [0.0]));
        assert_eq!(report.delivered, 3);
        let seen = tags(&log);
        assert_eq!(seen.iter().filter(|(tag, kind)| *tag == "c" && *kind == "end").count(), 1);
        assert_eq!(seen.iter().filter(|(tag, _)| *tag == "remover-buttons").count(), 1);
        assert!(!dispatcher.listeners().contains(&remover_ref));

        log.lock().unwrap().clear();
        let report = dispatcher.dispatch_frame(&Frame::new(1, [true], [0.0]));
        assert_eq!(report.delivered, 2);
        assert!(tags(&log).iter().all(|(tag, _)| *tag != "remover-buttons"));
    }

    struct Panicky;

    impl DeviceListener for Panicky {
        fn handle_buttons(&self, _: &FrameDevice, _: &[bool]) {
            panic!("listener failure");
        }

        fn handle_axes(&self, _: &FrameDevice, _: &[f32]) {}

        fn end_of_frame(&self) {}
    }

    #[test]
    fn panicking_listener_does_not_stop_delivery() {
        let dispatcher = Dispatcher::default();
        let log = CallLog::default();
        dispatcher.subscribe(Arc::new(Panicky));
        dispatcher.subscribe(Recorder::new("after", &log));

        let report = dispatcher.dispatch_frame(&Frame::new(1, [true], [0.0]));
        assert_eq!(report.failed, 1);
        assert_eq!(report.delivered, 1);
        assert_eq!(tags(&log).len(), 3);

        // The failing listener stays registered and the dispatcher keeps working.
        assert_eq!(dispatcher.listeners().len(), 2);
        let report = dispatcher.dispatch_frame(&Frame::new(1, [false], [0.0]));
        assert_eq!(report.failed, 1);
        assert_eq!(tags(&log).len(), 6);
    }

    /// Records its calls and panics in the chosen stage.
    struct FailingStage {
        stage: &'static str,
        log: CallLog,
    }

    impl DeviceListener for FailingStage {
        fn handle_buttons(&self, _: &FrameDevice, _: &[bool]) {
            self.log.lock().unwrap().push(Call::End { tag: "failing-buttons" });
            assert_ne!(self.stage, "buttons", "buttons failure");
        }

        fn handle_axes(&self, _: &FrameDevice, _: &[f32]) {
            self.log.lock().unwrap().push(Call::End { tag: "failing-axes" });
            assert_ne!(self.stage, "axes", "axes failure");
        }

        fn end_of_frame(&self) {
            self.log.lock().unwrap().push(Call::End { tag: "failing-end" });
            assert_ne!(self.stage, "end", "end failure");
        }
    }

    #[test]
    fn panic_in_any_stage_keeps_remaining_callbacks() {
        for stage in ["axes", "end"] {
            let dispatcher = Dispatcher::default();
            let log = CallLog::default();
            dispatcher.subscribe(Arc::new(FailingStage {
                stage,
                log: Arc::clone(&log),
            }));
            dispatcher.subscribe(Recorder::new("after", &log));

            let report = dispatcher.dispatch_frame(&Frame::new(1, [true], [0.0]));
            assert_eq!(report.failed, 1, "stage {stage}");
            assert_eq!(report.delivered, 1, "stage {stage}");
            assert_eq!(
                tags(&log),
                vec![
                    ("failing-buttons", "end"),
                    ("failing-axes", "end"),
                    ("failing-end", "end"),
                    ("after", "buttons"),
                    ("after", "axes"),
                    ("after", "end"),
                ],
                "stage {stage}"
            );
        }
    }

    #[test]
    fn duplicate_subscription_is_notified_twice() {
        let dispatcher = Dispatcher::default();
        let log = CallLog::default();
        let listener: ListenerRef = Recorder::new("dup", &log);
        dispatcher.subscribe(listener.clone());
        dispatcher.subscribe(listener.clone());

        dispatcher.dispatch_frame(&Frame::new(1, Vec::new(), Vec::new()));
        assert_eq!(tags(&log).len(), 6);

        assert!(dispatcher.unsubscribe(&listener));
        assert_eq!(dispatcher.listeners().occurrences(&listener), 1);
    }

    #[test]
    fn state_tracking_updates_directory_and_listener_view() {
        let dispatcher = Dispatcher::new(DispatchConfig {
            track_state: true,
            ..DispatchConfig::default()
        });
        dispatcher.directory().attach(1, 2, 1, &[false, false], &[0.0]);

        struct StateRecorder(Mutex<Vec<bool>>);
        impl DeviceListener for StateRecorder {
            fn handle_buttons(&self, device: &FrameDevice, _: &[bool]) {
                if let Some(device) = device.device() {
                    *self.0.lock().unwrap() = device.buttons().to_vec();
                }
            }
            fn handle_axes(&self, _: &FrameDevice, _: &[f32]) {}
            fn end_of_frame(&self) {}
        }
        let recorder = Arc::new(StateRecorder(Mutex::new(Vec::new())));
        dispatcher.subscribe(recorder.clone());

        dispatcher.dispatch_frame(&Frame::new(1, [false, true], [0.8]));
        assert_eq!(*recorder.0.lock().unwrap(), vec![false, true]);
        let stored = dispatcher.directory().lookup(1).expect("device attached");
        assert_eq!(stored.buttons(), &[false, true]);
        assert_eq!(stored.axes(), &[0.8]);
    }

    #[test]
    fn state_is_not_merged_by_default() {
        let dispatcher = Dispatcher::default();
        dispatcher.directory().attach(1, 1, 1, &[false], &[0.0]);
        dispatcher.dispatch_frame(&Frame::new(1, [true], [1.0]));
        let stored = dispatcher.directory().lookup(1).expect("device attached");
        assert_eq!(stored.buttons(), &[false]);
    }
}
