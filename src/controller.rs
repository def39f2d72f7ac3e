//! Collaborator-facing API.
//!
//! [`CameraPtz`] is what a UI or capture layer talks to.  Every call is
//! queued onto the single worker, so callers never block on USB I/O and two
//! transfers are never in flight against the camera at once.  Results come
//! back through completion callbacks and the [`PtzEvent`] channel.

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::action::PtzActionSet;
use crate::capability::{Capability, ZoomDirection};
use crate::config::PtzConfig;
use crate::device::DeviceIdentity;
use crate::emulator::{AbsoluteZoomEmulator, TickOutcome};
use crate::error::Result;
use crate::prober::{self, DeviceProfile};
use crate::session::{DeviceOpener, DeviceSession};
use crate::translator::PtzTranslator;
use crate::worker::{Executor, InlineExecutor, WorkerThread};

/// Capacity of the event queue.  Events emitted while it is full are dropped.
pub const EVENT_QUEUE_DEPTH: usize = 32;

/// Notifications for whoever owns the zoom timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PtzEvent {
    /// A held zoom needs periodic [`CameraPtz::zoom_tick`] calls.
    ZoomEmulationStarted(ZoomDirection),
    /// Absolute zoom hit the end of its range; stop calling `zoom_tick`.
    ZoomBoundaryReached(ZoomDirection),
}

/// State owned by the worker: the selected camera and its emulator.
pub struct PtzEngine {
    opener: Arc<dyn DeviceOpener>,
    config: PtzConfig,
    translator: Option<PtzTranslator>,
    emulator: AbsoluteZoomEmulator,
    events: Sender<PtzEvent>,
}

impl PtzEngine {
    fn new(opener: Arc<dyn DeviceOpener>, config: PtzConfig, events: Sender<PtzEvent>) -> Self {
        Self {
            opener,
            config,
            translator: None,
            emulator: AbsoluteZoomEmulator::new(),
            events,
        }
    }

    /// Probe `identity` and make it the selected camera.
    pub fn select(&mut self, identity: DeviceIdentity) -> DeviceProfile {
        log::info!("selecting camera {}", identity);
        self.emulator.stop();
        let session = DeviceSession::new(self.opener.clone(), identity);
        let profile = prober::probe(&session, self.config.zoom_steps);
        self.translator = Some(PtzTranslator::new(session, profile, self.config.settle));
        profile
    }

    pub fn capability(&self) -> Option<&Capability> {
        self.translator.as_ref().map(|t| t.capability())
    }

    pub fn translator(&self) -> Option<&PtzTranslator> {
        self.translator.as_ref()
    }

    pub fn emulating(&self) -> Option<ZoomDirection> {
        self.emulator.active()
    }

    pub fn apply(&mut self, actions: &PtzActionSet, continuous: bool) {
        let Some(translator) = self.translator.as_mut() else {
            log::debug!("no camera selected, dropping {}", actions);
            return;
        };
        log::debug!("apply {} continuous={}", actions, continuous);

        let outcome = translator.apply(actions, continuous);
        if let Some(direction) = outcome.emulate {
            self.emulator.start(direction);
            self.emit(PtzEvent::ZoomEmulationStarted(direction));
        }
        if let Some(direction) = outcome.boundary {
            self.emit(PtzEvent::ZoomBoundaryReached(direction));
        }
    }

    pub fn stop(&mut self) {
        self.emulator.stop();
        if let Some(translator) = self.translator.as_mut() {
            translator.stop();
        }
    }

    pub fn tick(&mut self) -> TickOutcome {
        let Some(translator) = self.translator.as_mut() else {
            return TickOutcome::Idle;
        };
        let outcome = self.emulator.tick(translator);
        if let TickOutcome::BoundaryReached(direction) = outcome {
            self.emit(PtzEvent::ZoomBoundaryReached(direction));
        }
        outcome
    }

    fn emit(&self, event: PtzEvent) {
        match self.events.try_send(event) {
            Ok(()) | Err(TrySendError::Disconnected(_)) => {}
            Err(TrySendError::Full(event)) => {
                log::debug!("event queue full, dropping {:?}", event);
            }
        }
    }
}

/// Handle to the PTZ core running on an executor.
pub struct CameraPtz<X: Executor<PtzEngine>> {
    executor: X,
    events: Receiver<PtzEvent>,
}

impl CameraPtz<WorkerThread<PtzEngine>> {
    /// Run on a dedicated worker thread.
    pub fn spawn(opener: Arc<dyn DeviceOpener>, config: PtzConfig) -> Result<Self> {
        let (tx, events) = crossbeam_channel::bounded(EVENT_QUEUE_DEPTH);
        let engine = PtzEngine::new(opener, config, tx);
        let executor = WorkerThread::spawn("uvc-ptz-worker", engine)?;
        Ok(Self { executor, events })
    }
}

impl CameraPtz<InlineExecutor<PtzEngine>> {
    /// Run every call synchronously on the caller's thread.
    pub fn inline(opener: Arc<dyn DeviceOpener>, config: PtzConfig) -> Self {
        let (tx, events) = crossbeam_channel::bounded(EVENT_QUEUE_DEPTH);
        let executor = InlineExecutor::new(PtzEngine::new(opener, config, tx));
        Self { executor, events }
    }

    /// Inspect the engine between calls.
    pub fn with_engine<T>(&self, f: impl FnOnce(&mut PtzEngine) -> T) -> T {
        self.executor.with_state(f)
    }
}

impl<X: Executor<PtzEngine>> CameraPtz<X> {
    /// Select `identity`, probe it, and deliver the result to `completion`
    /// on the worker.
    pub fn probe_capability(
        &self,
        identity: DeviceIdentity,
        completion: impl FnOnce(Capability) + Send + 'static,
    ) -> Result<()> {
        self.executor.submit(Box::new(move |engine: &mut PtzEngine| {
            let profile = engine.select(identity);
            completion(profile.capability);
        }))
    }

    /// One bounded motion pulse.
    pub fn apply_discrete(&self, actions: PtzActionSet) -> Result<()> {
        self.executor
            .submit(Box::new(move |engine: &mut PtzEngine| engine.apply(&actions, false)))
    }

    /// Start motion that lasts until [`apply_continuous_stop`](Self::apply_continuous_stop).
    pub fn apply_continuous_start(&self, actions: PtzActionSet) -> Result<()> {
        self.executor
            .submit(Box::new(move |engine: &mut PtzEngine| engine.apply(&actions, true)))
    }

    /// Halt all motion and disarm zoom emulation.
    pub fn apply_continuous_stop(&self) -> Result<()> {
        self.executor.submit(Box::new(|engine: &mut PtzEngine| engine.stop()))
    }

    /// One absolute zoom emulation step; a no-op unless emulation is armed.
    pub fn zoom_tick(&self) -> Result<()> {
        self.executor.submit(Box::new(|engine: &mut PtzEngine| {
            engine.tick();
        }))
    }

    /// Run `f` on the worker after everything queued so far.
    pub fn run<T: Send + 'static>(
        &self,
        f: impl FnOnce(&mut PtzEngine) -> T + Send + 'static,
    ) -> Result<Receiver<T>> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        self.executor.submit(Box::new(move |engine: &mut PtzEngine| {
            let _ = tx.send(f(engine));
        }))?;
        Ok(rx)
    }

    /// Engine notifications.  The queue holds [`EVENT_QUEUE_DEPTH`] events;
    /// newer ones are dropped while it is full, so drain it regularly.
    pub fn events(&self) -> &Receiver<PtzEvent> {
        &self.events
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::action::PtzAction::*;
    use crate::codec::ControlSelector;
    use crate::mock::MockCamera;

    fn config() -> PtzConfig {
        PtzConfig::default().with_settle(Duration::ZERO)
    }

    #[test]
    fn actions_before_selection_are_dropped() {
        let camera = MockCamera::new().with_pantilt_relative(1, 1);
        let ptz = CameraPtz::inline(Arc::new(camera.clone()), config());
        ptz.apply_discrete(PtzActionSet::from([PanLeft])).unwrap();
        ptz.apply_continuous_stop().unwrap();
        assert_eq!(camera.opens(), 0);
    }

    #[test]
    fn probe_delivers_capability() {
        let camera = MockCamera::new().with_pantilt_relative(4, 2);
        let ptz = CameraPtz::inline(Arc::new(camera.clone()), config());
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        ptz.probe_capability(MockCamera::identity(), move |cap| {
            *sink.lock().unwrap() = Some(cap);
        })
        .unwrap();
        let cap = seen.lock().unwrap().unwrap();
        assert!(cap.supports_pan() && cap.supports_tilt() && !cap.supports_zoom());
    }

    #[test]
    fn held_absolute_zoom_arms_emulation() {
        let camera = MockCamera::new().with_zoom_absolute(0, 100, 96);
        let ptz = CameraPtz::inline(Arc::new(camera.clone()), config());
        ptz.probe_capability(MockCamera::identity(), |_| {}).unwrap();
        camera.clear_log();

        ptz.apply_continuous_start(PtzActionSet::from([ZoomIn])).unwrap();
        assert_eq!(ptz.events().try_recv(), Ok(PtzEvent::ZoomEmulationStarted(ZoomDirection::In)));
        assert_eq!(ptz.with_engine(|e| e.emulating()), Some(ZoomDirection::In));

        ptz.zoom_tick().unwrap(); // 98
        ptz.zoom_tick().unwrap(); // 100, boundary
        assert_eq!(ptz.events().try_recv(), Ok(PtzEvent::ZoomBoundaryReached(ZoomDirection::In)));
        ptz.zoom_tick().unwrap(); // idle
        assert_eq!(camera.sets_to(ControlSelector::ZoomAbsolute), vec![vec![98, 0], vec![100, 0]]);
    }

    #[test]
    fn stop_disarms_emulation() {
        let camera = MockCamera::new().with_zoom_absolute(0, 100, 50);
        let ptz = CameraPtz::inline(Arc::new(camera.clone()), config());
        ptz.probe_capability(MockCamera::identity(), |_| {}).unwrap();
        ptz.apply_continuous_start(PtzActionSet::from([ZoomOut])).unwrap();
        ptz.apply_continuous_stop().unwrap();
        assert_eq!(ptz.with_engine(|e| e.emulating()), None);
        camera.clear_log();
        ptz.zoom_tick().unwrap();
        assert!(camera.transfers().is_empty());
    }

    #[test]
    fn undrained_events_do_not_block_the_engine() {
        let camera = MockCamera::new().with_zoom_absolute(0, 100, 50);
        let ptz = CameraPtz::inline(Arc::new(camera.clone()), config());
        ptz.probe_capability(MockCamera::identity(), |_| {}).unwrap();

        for _ in 0..(EVENT_QUEUE_DEPTH * 3) {
            ptz.apply_continuous_start(PtzActionSet::from([ZoomIn])).unwrap();
        }
        assert_eq!(ptz.events().len(), EVENT_QUEUE_DEPTH);

        ptz.zoom_tick().unwrap();
        let current = ptz.with_engine(|e| e.translator().and_then(|t| t.zoom_state()).map(|z| z.current()));
        assert_eq!(current, Some(52));
    }

    #[test]
    fn worker_thread_serialises_device_access() {
        let camera = MockCamera::new().with_zoom_relative(0, 1).with_pantilt_relative(2, 2);
        let ptz = CameraPtz::spawn(Arc::new(camera.clone()), config()).unwrap();
        ptz.probe_capability(MockCamera::identity(), |_| {}).unwrap();
        for _ in 0..10 {
            ptz.apply_discrete(PtzActionSet::from([PanLeft, ZoomIn])).unwrap();
            ptz.apply_continuous_start(PtzActionSet::from([TiltDown])).unwrap();
            ptz.apply_continuous_stop().unwrap();
        }
        let done = ptz.run(|e| e.capability().copied()).unwrap();
        assert!(done.recv().unwrap().is_some());
        assert_eq!(camera.max_concurrent_opens(), 1);
        assert_eq!(camera.opens(), camera.closes());
    }
}
