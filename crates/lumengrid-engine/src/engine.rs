//! The execution engine: run loop, lifecycle state machine, program registry.
//!
//! One mutex-guarded core serializes the periodic tick against lifecycle
//! calls arriving from control surfaces and from the day/night timer: when
//! `pause()` or `stop()` returns, no tick is in flight and none will follow.
//! The per-tick body is step -> frame -> notify; a misbehaving program is
//! contained at the tick boundary and must never halt the show.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use chrono::Local;

use crate::buffer::LightBuffer;
use crate::clock::AnimationClock;
use crate::color;
use crate::output::{OutputFramer, Transmitter};
use crate::program::VisualProgram;
use crate::schedule::{SunClock, SunEvent, SunEventKind, SunTimer};
use crate::state::{SharedStatus, StatusSnapshot};

/// Default frames per second.
const DEFAULT_FRAME_RATE_HZ: f64 = 60.0;

/// All-off frames emitted on stop, so downstream framing hardware observes
/// the blank state even if a single frame is dropped.
const BLANK_FRAMES: usize = 3;

/// Consecutive faulting ticks after which the active program is dropped.
const FAULT_LIMIT: u32 = 3;

/// Engine construction parameters.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Target tick rate of the periodic driver.
    pub frame_rate_hz: f64,
    /// Delay before the post-stop blackout frames go out.
    pub blank_delay: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            frame_rate_hz: DEFAULT_FRAME_RATE_HZ,
            blank_delay: Duration::from_millis(200),
        }
    }
}

/// Listener for engine lifecycle and frame events.
///
/// Listeners are invoked with the engine lock held and must not call back
/// into the engine.
pub trait ExecListener: Send {
    /// Called after every lifecycle transition with the fresh status.
    fn exec_state_changed(&mut self, status: &StatusSnapshot);

    /// Called after each frame has been handed to the output stage.
    fn frame_ready(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Stopped,
    Running,
    Paused,
}

/// Handle to the execution engine. Cloning yields another handle to the same
/// engine; all methods may be called from any thread.
#[derive(Clone)]
pub struct ShowEngine {
    shared: Arc<Shared>,
}

struct Shared {
    core: Mutex<Core>,
    status: SharedStatus,
    frame_interval: Duration,
    blank_delay: Duration,
}

struct Core {
    lights: LightBuffer,
    clock: AnimationClock,
    framer: OutputFramer,
    transmitter: Option<Box<dyn Transmitter>>,
    programs: Vec<Box<dyn VisualProgram>>,
    active: Option<usize>,
    listeners: Vec<Box<dyn ExecListener>>,
    state: RunState,
    scheduled: bool,
    next_event: Option<SunEvent>,
    sun_clock: Option<Arc<dyn SunClock>>,
    sun_timer: Option<SunTimer>,
    driver_generation: u64,
    fault_streak: u32,
    frames: u64,
}

impl ShowEngine {
    pub fn new(lights: LightBuffer, framer: OutputFramer) -> Self {
        Self::with_config(lights, framer, EngineConfig::default())
    }

    pub fn with_config(lights: LightBuffer, framer: OutputFramer, config: EngineConfig) -> Self {
        let frame_rate = if config.frame_rate_hz.is_finite() && config.frame_rate_hz > 0.0 {
            config.frame_rate_hz
        } else {
            log::warn!(
                "invalid frame rate {}; using {DEFAULT_FRAME_RATE_HZ}",
                config.frame_rate_hz
            );
            DEFAULT_FRAME_RATE_HZ
        };
        Self {
            shared: Arc::new(Shared {
                core: Mutex::new(Core {
                    lights,
                    clock: AnimationClock::new(),
                    framer,
                    transmitter: None,
                    programs: Vec::new(),
                    active: None,
                    listeners: Vec::new(),
                    state: RunState::Stopped,
                    scheduled: false,
                    next_event: None,
                    sun_clock: None,
                    sun_timer: None,
                    driver_generation: 0,
                    fault_streak: 0,
                    frames: 0,
                }),
                status: SharedStatus::default(),
                frame_interval: Duration::from_secs_f64(1.0 / frame_rate),
                blank_delay: config.blank_delay,
            }),
        }
    }

    /// Attach the output hardware. Without one the engine runs headless.
    #[must_use]
    pub fn with_transmitter(self, transmitter: Box<dyn Transmitter>) -> Self {
        self.lock().transmitter = Some(transmitter);
        self
    }

    /// Attach the day/night oracle consulted by `set_scheduled`.
    #[must_use]
    pub fn with_sun_clock(self, sun_clock: Arc<dyn SunClock>) -> Self {
        self.lock().sun_clock = Some(sun_clock);
        self
    }

    pub fn add_listener(&self, listener: Box<dyn ExecListener>) {
        self.lock().listeners.push(listener);
    }

    // ----- program registry -------------------------------------------

    /// Add a program to the registry. Programs are selected by name.
    pub fn register_program(&self, program: Box<dyn VisualProgram>) {
        self.lock().programs.push(program);
    }

    /// Activate a registered program and initialize it against the buffer.
    ///
    /// The swap is atomic with respect to the periodic driver: no tick can
    /// observe a half-initialized program. Returns `false` for an unknown
    /// name.
    pub fn select_program(&self, name: &str) -> bool {
        let mut core = self.lock();
        let Some(index) = core.programs.iter().position(|p| p.name() == name) else {
            log::warn!("unknown program {name:?}");
            return false;
        };
        core.active = Some(index);
        core.fault_streak = 0;
        core.init_active_program();
        if core.active.is_none() {
            return false;
        }
        log::info!("selected program {name:?}");
        core.notify_state_changed();
        true
    }

    pub fn program_names(&self) -> Vec<String> {
        self.lock()
            .programs
            .iter()
            .map(|p| p.name().to_string())
            .collect()
    }

    // ----- lifecycle --------------------------------------------------

    /// Start or resume the show. No-op while already running.
    ///
    /// Starting from stopped re-initializes the active program; resuming
    /// from paused does not.
    pub fn start(&self) {
        let generation;
        {
            let mut core = self.lock();
            if core.state == RunState::Running {
                return;
            }
            let resuming = core.state == RunState::Paused;
            log::info!("starting{}", if resuming { " (resume)" } else { "" });
            if !resuming {
                core.init_active_program();
                core.frames = 0;
            }
            core.state = RunState::Running;
            core.fault_streak = 0;
            core.driver_generation += 1;
            generation = core.driver_generation;
            self.shared.status.set_running(true);
            self.shared.status.set_paused(false);
            core.notify_state_changed();
        }
        let shared = Arc::clone(&self.shared);
        thread::spawn(move || drive(&shared, generation));
    }

    /// Halt the periodic driver without resetting the program or the clock.
    /// No-op unless running. Blocks until any in-flight tick completes.
    pub fn pause(&self) {
        let mut core = self.lock();
        if core.state != RunState::Running {
            return;
        }
        log::info!("pausing");
        core.state = RunState::Paused;
        self.shared.status.set_running(false);
        self.shared.status.set_paused(true);
        core.notify_state_changed();
    }

    /// Halt the driver, reset the clock, and blank the lights shortly after.
    /// No-op while already stopped. Blocks until any in-flight tick completes.
    pub fn stop(&self) {
        {
            let mut core = self.lock();
            if core.state == RunState::Stopped {
                return;
            }
            log::info!("stopping");
            core.state = RunState::Stopped;
            core.clock.reset();
            self.shared.status.set_running(false);
            self.shared.status.set_paused(false);
            core.notify_state_changed();
        }
        self.blank_later();
    }

    // ----- day/night scheduling ---------------------------------------

    /// Enable or disable the day/night auto-controller.
    ///
    /// Enabling decides immediately whether "now" means lights on or off and
    /// drives the engine accordingly, then arms a timer for the boundary.
    pub fn set_scheduled(&self, scheduled: bool) {
        {
            let mut core = self.lock();
            if core.scheduled == scheduled {
                return;
            }
            core.scheduled = scheduled;
            self.shared.status.set_scheduled(scheduled);
        }
        if scheduled {
            log::info!("day/night scheduling enabled");
            match self.arm_sun_timer() {
                // Next boundary is sunrise: it is night, lights on.
                Some(event) if event.kind == SunEventKind::Sunrise => self.start(),
                // Next boundary is sunset: it is day, lights off.
                Some(_) => {
                    self.stop();
                    self.blank_now();
                }
                None => {
                    log::warn!("no sun clock or no upcoming event; scheduling is idle");
                    self.lock().notify_state_changed();
                }
            }
        } else {
            log::info!("day/night scheduling disabled");
            let mut core = self.lock();
            if let Some(timer) = core.sun_timer.take() {
                timer.cancel();
            }
            core.next_event = None;
            core.notify_state_changed();
        }
    }

    fn arm_sun_timer(&self) -> Option<SunEvent> {
        let sun_clock = self.lock().sun_clock.clone()?;
        let Some(event) = sun_clock.next_event(Local::now()) else {
            self.lock().next_event = None;
            return None;
        };
        log::info!("next sun event: {:?} at {}", event.kind, event.at);
        let weak = Arc::downgrade(&self.shared);
        let kind = event.kind;
        let timer = SunTimer::spawn(event.at, move || {
            if let Some(shared) = weak.upgrade() {
                ShowEngine { shared }.on_sun_boundary(kind);
            }
        });
        let mut core = self.lock();
        core.next_event = Some(event.clone());
        if let Some(old) = core.sun_timer.replace(timer) {
            old.cancel();
        }
        Some(event)
    }

    fn on_sun_boundary(&self, kind: SunEventKind) {
        if !self.is_scheduled() {
            return;
        }
        log::info!("sun boundary reached: {kind:?}");
        match kind {
            SunEventKind::Sunrise => self.stop(),
            SunEventKind::Sunset => self.start(),
        }
        self.arm_sun_timer();
        self.lock().notify_state_changed();
    }

    // ----- observation and tuning -------------------------------------

    /// Forwarded to the animation clock.
    pub fn set_speed(&self, speed: f64) {
        self.lock().clock.set_speed(speed);
    }

    pub fn speed(&self) -> f64 {
        self.lock().clock.speed()
    }

    pub fn is_running(&self) -> bool {
        self.shared.status.is_running()
    }

    pub fn is_paused(&self) -> bool {
        self.shared.status.is_paused()
    }

    pub fn is_scheduled(&self) -> bool {
        self.shared.status.is_scheduled()
    }

    /// Ticks driven since the last cold start.
    pub fn frames(&self) -> u64 {
        self.lock().frames
    }

    /// Full status for a control surface reply.
    pub fn status(&self) -> StatusSnapshot {
        self.lock().snapshot()
    }

    /// Run a closure against the buffer under the engine lock.
    pub fn with_lights<R>(&self, f: impl FnOnce(&LightBuffer) -> R) -> R {
        f(&self.lock().lights)
    }

    pub fn with_lights_mut<R>(&self, f: impl FnOnce(&mut LightBuffer) -> R) -> R {
        f(&mut self.lock().lights)
    }

    // ----- internals --------------------------------------------------

    fn lock(&self) -> MutexGuard<'_, Core> {
        self.shared.core.lock().unwrap()
    }

    fn blank_later(&self) {
        let shared = Arc::downgrade(&self.shared);
        let delay = self.shared.blank_delay;
        thread::spawn(move || {
            thread::sleep(delay);
            if let Some(shared) = shared.upgrade() {
                shared.core.lock().unwrap().blank_all();
            }
        });
    }

    fn blank_now(&self) {
        self.lock().blank_all();
    }
}

fn drive(shared: &Arc<Shared>, generation: u64) {
    let interval = shared.frame_interval;
    let mut next = Instant::now();
    loop {
        {
            let mut core = shared.core.lock().unwrap();
            if core.driver_generation != generation || core.state != RunState::Running {
                break;
            }
            core.tick();
        }
        next += interval;
        let now = Instant::now();
        if next < now {
            // Overran the interval: delay the next tick, never run two at once.
            next = now;
        } else {
            thread::sleep(next - now);
        }
    }
}

impl Core {
    fn tick(&mut self) {
        let time_ms = self.clock.current_time() * 1e3;
        if let Some(index) = self.active {
            let program = &mut self.programs[index];
            let lights = &mut self.lights;
            let result = catch_unwind(AssertUnwindSafe(|| {
                let keep_going = program.step(time_ms, lights);
                program.set_lights(time_ms, lights);
                keep_going
            }));
            match result {
                Ok(keep_going) => {
                    self.fault_streak = 0;
                    if !keep_going {
                        log::debug!(
                            "program {:?} reports its run complete",
                            self.programs[index].name()
                        );
                    }
                }
                Err(_) => {
                    self.fault_streak += 1;
                    let name = self.programs[index].name().to_string();
                    log::error!("caught panic in step of program {name:?}; continuing");
                    // Whatever the program had acquired dies with this frame.
                    self.lights.release_temps();
                    if self.fault_streak >= FAULT_LIMIT {
                        log::error!(
                            "program {name:?} faulted {FAULT_LIMIT} ticks in a row; dropping it"
                        );
                        self.active = None;
                        self.notify_state_changed();
                    }
                }
            }
        }
        self.write_frame();
        self.frames += 1;
    }

    fn write_frame(&mut self) {
        if let Some(transmitter) = self.transmitter.as_deref_mut() {
            if let Err(err) = self.framer.write_lights(&self.lights, transmitter) {
                log::warn!("frame transmit failed: {err}");
            }
        }
        for listener in &mut self.listeners {
            listener.frame_ready();
        }
    }

    fn blank_all(&mut self) {
        for _ in 0..BLANK_FRAMES {
            self.lights.fill(color::BLACK, false);
            self.write_frame();
        }
    }

    fn init_active_program(&mut self) {
        if let Some(index) = self.active {
            let program = &mut self.programs[index];
            let lights = &mut self.lights;
            if catch_unwind(AssertUnwindSafe(|| program.init(lights))).is_err() {
                log::error!(
                    "caught panic in init of program {:?}; dropping it",
                    self.programs[index].name()
                );
                self.active = None;
                self.lights.release_temps();
            }
        }
    }

    fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            running: self.state == RunState::Running,
            paused: self.state == RunState::Paused,
            scheduled: self.scheduled,
            program: self.active.map(|i| self.programs[i].name().to_string()),
            next_event: self.next_event.clone(),
        }
    }

    fn notify_state_changed(&mut self) {
        let snapshot = self.snapshot();
        for listener in &mut self.listeners {
            listener.exec_state_changed(&snapshot);
        }
    }
}
