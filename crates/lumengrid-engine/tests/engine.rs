//! Engine lifecycle tests driving the real periodic thread.
//!
//! Frame rates are set high and sleeps kept generous so the assertions hold
//! on slow machines.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use lumengrid_engine::buffer::{Layout, LightBuffer};
use lumengrid_engine::color::Rgb;
use lumengrid_engine::engine::{EngineConfig, ShowEngine};
use lumengrid_engine::error::TransmitError;
use lumengrid_engine::output::{ChannelLayout, OutputFramer, Transmitter};
use lumengrid_engine::program::VisualProgram;

struct CountingProgram {
    name: &'static str,
    inits: Arc<AtomicUsize>,
    steps: Arc<AtomicUsize>,
}

impl CountingProgram {
    fn new(name: &'static str) -> (Self, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let inits = Arc::new(AtomicUsize::new(0));
        let steps = Arc::new(AtomicUsize::new(0));
        (
            Self {
                name,
                inits: Arc::clone(&inits),
                steps: Arc::clone(&steps),
            },
            inits,
            steps,
        )
    }
}

impl VisualProgram for CountingProgram {
    fn name(&self) -> &str {
        self.name
    }

    fn init(&mut self, lights: &mut LightBuffer) {
        self.inits.fetch_add(1, Ordering::SeqCst);
        lights.fill(Rgb::new(200, 120, 40), true);
    }

    fn step(&mut self, _time_ms: f64, _lights: &mut LightBuffer) -> bool {
        self.steps.fetch_add(1, Ordering::SeqCst);
        true
    }
}

struct PanickyProgram;

impl VisualProgram for PanickyProgram {
    fn name(&self) -> &str {
        "panicky"
    }

    fn init(&mut self, _lights: &mut LightBuffer) {}

    fn step(&mut self, _time_ms: f64, _lights: &mut LightBuffer) -> bool {
        panic!("misbehaving plugin");
    }
}

#[derive(Clone)]
struct RecordingTransmitter {
    sends: Arc<Mutex<Vec<(usize, Vec<u8>)>>>,
}

impl RecordingTransmitter {
    fn new() -> Self {
        Self {
            sends: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl Transmitter for RecordingTransmitter {
    fn send(&mut self, channel: usize, bytes: &[u8]) -> Result<(), TransmitError> {
        self.sends.lock().unwrap().push((channel, bytes.to_vec()));
        Ok(())
    }
}

fn test_engine(blank_delay: Duration) -> ShowEngine {
    let lights = LightBuffer::new(Layout::double_tower());
    let framer = OutputFramer::new(ChannelLayout::for_buffer(&lights, 2));
    ShowEngine::with_config(
        lights,
        framer,
        EngineConfig {
            frame_rate_hz: 200.0,
            blank_delay,
        },
    )
}

#[test]
fn pause_then_start_resumes_without_reinit() {
    let engine = test_engine(Duration::from_millis(50));
    let (program, inits, steps) = CountingProgram::new("counting");
    engine.register_program(Box::new(program));
    assert!(engine.select_program("counting"));

    engine.start();
    thread::sleep(Duration::from_millis(100));
    let inits_after_start = inits.load(Ordering::SeqCst);
    let steps_after_start = steps.load(Ordering::SeqCst);
    assert!(steps_after_start > 0);

    engine.pause();
    assert!(engine.is_paused());
    assert!(!engine.is_running());

    engine.start();
    thread::sleep(Duration::from_millis(100));
    assert_eq!(inits.load(Ordering::SeqCst), inits_after_start);
    assert!(steps.load(Ordering::SeqCst) > steps_after_start);

    engine.stop();
}

#[test]
fn starting_from_stopped_reinitializes() {
    let engine = test_engine(Duration::from_millis(50));
    let (program, inits, _steps) = CountingProgram::new("counting");
    engine.register_program(Box::new(program));
    engine.select_program("counting");

    engine.start();
    let inits_after_start = inits.load(Ordering::SeqCst);
    engine.stop();
    engine.start();
    assert_eq!(inits.load(Ordering::SeqCst), inits_after_start + 1);
    engine.stop();
}

#[test]
fn stopped_means_no_further_ticks() {
    let engine = test_engine(Duration::from_millis(10));
    let (program, _inits, _steps) = CountingProgram::new("counting");
    engine.register_program(Box::new(program));
    engine.select_program("counting");

    engine.start();
    thread::sleep(Duration::from_millis(100));
    engine.stop();
    let frames = engine.frames();
    thread::sleep(Duration::from_millis(100));
    assert_eq!(engine.frames(), frames);
}

#[test]
fn stop_emits_blank_frames() {
    let engine = test_engine(Duration::from_millis(20));
    let transmitter = RecordingTransmitter::new();
    let sends = Arc::clone(&transmitter.sends);
    let engine = engine.with_transmitter(Box::new(transmitter));
    let (program, _inits, _steps) = CountingProgram::new("counting");
    engine.register_program(Box::new(program));
    engine.select_program("counting");

    engine.start();
    thread::sleep(Duration::from_millis(50));
    engine.stop();
    thread::sleep(Duration::from_millis(150));

    let sends = sends.lock().unwrap();
    let payload_len = 3 * 25 * 10;
    let payloads: Vec<_> = sends.iter().filter(|(_, b)| b.len() == payload_len).collect();
    assert!(payloads.len() >= 3);
    // The show was actually lit while running...
    assert!(payloads.iter().any(|(_, p)| p.iter().any(|&b| b != 0)));
    // ...and the blackout at the tail is entirely dark.
    for (_, payload) in payloads.iter().rev().take(3) {
        assert!(payload.iter().all(|&b| b == 0));
    }
}

#[test]
fn panicking_program_is_contained_then_dropped() {
    // Keep the expected panics out of the test output.
    std::panic::set_hook(Box::new(|_| {}));

    let engine = test_engine(Duration::from_millis(50));
    engine.register_program(Box::new(PanickyProgram));
    engine.select_program("panicky");

    engine.start();
    thread::sleep(Duration::from_millis(200));

    // The engine survived its program.
    assert!(engine.is_running());
    assert!(engine.frames() > 3);
    // After three consecutive faults the program was deselected.
    assert_eq!(engine.status().program, None);

    engine.stop();
    let _ = std::panic::take_hook();
}

#[test]
fn hot_swap_reinitializes_the_new_program() {
    let engine = test_engine(Duration::from_millis(50));
    let (first, _first_inits, _first_steps) = CountingProgram::new("first");
    let (second, second_inits, second_steps) = CountingProgram::new("second");
    engine.register_program(Box::new(first));
    engine.register_program(Box::new(second));
    engine.select_program("first");

    engine.start();
    thread::sleep(Duration::from_millis(50));

    assert!(engine.select_program("second"));
    assert_eq!(second_inits.load(Ordering::SeqCst), 1);
    thread::sleep(Duration::from_millis(100));
    assert!(second_steps.load(Ordering::SeqCst) > 0);
    assert_eq!(engine.status().program.as_deref(), Some("second"));

    engine.stop();
}

#[test]
fn unknown_programs_are_rejected() {
    let engine = test_engine(Duration::from_millis(50));
    assert!(!engine.select_program("no-such-program"));
    assert_eq!(engine.status().program, None);
}

#[test]
fn status_reflects_lifecycle() {
    let engine = test_engine(Duration::from_millis(10));
    let (program, _inits, _steps) = CountingProgram::new("counting");
    engine.register_program(Box::new(program));
    engine.select_program("counting");

    let status = engine.status();
    assert!(!status.running && !status.paused && !status.scheduled);

    engine.start();
    let status = engine.status();
    assert!(status.running && !status.paused);

    engine.pause();
    let status = engine.status();
    assert!(!status.running && status.paused);

    engine.stop();
    let status = engine.status();
    assert!(!status.running && !status.paused);
    assert_eq!(status.program.as_deref(), Some("counting"));
}
