//! Integration tests for the tempo scheduler
//!
//! Drives `TempoScheduler` on `ManualClock` with `StubOutput` and checks the
//! observable cadence: when ticks fire, with which sound, and that retunes
//! and re-voices never leave a second timer behind.

use std::sync::Arc;
use std::time::Duration;

use mindset_core::engine::StubOutput;
use mindset_core::synth::TickSoundType;
use mindset_core::tempo::{Bpm, ManualClock, TempoScheduler, TickEvent};
use tokio::sync::broadcast;

const TOLERANCE: f64 = 1e-6;

struct Rig {
    clock: Arc<ManualClock>,
    output: Arc<StubOutput>,
    scheduler: TempoScheduler,
    ticks: broadcast::Receiver<TickEvent>,
}

impl Rig {
    fn new() -> Self {
        let clock = Arc::new(ManualClock::new());
        let output = Arc::new(StubOutput::new());
        let scheduler = TempoScheduler::new(
            clock.clone(),
            output.clone(),
            Bpm::default(),
            TickSoundType::Classic,
        );
        let ticks = scheduler.subscribe_ticks();
        Self {
            clock,
            output,
            scheduler,
            ticks,
        }
    }

    fn advance_to(&self, seconds: f64) {
        self.clock.advance_to(Duration::from_secs_f64(seconds));
    }

    fn drain(&mut self) -> Vec<TickEvent> {
        std::iter::from_fn(|| self.ticks.try_recv().ok()).collect()
    }
}

fn bpm(value: u32) -> Bpm {
    Bpm::try_from(value).unwrap()
}

fn times(events: &[TickEvent]) -> Vec<f64> {
    events.iter().map(|event| event.at_seconds).collect()
}

fn assert_times(actual: &[f64], expected: &[f64]) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "tick count mismatch: {:?} vs {:?}",
        actual,
        expected
    );
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() < TOLERANCE, "{:?} vs {:?}", actual, expected);
    }
}

#[test]
fn start_at_60_then_retune_to_120() {
    let mut rig = Rig::new();
    rig.scheduler.start(bpm(60), TickSoundType::Classic).unwrap();

    rig.advance_to(3.5);
    assert_times(&times(&rig.drain()), &[0.0, 1.0, 2.0, 3.0]);

    rig.scheduler.set_bpm(bpm(120)).unwrap();
    // retune plays nothing by itself
    assert!(rig.drain().is_empty());

    rig.advance_to(5.5);
    let after = rig.drain();
    assert_times(&times(&after), &[4.0, 4.5, 5.0, 5.5]);
    assert!(after.iter().all(|tick| tick.bpm == bpm(120)));
}

#[test]
fn interval_law_holds_for_every_tested_tempo() {
    for value in [20u32, 60, 120, 180] {
        let mut rig = Rig::new();
        let tempo = bpm(value);
        rig.scheduler.start(tempo, TickSoundType::Digital).unwrap();
        rig.advance_to(12.0);

        let stamps = times(&rig.drain());
        let expected = 60.0 / value as f64;
        assert!(stamps.len() >= 5, "{} BPM produced {:?}", value, stamps);
        for pair in stamps.windows(2) {
            let gap = pair[1] - pair[0];
            assert!(
                (gap - expected).abs() < TOLERANCE,
                "{} BPM gap {} expected {}",
                value,
                gap,
                expected
            );
        }
    }
}

#[test]
fn repeated_start_never_double_fires() {
    let mut rig = Rig::new();
    for _ in 0..5 {
        rig.scheduler.start(bpm(120), TickSoundType::Soft).unwrap();
    }
    rig.drain();

    rig.advance_to(2.0);
    let stamps = times(&rig.drain());
    assert_times(&stamps, &[0.5, 1.0, 1.5, 2.0]);
    assert_eq!(rig.clock.pending_timers(), 1);
}

#[test]
fn interleaved_retunes_keep_one_timer() {
    let mut rig = Rig::new();
    rig.scheduler.start(bpm(60), TickSoundType::Classic).unwrap();
    for (at, tempo) in [(0.2, 180), (0.3, 20), (0.4, 140), (0.5, 100)] {
        rig.advance_to(at);
        rig.scheduler.set_bpm(bpm(tempo)).unwrap();
    }
    rig.drain();

    rig.advance_to(2.4);
    // 100 BPM armed at 0.5: ticks at 1.1, 1.7, 2.3
    assert_times(&times(&rig.drain()), &[1.1, 1.7, 2.3]);
    assert_eq!(rig.clock.pending_timers(), 1);
}

#[test]
fn revoice_while_running_restarts_with_new_sound() {
    let mut rig = Rig::new();
    rig.scheduler.start(bpm(60), TickSoundType::Classic).unwrap();
    rig.advance_to(1.25);
    rig.scheduler
        .set_sound_type(TickSoundType::Accent)
        .unwrap();
    rig.advance_to(3.25);

    let events = rig.drain();
    let sounds: Vec<TickSoundType> = events.iter().map(|event| event.sound).collect();
    assert_eq!(
        sounds,
        vec![
            TickSoundType::Classic,
            TickSoundType::Classic,
            TickSoundType::Accent,
            TickSoundType::Accent,
            TickSoundType::Accent,
        ]
    );
    assert_times(&times(&events), &[0.0, 1.0, 1.25, 2.25, 3.25]);
    assert_eq!(rig.output.played_sounds(), sounds);
}

#[test]
fn stopped_scheduler_changes_are_silent() {
    let mut rig = Rig::new();
    rig.scheduler.set_bpm(bpm(180)).unwrap();
    rig.scheduler.set_sound_type(TickSoundType::Wooden).unwrap();
    rig.advance_to(10.0);

    assert!(rig.drain().is_empty());
    assert_eq!(rig.output.attempt_count(), 0);
    assert!(!rig.scheduler.is_running());
}

#[test]
fn stop_then_start_resumes_with_fresh_phase() {
    let mut rig = Rig::new();
    rig.scheduler.start(bpm(60), TickSoundType::Classic).unwrap();
    rig.advance_to(1.5);
    rig.scheduler.stop().unwrap();
    rig.advance_to(4.2);
    rig.scheduler.start(bpm(60), TickSoundType::Classic).unwrap();
    rig.advance_to(5.2);

    assert_times(&times(&rig.drain()), &[0.0, 1.0, 4.2, 5.2]);
}

#[test]
fn sequence_numbers_are_monotonic_across_restarts() {
    let mut rig = Rig::new();
    rig.scheduler.start(bpm(120), TickSoundType::Classic).unwrap();
    rig.advance_to(1.0);
    rig.scheduler.set_sound_type(TickSoundType::Wooden).unwrap();
    rig.advance_to(2.0);

    let sequences: Vec<u64> = rig.drain().iter().map(|event| event.sequence).collect();
    let expected: Vec<u64> = (0..sequences.len() as u64).collect();
    assert_eq!(sequences, expected);
}
