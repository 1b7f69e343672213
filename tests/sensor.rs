mod common;

use common::{PinMode, SimPin, SimScheduler, clock};
use embassy_futures::block_on;
use tiny_rgb_blinker::{LightSensor, LightState, PowerScheduler, SleepDepth, SleepDuration, TimingProfile};

fn read(discharge_ms: Option<u64>) -> (LightState, LightSensor<SimPin>, SimScheduler) {
    let clock = clock();
    let mut scheduler = SimScheduler::new(clock.clone(), TimingProfile::CLASSIC);
    let mut sensor = LightSensor::new(SimPin::new(clock, discharge_ms));
    let state = block_on(sensor.read(&mut scheduler));
    (state, sensor, scheduler)
}

#[test]
fn fast_discharge_is_day() {
    let (state, sensor, _) = read(Some(20));
    assert_eq!(state, LightState::Day);
    assert_eq!(sensor.pin().mode, PinMode::OutputLow);
}

#[test]
fn no_discharge_is_night() {
    let (state, sensor, _) = read(None);
    assert_eq!(state, LightState::Night);
    assert_eq!(sensor.pin().mode, PinMode::OutputLow);
}

#[test]
fn discharge_slower_than_sample_is_night() {
    let (state, _, _) = read(Some(400));
    assert!(state.is_night());
}

#[test]
fn pin_walks_through_charge_float_restore() {
    let (_, sensor, _) = read(Some(20));
    assert_eq!(
        sensor.pin().modes,
        [
            PinMode::OutputLow,
            PinMode::OutputHigh,
            PinMode::Floating,
            PinMode::OutputLow,
        ]
    );
}

#[test]
fn waits_charge_then_discharge() {
    let (_, _, scheduler) = read(None);
    assert_eq!(
        scheduler.sleeps,
        [
            (SleepDuration::ChargeSettle, SleepDepth::PowerDown),
            (SleepDuration::DischargeSample, SleepDepth::PowerDown),
        ]
    );
}

/// Never finishes a discharge wait, so only the pin edge can end it.
struct StalledScheduler(SimScheduler);

impl PowerScheduler for StalledScheduler {
    async fn suspend_for(&mut self, duration: SleepDuration) {
        if duration == SleepDuration::DischargeSample {
            core::future::pending::<()>().await;
        }
        self.0.suspend_for(duration).await;
    }

    fn set_sleep_depth(&mut self, depth: SleepDepth) {
        self.0.set_sleep_depth(depth);
    }
}

#[test]
fn falling_edge_ends_discharge_wait() {
    let clock = clock();
    let mut scheduler = StalledScheduler(SimScheduler::new(clock.clone(), TimingProfile::CLASSIC));
    let mut sensor = LightSensor::new(SimPin::new(clock.clone(), Some(30)));

    let state = block_on(sensor.read(&mut scheduler));

    assert_eq!(state, LightState::Day);
    assert_eq!(clock.get(), 15 + 30);
    assert_eq!(sensor.pin().edge_arms.get(), 1);
    assert!(!sensor.pin().edge_armed.get());
    assert_eq!(sensor.pin().mode, PinMode::OutputLow);
}

#[test]
fn edge_is_disarmed_when_timer_wins() {
    let (_, sensor, _) = read(None);
    assert!(!sensor.pin().edge_armed.get());
}

#[test]
fn readings_are_not_cached() {
    let clock = clock();
    let mut scheduler = SimScheduler::new(clock.clone(), TimingProfile::CLASSIC);
    let mut sensor = LightSensor::new(SimPin::new(clock, None));

    assert!(block_on(sensor.is_night(&mut scheduler)));
    assert!(block_on(sensor.is_night(&mut scheduler)));
    assert_eq!(scheduler.count(SleepDuration::DischargeSample), 2);
}
