//! Host doubles for the hardware capabilities, sharing a simulated clock.
#![allow(dead_code)]

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

use tiny_rgb_blinker::{Channel, PowerScheduler, PwmBank, SensePin, SleepDepth, SleepDuration, TimingProfile};

/// Milliseconds since simulated power-on.
pub type Clock = Rc<Cell<u64>>;

pub fn clock() -> Clock {
    Rc::new(Cell::new(0))
}

/// Scheduler that advances the shared clock instead of sleeping.
pub struct SimScheduler {
    clock: Clock,
    profile: TimingProfile,
    pub depth: SleepDepth,
    pub sleeps: Vec<(SleepDuration, SleepDepth)>,
    pub depth_changes: Vec<SleepDepth>,
}

impl SimScheduler {
    pub fn new(clock: Clock, profile: TimingProfile) -> Self {
        Self {
            clock,
            profile,
            depth: SleepDepth::PowerDown,
            sleeps: Vec::new(),
            depth_changes: Vec::new(),
        }
    }

    pub fn count(&self, duration: SleepDuration) -> usize {
        self.sleeps.iter().filter(|(d, _)| *d == duration).count()
    }
}

impl PowerScheduler for SimScheduler {
    async fn suspend_for(&mut self, duration: SleepDuration) {
        let millis = self.profile.duration_of(duration).as_millis();
        self.clock.set(self.clock.get() + millis);
        self.sleeps.push((duration, self.depth));
    }

    fn set_sleep_depth(&mut self, depth: SleepDepth) {
        self.depth = depth;
        self.depth_changes.push(depth);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    OutputLow,
    OutputHigh,
    Floating,
}

/// Clears the flag it was created from when dropped.
struct Armed<'a>(&'a Cell<bool>);

impl<'a> Armed<'a> {
    fn arm(flag: &'a Cell<bool>, arms: &Cell<u32>) -> Self {
        flag.set(true);
        arms.set(arms.get() + 1);
        Self(flag)
    }
}

impl Drop for Armed<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// LED cathode pin with a simple discharge model.
///
/// Once floated after a charge, the pin reads high until `discharge_ms` of
/// simulated time have passed. `None` never discharges (pitch dark).
pub struct SimPin {
    clock: Clock,
    discharge_ms: Option<u64>,
    charged: bool,
    floated_at: u64,
    pub mode: PinMode,
    pub modes: Vec<PinMode>,
    pub edge_armed: Cell<bool>,
    pub edge_arms: Cell<u32>,
}

impl SimPin {
    pub fn new(clock: Clock, discharge_ms: Option<u64>) -> Self {
        Self {
            clock,
            discharge_ms,
            charged: false,
            floated_at: 0,
            mode: PinMode::Floating,
            modes: Vec::new(),
            edge_armed: Cell::new(false),
            edge_arms: Cell::new(0),
        }
    }

    fn set_mode(&mut self, mode: PinMode) {
        self.mode = mode;
        self.modes.push(mode);
    }
}

impl SensePin for SimPin {
    fn drive_low(&mut self) {
        self.charged = false;
        self.set_mode(PinMode::OutputLow);
    }

    fn drive_high(&mut self) {
        self.charged = true;
        self.set_mode(PinMode::OutputHigh);
    }

    fn float(&mut self) {
        self.floated_at = self.clock.get();
        self.set_mode(PinMode::Floating);
    }

    fn is_high(&mut self) -> bool {
        match self.mode {
            PinMode::OutputLow => false,
            PinMode::OutputHigh => true,
            PinMode::Floating => {
                let elapsed = self.clock.get() - self.floated_at;
                self.charged && self.discharge_ms.is_none_or(|t| elapsed < t)
            }
        }
    }

    async fn wait_for_falling_edge(&mut self) {
        let _armed = Armed::arm(&self.edge_armed, &self.edge_arms);
        match self.discharge_ms {
            Some(t) if self.charged => {
                let fall = self.floated_at + t;
                if self.clock.get() < fall {
                    self.clock.set(fall);
                }
            }
            _ => core::future::pending::<()>().await,
        }
    }
}

/// Pin whose floating reads follow a script of night/day answers.
pub struct ScriptedPin {
    nights: VecDeque<bool>,
    floating: bool,
    pub reads: usize,
    pub left_floating: bool,
}

impl ScriptedPin {
    pub fn new(nights: impl IntoIterator<Item = bool>) -> Self {
        Self {
            nights: nights.into_iter().collect(),
            floating: false,
            reads: 0,
            left_floating: false,
        }
    }

    pub fn remaining(&self) -> usize {
        self.nights.len()
    }
}

impl SensePin for ScriptedPin {
    fn drive_low(&mut self) {
        self.floating = false;
    }

    fn drive_high(&mut self) {
        self.floating = false;
    }

    fn float(&mut self) {
        self.floating = true;
    }

    fn is_high(&mut self) -> bool {
        assert!(self.floating, "sampled while not floating");
        self.reads += 1;
        self.nights.pop_front().expect("light script exhausted")
    }

    async fn wait_for_falling_edge(&mut self) {
        core::future::pending::<()>().await;
    }
}

/// PWM bank recording everything it is asked to do.
#[derive(Default)]
pub struct SimPwm {
    pub powered: bool,
    pub enabled: [bool; 3],
    pub power_ups: Vec<[bool; 3]>,
    pub power_downs: usize,
    pub duties: [Vec<u8>; 3],
    pub steps: usize,
}

impl SimPwm {
    pub fn duties(&self, channel: Channel) -> &[u8] {
        &self.duties[channel.index()]
    }
}

impl PwmBank for SimPwm {
    fn power_up(&mut self, enabled: [bool; 3]) {
        assert!(!self.powered, "powered up twice");
        self.powered = true;
        self.enabled = enabled;
        self.power_ups.push(enabled);
    }

    fn set_duty(&mut self, channel: Channel, duty: u8) {
        assert!(self.powered, "duty set while powered down");
        assert!(self.enabled[channel.index()], "duty set on disabled channel");
        self.duties[channel.index()].push(duty);
    }

    async fn wait_step(&mut self) {
        assert!(self.powered, "stepped while powered down");
        self.steps += 1;
    }

    fn power_down(&mut self) {
        self.powered = false;
        self.enabled = [false; 3];
        self.power_downs += 1;
    }
}
