//! Random two-colour breathing scenes.
//!
//! A cycle either pauses for one beat or lights a scene: one channel at full
//! brightness, a second at a random level, the third dark. The scene fades in
//! and back out through a 256-step accumulator ramp paced by the PWM timer.

use crate::config::{FULL_BRIGHTNESS, RAMP_STEPS};
use crate::power::{PowerScheduler, SleepDepth, SleepDuration};
use crate::random::Xabc;

/// One of the three PWM-driven LED anodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    One,
    Two,
    Three,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::One, Channel::Two, Channel::Three];

    pub const fn index(self) -> usize {
        match self {
            Channel::One => 0,
            Channel::Two => 1,
            Channel::Three => 2,
        }
    }

    /// The two other channels, lower-numbered first.
    const fn others(self) -> (Channel, Channel) {
        match self {
            Channel::One => (Channel::Two, Channel::Three),
            Channel::Two => (Channel::One, Channel::Three),
            Channel::Three => (Channel::One, Channel::Two),
        }
    }
}

/// Peak intensity of each channel for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelTarget {
    pub peaks: [u8; 3],
}

impl ChannelTarget {
    pub const fn new(p1: u8, p2: u8, p3: u8) -> Self {
        Self {
            peaks: [p1, p2, p3],
        }
    }

    /// Draws the next scene, or `None` for a pause.
    ///
    /// Consumes one byte for a pause and three for a lit scene:
    /// the primary channel (low two bits, `0` meaning pause), which of the
    /// remaining channels is secondary (low bit set picks the lower-numbered
    /// one) and the secondary's peak.
    pub fn random(rng: &mut Xabc) -> Option<Self> {
        let primary = match rng.below_four() {
            1 => Channel::One,
            2 => Channel::Two,
            3 => Channel::Three,
            _ => return None,
        };
        let (lower, higher) = primary.others();
        let secondary = if rng.bit() { lower } else { higher };

        let mut target = Self::default();
        target.peaks[primary.index()] = FULL_BRIGHTNESS;
        target.peaks[secondary.index()] = rng.next_byte();
        Some(target)
    }

    pub const fn peak(&self, channel: Channel) -> u8 {
        self.peaks[channel.index()]
    }

    pub const fn is_lit(&self, channel: Channel) -> bool {
        self.peak(channel) != 0
    }

    /// Which channels have a non-zero peak, indexed like [`Channel::index`].
    pub fn lit_mask(&self) -> [bool; 3] {
        self.peaks.map(|peak| peak != 0)
    }
}

/// Duty values for a full fade in and out, one `[u8; 3]` per step.
///
/// Each step adds the peak to a 16-bit accumulator and outputs its high byte,
/// so brighter channels climb faster. The second half subtracts the same
/// amounts and ends exactly at zero.
#[derive(Debug, Clone)]
pub struct Ramp {
    peaks: [u8; 3],
    accumulators: [u16; 3],
    step: u16,
}

impl Ramp {
    pub fn new(target: ChannelTarget) -> Self {
        Self {
            peaks: target.peaks,
            accumulators: [0; 3],
            step: 0,
        }
    }
}

impl Iterator for Ramp {
    type Item = [u8; 3];

    fn next(&mut self) -> Option<[u8; 3]> {
        if self.step >= 2 * RAMP_STEPS {
            return None;
        }
        let rising = self.step < RAMP_STEPS;
        self.step += 1;

        for (accumulator, &peak) in self.accumulators.iter_mut().zip(&self.peaks) {
            if rising {
                *accumulator += u16::from(peak);
            } else {
                *accumulator -= u16::from(peak);
            }
        }
        Some(self.accumulators.map(|accumulator| (accumulator >> 8) as u8))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::from(2 * RAMP_STEPS - self.step);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Ramp {}

/// The PWM timer and its three output channels.
pub trait PwmBank {
    /// Powers the timer up and connects the channels marked in `enabled`.
    ///
    /// Channels left out stay unconfigured for the whole cycle.
    fn power_up(&mut self, enabled: [bool; 3]);

    /// Sets an enabled channel's duty, `0..=255`.
    fn set_duty(&mut self, channel: Channel, duty: u8);

    /// Waits one ramp step.
    async fn wait_step(&mut self);

    /// Disconnects all channels and gates the timer clock.
    fn power_down(&mut self);
}

/// What one call to [`AnimationEngine::play_one_cycle`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CycleOutcome {
    Paused,
    Lit(ChannelTarget),
}

/// Plays scenes on a [`PwmBank`].
pub struct AnimationEngine<P> {
    pwm: P,
    rng: Xabc,
}

impl<P: PwmBank> AnimationEngine<P> {
    pub fn new(pwm: P, rng: Xabc) -> Self {
        Self { pwm, rng }
    }

    /// Plays one pause or one full fade in and out.
    ///
    /// The timer is only powered for the length of the ramp, and the core
    /// sleeps in [`SleepDepth::Idle`] between steps so the timer keeps
    /// running. Afterwards the depth is back at [`SleepDepth::PowerDown`].
    pub async fn play_one_cycle<S: PowerScheduler>(&mut self, scheduler: &mut S) -> CycleOutcome {
        let Some(target) = ChannelTarget::random(&mut self.rng) else {
            #[cfg(feature = "defmt")]
            defmt::debug!("cycle paused");

            scheduler.suspend_for(SleepDuration::Beat).await;
            return CycleOutcome::Paused;
        };

        let enabled = target.lit_mask();
        self.pwm.power_up(enabled);
        scheduler.set_sleep_depth(SleepDepth::Idle);

        for duties in Ramp::new(target) {
            for channel in Channel::ALL {
                if enabled[channel.index()] {
                    self.pwm.set_duty(channel, duties[channel.index()]);
                }
            }
            self.pwm.wait_step().await;
        }

        self.pwm.power_down();
        scheduler.set_sleep_depth(SleepDepth::PowerDown);

        #[cfg(feature = "defmt")]
        defmt::debug!("cycle lit {}", target.peaks);

        CycleOutcome::Lit(target)
    }

    pub fn pwm(&self) -> &P {
        &self.pwm
    }

    pub fn rng(&self) -> &Xabc {
        &self.rng
    }
}
