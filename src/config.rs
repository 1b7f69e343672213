//! Timing and animation constants.
//!
//! Everything that depends on the clock source lives in [`TimingProfile`], so
//! retuning for a different oscillator never touches the control logic. Two
//! profiles are provided, matching the two hardware variants the fixture has
//! shipped in.

use embassy_time::Duration;

use crate::power::SleepDuration;

/// Number of steps in each half of a ramp.
///
/// Fixed by the accumulator arithmetic: 256 additions of an 8-bit peak land
/// exactly on `peak << 8`, whose high byte is the peak again.
pub const RAMP_STEPS: u16 = 256;

/// Peak of the primary channel in every lit scene.
pub const FULL_BRIGHTNESS: u8 = u8::MAX;

/// Generator seed, `CA FE BA BE`.
pub const DEFAULT_SEED: [u8; 4] = [0xCA, 0xFE, 0xBA, 0xBE];

/// Clock-dependent magnitudes for one hardware variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimingProfile {
    /// Animation cycles played per activation before confirming day again.
    pub max_cycles_per_activation: u16,
    /// Time the sense pin is driven high to charge its capacitance.
    pub charge_settle: Duration,
    /// Time the floating sense pin is left to discharge before sampling.
    pub discharge_sample: Duration,
    /// Length of the pause scene.
    pub beat: Duration,
    /// Sleep between light checks while idle.
    pub idle_confirm: Duration,
}

impl TimingProfile {
    /// 60 cycles per activation, one-second pause scene.
    pub const CLASSIC: Self = Self {
        max_cycles_per_activation: 60,
        charge_settle: Duration::from_millis(15),
        discharge_sample: Duration::from_millis(250),
        beat: Duration::from_secs(1),
        idle_confirm: Duration::from_secs(8),
    };

    /// 240 cycles per activation, half-second pause scene.
    pub const EXTENDED: Self = Self {
        max_cycles_per_activation: 240,
        charge_settle: Duration::from_millis(15),
        discharge_sample: Duration::from_millis(250),
        beat: Duration::from_millis(500),
        idle_confirm: Duration::from_secs(8),
    };

    /// Resolves a sleep kind to its magnitude.
    pub const fn duration_of(&self, duration: SleepDuration) -> Duration {
        match duration {
            SleepDuration::ChargeSettle => self.charge_settle,
            SleepDuration::DischargeSample => self.discharge_sample,
            SleepDuration::Beat => self.beat,
            SleepDuration::IdleConfirm => self.idle_confirm,
        }
    }

    /// Checks the ordering the sensor and controller rely on.
    ///
    /// Meant for `const` assertions in firmware so a bad profile fails the
    /// build rather than misbehaving on a battery.
    pub const fn is_valid(&self) -> bool {
        let charge = self.charge_settle.as_ticks();
        let discharge = self.discharge_sample.as_ticks();
        self.max_cycles_per_activation > 0
            && charge > 0
            && discharge > charge
            && self.beat.as_ticks() > 0
            && self.idle_confirm.as_ticks() >= discharge
    }

    /// Longest magnitude in the profile.
    pub const fn longest(&self) -> Duration {
        let mut longest = self.charge_settle;
        let candidates = [self.discharge_sample, self.beat, self.idle_confirm];
        let mut i = 0;
        while i < candidates.len() {
            if candidates[i].as_ticks() > longest.as_ticks() {
                longest = candidates[i];
            }
            i += 1;
        }
        longest
    }
}

impl Default for TimingProfile {
    fn default() -> Self {
        Self::CLASSIC
    }
}
