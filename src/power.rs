//! Low-power suspension.
//!
//! The fixture has no busy loops: every wait is the processor asleep until a
//! wake source fires. [`PowerScheduler`] is the capability the rest of the
//! crate uses for that; the firmware implements it on top of the RTC wakeup
//! timer, tests implement it on a simulated clock.

/// How deeply the core sleeps while suspended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SleepDepth {
    /// Everything but the wake timer stops. Used whenever no peripheral timer
    /// has to keep counting.
    #[default]
    PowerDown,
    /// Core clock stops, peripheral clocks keep running. Used during ramps so
    /// the PWM timer can pace steps with its overflow.
    Idle,
}

/// Which timeout a call site wants.
///
/// The magnitude of each is looked up in the active
/// [`TimingProfile`](crate::config::TimingProfile).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SleepDuration {
    /// Charging the sense pin.
    ChargeSettle,
    /// Letting the floating sense pin discharge.
    DischargeSample,
    /// One pause scene.
    Beat,
    /// Sleep between light checks while idle.
    IdleConfirm,
}

/// Events able to end a low-power wait.
///
/// None of them carry data; their handlers only acknowledge the hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WakeSource {
    /// Periodic wake timer expired.
    WakeTimer,
    /// Edge on the sense pin while it floats.
    SensePinEdge,
    /// PWM timer overflowed.
    PwmOverflow,
}

/// Suspension primitive backed by a periodic wake timer.
pub trait PowerScheduler {
    /// Sleeps at the current depth until `duration` has elapsed.
    ///
    /// There is no cancellation. Implementations reprogram the timer from
    /// scratch on every call and discard any expiry left over from an earlier
    /// wait, so dropping this future early (when racing another wake source)
    /// is harmless.
    async fn suspend_for(&mut self, duration: SleepDuration);

    /// Selects the depth used by subsequent waits.
    fn set_sleep_depth(&mut self, depth: SleepDepth);
}
