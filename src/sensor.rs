//! Ambient light measurement through the LED common cathode.
//!
//! An LED in reverse bias behaves like a tiny photodiode in parallel with a
//! tiny capacitor. Charging the cathode pin and then letting it float, the
//! photocurrent drains the charge: quickly in daylight, barely at all in the
//! dark. Sampling the pin after a fixed interval gives a one-bit light meter.
//!
//! The pin is normally an output sinking the LED cathode. [`SensePin::acquire_sensor`]
//! hands out a [`SensingGuard`] that puts it back into that role when dropped,
//! so no exit path can leave the LEDs without their cathode.

use embassy_futures::select::select;

use crate::power::{PowerScheduler, SleepDuration};

/// Result of one light measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LightState {
    Day,
    Night,
}

impl LightState {
    pub fn is_night(self) -> bool {
        self == LightState::Night
    }
}

/// GPIO shared between the LED cathode and the light sensor.
pub trait SensePin {
    /// Output, driven low. The resting role: sinks the LED cathode.
    fn drive_low(&mut self);

    /// Output, driven high. Charges the pin capacitance.
    fn drive_high(&mut self);

    /// Input without pull resistors.
    fn float(&mut self);

    /// Current input level.
    fn is_high(&mut self) -> bool;

    /// Waits for the floating pin to fall.
    ///
    /// The edge wake source is armed only while this future exists and
    /// disarmed when it completes or is dropped.
    async fn wait_for_falling_edge(&mut self);

    /// Borrows the pin in its sensor role until the guard is dropped.
    fn acquire_sensor(&mut self) -> SensingGuard<'_, Self>
    where
        Self: Sized,
    {
        SensingGuard { pin: self }
    }
}

/// The sense pin temporarily out of its output role.
///
/// Dropping the guard drives the pin low as an output again.
pub struct SensingGuard<'a, P: SensePin> {
    pin: &'a mut P,
}

impl<P: SensePin> SensingGuard<'_, P> {
    pub fn charge(&mut self) {
        self.pin.drive_high();
    }

    pub fn float(&mut self) {
        self.pin.float();
    }

    pub async fn wait_for_falling_edge(&mut self) {
        self.pin.wait_for_falling_edge().await;
    }

    pub fn is_high(&mut self) -> bool {
        self.pin.is_high()
    }
}

impl<P: SensePin> Drop for SensingGuard<'_, P> {
    fn drop(&mut self) {
        self.pin.drive_low();
    }
}

/// One-bit light meter built on a [`SensePin`].
pub struct LightSensor<P> {
    pin: P,
}

impl<P: SensePin> LightSensor<P> {
    /// Takes ownership of the pin and puts it in its resting output role.
    pub fn new(mut pin: P) -> Self {
        pin.drive_low();
        Self { pin }
    }

    /// Measures ambient light.
    ///
    /// Charges the pin for [`SleepDuration::ChargeSettle`], floats it, then
    /// sleeps for [`SleepDuration::DischargeSample`] or until the pin falls,
    /// whichever comes first. Still high afterwards means it is dark.
    pub async fn read<S: PowerScheduler>(&mut self, scheduler: &mut S) -> LightState {
        let mut sensing = self.pin.acquire_sensor();

        sensing.charge();
        scheduler.suspend_for(SleepDuration::ChargeSettle).await;
        sensing.float();

        // The edge only ends the sleep early; the sample below decides.
        select(
            scheduler.suspend_for(SleepDuration::DischargeSample),
            sensing.wait_for_falling_edge(),
        )
        .await;

        let still_charged = sensing.is_high();
        drop(sensing);

        let state = if still_charged {
            LightState::Night
        } else {
            LightState::Day
        };

        #[cfg(feature = "defmt")]
        defmt::trace!("light sensor: {}", state);

        state
    }

    /// Shorthand for `read(..).is_night()`.
    pub async fn is_night<S: PowerScheduler>(&mut self, scheduler: &mut S) -> bool {
        self.read(scheduler).await.is_night()
    }

    /// Borrows the underlying pin.
    pub fn pin(&self) -> &P {
        &self.pin
    }

    /// Gives the pin back.
    pub fn into_inner(self) -> P {
        self.pin
    }
}
