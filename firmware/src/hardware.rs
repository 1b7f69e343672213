//! Hardware abstraction and peripheral initialization.
//!
//! This module defines the pin mappings and peripheral initialization
//! for the RGB blinker hardware.
//!
//! # Pin Assignments
//!
//! ## RGB LED (common cathode)
//! - **PA0**: TIM2_CH1 - Anode of channel 1
//! - **PA1**: TIM2_CH2 - Anode of channel 2
//! - **PA2**: TIM2_CH3 - Anode of channel 3
//! - **PB1**: Common cathode, also the light sense input (EXTI line 1)
//!
//! ## Low Power & RTC
//! - **PC14**: OSC32_IN - 32.768 kHz crystal input
//! - **PC15**: OSC32_OUT - 32.768 kHz crystal output
//!
//! ## Debug (SWD)
//! - **PA13**: SWDIO
//! - **PA14**: SWCLK
//!
//! Every other pin keeps its analog reset state, the lowest-leakage option
//! on STM32L0.

use tiny_rgb_blinker::TimingProfile;

use crate::leds::{CathodePin, RgbPwm};
use crate::power::RtcWakeScheduler;

/// Top-level peripheral container for the blinker.
///
/// Owns all hardware drivers the controller is built from.
pub struct Peripherals {
    /// RTC wakeup suspension and sleep depth control
    pub scheduler: RtcWakeScheduler,
    /// TIM2 PWM on the three anodes
    pub pwm: RgbPwm,
    /// Shared cathode / light sense pin
    pub cathode: CathodePin,
}

impl Peripherals {
    /// Initializes all peripherals from STM32 peripheral singleton.
    ///
    /// # Initial GPIO States
    ///
    /// - PB1 (cathode): output, Low
    /// - PA0..PA2 (anodes): analog until the first scene powers TIM2 up
    ///
    /// # Arguments
    ///
    /// * `p` - STM32 peripheral singleton from embassy_stm32::init()
    /// * `core` - Cortex-M core peripherals, for the system control block
    /// * `profile` - Timing magnitudes used by the scheduler
    pub fn new(
        p: embassy_stm32::Peripherals,
        core: cortex_m::Peripherals,
        profile: TimingProfile,
    ) -> Self {
        Self {
            scheduler: RtcWakeScheduler::new(core.SCB, profile),
            pwm: RgbPwm::new(p.TIM2, p.PA0, p.PA1, p.PA2),
            cathode: CathodePin::new(p.PB1),
        }
    }
}
