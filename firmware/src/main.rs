//! Firmware for a coin-cell RGB light that breathes by day and sleeps by night.
//!
//! # Overview
//!
//! This firmware drives a standalone RGB light fixture featuring:
//! - One common-cathode RGB LED on three PWM channels
//! - The same LED's cathode reused as an ambient light sensor
//! - Ultra-low power operation using STM32L031G6 in STOP mode
//! - No buttons, no radio: ambient light is the only input
//!
//! # Hardware
//!
//! - **MCU**: STM32L031G6U6 (Cortex-M0+, ultra-low-power)
//! - **Battery**: 1x CR2032 coin cell
//! - **LED**: common-cathode RGB, anodes on TIM2, cathode on a GPIO
//! - **RTC**: 32.768 kHz crystal for timekeeping in STOP mode
//!
//! # Behaviour
//!
//! While it is light the fixture plays random two-colour fades, checking the
//! light after each one, for a bounded number of cycles. It then sleeps in
//! STOP mode, waking every few seconds to re-check, until it has seen night
//! and then day again.
//!
//! # Low Power Operation
//!
//! - MSI oscillator at 65 kHz for minimal active current
//! - Every wait parks the only task; the executor's `WFE` enters STOP
//!   (idle checks, light sensing) or Sleep (PWM ramps)
//! - RTC wakeup timer, cathode edge and TIM2 overflow are the wake sources
//!
//! # Module Organization
//!
//! - [`power`] - RTC wakeup scheduler and wake signals
//! - [`leds`] - TIM2 PWM bank and the shared cathode / sense pin
//! - [`hardware`] - Pin mappings and peripheral initialization
//!
//! # Features
//!
//! - `debug-mode` - faster clock, defmt logging, boot delay for the debugger
//! - `extended-profile` - 240 cycles per activation, half-second pauses
//! - `software-pacing` - busy-wait ramp steps instead of TIM2 overflow

#![no_std]
#![no_main]

mod hardware;
mod leds;
mod power;

use embassy_executor::Spawner;
use embassy_stm32::{
    Config,
    rcc::{LsConfig, LseConfig, mux::ClockMux},
    time::Hertz,
};
use tiny_rgb_blinker::{AnimationEngine, LightSensor, MainController, TimingProfile, Xabc};
use {defmt_rtt as _, panic_probe as _};

use hardware::Peripherals;
use power::{fits_wakeup_timer, setup_wakeup_timer};

/// Timing magnitudes for this build.
#[cfg(not(feature = "extended-profile"))]
const PROFILE: TimingProfile = TimingProfile::CLASSIC;
#[cfg(feature = "extended-profile")]
const PROFILE: TimingProfile = TimingProfile::EXTENDED;

const _: () = assert!(PROFILE.is_valid(), "inconsistent timing profile");
const _: () = assert!(
    fits_wakeup_timer(PROFILE.longest()),
    "timing profile exceeds the RTC wakeup range"
);

/// Core cycles the debug build idles before the first STOP entry.
#[cfg(feature = "debug-mode")]
const DEBUGGER_GRACE_CYCLES: u32 = 3 * 2_097_000;

/// Creates a low-power clock configuration for STM32L031.
///
/// # Clock Settings
///
/// - **MSI**: 65 kHz in normal mode, 2.097 MHz in debug mode (for reliable debugging)
/// - **System clock**: MSI (no PLL)
/// - **LSE**: 32.768 kHz external crystal for RTC
/// - **Voltage scale**: Range 1 (1.8V core for low power)
///
/// MSI is also the clock the core wakes from STOP on, so no clock
/// reconfiguration is needed after a wakeup. TIM2 runs from it as well,
/// and `PWM_FREQUENCY` is derived from it at runtime by the PWM driver.
///
/// # Returns
///
/// Configured RCC settings for embassy-stm32 initialization
fn create_low_power_config() -> embassy_stm32::rcc::Config {
    embassy_stm32::rcc::Config {
        #[cfg(feature = "debug-mode")]
        msi: Some(embassy_stm32::rcc::MSIRange::RANGE2M),
        #[cfg(not(feature = "debug-mode"))]
        msi: Some(embassy_stm32::rcc::MSIRange::RANGE66K),
        hsi: false,
        hse: None,
        pll: None,
        sys: embassy_stm32::rcc::Sysclk::MSI,
        ahb_pre: embassy_stm32::rcc::AHBPrescaler::DIV1,
        apb1_pre: embassy_stm32::rcc::APBPrescaler::DIV1,
        apb2_pre: embassy_stm32::rcc::APBPrescaler::DIV1,
        ls: LsConfig {
            rtc: embassy_stm32::rcc::RtcClockSource::LSE,
            lsi: false,
            lse: Some(LseConfig {
                frequency: Hertz::hz(32768),
                mode: embassy_stm32::rcc::LseMode::Oscillator(embassy_stm32::rcc::LseDrive::Low),
            }),
        },
        voltage_scale: embassy_stm32::rcc::VoltageScale::RANGE1,
        mux: ClockMux::default(),
    }
}

/// Main entry point for the RGB blinker firmware.
///
/// # Initialization Sequence
///
/// 1. Configure clocks for low power operation (65 kHz MSI, LSE for the RTC)
/// 2. Initialize STM32 peripherals
/// 3. Prepare STOP mode and the RTC wakeup interrupt
/// 4. Initialize the PWM bank, cathode pin and scheduler
/// 5. Hand everything to the controller, which never returns
#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    let mut config = Config::default();
    config.rcc = create_low_power_config();

    let p = embassy_stm32::init(config);
    let core = cortex_m::Peripherals::take().unwrap();

    #[cfg(feature = "debug-mode")]
    defmt::info!("RGB blinker firmware starting...");

    // Give the debugger a window before the first STOP entry.
    // Negligible battery impact.
    #[cfg(feature = "debug-mode")]
    {
        defmt::info!("Waiting 3 seconds for debugger connection...");
        cortex_m::asm::delay(DEBUGGER_GRACE_CYCLES);
    }

    #[cfg(feature = "debug-mode")]
    defmt::info!("Setting up RTC wakeup...");

    setup_wakeup_timer();

    #[cfg(feature = "debug-mode")]
    defmt::info!("Initializing peripherals...");

    let peripherals = Peripherals::new(p, core, PROFILE);

    let mut controller = MainController::new(
        peripherals.scheduler,
        AnimationEngine::new(peripherals.pwm, Xabc::default()),
        LightSensor::new(peripherals.cathode),
        &PROFILE,
    );

    #[cfg(feature = "debug-mode")]
    defmt::info!("Entering control loop with {}", PROFILE);

    controller.run().await
}
