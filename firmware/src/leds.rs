//! RGB LED drivers: PWM anodes and the shared cathode/sense pin.
//!
//! The LED is common cathode. Its three anodes sit on TIM2 channels 1-3 and
//! are only connected to the timer while a scene ramps. The cathode sits on
//! a plain GPIO that normally sinks current and, for a few hundred
//! milliseconds per light check, floats as the photodiode input.
//!
//! # Hardware Design
//!
//! - PA0 / PA1 / PA2: TIM2_CH1..CH3, anodes of channels 1..3
//! - PB1: common cathode, EXTI line 1 for the discharge edge

use embassy_stm32::Peri;
use embassy_stm32::gpio::{Flex, OutputType, Pull, Speed};
use embassy_stm32::pac::{self, interrupt};
use embassy_stm32::peripherals::{PA0, PA1, PA2, PB1, TIM2};
use embassy_stm32::time::Hertz;
use embassy_stm32::timer::Channel as TimerChannel;
use embassy_stm32::timer::low_level::CountingMode;
use embassy_stm32::timer::simple_pwm::{PwmPin, SimplePwm};
use tiny_rgb_blinker::{Channel, PwmBank, SensePin, WakeSource};

use crate::power::{discard_wake, sleep_until, wake};

/// TIM2 overflow rate; one overflow paces one ramp step.
///
/// 512 steps at 256 Hz make a two-second fade in and out.
pub const PWM_FREQUENCY: Hertz = Hertz::hz(256);

/// Busy-wait per ramp step with the `software-pacing` feature, in core
/// cycles (about 4 ms at 65 kHz MSI).
#[cfg(feature = "software-pacing")]
pub const SOFTWARE_STEP_CYCLES: u32 = 256;

/// EXTI line of the cathode pin (PB1).
const SENSE_EXTI_LINE: usize = 1;

/// IMR register index for EXTI lines 0-31
const IMR1_REG_IDX: usize = 0;

/// SYSCFG EXTICR port code for GPIOB.
const EXTI_PORT_B: u8 = 1;

/// Duty values arrive as 0..=255 and are scaled to the timer's range.
const DUTY_DENOMINATOR: u16 = u8::MAX as u16;

fn timer_channel(channel: Channel) -> TimerChannel {
    match channel {
        Channel::One => TimerChannel::Ch1,
        Channel::Two => TimerChannel::Ch2,
        Channel::Three => TimerChannel::Ch3,
    }
}

/// TIM2 and the three anode pins.
///
/// Holds the raw peripherals while idle and a live [`SimplePwm`] only
/// between [`PwmBank::power_up`] and [`PwmBank::power_down`]. Dropping the
/// driver gates the TIM2 clock and disconnects the pins.
pub struct RgbPwm {
    tim: Peri<'static, TIM2>,
    anode1: Peri<'static, PA0>,
    anode2: Peri<'static, PA1>,
    anode3: Peri<'static, PA2>,
    pwm: Option<SimplePwm<'static, TIM2>>,
}

impl RgbPwm {
    pub fn new(
        tim: Peri<'static, TIM2>,
        anode1: Peri<'static, PA0>,
        anode2: Peri<'static, PA1>,
        anode3: Peri<'static, PA2>,
    ) -> Self {
        Self {
            tim,
            anode1,
            anode2,
            anode3,
            pwm: None,
        }
    }
}

impl PwmBank for RgbPwm {
    fn power_up(&mut self, enabled: [bool; 3]) {
        // Stale driver would alias the peripherals below.
        self.pwm = None;

        // SAFETY: the clones only live inside `self.pwm`, which is the single
        // user of these peripherals and is dropped before they are cloned again.
        let pwm = unsafe {
            SimplePwm::new(
                self.tim.clone_unchecked(),
                enabled[0].then(|| PwmPin::new(self.anode1.clone_unchecked(), OutputType::PushPull)),
                enabled[1].then(|| PwmPin::new(self.anode2.clone_unchecked(), OutputType::PushPull)),
                enabled[2].then(|| PwmPin::new(self.anode3.clone_unchecked(), OutputType::PushPull)),
                None,
                PWM_FREQUENCY,
                CountingMode::EdgeAlignedUp,
            )
        };
        let pwm = self.pwm.insert(pwm);

        for channel in Channel::ALL {
            if enabled[channel.index()] {
                let mut output = pwm.channel(timer_channel(channel));
                output.set_duty_cycle_fully_off();
                output.enable();
            }
        }

        #[cfg(not(feature = "software-pacing"))]
        {
            pac::TIM2.sr().modify(|w| w.set_uif(false));
            discard_wake(WakeSource::PwmOverflow);
            pac::TIM2.dier().modify(|w| w.set_uie(true));
            unsafe {
                cortex_m::peripheral::NVIC::unmask(embassy_stm32::interrupt::TIM2);
            }
        }
    }

    fn set_duty(&mut self, channel: Channel, duty: u8) {
        if let Some(pwm) = self.pwm.as_mut() {
            pwm.channel(timer_channel(channel))
                .set_duty_cycle_fraction(u16::from(duty).into(), DUTY_DENOMINATOR.into());
        }
    }

    #[cfg(not(feature = "software-pacing"))]
    async fn wait_step(&mut self) {
        discard_wake(WakeSource::PwmOverflow);
        sleep_until(WakeSource::PwmOverflow).await;
    }

    #[cfg(feature = "software-pacing")]
    async fn wait_step(&mut self) {
        cortex_m::asm::delay(SOFTWARE_STEP_CYCLES);
    }

    fn power_down(&mut self) {
        if self.pwm.is_some() {
            cortex_m::peripheral::NVIC::mask(embassy_stm32::interrupt::TIM2);
            pac::TIM2.dier().modify(|w| w.set_uie(false));
        }
        self.pwm = None;
    }
}

/// TIM2 interrupt handler (update event).
///
/// Only active during a ramp. Clears the update flag and wakes the ramp.
#[interrupt]
fn TIM2() {
    pac::TIM2.sr().modify(|w| w.set_uif(false));
    wake(WakeSource::PwmOverflow);
}

/// The LED common cathode, doubling as the light sensor input.
pub struct CathodePin {
    pin: Flex<'static>,
}

impl CathodePin {
    /// Takes the pin as an output driven low and routes PB1 to EXTI line 1
    /// (falling edge, masked until a discharge wait arms it).
    pub fn new(pin: Peri<'static, PB1>) -> Self {
        let mut pin = Flex::new(pin);
        pin.set_low();
        pin.set_as_output(Speed::Low);

        pac::RCC.apb2enr().modify(|w| w.set_syscfgen(true));
        pac::SYSCFG
            .exticr(SENSE_EXTI_LINE / 4)
            .modify(|w| w.set_exti(SENSE_EXTI_LINE % 4, EXTI_PORT_B));
        pac::EXTI
            .ftsr(IMR1_REG_IDX)
            .modify(|w| w.set_line(SENSE_EXTI_LINE, true));

        unsafe {
            cortex_m::peripheral::NVIC::unmask(embassy_stm32::interrupt::EXTI0_1);
        }

        Self { pin }
    }
}

/// Keeps the cathode edge wake armed while alive.
struct EdgeWake;

impl EdgeWake {
    fn arm() -> Self {
        pac::EXTI
            .pr(IMR1_REG_IDX)
            .write(|w| w.set_line(SENSE_EXTI_LINE, true));
        discard_wake(WakeSource::SensePinEdge);
        pac::EXTI
            .imr(IMR1_REG_IDX)
            .modify(|w| w.set_line(SENSE_EXTI_LINE, true));
        Self
    }
}

impl Drop for EdgeWake {
    fn drop(&mut self) {
        pac::EXTI
            .imr(IMR1_REG_IDX)
            .modify(|w| w.set_line(SENSE_EXTI_LINE, false));
    }
}

impl SensePin for CathodePin {
    fn drive_low(&mut self) {
        self.pin.set_low();
        self.pin.set_as_output(Speed::Low);
    }

    fn drive_high(&mut self) {
        self.pin.set_high();
        self.pin.set_as_output(Speed::Low);
    }

    fn float(&mut self) {
        self.pin.set_as_input(Pull::None);
    }

    fn is_high(&mut self) -> bool {
        self.pin.is_high()
    }

    async fn wait_for_falling_edge(&mut self) {
        let _armed = EdgeWake::arm();
        sleep_until(WakeSource::SensePinEdge).await;
    }
}

/// EXTI lines 0-1 interrupt handler.
///
/// Masks the cathode line again and wakes the discharge wait. The light
/// decision is taken from the pin level afterwards, not from this event.
#[interrupt]
fn EXTI0_1() {
    let exti = pac::EXTI;
    exti.imr(IMR1_REG_IDX)
        .modify(|w| w.set_line(SENSE_EXTI_LINE, false));
    exti.pr(IMR1_REG_IDX)
        .write(|w| w.set_line(SENSE_EXTI_LINE, true));

    wake(WakeSource::SensePinEdge);
}
