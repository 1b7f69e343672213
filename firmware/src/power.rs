//! Low-power suspension on the RTC wakeup timer.
//!
//! The RTC runs from the 32.768 kHz LSE and keeps counting in STOP mode, so
//! its wakeup timer is the fixture's only clock while asleep. Every wait in
//! the firmware goes through [`sleep_until`]: the task parks on a
//! payload-free signal and the executor idles with `WFE`, which drops into
//! STOP or Sleep depending on `SLEEPDEEP`.
//!
//! # Wake sources
//!
//! Each [`WakeSource`] has an interrupt handler that acknowledges the
//! hardware, disarms itself and raises that source's signal. Handlers make no
//! decisions; the task does all of that after it resumes.
//!
//! - RTC wakeup: EXTI line 20, `RTC` interrupt (this module)
//! - Sense pin edge: EXTI line 1, `EXTI0_1` interrupt ([`crate::leds`])
//! - PWM overflow: TIM2 update, `TIM2` interrupt ([`crate::leds`])

use embassy_stm32::pac;
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, signal::Signal};
use embassy_time::Duration;
use pac::interrupt;
use tiny_rgb_blinker::{PowerScheduler, SleepDepth, SleepDuration, TimingProfile, WakeSource};

/// EXTI line number for the RTC wakeup event (fixed at line 20 on STM32L0)
const RTC_WAKEUP_EXTI_LINE: usize = 20;

/// IMR register index for EXTI lines 0-31
const IMR1_REG_IDX: usize = 0;

/// Wakeup timer clock: LSE / 16.
const WAKEUP_CLOCK_HZ: u64 = 32_768 / 16;

/// RTC write protection key pair.
const RTC_UNLOCK_KEYS: [u8; 2] = [0xCA, 0x53];

/// Any other value re-locks the RTC registers.
const RTC_LOCK_KEY: u8 = 0xFF;

static WAKE_SIGNALS: [Signal<CriticalSectionRawMutex, ()>; 3] = [const { Signal::new() }; 3];

fn signal_for(source: WakeSource) -> &'static Signal<CriticalSectionRawMutex, ()> {
    match source {
        WakeSource::WakeTimer => &WAKE_SIGNALS[0],
        WakeSource::SensePinEdge => &WAKE_SIGNALS[1],
        WakeSource::PwmOverflow => &WAKE_SIGNALS[2],
    }
}

/// Raises `source`. Called from interrupt handlers only.
pub fn wake(source: WakeSource) {
    signal_for(source).signal(());
}

/// Forgets a wake of `source` that nobody waited for.
pub fn discard_wake(source: WakeSource) {
    signal_for(source).reset();
}

/// Parks the task until `source` is raised.
pub async fn sleep_until(source: WakeSource) {
    signal_for(source).wait().await;
}

/// Converts a timeout into the `WUTR` reload value.
///
/// The timer fires after `WUT + 1` ticks, so the shortest timeout is one
/// tick (about half a millisecond).
pub const fn wakeup_ticks(duration: Duration) -> u16 {
    let ticks = duration.as_micros() * WAKEUP_CLOCK_HZ / 1_000_000;
    if ticks == 0 {
        0
    } else if ticks > u16::MAX as u64 + 1 {
        u16::MAX
    } else {
        (ticks - 1) as u16
    }
}

/// Whether `duration` fits the 16-bit wakeup counter at [`WAKEUP_CLOCK_HZ`].
pub const fn fits_wakeup_timer(duration: Duration) -> bool {
    duration.as_micros() * WAKEUP_CLOCK_HZ / 1_000_000 <= u16::MAX as u64 + 1
}

/// Suspension primitive on the RTC wakeup timer.
///
/// Owns the core's system control block to switch between STOP
/// ([`SleepDepth::PowerDown`]) and Sleep ([`SleepDepth::Idle`]).
pub struct RtcWakeScheduler {
    /// Source of `SLEEPDEEP`
    scb: cortex_m::peripheral::SCB,
    /// Magnitudes for each [`SleepDuration`]
    profile: TimingProfile,
}

impl RtcWakeScheduler {
    /// Creates the scheduler. [`setup_wakeup_timer`] must have run first.
    pub fn new(scb: cortex_m::peripheral::SCB, profile: TimingProfile) -> Self {
        Self { scb, profile }
    }
}

impl PowerScheduler for RtcWakeScheduler {
    async fn suspend_for(&mut self, duration: SleepDuration) {
        let ticks = wakeup_ticks(self.profile.duration_of(duration));
        cortex_m::interrupt::free(|_| arm_wakeup(ticks));
        sleep_until(WakeSource::WakeTimer).await;
    }

    fn set_sleep_depth(&mut self, depth: SleepDepth) {
        match depth {
            SleepDepth::PowerDown => self.scb.set_sleepdeep(),
            SleepDepth::Idle => self.scb.clear_sleepdeep(),
        }
    }
}

fn unlock_rtc() {
    for key in RTC_UNLOCK_KEYS {
        pac::RTC.wpr().write(|w| w.set_key(key));
    }
}

fn lock_rtc() {
    pac::RTC.wpr().write(|w| w.set_key(RTC_LOCK_KEY));
}

/// Reprograms the wakeup timer for one expiry `ticks + 1` ticks from now.
///
/// Any expiry left over from an earlier, abandoned wait is discarded only
/// after the new reload value is in place, so it cannot end this wait.
fn arm_wakeup(ticks: u16) {
    let rtc = pac::RTC;

    unlock_rtc();
    rtc.cr().modify(|w| {
        w.set_wutie(false);
        w.set_wute(false);
    });
    // Takes up to two RTCCLK cycles after WUTE is cleared.
    while !rtc.isr().read().wutwf() {}

    rtc.wutr().write(|w| w.set_wut(ticks));
    rtc.cr()
        .modify(|w| w.set_wucksel(pac::rtc::vals::Wucksel::DIV16));

    rtc.isr().modify(|w| w.set_wutf(false));
    pac::EXTI
        .pr(IMR1_REG_IDX)
        .write(|w| w.set_line(RTC_WAKEUP_EXTI_LINE, true));
    discard_wake(WakeSource::WakeTimer);

    rtc.cr().modify(|w| {
        w.set_wutie(true);
        w.set_wute(true);
    });
    lock_rtc();
}

/// RTC interrupt handler (wakeup timer via EXTI line 20).
///
/// Stops the wakeup timer so it fires exactly once per
/// [`PowerScheduler::suspend_for`], clears its flags and wakes the task.
#[interrupt]
fn RTC() {
    let rtc = pac::RTC;

    unlock_rtc();
    rtc.cr().modify(|w| {
        w.set_wutie(false);
        w.set_wute(false);
    });
    rtc.isr().modify(|w| w.set_wutf(false));
    lock_rtc();

    pac::EXTI
        .pr(IMR1_REG_IDX)
        .write(|w| w.set_line(RTC_WAKEUP_EXTI_LINE, true));

    wake(WakeSource::WakeTimer);
}

/// Prepares STOP mode and routes the RTC wakeup timer to the NVIC.
///
/// # Configuration
///
/// - PWR: backup domain writable, regulator in low-power mode during STOP,
///   internal reference off during STOP. `PDDS` stays at its reset value so
///   deep sleep means STOP, never STANDBY.
/// - EXTI line 20: rising edge, unmasked
/// - NVIC: RTC interrupt unmasked
///
/// # Safety
///
/// Directly accesses PAC registers and unmasks NVIC interrupt.
pub fn setup_wakeup_timer() {
    let pwr = pac::PWR;
    let exti = pac::EXTI;

    // Enable the PWR clock
    pac::RCC.apb1enr().modify(|w| w.set_pwren(true));

    pwr.cr().modify(|w| {
        w.set_dbp(true);
        w.set_lpsdsr(true);
        w.set_ulp(true);
    });

    exti.imr(IMR1_REG_IDX)
        .modify(|w| w.set_line(RTC_WAKEUP_EXTI_LINE, true));
    exti.rtsr(IMR1_REG_IDX)
        .modify(|w| w.set_line(RTC_WAKEUP_EXTI_LINE, true));

    unsafe {
        cortex_m::peripheral::NVIC::unmask(embassy_stm32::interrupt::RTC);
    };
}
