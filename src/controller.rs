//! Day/night state machine.
//!
//! ```text
//!            night seen mid-activation
//!   Active ───────────────────────────────┐
//!     │ budget spent, still day           ▼
//!     ▼                                ConfirmNight ──(day seen)──► Active
//!   ConfirmDay ──────(night seen)────────►
//! ```
//!
//! Every sleep phase re-checks its own condition after each idle sleep and
//! leaves on the first contrary reading. A borderline reading during `Active`
//! only shortens that activation.

use crate::animation::{AnimationEngine, PwmBank};
use crate::config::TimingProfile;
use crate::power::{PowerScheduler, SleepDepth, SleepDuration};
use crate::sensor::{LightSensor, SensePin};

/// Controller phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// Animating, up to the activation budget.
    #[default]
    Active,
    /// Idle while it stays light.
    ConfirmDay,
    /// Idle while it stays dark.
    ConfirmNight,
}

/// Owns every component and runs the fixture forever.
pub struct MainController<S, P, L> {
    scheduler: S,
    engine: AnimationEngine<P>,
    sensor: LightSensor<L>,
    max_cycles_per_activation: u16,
}

impl<S, P, L> MainController<S, P, L>
where
    S: PowerScheduler,
    P: PwmBank,
    L: SensePin,
{
    /// Assembles the controller; the scheduler starts at
    /// [`SleepDepth::PowerDown`].
    pub fn new(
        mut scheduler: S,
        engine: AnimationEngine<P>,
        sensor: LightSensor<L>,
        profile: &TimingProfile,
    ) -> Self {
        scheduler.set_sleep_depth(SleepDepth::PowerDown);
        Self {
            scheduler,
            engine,
            sensor,
            max_cycles_per_activation: profile.max_cycles_per_activation,
        }
    }

    /// Runs phases back to back, starting with [`Phase::Active`]. Never
    /// returns.
    pub async fn run(&mut self) {
        let mut phase = Phase::default();
        loop {
            phase = self.run_phase(phase).await;
        }
    }

    /// Runs `phase` until it decides to leave and returns the next phase.
    pub async fn run_phase(&mut self, phase: Phase) -> Phase {
        #[cfg(feature = "defmt")]
        defmt::info!("entering {}", phase);

        match phase {
            Phase::Active => self.animate().await,
            Phase::ConfirmDay => {
                self.idle_while(false).await;
                Phase::ConfirmNight
            }
            Phase::ConfirmNight => {
                self.idle_while(true).await;
                Phase::Active
            }
        }
    }

    async fn animate(&mut self) -> Phase {
        for _ in 0..self.max_cycles_per_activation {
            self.engine.play_one_cycle(&mut self.scheduler).await;
            if self.sensor.is_night(&mut self.scheduler).await {
                return Phase::ConfirmNight;
            }
        }
        Phase::ConfirmDay
    }

    /// Sleeps and re-reads until the night reading differs from `night`.
    async fn idle_while(&mut self, night: bool) {
        loop {
            self.scheduler.suspend_for(SleepDuration::IdleConfirm).await;
            if self.sensor.is_night(&mut self.scheduler).await != night {
                return;
            }
        }
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn engine(&self) -> &AnimationEngine<P> {
        &self.engine
    }

    pub fn sensor(&self) -> &LightSensor<L> {
        &self.sensor
    }
}
