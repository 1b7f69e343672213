//! Control logic for a coin-cell RGB light that breathes while it is light
//! outside and sleeps while it is dark.
//!
//! # Overview
//!
//! The fixture has no inputs except ambient light, which it measures with one
//! of its own LEDs running in reverse as a photodiode. The logic is split into
//! five parts, leaf-first:
//!
//! - [`random`] - XABC byte generator driving scene selection
//! - [`power`] - wake timer suspension and sleep depth selection
//! - [`sensor`] - charge/discharge light measurement on the shared LED pin
//! - [`animation`] - random two-channel scenes ramped through PWM
//! - [`controller`] - the day/night state machine tying it all together
//!
//! Hardware is reached only through the capability traits [`PowerScheduler`],
//! [`PwmBank`] and [`SensePin`], so everything here runs unchanged on the
//! target and under host tests.
//!
//! # Features
//!
//! - `defmt` - derive `defmt::Format` for public types and log phase changes

#![cfg_attr(not(test), no_std)]
#![allow(async_fn_in_trait)]

pub mod animation;
pub mod config;
pub mod controller;
pub mod power;
pub mod random;
pub mod sensor;

pub use animation::{AnimationEngine, Channel, ChannelTarget, CycleOutcome, PwmBank, Ramp};
pub use config::{DEFAULT_SEED, FULL_BRIGHTNESS, RAMP_STEPS, TimingProfile};
pub use controller::{MainController, Phase};
pub use power::{PowerScheduler, SleepDepth, SleepDuration, WakeSource};
pub use random::Xabc;
pub use sensor::{LightSensor, LightState, SensePin, SensingGuard};

pub use embassy_time::Duration;
