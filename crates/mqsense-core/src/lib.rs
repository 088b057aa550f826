//! Hardware-independent core library for mqsense
//!
//! This crate contains the platform-agnostic logic of the mqsense air-quality
//! node: the per-sensor sampler, the wake-cycle orchestrator, the duty-cycle
//! controller, Sensirion and fuel-gauge drivers written against
//! `embedded-hal-async`, and the e-paper summary renderer.
//!
//! It is `#![no_std]` and needs no allocator, so it compiles on the ESP32
//! firmware target and on desktop hosts (for tests).

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod cycle;
pub mod display;
pub mod duty_cycle;
pub mod gauge;
pub mod metrics;
pub mod orchestrator;
pub mod reading;
pub mod sampler;
pub mod sensors;
pub mod snapshot;
pub mod time;

#[cfg(test)]
mod mock;
