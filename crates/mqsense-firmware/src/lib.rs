//! ESP32 firmware-specific modules for mqsense
//!
//! This crate contains the hardware-specific code that cannot compile on
//! desktop targets: peripheral initialization, the e-paper panel driver, the
//! embassy-backed timebase and RTC deep sleep.

#![no_std]

pub mod epd;
pub mod hardware;
pub mod panel;
pub mod power;
pub mod timebase;
