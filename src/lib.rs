//! Keyboard Timing - sub-millisecond keyboard event capture
//!
//! Records key-down and key-up events with monotonic timestamps, modifier
//! state and repeat flags, buffers them in memory and writes the whole
//! session to one CSV file when capture stops.

pub mod capture;
pub mod config;
pub mod keyboard;
pub mod report;
pub mod session;
pub mod ui;

pub use config::Config;
