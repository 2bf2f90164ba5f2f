//! **xr-desktop**: a desktop control panel for an external XR display
//! driver.
//!
//! The driver runs out of process and is controlled exclusively through two
//! text files in shared memory: a *control channel* the panel writes
//! `key=value` commands to, and a *state channel* the driver publishes its
//! status on.  User preferences are persisted to a JSON settings file.
//!
//! # Architecture
//!
//! The crate is organised around two core traits:
//!
//! * [`traits::DriverChannel`] abstracts the driver transport so the
//!   [`bridge::DriverBridge`] is not coupled to shared-memory files.
//! * [`traits::CommandSource`] abstracts the transport that delivers
//!   user intent (a Unix socket, a test harness, …).
//!
//! [`panel::ControlPanel`] ties the bridge to the [`settings::SettingsStore`];
//! the optional `panel-gtk` feature adds a GTK4 window on top of it.

pub mod bridge;
pub mod channel;
pub mod command;
pub mod control;
pub mod events;
pub mod ipc;
pub mod panel;
pub mod settings;
pub mod traits;
