//! The presentation shell.
//!
//! [`ControlPanel`] is the toolkit-independent half: it pairs a
//! [`DriverBridge`] with a [`SettingsStore`] and applies each [`Command`] to
//! both, the bridge first.  Front-ends (the headless socket loop, the GTK
//! window) only ever talk to the panel.

use crate::bridge::{BridgeError, DriverBridge};
use crate::command::Command;
use crate::events::{DriverEvent, EventKind, SubscriptionId};
use crate::settings::{SettingsError, SettingsStore};
use crate::traits::DriverChannel;
use log::{debug, info};

#[cfg(feature = "panel-gtk")]
pub mod gtk;

/// Errors surfaced to the front-end.
#[derive(Debug, thiserror::Error)]
pub enum PanelError {
    #[error(transparent)]
    Bridge(#[from] BridgeError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Applies user commands to the driver and the persisted settings.
pub struct ControlPanel<C: DriverChannel> {
    bridge: DriverBridge<C>,
    settings: SettingsStore,
}

impl<C: DriverChannel> ControlPanel<C> {
    /// Create a panel whose bridge starts from the persisted settings.
    pub fn new(channel: C, settings: SettingsStore) -> Self {
        let mut bridge = DriverBridge::new(channel);
        bridge.seed(settings.bridge_state());
        Self { bridge, settings }
    }

    /// Initialize the bridge.  A missing driver aborts startup.
    pub fn initialize(&mut self) -> Result<(), PanelError> {
        Ok(self.bridge.initialize()?)
    }

    /// Process a single [`Command`].
    ///
    /// Setting changes are persisted even when the driver write fails.  If
    /// both the driver write and the save fail, the driver error is the one
    /// returned.
    pub fn handle(&mut self, cmd: Command) -> Result<(), PanelError> {
        debug!("command: {}", cmd);
        match cmd {
            Command::SetDisplayDistance(meters) => {
                let sent = self.bridge.set_display_distance(meters);
                let saved = self.settings.set_display_distance(meters);
                sent?;
                saved?;
            }

            Command::ToggleWidescreenMode => {
                let sent = self.bridge.toggle_widescreen_mode();
                let saved = self
                    .settings
                    .set_widescreen_mode(self.bridge.widescreen_mode());
                sent?;
                saved?;
            }

            Command::ToggleFollowMode => {
                let sent = self.bridge.toggle_follow_mode();
                let saved = self.settings.set_follow_mode(self.bridge.follow_mode());
                sent?;
                saved?;
            }

            Command::SetFollowThreshold(radians) => {
                let sent = self.bridge.set_follow_threshold(radians);
                let saved = self.settings.set_follow_threshold(radians);
                sent?;
                saved?;
            }

            Command::Recenter => self.bridge.recenter_display()?,

            Command::CheckConnection => {
                let connected = self.bridge.check_device_connection()?;
                info!("device {}", if connected { "connected" } else { "not connected" });
            }

            Command::Quit => self.shutdown()?,
        }
        Ok(())
    }

    /// Disable XR output on the driver.
    pub fn shutdown(&mut self) -> Result<(), PanelError> {
        info!("shutting down, disabling XR");
        Ok(self.bridge.cleanup()?)
    }

    /// Register a handler for bridge notifications.
    pub fn subscribe<F>(&mut self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: FnMut(&DriverEvent) + 'static,
    {
        self.bridge.subscribe(kind, handler)
    }

    pub fn bridge(&self) -> &DriverBridge<C> {
        &self.bridge
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    /// Rebind a keybinding action and persist it.
    pub fn set_keybinding(&mut self, action: &str, accelerator: &str) -> Result<(), PanelError> {
        Ok(self.settings.set_keybinding(action, accelerator)?)
    }
}
