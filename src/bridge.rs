//! The bridge between user-facing settings and the external XR driver.
//!
//! [`DriverBridge`] turns each setting change into a single line on the
//! control channel and derives the device-connection status from the state
//! channel.  It is generic over any [`DriverChannel`], so it can be driven
//! against real shared-memory files or an in-memory recorder.
//!
//! Every operation returns a [`BridgeError`] on failure and also logs it;
//! callers that only care about best-effort behaviour can ignore the result.

use crate::control::{parse_state, ControlKey, ControlLine, StateMap};
use crate::events::{DriverEvent, EventBus, EventKind, SubscriptionId};
use crate::traits::DriverChannel;
use log::{debug, error, info, warn};

/// Default virtual display distance in meters.
pub const DEFAULT_DISPLAY_DISTANCE: f64 = 1.05;

/// Default follow threshold in radians.
pub const DEFAULT_FOLLOW_THRESHOLD: f64 = 0.1;

/// Possible errors from the bridge.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The driver's CLI helper is not installed.
    #[error("XR driver CLI not found")]
    CliMissing,

    /// Reading or writing a driver channel failed.
    #[error("driver channel error: {0}")]
    Channel(String),
}

/// The settings the bridge mirrors to the driver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BridgeState {
    /// Virtual display distance in meters.
    pub display_distance: f64,
    pub widescreen_mode: bool,
    /// Smooth-follow mode.
    pub follow_mode: bool,
    /// Head-movement angle in radians before the display follows.
    pub follow_threshold: f64,
}

impl Default for BridgeState {
    fn default() -> Self {
        Self {
            display_distance: DEFAULT_DISPLAY_DISTANCE,
            widescreen_mode: false,
            follow_mode: true,
            follow_threshold: DEFAULT_FOLLOW_THRESHOLD,
        }
    }
}

/// Mediates all communication with the XR driver.
///
/// In-memory fields are updated **before** the control line is written, so
/// a failed write leaves the bridge holding the requested value even though
/// the driver never saw it.  Change notifications fire only after a
/// successful write.
pub struct DriverBridge<C: DriverChannel> {
    channel: C,
    state: BridgeState,
    device_connected: bool,
    events: EventBus,
}

impl<C: DriverChannel> DriverBridge<C> {
    /// Create a bridge with default settings.  Nothing is written until
    /// [`initialize`](Self::initialize) is called.
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            state: BridgeState::default(),
            device_connected: false,
            events: EventBus::new(),
        }
    }

    /// Replace the in-memory settings, typically with persisted preferences,
    /// without writing anything to the driver.
    pub fn seed(&mut self, state: BridgeState) {
        debug!("seeded bridge with {:?}", state);
        self.state = state;
    }

    /// Check that the XR stack is installed, read the connection status
    /// once, and push the initial distance and follow settings.
    ///
    /// A failed connection check is logged and leaves the device marked as
    /// disconnected; it does not fail initialization.
    pub fn initialize(&mut self) -> Result<(), BridgeError> {
        if !self.channel.cli_installed() {
            error!("XR driver CLI not found, is the driver installed?");
            return Err(BridgeError::CliMissing);
        }

        if let Err(e) = self.check_device_connection() {
            warn!("initial connection check failed: {}", e);
        }

        self.write(
            ControlLine::float(ControlKey::DisplayDistance, self.state.display_distance),
            "writing initial display distance",
        )?;
        self.write(
            ControlLine::flag(ControlKey::FollowMode, self.state.follow_mode),
            "writing initial follow mode",
        )?;
        self.write(
            ControlLine::float(ControlKey::FollowThreshold, self.state.follow_threshold),
            "writing initial follow threshold",
        )?;

        info!(
            "bridge initialized (distance {}, follow {}, threshold {}, connected {})",
            self.state.display_distance,
            self.state.follow_mode,
            self.state.follow_threshold,
            self.device_connected
        );
        Ok(())
    }

    /// Disable XR output on the driver.
    pub fn cleanup(&mut self) -> Result<(), BridgeError> {
        info!("disabling XR");
        self.write(
            ControlLine::flag(ControlKey::DisableXr, true),
            "during cleanup",
        )
    }

    /// Set the display distance in meters and notify
    /// [`EventKind::DisplayDistanceChanged`] subscribers.
    pub fn set_display_distance(&mut self, distance: f64) -> Result<(), BridgeError> {
        self.state.display_distance = distance;
        self.write(
            ControlLine::float(ControlKey::DisplayDistance, distance),
            "setting display distance",
        )?;
        self.events
            .notify(&DriverEvent::DisplayDistanceChanged(distance));
        Ok(())
    }

    /// Flip widescreen mode and notify
    /// [`EventKind::WidescreenModeChanged`] subscribers.
    pub fn toggle_widescreen_mode(&mut self) -> Result<(), BridgeError> {
        self.state.widescreen_mode = !self.state.widescreen_mode;
        let enabled = self.state.widescreen_mode;
        self.write(
            ControlLine::flag(ControlKey::WidescreenMode, enabled),
            "toggling widescreen mode",
        )?;
        self.events
            .notify(&DriverEvent::WidescreenModeChanged(enabled));
        Ok(())
    }

    /// Flip smooth-follow mode.
    pub fn toggle_follow_mode(&mut self) -> Result<(), BridgeError> {
        self.state.follow_mode = !self.state.follow_mode;
        self.write(
            ControlLine::flag(ControlKey::FollowMode, self.state.follow_mode),
            "toggling follow mode",
        )
    }

    /// Set the follow threshold in radians.
    pub fn set_follow_threshold(&mut self, threshold: f64) -> Result<(), BridgeError> {
        self.state.follow_threshold = threshold;
        self.write(
            ControlLine::float(ControlKey::FollowThreshold, threshold),
            "setting follow threshold",
        )
    }

    /// Ask the driver to recenter the display.
    pub fn recenter_display(&mut self) -> Result<(), BridgeError> {
        self.write(
            ControlLine::flag(ControlKey::Recenter, true),
            "recentering display",
        )
    }

    /// Re-read the connection status from the state channel.
    ///
    /// * No state file: the device is marked disconnected and **no**
    ///   notification is sent.
    /// * State file present: the status is parsed and
    ///   [`EventKind::DeviceConnected`] subscribers are notified once.
    /// * Read failure: the device is marked disconnected and the error is
    ///   returned without notifying.
    pub fn check_device_connection(&mut self) -> Result<bool, BridgeError> {
        match self.channel.read_state() {
            Ok(None) => {
                debug!("no driver state file, device not connected");
                self.device_connected = false;
                Ok(false)
            }
            Ok(Some(text)) => {
                let connected = parse_state(&text).device_connected();
                debug!("device connected: {}", connected);
                self.device_connected = connected;
                self.events.notify(&DriverEvent::DeviceConnected(connected));
                Ok(connected)
            }
            Err(e) => {
                error!("error checking device connection: {}", e);
                self.device_connected = false;
                Err(BridgeError::Channel(e.to_string()))
            }
        }
    }

    /// Parse the full state channel.  An absent state file yields an empty
    /// map.
    pub fn read_state(&self) -> Result<StateMap, BridgeError> {
        match self.channel.read_state() {
            Ok(Some(text)) => Ok(parse_state(&text)),
            Ok(None) => Ok(StateMap::default()),
            Err(e) => {
                error!("error reading driver state: {}", e);
                Err(BridgeError::Channel(e.to_string()))
            }
        }
    }

    /// Register a handler for bridge notifications.
    pub fn subscribe<F>(&mut self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: FnMut(&DriverEvent) + 'static,
    {
        self.events.subscribe(kind, handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    pub fn device_connected(&self) -> bool {
        self.device_connected
    }

    pub fn display_distance(&self) -> f64 {
        self.state.display_distance
    }

    pub fn widescreen_mode(&self) -> bool {
        self.state.widescreen_mode
    }

    pub fn follow_mode(&self) -> bool {
        self.state.follow_mode
    }

    pub fn follow_threshold(&self) -> f64 {
        self.state.follow_threshold
    }

    /// Snapshot of every mirrored setting.
    pub fn state(&self) -> BridgeState {
        self.state
    }

    /// The underlying channel.
    pub fn channel(&self) -> &C {
        &self.channel
    }

    //  Helpers

    fn write(&self, line: ControlLine, context: &str) -> Result<(), BridgeError> {
        self.channel.write_control(&line).map_err(|e| {
            error!("error {}: {}", context, e);
            BridgeError::Channel(e.to_string())
        })
    }
}
