//! IPC listener that accepts commands over a Unix socket.
//!
//! External tools (key-bind helpers, scripts, the `xr-desktop-ctl` binary)
//! can connect to the socket and send newline-delimited JSON commands.

pub mod listener;
