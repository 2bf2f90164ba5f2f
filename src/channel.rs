//! [`DriverChannel`] implementation backed by files in shared memory.
//!
//! The driver polls `/dev/shm/xr_driver_control` for commands and publishes
//! its status to `/dev/shm/xr_driver_state`.  Neither side locks the files;
//! a command written while the driver is mid-read may be missed, and the
//! next write simply replaces it.

use crate::control::ControlLine;
use crate::traits::DriverChannel;
use log::debug;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Default control channel path.
pub const CONTROL_PATH: &str = "/dev/shm/xr_driver_control";

/// Default state channel path.
pub const STATE_PATH: &str = "/dev/shm/xr_driver_state";

/// CLI helper location relative to `$HOME`.
pub const CLI_RELATIVE_PATH: &str = ".local/bin/xr_driver_cli";

/// Filesystem locations used to talk to the driver.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverPaths {
    pub control: PathBuf,
    pub state: PathBuf,
    pub cli: PathBuf,
}

impl Default for DriverPaths {
    fn default() -> Self {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        Self {
            control: PathBuf::from(CONTROL_PATH),
            state: PathBuf::from(STATE_PATH),
            cli: Path::new(&home).join(CLI_RELATIVE_PATH),
        }
    }
}

/// Errors from reading or writing a channel file.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// File-backed driver channel.
pub struct FileChannel {
    paths: DriverPaths,
}

impl FileChannel {
    pub fn new(paths: DriverPaths) -> Self {
        Self { paths }
    }

    /// The paths this channel reads and writes.
    pub fn paths(&self) -> &DriverPaths {
        &self.paths
    }
}

impl Default for FileChannel {
    fn default() -> Self {
        Self::new(DriverPaths::default())
    }
}

impl DriverChannel for FileChannel {
    type Error = ChannelError;

    fn cli_installed(&self) -> bool {
        self.paths.cli.exists()
    }

    fn write_control(&self, line: &ControlLine) -> Result<(), ChannelError> {
        debug!("control <- {}", line);
        // `fs::write` truncates; the file only ever holds the latest command.
        std::fs::write(&self.paths.control, line.to_line()).map_err(|source| {
            ChannelError::Write {
                path: self.paths.control.clone(),
                source,
            }
        })
    }

    fn read_state(&self) -> Result<Option<String>, ChannelError> {
        match std::fs::read_to_string(&self.paths.state) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ChannelError::Read {
                path: self.paths.state.clone(),
                source,
            }),
        }
    }
}
