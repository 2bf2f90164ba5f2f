//! Core traits that decouple the control panel from the concrete driver
//! transport and from the front-end that delivers user intent.
//!
//! The [`DriverBridge`](crate::bridge::DriverBridge) only depends on
//! [`DriverChannel`]; the headless loop and the GTK window only depend on
//! [`CommandSource`].

use crate::command::Command;
use crate::control::ControlLine;
use std::sync::mpsc;

/// Abstraction over the channels shared with the external XR driver.
///
/// The production implementation is
/// [`FileChannel`](crate::channel::FileChannel), which reads and writes
/// files in shared memory.  Tests substitute an in-memory recorder.
pub trait DriverChannel {
    /// The error type produced by this channel.
    type Error: std::error::Error + Send + 'static;

    /// Whether the driver's CLI helper is installed.
    ///
    /// Used purely as an "is the XR stack present" gate; the helper is
    /// never executed.
    fn cli_installed(&self) -> bool;

    /// Replace the contents of the control channel with `line`.
    ///
    /// Each call overwrites the previous command.  There is no
    /// acknowledgement that the driver has read it.
    fn write_control(&self, line: &ControlLine) -> Result<(), Self::Error>;

    /// Read the raw contents of the state channel.
    ///
    /// Returns `Ok(None)` if the driver has not published a state file.
    fn read_state(&self) -> Result<Option<String>, Self::Error>;
}

//  Command Source

/// A source of [`Command`]s.
///
/// Implementations listen on some transport (a Unix socket, an in-memory
/// list, …) and forward parsed commands into the provided
/// [`mpsc::Sender`].
///
/// # Contract
///
/// * [`run`](CommandSource::run) **blocks** until the source is exhausted or
///   an unrecoverable error occurs.
/// * Each received command must be sent through `sink` exactly once.
/// * Implementations must be [`Send`] so they can run on a dedicated thread.
pub trait CommandSource: Send {
    /// The error type produced by this source.
    type Error: std::error::Error + Send + 'static;

    /// Start listening and forward every incoming [`Command`] into `sink`.
    fn run(&mut self, sink: mpsc::Sender<Command>) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::ControlKey;
    use std::cell::RefCell;

    #[derive(Debug, thiserror::Error)]
    #[error("mock error")]
    struct MockError;

    //  Mock DriverChannel

    #[derive(Default)]
    struct MockChannel {
        written: RefCell<Vec<String>>,
    }

    impl DriverChannel for MockChannel {
        type Error = MockError;

        fn cli_installed(&self) -> bool {
            true
        }

        fn write_control(&self, line: &ControlLine) -> Result<(), MockError> {
            self.written.borrow_mut().push(line.to_line());
            Ok(())
        }

        fn read_state(&self) -> Result<Option<String>, MockError> {
            Ok(None)
        }
    }

    #[test]
    fn mock_channel_records_lines() {
        let ch = MockChannel::default();
        ch.write_control(&ControlLine::flag(ControlKey::Recenter, true))
            .unwrap();
        assert_eq!(ch.written.borrow().as_slice(), ["recenter=true\n"]);
        assert!(ch.read_state().unwrap().is_none());
    }

    //  Mock CommandSource

    struct MockSource {
        commands: Vec<Command>,
    }

    impl CommandSource for MockSource {
        type Error = MockError;

        fn run(&mut self, sink: mpsc::Sender<Command>) -> Result<(), MockError> {
            for cmd in self.commands.drain(..) {
                let _ = sink.send(cmd);
            }
            Ok(())
        }
    }

    #[test]
    fn mock_source_emits_commands() {
        let mut src = MockSource {
            commands: vec![Command::Recenter, Command::SetDisplayDistance(2.0)],
        };
        let (tx, rx) = mpsc::channel();
        src.run(tx).unwrap();
        let cmds: Vec<Command> = rx.try_iter().collect();
        assert_eq!(cmds, vec![Command::Recenter, Command::SetDisplayDistance(2.0)]);
    }
}
