//! Commands understood by the control panel.
//!
//! [`Command`] is the vocabulary shared by every front-end: the GTK window
//! translates widget events into commands, the Unix socket listener parses
//! them from JSON, and the `xr-desktop-ctl` helper builds them from its
//! command line.
//!
//! # Wire format
//!
//! ```json
//! "Recenter"
//! {"SetDisplayDistance":1.5}
//! {"SetFollowThreshold":0.2}
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Every action the control panel can perform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Set the virtual display distance in meters.
    SetDisplayDistance(f64),

    /// Flip widescreen mode.
    ToggleWidescreenMode,

    /// Flip smooth-follow mode.
    ToggleFollowMode,

    /// Set the follow threshold in radians.
    SetFollowThreshold(f64),

    /// Recenter the virtual display in front of the user.
    Recenter,

    /// Re-read the state channel and refresh the connection status.
    CheckConnection,

    /// Disable XR output and stop the panel.
    Quit,
}

/// Error from [`Command::from_args`].
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ParseCommandError {
    #[error("no command given")]
    Empty,
    #[error("unknown command: {0:?}")]
    Unknown(String),
    #[error("{0}: expected a number")]
    MissingValue(&'static str),
    #[error("{name}: invalid number {value:?}")]
    InvalidValue { name: &'static str, value: String },
    #[error("unexpected argument: {0:?}")]
    Trailing(String),
}

impl Command {
    /// Parse the command-line form used by `xr-desktop-ctl`.
    ///
    /// Accepted forms (case-insensitive verbs):
    ///
    /// ```text
    /// distance <meters>     threshold <radians>
    /// widescreen            follow
    /// recenter              refresh
    /// quit
    /// ```
    pub fn from_args<I, S>(args: I) -> Result<Self, ParseCommandError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut args = args.into_iter();
        let verb = args
            .next()
            .ok_or(ParseCommandError::Empty)?
            .as_ref()
            .trim()
            .to_lowercase();

        let cmd = match verb.as_str() {
            "distance" | "display-distance" => {
                Command::SetDisplayDistance(parse_number("distance", args.next())?)
            }
            "threshold" | "follow-threshold" => {
                Command::SetFollowThreshold(parse_number("threshold", args.next())?)
            }
            "widescreen" => Command::ToggleWidescreenMode,
            "follow" => Command::ToggleFollowMode,
            "recenter" => Command::Recenter,
            "refresh" | "status" => Command::CheckConnection,
            "quit" => Command::Quit,
            other => return Err(ParseCommandError::Unknown(other.to_string())),
        };

        match args.next() {
            Some(extra) => Err(ParseCommandError::Trailing(extra.as_ref().to_string())),
            None => Ok(cmd),
        }
    }
}

fn parse_number<S: AsRef<str>>(
    name: &'static str,
    arg: Option<S>,
) -> Result<f64, ParseCommandError> {
    let raw = arg.ok_or(ParseCommandError::MissingValue(name))?;
    let raw = raw.as_ref().trim();
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ParseCommandError::InvalidValue {
            name,
            value: raw.to_string(),
        }),
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::SetDisplayDistance(v) => write!(f, "set display distance {}", v),
            Command::ToggleWidescreenMode => write!(f, "toggle widescreen mode"),
            Command::ToggleFollowMode => write!(f, "toggle follow mode"),
            Command::SetFollowThreshold(v) => write!(f, "set follow threshold {}", v),
            Command::Recenter => write!(f, "recenter"),
            Command::CheckConnection => write!(f, "check connection"),
            Command::Quit => write!(f, "quit"),
        }
    }
}
