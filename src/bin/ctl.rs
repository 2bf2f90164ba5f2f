//! `xr-desktop-ctl`: send a single command to a running control panel.
//!
//! Meant to be bound to desktop keybindings, e.g.
//!
//! ```text
//! xr-desktop-ctl recenter
//! xr-desktop-ctl distance 1.5
//! xr-desktop-ctl follow
//! ```

use log::error;
use xr_desktop::command::Command;
use xr_desktop::ipc::listener::send_command;

const USAGE: &str = "usage: xr-desktop-ctl <distance M | threshold RAD | widescreen | follow | recenter | refresh | quit>";

/// Socket path shared with the `xr-desktop` daemon.
fn socket_path() -> String {
    let runtime = std::env::var("XDG_RUNTIME_DIR").unwrap_or_else(|_| "/tmp".into());
    format!("{}/xr-desktop.sock", runtime)
}

fn main() {
    env_logger::init();

    let cmd = match Command::from_args(std::env::args().skip(1)) {
        Ok(cmd) => cmd,
        Err(e) => {
            eprintln!("{}\n{}", e, USAGE);
            std::process::exit(2);
        }
    };

    let path = socket_path();
    if let Err(e) = send_command(&path, &cmd) {
        error!("failed to send {} to {}: {}", cmd, path, e);
        std::process::exit(1);
    }
}
