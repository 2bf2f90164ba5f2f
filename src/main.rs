//! Entry point for the **xr-desktop** control panel.
//!
//! Loads the persisted settings, initializes the driver bridge, and spawns
//! the Unix-socket command listener on a background thread.
//!
//! With the default `panel-gtk` feature (and without `--headless`) the main
//! thread runs the GTK window.  Otherwise commands from the socket are
//! processed in a simple blocking loop until a `Quit` arrives.
//!
//! XR output is disabled on every exit path, including a failed startup.
//!
//! # Flags
//!
//! * `--config <path>`: settings file (default
//!   `$XDG_CONFIG_HOME/xfce4-xr-desktop/config.json`)
//! * `--headless`: never open a window

use log::{error, info};
use std::path::PathBuf;
use std::sync::mpsc;
use xr_desktop::channel::FileChannel;
use xr_desktop::command::Command;
use xr_desktop::ipc::listener::UnixSocketListener;
use xr_desktop::panel::ControlPanel;
use xr_desktop::settings::SettingsStore;
use xr_desktop::traits::{CommandSource, DriverChannel};

/// Resolve the config directory (`$XDG_CONFIG_HOME/xfce4-xr-desktop`).
fn config_dir() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        format!("{}/.config", home)
    });
    PathBuf::from(base).join("xfce4-xr-desktop")
}

/// Value following `flag` on the command line, if any.
fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

//  Main

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let headless = args.iter().any(|a| a == "--headless");
    let config_path = flag_value(&args, "--config")
        .map(PathBuf::from)
        .unwrap_or_else(|| config_dir().join("config.json"));

    let settings = SettingsStore::load(&config_path);
    info!("settings: {}", settings.path().display());

    let channel = FileChannel::default();
    info!(
        "driver control {}, state {}, cli {}",
        channel.paths().control.display(),
        channel.paths().state.display(),
        channel.paths().cli.display()
    );

    let mut panel = ControlPanel::new(channel, settings);
    if let Err(e) = panel.initialize() {
        error!("failed to initialize XR bridge: {}", e);
        if let Err(e) = panel.shutdown() {
            error!("cleanup failed: {}", e);
        }
        std::process::exit(1);
    }

    let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
    spawn_command_sources(cmd_tx);

    start_event_loop(panel, cmd_rx, headless);
}

//  Event loops

#[cfg(feature = "panel-gtk")]
fn start_event_loop<C: DriverChannel + 'static>(
    panel: ControlPanel<C>,
    cmd_rx: mpsc::Receiver<Command>,
    headless: bool,
) {
    if headless {
        run_headless(panel, cmd_rx);
    } else if let Err(e) = xr_desktop::panel::gtk::run_main_loop(panel, cmd_rx) {
        error!("failed to start GTK: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "panel-gtk"))]
fn start_event_loop<C: DriverChannel>(
    panel: ControlPanel<C>,
    cmd_rx: mpsc::Receiver<Command>,
    _headless: bool,
) {
    run_headless(panel, cmd_rx);
}

fn run_headless<C: DriverChannel>(mut panel: ControlPanel<C>, cmd_rx: mpsc::Receiver<Command>) {
    info!("xr-desktop running headless");
    for cmd in cmd_rx {
        let quit = cmd == Command::Quit;
        if let Err(e) = panel.handle(cmd) {
            error!("command error: {}", e);
        }
        if quit {
            info!("quit requested, exiting");
            return;
        }
    }
    info!("all command sources closed, exiting");
    if let Err(e) = panel.shutdown() {
        error!("cleanup failed: {}", e);
    }
}

//  Helpers

/// Default socket path for the command listener.
fn default_socket_path() -> String {
    let runtime = std::env::var("XDG_RUNTIME_DIR").unwrap_or_else(|_| "/tmp".into());
    format!("{}/xr-desktop.sock", runtime)
}

fn spawn_command_sources(tx: mpsc::Sender<Command>) {
    let path = default_socket_path();
    std::thread::spawn(move || {
        let mut source = UnixSocketListener::new(&path);
        if let Err(e) = source.run(tx) {
            error!("socket listener error: {}", e);
        }
    });
}
