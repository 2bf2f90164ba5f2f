//! GTK4 control panel window that runs on the **main thread**.
//!
//! # Widget tree
//!
//! ```text
//! window
//! └ box (vertical)
//!     ├ frame "Status"       device label, refresh button
//!     ├ frame "Controls"     distance scale, widescreen switch,
//!     │                      follow switch, threshold scale, recenter button
//!     └ frame "Keybindings"  one label row per action
//! ```
//!
//! Widget callbacks turn user input into [`Command`]s for the
//! [`ControlPanel`].  Bridge notifications travel back over an
//! [`mpsc`] channel and are applied to the widgets from a GLib timeout,
//! together with any commands arriving on the socket.

use super::ControlPanel;
use crate::command::Command;
use crate::events::{DriverEvent, EventKind};
use crate::settings::KeybindingAction;
use crate::traits::DriverChannel;
use gtk4::prelude::*;
use gtk4::glib;
use log::{debug, error, info};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::mpsc;
use std::time::Duration;

//  Slider bounds

const DISTANCE_MIN: f64 = 0.5;
const DISTANCE_MAX: f64 = 3.0;
const DISTANCE_STEP: f64 = 0.05;

const THRESHOLD_MIN: f64 = 0.01;
const THRESHOLD_MAX: f64 = 0.5;
const THRESHOLD_STEP: f64 = 0.01;

/// Values closer than this are treated as unchanged.
const EPSILON: f64 = 1e-9;

fn status_text(connected: bool) -> String {
    format!(
        "Device: {}",
        if connected { "Connected" } else { "Not Connected" }
    )
}

/// A label followed by an expanding control.
fn labelled_row(label: &str, widget: &impl IsA<gtk4::Widget>) -> gtk4::Box {
    let row = gtk4::Box::new(gtk4::Orientation::Horizontal, 6);
    row.set_margin_start(6);
    row.set_margin_end(6);
    row.append(&gtk4::Label::new(Some(label)));
    row.append(widget);
    row
}

fn frame(title: &str, child: &impl IsA<gtk4::Widget>) -> gtk4::Frame {
    let frame = gtk4::Frame::new(Some(title));
    frame.set_child(Some(child));
    frame.set_margin_top(6);
    frame.set_margin_start(6);
    frame.set_margin_end(6);
    frame
}

/// Dispatch a command, logging instead of surfacing failures.
fn dispatch<C: DriverChannel>(panel: &Rc<RefCell<ControlPanel<C>>>, cmd: Command) {
    if let Err(e) = panel.borrow_mut().handle(cmd) {
        error!("command error: {}", e);
    }
}

//  Public API

/// Build the window and run the GLib main loop on the current thread until
/// the window is closed or a [`Command::Quit`] arrives.
///
/// The panel must already be initialized.  On exit the driver's XR output is
/// disabled.
pub fn run_main_loop<C: DriverChannel + 'static>(
    panel: ControlPanel<C>,
    cmd_rx: mpsc::Receiver<Command>,
) -> Result<(), glib::BoolError> {
    gtk4::init()?;
    info!("GTK4 initialised on main thread");

    let panel = Rc::new(RefCell::new(panel));

    //  Bridge notifications
    let (event_tx, event_rx) = mpsc::channel::<DriverEvent>();
    for kind in [
        EventKind::DeviceConnected,
        EventKind::DisplayDistanceChanged,
        EventKind::WidescreenModeChanged,
    ] {
        let tx = event_tx.clone();
        panel.borrow_mut().subscribe(kind, move |e| {
            let _ = tx.send(*e);
        });
    }

    let (connected, distance, widescreen, follow, threshold) = {
        let p = panel.borrow();
        let b = p.bridge();
        (
            b.device_connected(),
            b.display_distance(),
            b.widescreen_mode(),
            b.follow_mode(),
            b.follow_threshold(),
        )
    };

    let window = gtk4::Window::new();
    window.set_title(Some("XR Desktop"));
    window.set_default_size(400, 500);

    let main_box = gtk4::Box::new(gtk4::Orientation::Vertical, 6);
    window.set_child(Some(&main_box));

    //  Status
    let status_box = gtk4::Box::new(gtk4::Orientation::Vertical, 6);
    let device_status = gtk4::Label::new(Some(status_text(connected).as_str()));
    let refresh_button = gtk4::Button::with_label("Refresh Status");
    status_box.append(&device_status);
    status_box.append(&refresh_button);
    main_box.append(&frame("Status", &status_box));

    //  Controls
    let controls_box = gtk4::Box::new(gtk4::Orientation::Vertical, 6);

    let distance_scale = gtk4::Scale::with_range(
        gtk4::Orientation::Horizontal,
        DISTANCE_MIN,
        DISTANCE_MAX,
        DISTANCE_STEP,
    );
    distance_scale.set_digits(2);
    distance_scale.set_hexpand(true);
    distance_scale.set_value(distance);
    controls_box.append(&labelled_row("Display Distance (m):", &distance_scale));

    let widescreen_switch = gtk4::Switch::new();
    widescreen_switch.set_active(widescreen);
    controls_box.append(&labelled_row("Widescreen Mode:", &widescreen_switch));

    let follow_switch = gtk4::Switch::new();
    follow_switch.set_active(follow);
    controls_box.append(&labelled_row("Follow Mode:", &follow_switch));

    let threshold_scale = gtk4::Scale::with_range(
        gtk4::Orientation::Horizontal,
        THRESHOLD_MIN,
        THRESHOLD_MAX,
        THRESHOLD_STEP,
    );
    threshold_scale.set_digits(2);
    threshold_scale.set_hexpand(true);
    threshold_scale.set_value(threshold);
    controls_box.append(&labelled_row("Follow Threshold:", &threshold_scale));

    let recenter_button = gtk4::Button::with_label("Recenter Display");
    controls_box.append(&recenter_button);
    main_box.append(&frame("Controls", &controls_box));

    //  Keybindings (display only)
    let keybindings_box = gtk4::Box::new(gtk4::Orientation::Vertical, 6);
    for action in KeybindingAction::ALL {
        let accel = panel
            .borrow()
            .settings()
            .keybinding(action.as_str())
            .unwrap_or("")
            .to_string();
        let value = gtk4::Label::new(Some(accel.as_str()));
        value.set_hexpand(true);
        keybindings_box.append(&labelled_row(&format!("{}:", action.label()), &value));
    }
    main_box.append(&frame("Keybindings", &keybindings_box));

    //  Widget signals
    {
        let panel = panel.clone();
        distance_scale.connect_value_changed(move |scale| {
            let value = scale.value();
            let current = panel.borrow().bridge().display_distance();
            if (value - current).abs() > EPSILON {
                dispatch(&panel, Command::SetDisplayDistance(value));
            }
        });
    }
    {
        let panel = panel.clone();
        widescreen_switch.connect_active_notify(move |switch| {
            if switch.is_active() != panel.borrow().bridge().widescreen_mode() {
                dispatch(&panel, Command::ToggleWidescreenMode);
            }
        });
    }
    {
        let panel = panel.clone();
        follow_switch.connect_active_notify(move |switch| {
            if switch.is_active() != panel.borrow().bridge().follow_mode() {
                dispatch(&panel, Command::ToggleFollowMode);
            }
        });
    }
    {
        let panel = panel.clone();
        threshold_scale.connect_value_changed(move |scale| {
            let value = scale.value();
            let current = panel.borrow().bridge().follow_threshold();
            if (value - current).abs() > EPSILON {
                dispatch(&panel, Command::SetFollowThreshold(value));
            }
        });
    }
    {
        let panel = panel.clone();
        recenter_button.connect_clicked(move |_| dispatch(&panel, Command::Recenter));
    }
    {
        let panel = panel.clone();
        refresh_button.connect_clicked(move |_| dispatch(&panel, Command::CheckConnection));
    }

    let main_loop = glib::MainLoop::new(None, false);
    {
        let panel = panel.clone();
        let main_loop = main_loop.clone();
        window.connect_close_request(move |_| {
            info!("window closing, cleaning up");
            if let Err(e) = panel.borrow_mut().shutdown() {
                error!("cleanup failed: {}", e);
            }
            main_loop.quit();
            glib::Propagation::Proceed
        });
    }

    //  Socket commands + bridge notifications
    {
        let panel = panel.clone();
        let main_loop = main_loop.clone();
        let window = window.clone();
        glib::timeout_add_local(Duration::from_millis(50), move || {
            // Commands are applied one at a time so no borrow is held while
            // widgets are updated below.
            let mut quit = false;
            loop {
                match cmd_rx.try_recv() {
                    Ok(Command::Quit) => {
                        quit = true;
                        break;
                    }
                    Ok(cmd) => dispatch(&panel, cmd),
                    Err(mpsc::TryRecvError::Empty) => break,
                    Err(mpsc::TryRecvError::Disconnected) => break,
                }
            }

            while let Ok(event) = event_rx.try_recv() {
                debug!("event: {:?}", event);
                match event {
                    DriverEvent::DeviceConnected(connected) => {
                        device_status.set_text(&status_text(connected));
                    }
                    DriverEvent::DisplayDistanceChanged(meters) => {
                        if (distance_scale.value() - meters).abs() > EPSILON {
                            distance_scale.set_value(meters);
                        }
                    }
                    DriverEvent::WidescreenModeChanged(enabled) => {
                        if widescreen_switch.is_active() != enabled {
                            widescreen_switch.set_active(enabled);
                        }
                    }
                }
            }

            if quit {
                info!("quit requested");
                // Runs the close-request handler, which disables XR.
                window.close();
                main_loop.quit();
                return glib::ControlFlow::Break;
            }
            glib::ControlFlow::Continue
        });
    }

    window.present();
    info!("entering GLib main loop");
    main_loop.run();
    info!("GLib main loop exited");
    Ok(())
}
