//! uvc-ptz: pan, tilt and zoom a UVC camera from the command line.

use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand, ValueEnum};
use crossbeam_channel::RecvTimeoutError;
use serde::Serialize;

use uvc_ptz::{
    CameraPtz, Capability, CapabilitySummary, DeviceIdentity, PtzAction, PtzActionSet, PtzConfig,
    PtzEngine, PtzError, PtzEvent, Result, UsbOpener, WorkerThread,
};

#[derive(Parser)]
#[command(
    name = "uvc-ptz",
    version,
    about = "Pan/tilt/zoom control for UVC cameras",
    after_help = "IDENTITY is either <vid>:<pid> (e.g. 046d:085e) or the location form\n\
                  0x<location><vid:04x><pid:04x> (e.g. 0x14200000046d085e)."
)]
struct Args {
    /// Camera to control
    identity: DeviceIdentity,

    /// Print probe results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Discrete move pulse length in milliseconds
    #[arg(long, global = true, default_value_t = 200)]
    settle_ms: u64,

    /// Absolute zoom emulation period in milliseconds
    #[arg(long, global = true, default_value_t = 100)]
    tick_ms: u64,

    /// USB control transfer timeout in milliseconds
    #[arg(long, global = true, default_value_t = 1000)]
    timeout_ms: u64,

    /// Detach the kernel driver from the VideoControl interface while talking to the camera
    #[arg(long, global = true)]
    detach: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show which PTZ controls the camera implements
    Probe,
    /// Nudge pan and/or tilt once
    Move {
        #[arg(long, value_enum)]
        pan: Option<Pan>,
        #[arg(long, value_enum)]
        tilt: Option<Tilt>,
    },
    /// Zoom one step
    Zoom {
        #[arg(value_enum)]
        direction: Zoom,
    },
    /// Keep moving for a while, then stop
    Hold {
        #[arg(long, value_enum)]
        pan: Option<Pan>,
        #[arg(long, value_enum)]
        tilt: Option<Tilt>,
        #[arg(long, value_enum)]
        zoom: Option<Zoom>,
        /// How long to keep moving
        #[arg(long)]
        duration_ms: u64,
    },
    /// Halt all pan, tilt and zoom motion
    Stop,
}

#[derive(Clone, Copy, ValueEnum)]
enum Pan {
    Left,
    Right,
}

#[derive(Clone, Copy, ValueEnum)]
enum Tilt {
    Up,
    Down,
}

#[derive(Clone, Copy, ValueEnum)]
enum Zoom {
    In,
    Out,
}

impl From<Pan> for PtzAction {
    fn from(p: Pan) -> Self {
        match p {
            Pan::Left => PtzAction::PanLeft,
            Pan::Right => PtzAction::PanRight,
        }
    }
}

impl From<Tilt> for PtzAction {
    fn from(t: Tilt) -> Self {
        match t {
            Tilt::Up => PtzAction::TiltUp,
            Tilt::Down => PtzAction::TiltDown,
        }
    }
}

impl From<Zoom> for PtzAction {
    fn from(z: Zoom) -> Self {
        match z {
            Zoom::In => PtzAction::ZoomIn,
            Zoom::Out => PtzAction::ZoomOut,
        }
    }
}

fn action_set(pan: Option<Pan>, tilt: Option<Tilt>, zoom: Option<Zoom>) -> PtzActionSet {
    pan.map(PtzAction::from)
        .into_iter()
        .chain(tilt.map(PtzAction::from))
        .chain(zoom.map(PtzAction::from))
        .collect()
}

#[derive(Serialize)]
struct ProbeOutput {
    identity: String,
    supports: CapabilitySummary,
    capability: Capability,
}

type Ptz = CameraPtz<WorkerThread<PtzEngine>>;

fn main() {
    let args = Args::parse();

    let default_filter = match args.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .format_target(false)
        .init();

    if let Err(e) = run(args) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let config = PtzConfig::default()
        .with_settle(Duration::from_millis(args.settle_ms))
        .with_tick_interval(Duration::from_millis(args.tick_ms))
        .with_usb_timeout(Duration::from_millis(args.timeout_ms))
        .with_detach_kernel_driver(args.detach);

    let opener = UsbOpener::new(&config)?;
    // Probing swallows open failures, so report a missing camera up front.
    opener.find_device(&args.identity)?;

    let tick = config.tick_interval;
    let ptz = CameraPtz::spawn(Arc::new(opener), config)?;
    let capability = select(&ptz, args.identity)?;

    match args.command {
        Command::Probe => print_probe(&args.identity, &capability, args.json),
        Command::Move { pan, tilt } => {
            if pan.is_none() && tilt.is_none() {
                eprintln!("Nothing to do: pass --pan and/or --tilt");
                return Ok(());
            }
            ptz.apply_discrete(action_set(pan, tilt, None))?;
            wait_idle(&ptz)?;
        }
        Command::Zoom { direction } => {
            ptz.apply_discrete(action_set(None, None, Some(direction)))?;
            wait_idle(&ptz)?;
        }
        Command::Hold { pan, tilt, zoom, duration_ms } => {
            let actions = action_set(pan, tilt, zoom);
            hold(&ptz, actions, Duration::from_millis(duration_ms), tick)?;
        }
        Command::Stop => {
            ptz.apply_continuous_stop()?;
            wait_idle(&ptz)?;
        }
    }

    Ok(())
}

fn select(ptz: &Ptz, identity: DeviceIdentity) -> Result<Capability> {
    let (tx, rx) = crossbeam_channel::bounded(1);
    ptz.probe_capability(identity, move |cap| {
        let _ = tx.send(cap);
    })?;
    rx.recv().map_err(|_| PtzError::WorkerGone)
}

/// Block until every queued job has run.
fn wait_idle(ptz: &Ptz) -> Result<()> {
    ptz.run(|_| ())?
        .recv()
        .map_err(|_| PtzError::WorkerGone)
}

fn hold(ptz: &Ptz, actions: PtzActionSet, duration: Duration, tick: Duration) -> Result<()> {
    let deadline = Instant::now() + duration;
    let mut emulating = false;

    ptz.apply_continuous_start(actions)?;
    loop {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        let wait = if emulating { tick.min(deadline - now) } else { deadline - now };

        match ptz.events().recv_timeout(wait) {
            Ok(PtzEvent::ZoomEmulationStarted(direction)) => {
                log::debug!("emulating continuous zoom {}", direction);
                emulating = true;
            }
            Ok(PtzEvent::ZoomBoundaryReached(direction)) => {
                println!("Zoom {} limit reached", direction);
                emulating = false;
            }
            Err(RecvTimeoutError::Timeout) => {
                if emulating {
                    ptz.zoom_tick()?;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    ptz.apply_continuous_stop()?;
    wait_idle(ptz)
}

fn yes_no(b: bool) -> &'static str {
    if b { "yes" } else { "no" }
}

fn print_probe(identity: &DeviceIdentity, cap: &Capability, json: bool) {
    if json {
        let out = ProbeOutput {
            identity: identity.to_string(),
            supports: cap.summary(),
            capability: *cap,
        };
        match serde_json::to_string_pretty(&out) {
            Ok(s) => println!("{s}"),
            Err(e) => eprintln!("Error: {e}"),
        }
        return;
    }

    println!("Camera {}", identity);
    println!("  Zoom (absolute):     {}", yes_no(cap.supports_zoom_absolute));
    println!("  Zoom (relative):     {}", yes_no(cap.supports_zoom_relative));
    println!("  Pan/tilt (absolute): {}", yes_no(cap.supports_pantilt_absolute));
    println!("  Pan/tilt (relative): {}", yes_no(cap.supports_pantilt_relative));
    if cap.supports_pantilt_relative {
        println!("  Pan speed:           {}", cap.pan_speed);
        println!("  Tilt speed:          {}", cap.tilt_speed);
    }
    if cap.supports_zoom_relative {
        println!("  Zoom speed:          {}", cap.zoom_speed);
    }
    if cap.supports_pantilt_absolute {
        let r = cap.pantilt_range;
        println!("  Pan range:           {}..{}", r.pan_min, r.pan_max);
        println!("  Tilt range:          {}..{}", r.tilt_min, r.tilt_max);
    }
    if cap.needs_zoom_emulation() {
        println!("  Continuous zoom is emulated with absolute steps");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_directions_map_to_actions() {
        let set = action_set(Some(Pan::Right), Some(Tilt::Up), Some(Zoom::Out));
        assert_eq!(
            set,
            PtzActionSet::from([PtzAction::PanRight, PtzAction::TiltUp, PtzAction::ZoomOut])
        );
        assert_eq!(action_set(None, None, None), PtzActionSet::default());
    }
}
