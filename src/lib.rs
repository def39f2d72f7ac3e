//! Pan/tilt/zoom control for USB Video Class cameras.
//!
//! Talks to the Camera Terminal of a UVC camera with class-specific control
//! transfers on endpoint 0, probes which PTZ controls the camera implements,
//! and turns abstract actions (pan left, zoom in, ...) into the right
//! relative or absolute control writes.  Cameras that only expose absolute
//! zoom get continuous zoom through a tick-driven emulator.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use uvc_ptz::{CameraPtz, PtzAction, PtzActionSet, PtzConfig, UsbOpener};
//!
//! let config = PtzConfig::default();
//! let opener = Arc::new(UsbOpener::new(&config)?);
//! let ptz = CameraPtz::spawn(opener, config)?;
//!
//! ptz.probe_capability("046d:085e".parse()?, |cap| {
//!     println!("pan: {} zoom: {}", cap.supports_pan(), cap.supports_zoom());
//! })?;
//! ptz.apply_discrete(PtzActionSet::from([PtzAction::PanLeft, PtzAction::TiltUp]))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod action;
pub mod capability;
pub mod codec;
pub mod config;
pub mod controller;
pub mod device;
pub mod emulator;
pub mod error;
#[doc(hidden)]
pub mod mock;
pub mod prober;
pub mod protocol;
pub mod session;
pub mod translator;
pub mod worker;

pub use action::{PtzAction, PtzActionSet};
pub use capability::{Capability, CapabilitySummary, PanTiltRange, ZoomAbsoluteState, ZoomDirection};
pub use codec::{ControlRequest, ControlSelector, ControlValue, RequestKind};
pub use config::PtzConfig;
pub use controller::{CameraPtz, EVENT_QUEUE_DEPTH, PtzEngine, PtzEvent};
pub use device::{DeviceIdentity, UsbOpener};
pub use emulator::{AbsoluteZoomEmulator, TickOutcome};
pub use error::{PtzError, Result};
pub use prober::DeviceProfile;
pub use session::{ControlHandle, DeviceOpener, DeviceSession};
pub use translator::PtzTranslator;
pub use worker::{Executor, InlineExecutor, WorkerThread};
