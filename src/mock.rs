//! In-memory camera for tests.
//!
//! [`MockCamera`] implements [`DeviceOpener`]; each `open()` hands out a
//! handle that answers GET requests from a table of canned replies and
//! records every transfer.  Selectors without a reply answer with zero bytes,
//! which is how an unsupported control looks on the wire.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use crate::codec::{ControlSelector, RequestKind, pack16};
use crate::device::DeviceIdentity;
use crate::error::{PtzError, Result};
use crate::protocol::*;
use crate::session::{ControlHandle, DeviceOpener};

/// One control transfer as seen by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub request_type: u8,
    pub request: u8,
    pub value: u16,
    pub index: u16,
    /// Bytes sent (SET) or returned (GET).
    pub data: Vec<u8>,
    pub at: Instant,
}

impl Transfer {
    pub fn is_set(&self) -> bool {
        self.request_type == UVC_REQUEST_TYPE_OUT
    }

    pub fn selector_code(&self) -> u8 {
        (self.value >> 8) as u8
    }
}

#[derive(Default)]
struct State {
    replies: HashMap<(u8, u8), Vec<u8>>,
    log: Vec<Transfer>,
    opens: usize,
    closes: usize,
    open_now: usize,
    max_open: usize,
    fail_open: bool,
    fail_transfers: bool,
    stall_unsupported: bool,
}

/// Shared, cloneable fake camera.
#[derive(Clone, Default)]
pub struct MockCamera {
    state: Arc<Mutex<State>>,
}

impl MockCamera {
    /// A camera that supports nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity that the mock accepts (any identity is accepted).
    pub fn identity() -> DeviceIdentity {
        DeviceIdentity::new(0x046d, 0x085e)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Set the reply for `kind` on `selector`.
    pub fn reply(&self, selector: ControlSelector, kind: RequestKind, data: Vec<u8>) {
        self.lock().replies.insert((selector.code(), kind.code()), data);
    }

    pub fn with_zoom_absolute(self, min: i16, max: i16, cur: i16) -> Self {
        let s = ControlSelector::ZoomAbsolute;
        self.reply(s, RequestKind::GetDef, pack16(min as u16).to_vec());
        self.reply(s, RequestKind::GetMin, pack16(min as u16).to_vec());
        self.reply(s, RequestKind::GetMax, pack16(max as u16).to_vec());
        self.reply(s, RequestKind::GetCur, pack16(cur as u16).to_vec());
        self
    }

    pub fn with_zoom_relative(self, default_zoom: i8, speed: u8) -> Self {
        self.reply(
            ControlSelector::ZoomRelative,
            RequestKind::GetDef,
            vec![default_zoom as u8, 0, speed],
        );
        self
    }

    pub fn with_pantilt_relative(self, pan_speed: u8, tilt_speed: u8) -> Self {
        self.reply(
            ControlSelector::PanTiltRelative,
            RequestKind::GetDef,
            vec![0, pan_speed, 0, tilt_speed],
        );
        self
    }

    pub fn with_pantilt_absolute(self, pan: (i16, i16), tilt: (i16, i16)) -> Self {
        let s = ControlSelector::PanTiltAbsolute;
        let bytes = |p: i16, t: i16| {
            let mut v = pack16(p as u16).to_vec();
            v.extend_from_slice(&pack16(t as u16));
            v
        };
        self.reply(s, RequestKind::GetDef, bytes(0, 0));
        self.reply(s, RequestKind::GetMin, bytes(pan.0, tilt.0));
        self.reply(s, RequestKind::GetMax, bytes(pan.1, tilt.1));
        self
    }

    /// Make every `open()` fail with [`PtzError::OpenFailed`].
    pub fn fail_open(&self, fail: bool) {
        self.lock().fail_open = fail;
    }

    /// Make every transfer fail with [`PtzError::TransferFailed`].
    pub fn fail_transfers(&self, fail: bool) {
        self.lock().fail_transfers = fail;
    }

    /// Answer requests for missing controls with a STALL instead of zero bytes.
    pub fn stall_unsupported(&self, stall: bool) {
        self.lock().stall_unsupported = stall;
    }

    pub fn opens(&self) -> usize {
        self.lock().opens
    }

    pub fn closes(&self) -> usize {
        self.lock().closes
    }

    /// Highest number of handles that were open at the same time.
    pub fn max_concurrent_opens(&self) -> usize {
        self.lock().max_open
    }

    pub fn transfers(&self) -> Vec<Transfer> {
        self.lock().log.clone()
    }

    /// Only the SET_CUR transfers.
    pub fn sets(&self) -> Vec<Transfer> {
        self.lock().log.iter().filter(|t| t.is_set()).cloned().collect()
    }

    /// SET_CUR payloads sent to one selector, in order.
    pub fn sets_to(&self, selector: ControlSelector) -> Vec<Vec<u8>> {
        self.sets()
            .into_iter()
            .filter(|t| t.selector_code() == selector.code())
            .map(|t| t.data)
            .collect()
    }

    /// Forget recorded transfers and open/close counts.
    pub fn clear_log(&self) {
        let mut state = self.lock();
        state.log.clear();
        state.opens = 0;
        state.closes = 0;
        state.max_open = state.open_now;
    }
}

impl DeviceOpener for MockCamera {
    fn open(&self, _identity: &DeviceIdentity) -> Result<Box<dyn ControlHandle>> {
        let mut state = self.lock();
        if state.fail_open {
            return Err(PtzError::OpenFailed("mock open refused".into()));
        }
        state.opens += 1;
        state.open_now += 1;
        state.max_open = state.max_open.max(state.open_now);
        Ok(Box::new(MockHandle { camera: self.clone() }))
    }
}

struct MockHandle {
    camera: MockCamera,
}

impl ControlHandle for MockHandle {
    fn read_control(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
    ) -> Result<usize> {
        let mut state = self.camera.lock();
        if state.fail_transfers {
            return Err(PtzError::TransferFailed("mock pipe error".into()));
        }
        let reply = match state.replies.get(&(((value >> 8) as u8), request)) {
            Some(reply) => reply.clone(),
            None if state.stall_unsupported => return Err(PtzError::Stalled { request, value }),
            None => Vec::new(),
        };
        let n = reply.len().min(buf.len());
        buf[..n].copy_from_slice(&reply[..n]);
        state.log.push(Transfer {
            request_type,
            request,
            value,
            index,
            data: reply[..n].to_vec(),
            at: Instant::now(),
        });
        Ok(n)
    }

    fn write_control(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
    ) -> Result<usize> {
        let mut state = self.camera.lock();
        if state.fail_transfers {
            return Err(PtzError::TransferFailed("mock pipe error".into()));
        }
        let selector = (value >> 8) as u8;
        state.log.push(Transfer {
            request_type,
            request,
            value,
            index,
            data: data.to_vec(),
            at: Instant::now(),
        });

        let supported = state.replies.keys().any(|&(s, _)| s == selector);
        if !supported && state.stall_unsupported {
            return Err(PtzError::Stalled { request, value });
        }
        if !supported {
            return Ok(0);
        }
        if selector == CT_ZOOM_ABSOLUTE_CONTROL {
            state.replies.insert((selector, UVC_GET_CUR), data.to_vec());
        }
        Ok(data.len())
    }
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        let mut state = self.camera.lock();
        state.closes += 1;
        state.open_now -= 1;
    }
}
