//! Open → transfer → close bracketing around a single device operation.
//!
//! A [`DeviceSession`] never keeps a handle between operations: every
//! [`with_open_device`](DeviceSession::with_open_device) call opens a fresh
//! handle through the injected [`DeviceOpener`], runs the body, and drops the
//! handle (which closes it) before returning, on every exit path.

use std::sync::Arc;

use crate::codec::{self, ControlRequest, ControlSelector, ControlValue, RequestKind};
use crate::device::DeviceIdentity;
use crate::error::{PtzError, Result};

/// An opened device capable of issuing class control transfers on endpoint 0.
///
/// Implementations close the underlying handle in their `Drop` impl.
pub trait ControlHandle {
    /// Device-to-host transfer.  Returns the number of bytes actually received.
    fn read_control(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
    ) -> Result<usize>;

    /// Host-to-device transfer.  Returns the number of bytes actually sent.
    fn write_control(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
    ) -> Result<usize>;
}

/// Resolves a device identity to a freshly opened handle.
pub trait DeviceOpener: Send + Sync {
    /// Open the device.  Failures map to [`PtzError::OpenFailed`] or
    /// [`PtzError::DeviceNotFound`].
    fn open(&self, identity: &DeviceIdentity) -> Result<Box<dyn ControlHandle>>;
}

/// Issue `request` on an open handle and return the bytes actually transferred.
///
/// For SET requests the payload is sent; for GET requests it is used as the
/// receive buffer size.
pub fn transfer(handle: &mut dyn ControlHandle, request: &ControlRequest) -> Result<Vec<u8>> {
    if request.kind().is_set() {
        let sent = handle.write_control(
            request.request_type(),
            request.request(),
            request.value(),
            request.index(),
            request.payload(),
        )?;
        log::trace!(
            "SET_CUR {} {:02x?} -> {} bytes",
            request.selector(),
            request.payload(),
            sent
        );
        Ok(request.payload()[..sent.min(request.payload().len())].to_vec())
    } else {
        let mut buf = request.payload().to_vec();
        let received = handle.read_control(
            request.request_type(),
            request.request(),
            request.value(),
            request.index(),
            &mut buf,
        )?;
        buf.truncate(received);
        log::trace!(
            "{:?} {} -> {:02x?}",
            request.kind(),
            request.selector(),
            buf
        );
        Ok(buf)
    }
}

/// GET `kind` on `selector` and decode the reply.
pub fn get(
    handle: &mut dyn ControlHandle,
    selector: ControlSelector,
    kind: RequestKind,
) -> Result<ControlValue> {
    let request = ControlRequest::query(selector, kind)?;
    let raw = transfer(handle, &request)?;
    codec::decode(selector, &raw)
}

/// SET_CUR `value`.  A short write is reported as [`PtzError::ShortTransfer`].
pub fn set(handle: &mut dyn ControlHandle, value: &ControlValue) -> Result<()> {
    let request = codec::encode(RequestKind::Set, value)?;
    let sent = transfer(handle, &request)?;
    let expected = request.selector().length();
    if sent.len() < expected {
        return Err(PtzError::ShortTransfer {
            selector: request.selector(),
            expected,
            got: sent.len(),
        });
    }
    Ok(())
}

/// Scope owner for one device identity.
#[derive(Clone)]
pub struct DeviceSession {
    opener: Arc<dyn DeviceOpener>,
    identity: DeviceIdentity,
}

impl DeviceSession {
    pub fn new(opener: Arc<dyn DeviceOpener>, identity: DeviceIdentity) -> Self {
        Self { opener, identity }
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    /// Open the device, run `body`, close the device.
    ///
    /// If opening fails `body` is never invoked.  The handle is dropped before
    /// this returns, including when `body` panics.
    pub fn with_open_device<T>(&self, body: impl FnOnce(&mut dyn ControlHandle) -> T) -> Result<T> {
        let mut handle = self.opener.open(&self.identity)?;
        log::trace!("opened {}", self.identity);
        let out = body(handle.as_mut());
        drop(handle);
        log::trace!("closed {}", self.identity);
        Ok(out)
    }

    /// One GET in its own bracket.
    pub fn query(&self, selector: ControlSelector, kind: RequestKind) -> Result<ControlValue> {
        self.with_open_device(|h| get(h, selector, kind))?
    }

    /// One SET_CUR in its own bracket.
    pub fn set(&self, value: &ControlValue) -> Result<()> {
        self.with_open_device(|h| set(h, value))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockCamera;

    fn session(camera: &MockCamera) -> DeviceSession {
        DeviceSession::new(Arc::new(camera.clone()), MockCamera::identity())
    }

    #[test]
    fn query_opens_and_closes_once() {
        let camera = MockCamera::new().with_zoom_relative(0, 4);
        let value = session(&camera)
            .query(ControlSelector::ZoomRelative, RequestKind::GetDef)
            .unwrap();
        assert_eq!(value, ControlValue::ZoomRelative { zoom: 0, digital_zoom: 0, speed: 4 });
        assert_eq!(camera.opens(), 1);
        assert_eq!(camera.closes(), 1);
    }

    #[test]
    fn open_failure_skips_body() {
        let camera = MockCamera::new();
        camera.fail_open(true);
        let mut called = false;
        let result = session(&camera).with_open_device(|_| called = true);
        assert!(matches!(result, Err(PtzError::OpenFailed(_))));
        assert!(!called);
        assert_eq!(camera.closes(), 0);
    }

    #[test]
    fn unsupported_selector_is_short_transfer() {
        let camera = MockCamera::new();
        let err = session(&camera)
            .query(ControlSelector::PanTiltRelative, RequestKind::GetDef)
            .unwrap_err();
        assert!(matches!(err, PtzError::ShortTransfer { got: 0, .. }));
        assert_eq!(camera.closes(), 1);
    }

    #[test]
    fn transport_error_still_closes() {
        let camera = MockCamera::new().with_zoom_relative(0, 4);
        camera.fail_transfers(true);
        let err = session(&camera)
            .set(&ControlValue::ZoomRelative { zoom: 1, digital_zoom: 0, speed: 4 })
            .unwrap_err();
        assert!(matches!(err, PtzError::TransferFailed(_)));
        assert_eq!(camera.opens(), 1);
        assert_eq!(camera.closes(), 1);
    }

    #[test]
    fn set_records_wire_fields() {
        let camera = MockCamera::new().with_zoom_absolute(0, 1000, 0);
        session(&camera)
            .set(&ControlValue::ZoomAbsolute { focal_length: 1000 })
            .unwrap();
        let sets = camera.sets();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].request_type, 0x21);
        assert_eq!(sets[0].request, 0x01);
        assert_eq!(sets[0].value, 0x0B00);
        assert_eq!(sets[0].index, 0x0100);
        assert_eq!(sets[0].data, vec![0xE8, 0x03]);
    }
}
