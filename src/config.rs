//! Tunables for timing, stepping and USB access.

use std::time::Duration;

use crate::protocol::*;

/// Runtime configuration shared by the opener, translator and CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PtzConfig {
    /// Length of a discrete move pulse before the stop command.
    pub settle: Duration,
    /// Period the collaborator should use between absolute zoom ticks.
    pub tick_interval: Duration,
    /// Number of steps that span the absolute zoom range.
    pub zoom_steps: i32,
    /// Per-transfer USB timeout.
    pub usb_timeout: Duration,
    /// Detach the kernel driver and claim the VideoControl interface for the
    /// duration of each operation.
    pub detach_kernel_driver: bool,
}

impl Default for PtzConfig {
    fn default() -> Self {
        Self {
            settle: DISCRETE_SETTLE,
            tick_interval: ZOOM_TICK_INTERVAL,
            zoom_steps: ZOOM_ABSOLUTE_STEPS,
            usb_timeout: USB_TIMEOUT,
            detach_kernel_driver: false,
        }
    }
}

impl PtzConfig {
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Values below 1 are raised to 1.
    pub fn with_zoom_steps(mut self, steps: i32) -> Self {
        self.zoom_steps = steps.max(1);
        self
    }

    pub fn with_usb_timeout(mut self, timeout: Duration) -> Self {
        self.usb_timeout = timeout;
        self
    }

    pub fn with_detach_kernel_driver(mut self, detach: bool) -> Self {
        self.detach_kernel_driver = detach;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_protocol_timing() {
        let config = PtzConfig::default();
        assert_eq!(config.settle, Duration::from_millis(200));
        assert_eq!(config.tick_interval, Duration::from_millis(100));
        assert_eq!(config.zoom_steps, 50);
        assert_eq!(config.usb_timeout, Duration::from_secs(1));
        assert!(!config.detach_kernel_driver);
    }

    #[test]
    fn zoom_steps_never_zero() {
        assert_eq!(PtzConfig::default().with_zoom_steps(0).zoom_steps, 1);
        assert_eq!(PtzConfig::default().with_zoom_steps(-5).zoom_steps, 1);
        assert_eq!(PtzConfig::default().with_zoom_steps(10).zoom_steps, 10);
    }
}
