//! Waveshare 7.3" ACeP (7in3f) controller commands and timing.

use std::time::Duration;

pub const CMD_PSR: u8 = 0x00;
pub const CMD_PWR: u8 = 0x01;
/// Power off; data 0x00.
pub const CMD_POF: u8 = 0x02;
pub const CMD_POFS: u8 = 0x03;
/// Power on.
pub const CMD_PON: u8 = 0x04;
pub const CMD_BTST1: u8 = 0x05;
pub const CMD_BTST2: u8 = 0x06;
/// Deep sleep; data [`DEEP_SLEEP_CHECK`].
pub const CMD_DSLP: u8 = 0x07;
pub const CMD_BTST3: u8 = 0x08;
/// Start of frame data.
pub const CMD_DTM1: u8 = 0x10;
/// Display refresh; data 0x00.
pub const CMD_DRF: u8 = 0x12;
pub const CMD_IPC: u8 = 0x13;
pub const CMD_PLL: u8 = 0x30;
pub const CMD_TSE: u8 = 0x41;
pub const CMD_CDI: u8 = 0x50;
pub const CMD_TCON: u8 = 0x60;
pub const CMD_TRES: u8 = 0x61;
pub const CMD_VDCS: u8 = 0x82;
pub const CMD_T_VDCS: u8 = 0x84;
pub const CMD_AGID: u8 = 0x86;
pub const CMD_CMDH: u8 = 0xAA;
pub const CMD_CCSET: u8 = 0xE0;
pub const CMD_PWS: u8 = 0xE3;
pub const CMD_TSSET: u8 = 0xE6;

pub const DEEP_SLEEP_CHECK: u8 = 0xA5;

/// Largest single data write.
pub const MAX_TRANSFER: usize = 4096;

/// Register configuration sent after reset, in order.
pub const INIT_SEQUENCE: &[(u8, &[u8])] = &[
    (CMD_CMDH, &[0x49, 0x55, 0x20, 0x08, 0x09, 0x18]),
    (CMD_PWR, &[0x3F, 0x00, 0x32, 0x2A, 0x0E, 0x2A]),
    (CMD_PSR, &[0x5F, 0x69]),
    (CMD_POFS, &[0x00, 0x54, 0x00, 0x44]),
    (CMD_BTST1, &[0x40, 0x1F, 0x1F, 0x2C]),
    (CMD_BTST2, &[0x6F, 0x1F, 0x1F, 0x22]),
    (CMD_BTST3, &[0x6F, 0x1F, 0x1F, 0x22]),
    (CMD_IPC, &[0x00, 0x04]),
    (CMD_PLL, &[0x3C]),
    (CMD_TSE, &[0x00]),
    (CMD_CDI, &[0x3F]),
    (CMD_TCON, &[0x02, 0x00]),
    // 800 x 480
    (CMD_TRES, &[0x03, 0x20, 0x01, 0xE0]),
    (CMD_VDCS, &[0x1E]),
    (CMD_T_VDCS, &[0x00]),
    (CMD_AGID, &[0x00]),
    (CMD_PWS, &[0x2F]),
    (CMD_CCSET, &[0x00]),
    (CMD_TSSET, &[0x00]),
];

/// Busy-wait bounds. Exceeding one is a hardware fault, never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelTiming {
    pub poll_interval: Duration,
    /// Bound for reset, power-on and power-off waits.
    pub command_timeout: Duration,
    /// Bound for the refresh itself; a full-color refresh takes ~30 s.
    pub refresh_timeout: Duration,
    /// Pause between the post-reset busy wait and the first command.
    pub reset_settle: Duration,
}

impl PanelTiming {
    pub const ACEP_7IN3F: Self = Self {
        poll_interval: Duration::from_millis(10),
        command_timeout: Duration::from_secs(5),
        refresh_timeout: Duration::from_secs(60),
        reset_settle: Duration::from_millis(30),
    };

    /// Number of polls that covers `timeout`.
    pub fn max_polls(&self, timeout: Duration) -> u32 {
        let interval = self.poll_interval.as_nanos().max(1);
        timeout.as_nanos().div_ceil(interval).max(1) as u32
    }
}
