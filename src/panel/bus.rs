//! Byte-level transport to the panel controller.

use std::time::Duration;
use thiserror::Error;

/// Level of the data/command select line for a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dc {
    Command,
    Data,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    #[error("write rejected: {0}")]
    Write(String),

    #[error("busy line read failed: {0}")]
    BusyRead(String),

    #[error("reset failed: {0}")]
    Reset(String),
}

/// What the driver needs from the hardware: half-duplex writes, a busy line
/// and a reset pulse.
///
/// `is_busy` reports the logical state; pin polarity (the 7in3f pulls BUSY
/// low while working) is the transport's business.
pub trait PanelBus {
    fn write(&mut self, kind: Dc, bytes: &[u8]) -> Result<(), BusError>;

    fn is_busy(&mut self) -> Result<bool, BusError>;

    /// Pulse the hardware reset line.
    fn reset(&mut self) -> Result<(), BusError> {
        Ok(())
    }

    /// Wait between busy polls. Simulated buses advance a virtual clock.
    fn delay(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

impl<B: PanelBus + ?Sized> PanelBus for Box<B> {
    fn write(&mut self, kind: Dc, bytes: &[u8]) -> Result<(), BusError> {
        (**self).write(kind, bytes)
    }

    fn is_busy(&mut self) -> Result<bool, BusError> {
        (**self).is_busy()
    }

    fn reset(&mut self) -> Result<(), BusError> {
        (**self).reset()
    }

    fn delay(&mut self, duration: Duration) {
        (**self).delay(duration)
    }
}

/// The owned, type-erased bus the coordinator moves onto blocking threads.
pub type BoxedBus = Box<dyn PanelBus + Send>;
