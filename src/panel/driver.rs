//! Protocol state machine for the 7in3f controller.

use std::fmt;
use std::time::Duration;

use eink_frame::PackedFrame;
use thiserror::Error;
use tokio::sync::watch;

use super::bus::{BusError, Dc, PanelBus};
use super::commands::*;
use crate::models::PanelSpec;

/// Where the panel is in its command sequence.
///
/// `Transmitting` and `Refreshing` only exist while [`PanelDriver::send`] or
/// [`PanelDriver::refresh`] is running; observers see them through
/// [`PanelDriver::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PanelState {
    Uninitialized,
    Ready,
    Transmitting,
    Refreshing,
    Sleeping,
    /// Needs a fresh `initialize()`.
    Faulted,
}

impl fmt::Display for PanelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PanelState::Uninitialized => "uninitialized",
            PanelState::Ready => "ready",
            PanelState::Transmitting => "transmitting",
            PanelState::Refreshing => "refreshing",
            PanelState::Sleeping => "sleeping",
            PanelState::Faulted => "faulted",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PanelError {
    #[error("bus error: {0}")]
    Bus(#[from] BusError),

    #[error("panel stayed busy after {phase} for {waited_ms} ms")]
    BusyTimeout { phase: &'static str, waited_ms: u64 },

    #[error("refresh did not complete within {timeout_ms} ms")]
    RefreshTimeout { timeout_ms: u64 },

    #[error("cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: PanelState,
    },

    #[error("frame is {actual} bytes, panel expects {expected}")]
    FrameSize { expected: usize, actual: usize },
}

/// Owns the bus and walks the panel through
/// `initialize → send → refresh → sleep`.
///
/// Any bus error or busy timeout leaves the driver `Faulted`; only
/// `initialize()` leaves that state. Misuse errors (`InvalidState`,
/// `FrameSize`) are detected before touching the bus and change nothing.
pub struct PanelDriver<B> {
    bus: B,
    spec: PanelSpec,
    timing: PanelTiming,
    state: PanelState,
    refreshes: u64,
    observer: watch::Sender<PanelState>,
}

impl<B: PanelBus> PanelDriver<B> {
    pub fn new(bus: B, spec: PanelSpec, timing: PanelTiming) -> Self {
        let (observer, _) = watch::channel(PanelState::Uninitialized);
        Self {
            bus,
            spec,
            timing,
            state: PanelState::Uninitialized,
            refreshes: 0,
            observer,
        }
    }

    pub fn state(&self) -> PanelState {
        self.state
    }

    /// Receiver that follows every state change, readable without the driver.
    pub fn subscribe(&self) -> watch::Receiver<PanelState> {
        self.observer.subscribe()
    }

    pub fn spec(&self) -> &PanelSpec {
        &self.spec
    }

    pub fn timing(&self) -> &PanelTiming {
        &self.timing
    }

    /// Completed refreshes since construction.
    pub fn refresh_count(&self) -> u64 {
        self.refreshes
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Reset the controller and load the register configuration.
    ///
    /// Allowed from `Uninitialized`, `Sleeping` and `Faulted`; a no-op when
    /// already `Ready`.
    pub fn initialize(&mut self) -> Result<(), PanelError> {
        match self.state {
            PanelState::Ready => return Ok(()),
            PanelState::Uninitialized | PanelState::Sleeping | PanelState::Faulted => {}
            state => {
                return Err(PanelError::InvalidState {
                    operation: "initialize",
                    state,
                })
            }
        }

        self.guarded(|d| {
            d.bus.reset()?;
            d.wait_idle("reset", d.timing.command_timeout)?;
            d.bus.delay(d.timing.reset_settle);
            for &(cmd, data) in INIT_SEQUENCE {
                d.command(cmd, data)?;
            }
            Ok(())
        })?;

        self.set_state(PanelState::Ready);
        tracing::debug!(panel = self.spec.name, "Panel initialized");
        Ok(())
    }

    /// Stream a packed frame into display RAM.
    ///
    /// Nothing visible changes until [`refresh`](Self::refresh).
    pub fn send(&mut self, frame: &PackedFrame) -> Result<(), PanelError> {
        self.require_ready("send")?;
        let expected = self.spec.frame_len();
        if frame.len() != expected {
            return Err(PanelError::FrameSize {
                expected,
                actual: frame.len(),
            });
        }

        self.set_state(PanelState::Transmitting);
        let chunks = self.guarded(|d| {
            d.bus.write(Dc::Command, &[CMD_DTM1])?;
            let mut chunks = 0usize;
            for chunk in frame.as_bytes().chunks(MAX_TRANSFER) {
                d.bus.write(Dc::Data, chunk)?;
                chunks += 1;
            }
            Ok(chunks)
        })?;

        self.set_state(PanelState::Ready);
        tracing::debug!(bytes = frame.len(), chunks, "Frame transmitted");
        Ok(())
    }

    /// Power on, refresh, wait for the panel, power off.
    ///
    /// Blocks the calling thread for the whole refresh.
    pub fn refresh(&mut self) -> Result<(), PanelError> {
        self.require_ready("refresh")?;

        let refresh_timeout = self.timing.refresh_timeout;
        let polls = self.guarded(|d| {
            d.bus.write(Dc::Command, &[CMD_PON])?;
            d.wait_idle("power on", d.timing.command_timeout)?;

            d.command(CMD_DRF, &[0x00])?;
            d.set_state(PanelState::Refreshing);
            let polls = d
                .wait_idle("refresh", refresh_timeout)
                .map_err(|e| match e {
                    PanelError::BusyTimeout { .. } => PanelError::RefreshTimeout {
                        timeout_ms: refresh_timeout.as_millis() as u64,
                    },
                    other => other,
                })?;

            d.command(CMD_POF, &[0x00])?;
            d.wait_idle("power off", d.timing.command_timeout)?;
            Ok(polls)
        })?;

        self.refreshes += 1;
        self.set_state(PanelState::Ready);
        tracing::debug!(polls, "Panel refreshed");
        Ok(())
    }

    /// Put the controller into deep sleep.
    ///
    /// From `Ready` this moves to `Sleeping`. A no-op from `Sleeping` or
    /// `Uninitialized`. From `Faulted` the command is sent best-effort and the
    /// state stays `Faulted`.
    pub fn sleep(&mut self) -> Result<(), PanelError> {
        match self.state {
            PanelState::Sleeping | PanelState::Uninitialized => Ok(()),
            PanelState::Ready => {
                self.guarded(|d| d.command(CMD_DSLP, &[DEEP_SLEEP_CHECK]))?;
                self.set_state(PanelState::Sleeping);
                tracing::debug!("Panel sleeping");
                Ok(())
            }
            PanelState::Faulted => {
                let result = self.command(CMD_DSLP, &[DEEP_SLEEP_CHECK]);
                if let Err(ref e) = result {
                    tracing::warn!(error = %e, "Deep sleep after fault failed");
                }
                result
            }
            state => Err(PanelError::InvalidState {
                operation: "sleep",
                state,
            }),
        }
    }

    fn require_ready(&self, operation: &'static str) -> Result<(), PanelError> {
        if self.state == PanelState::Ready {
            Ok(())
        } else {
            Err(PanelError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    /// Run a hardware step; any error leaves the driver `Faulted`.
    fn guarded<T>(
        &mut self,
        step: impl FnOnce(&mut Self) -> Result<T, PanelError>,
    ) -> Result<T, PanelError> {
        let result = step(self);
        if let Err(ref e) = result {
            tracing::warn!(error = %e, state = %self.state, "Panel fault");
            self.set_state(PanelState::Faulted);
        }
        result
    }

    fn command(&mut self, cmd: u8, data: &[u8]) -> Result<(), PanelError> {
        self.bus.write(Dc::Command, &[cmd])?;
        if !data.is_empty() {
            self.bus.write(Dc::Data, data)?;
        }
        Ok(())
    }

    /// Poll until the busy line clears; returns the number of polls taken.
    fn wait_idle(&mut self, phase: &'static str, timeout: Duration) -> Result<u32, PanelError> {
        let max_polls = self.timing.max_polls(timeout);
        for poll in 1..=max_polls {
            if !self.bus.is_busy()? {
                return Ok(poll);
            }
            self.bus.delay(self.timing.poll_interval);
        }
        Err(PanelError::BusyTimeout {
            phase,
            waited_ms: (self.timing.poll_interval * max_polls).as_millis() as u64,
        })
    }

    fn set_state(&mut self, state: PanelState) {
        if self.state != state {
            tracing::trace!(from = %self.state, to = %state, "Panel state");
        }
        self.state = state;
        self.observer.send_replace(state);
    }
}
