//! In-memory stand-in for the panel hardware.
//!
//! Records every write, models the busy line after the commands that start
//! long-running controller work, and can be told to fail.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::bus::{BusError, Dc, PanelBus};
use super::commands::{CMD_DRF, CMD_DTM1, CMD_POF, CMD_PON};

/// One recorded bus operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    Reset,
    Command(u8),
    Data(Vec<u8>),
}

/// Injected failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// Writing this command byte is rejected.
    Command(u8),
    /// The n-th data write (0-based) after `DTM1` is rejected.
    FrameChunk(usize),
    /// Reading the busy line fails.
    BusyRead,
}

#[derive(Debug, Default)]
struct LogInner {
    events: Vec<BusEvent>,
    busy_polls: u64,
    elapsed: Duration,
}

/// Shared view of a [`SimulatedPanel`]'s transcript.
///
/// Clone it before moving the panel into a driver; both handles see the same
/// log.
#[derive(Debug, Clone, Default)]
pub struct SimulatedPanelLog {
    inner: Arc<Mutex<LogInner>>,
}

impl SimulatedPanelLog {
    fn lock(&self) -> MutexGuard<'_, LogInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn events(&self) -> Vec<BusEvent> {
        self.lock().events.clone()
    }

    /// Command bytes in the order they were written.
    pub fn commands(&self) -> Vec<u8> {
        self.lock()
            .events
            .iter()
            .filter_map(|e| match e {
                BusEvent::Command(c) => Some(*c),
                _ => None,
            })
            .collect()
    }

    pub fn count_command(&self, cmd: u8) -> usize {
        self.commands().iter().filter(|&&c| c == cmd).count()
    }

    pub fn resets(&self) -> usize {
        self.lock()
            .events
            .iter()
            .filter(|e| matches!(e, BusEvent::Reset))
            .count()
    }

    /// Data written after the most recent `DTM1`, concatenated.
    pub fn last_frame(&self) -> Option<Vec<u8>> {
        let inner = self.lock();
        let start = inner
            .events
            .iter()
            .rposition(|e| *e == BusEvent::Command(CMD_DTM1))?;
        let mut frame = Vec::new();
        for event in &inner.events[start + 1..] {
            match event {
                BusEvent::Data(bytes) => frame.extend_from_slice(bytes),
                _ => break,
            }
        }
        Some(frame)
    }

    /// Sizes of the data writes after the most recent `DTM1`.
    pub fn last_frame_chunks(&self) -> Vec<usize> {
        let inner = self.lock();
        let Some(start) = inner
            .events
            .iter()
            .rposition(|e| *e == BusEvent::Command(CMD_DTM1))
        else {
            return Vec::new();
        };
        inner.events[start + 1..]
            .iter()
            .map_while(|e| match e {
                BusEvent::Data(bytes) => Some(bytes.len()),
                _ => None,
            })
            .collect()
    }

    pub fn busy_polls(&self) -> u64 {
        self.lock().busy_polls
    }

    /// Time spent in `delay()`, virtual or real.
    pub fn elapsed(&self) -> Duration {
        self.lock().elapsed
    }
}

/// A [`PanelBus`] with scripted busy behavior.
///
/// After a reset, `PON`, `DRF` or `POF` the busy line reads busy for
/// `busy_polls` polls. `hang_after` makes it stick after one specific
/// trigger. `delay()` only advances the virtual clock unless real time is
/// enabled.
#[derive(Debug)]
pub struct SimulatedPanel {
    log: SimulatedPanelLog,
    busy_polls: u32,
    busy_remaining: u32,
    stuck: bool,
    hang_after: Option<BusyTrigger>,
    failure: Option<Failure>,
    frame_chunk: Option<usize>,
    real_time: bool,
}

/// Operations that raise the busy line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusyTrigger {
    Reset,
    Command(u8),
}

impl Default for SimulatedPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedPanel {
    /// Busy for 3 polls after each trigger, no failures, virtual time.
    pub fn new() -> Self {
        Self {
            log: SimulatedPanelLog::default(),
            busy_polls: 3,
            busy_remaining: 0,
            stuck: false,
            hang_after: None,
            failure: None,
            frame_chunk: None,
            real_time: false,
        }
    }

    pub fn busy_polls(mut self, polls: u32) -> Self {
        self.busy_polls = polls;
        self
    }

    /// The busy line never clears after `trigger`.
    pub fn hang_after(mut self, trigger: BusyTrigger) -> Self {
        self.hang_after = Some(trigger);
        self
    }

    pub fn fail(mut self, failure: Failure) -> Self {
        self.failure = Some(failure);
        self
    }

    /// Sleep for real in `delay()` as well as advancing the clock.
    pub fn real_time(mut self, enabled: bool) -> Self {
        self.real_time = enabled;
        self
    }

    pub fn log(&self) -> SimulatedPanelLog {
        self.log.clone()
    }

    fn raise_busy(&mut self, trigger: BusyTrigger) {
        self.busy_remaining = self.busy_polls;
        if self.hang_after == Some(trigger) {
            self.stuck = true;
        }
    }
}

impl PanelBus for SimulatedPanel {
    fn write(&mut self, kind: Dc, bytes: &[u8]) -> Result<(), BusError> {
        match kind {
            Dc::Command => {
                let cmd = bytes.first().copied().unwrap_or_default();
                if self.failure == Some(Failure::Command(cmd)) {
                    return Err(BusError::Write(format!("command 0x{cmd:02X} rejected")));
                }
                self.frame_chunk = (cmd == CMD_DTM1).then_some(0);
                self.log.lock().events.push(BusEvent::Command(cmd));
                if matches!(cmd, CMD_PON | CMD_DRF | CMD_POF) {
                    self.raise_busy(BusyTrigger::Command(cmd));
                }
            }
            Dc::Data => {
                if let Some(n) = self.frame_chunk {
                    if self.failure == Some(Failure::FrameChunk(n)) {
                        return Err(BusError::Write(format!("frame chunk {n} rejected")));
                    }
                    self.frame_chunk = Some(n + 1);
                }
                self.log.lock().events.push(BusEvent::Data(bytes.to_vec()));
            }
        }
        Ok(())
    }

    fn is_busy(&mut self) -> Result<bool, BusError> {
        if self.failure == Some(Failure::BusyRead) {
            return Err(BusError::BusyRead("busy pin unreadable".to_string()));
        }
        self.log.lock().busy_polls += 1;
        if self.stuck {
            return Ok(true);
        }
        if self.busy_remaining > 0 {
            self.busy_remaining -= 1;
            return Ok(true);
        }
        Ok(false)
    }

    fn reset(&mut self) -> Result<(), BusError> {
        self.stuck = false;
        self.frame_chunk = None;
        self.log.lock().events.push(BusEvent::Reset);
        self.raise_busy(BusyTrigger::Reset);
        Ok(())
    }

    fn delay(&mut self, duration: Duration) {
        self.log.lock().elapsed += duration;
        if self.real_time {
            std::thread::sleep(duration);
        }
    }
}
