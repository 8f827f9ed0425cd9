//! Exclusive access to the panel for concurrent render requests.
//!
//! Every request joins a single FIFO queue (a `tokio::sync::Mutex`) for the
//! driver on arrival and is quantized and packed while it waits, so a slow
//! conversion never loses its place. The lock guard is the display session:
//! it moves into the blocking pool together with the frame and is dropped
//! when the hardware cycle ends, whatever its outcome.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use eink_frame::{pack, PackedFrame, Quantizer, RasterImage};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::sync::{watch, Mutex, OwnedMutexGuard};
use utoipa::ToSchema;

use crate::error::RenderError;
use crate::models::PanelSpec;
use crate::panel::{BoxedBus, PanelDriver, PanelError, PanelState};
use crate::rendering::{encode_preview, prune_previews, save_preview};

#[derive(Debug, Clone)]
pub struct CoordinatorOptions {
    /// Longest a request waits for the panel before giving up
    pub queue_timeout: Duration,

    /// Directory for previews of displayed frames, `None` to skip them
    pub preview_dir: Option<PathBuf>,

    /// Most recent previews kept in `preview_dir`; 0 keeps all
    pub preview_keep: usize,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            queue_timeout: Duration::from_secs(120),
            preview_dir: None,
            preview_keep: 20,
        }
    }
}

/// Outcome of a successful render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderReport {
    /// 1-based number of the hardware cycle
    pub cycle: u64,
    /// Time spent waiting for the panel
    pub queued: Duration,
    /// Time spent driving the panel
    pub hardware: Duration,
    /// File name of the preview inside the preview directory
    pub preview_file: Option<String>,
}

/// Snapshot of the coordinator, readable while a cycle is running.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CoordinatorStatus {
    pub panel: String,
    pub width: u32,
    pub height: u32,
    pub state: PanelState,
    pub completed: u64,
    pub failed: u64,
    pub queue_timeouts: u64,
    /// Requests currently waiting for the panel
    pub waiting: usize,
    #[schema(value_type = Option<String>)]
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

#[derive(Debug, Default)]
struct Stats {
    completed: u64,
    failed: u64,
    queue_timeouts: u64,
    last_success: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

type SharedStats = Arc<StdMutex<Stats>>;

type Session = OwnedMutexGuard<PanelDriver<BoxedBus>>;

fn lock_stats(stats: &StdMutex<Stats>) -> std::sync::MutexGuard<'_, Stats> {
    stats.lock().unwrap_or_else(|e| e.into_inner())
}

/// Decrements the waiting count even if the request is dropped mid-wait.
struct Waiting<'a>(&'a AtomicUsize);

impl<'a> Waiting<'a> {
    fn enter(count: &'a AtomicUsize) -> Self {
        count.fetch_add(1, Ordering::SeqCst);
        Self(count)
    }
}

impl Drop for Waiting<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

struct Prepared {
    frame: PackedFrame,
    preview: Option<(String, Vec<u8>)>,
}

pub struct DisplayCoordinator {
    driver: Arc<Mutex<PanelDriver<BoxedBus>>>,
    panel_state: watch::Receiver<PanelState>,
    spec: PanelSpec,
    quantizer: Arc<Quantizer>,
    options: CoordinatorOptions,
    cycles: AtomicU64,
    waiting: AtomicUsize,
    stats: SharedStats,
}

impl DisplayCoordinator {
    /// Take ownership of the panel driver.
    pub fn new(
        driver: PanelDriver<BoxedBus>,
        quantizer: Quantizer,
        options: CoordinatorOptions,
    ) -> Self {
        let panel_state = driver.subscribe();
        let spec = *driver.spec();
        Self {
            driver: Arc::new(Mutex::new(driver)),
            panel_state,
            spec,
            quantizer: Arc::new(quantizer),
            options,
            cycles: AtomicU64::new(0),
            waiting: AtomicUsize::new(0),
            stats: SharedStats::default(),
        }
    }

    pub fn spec(&self) -> &PanelSpec {
        &self.spec
    }

    pub fn options(&self) -> &CoordinatorOptions {
        &self.options
    }

    pub fn panel_state(&self) -> PanelState {
        *self.panel_state.borrow()
    }

    /// Quantize, pack and show `image` on the panel.
    ///
    /// Takes its place in the queue immediately and prepares the frame while
    /// waiting behind any cycle already in progress, for at most the queue
    /// timeout. An invalid image fails with [`RenderError::Input`] and gives
    /// up its place. The preview is written only once the frame is on the
    /// panel.
    pub async fn render(&self, image: RasterImage) -> Result<RenderReport, RenderError> {
        let (Prepared { frame, preview }, (session, queued)) =
            tokio::try_join!(self.prepare(image), self.admit())?;

        let (cycle, hardware) = self.run(session, frame).await?;

        let preview_file = match (&self.options.preview_dir, preview) {
            (Some(dir), Some((name, png))) => self.store_preview(dir, &name, &png).await,
            _ => None,
        };

        Ok(RenderReport {
            cycle,
            queued,
            hardware,
            preview_file,
        })
    }

    async fn store_preview(&self, dir: &Path, name: &str, png: &[u8]) -> Option<String> {
        let path = match save_preview(dir, name, png).await {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(%e, "Failed to write preview");
                return None;
            }
        };
        if self.options.preview_keep > 0 {
            if let Err(e) = prune_previews(dir, self.options.preview_keep, &path).await {
                tracing::warn!(%e, "Failed to prune previews");
            }
        }
        Some(format!("{name}.png"))
    }

    /// Wait for the panel. Returns the session and the time spent queued.
    async fn admit(&self) -> Result<(Session, Duration), RenderError> {
        let queued_at = Instant::now();
        let admitted = {
            let _waiting = Waiting::enter(&self.waiting);
            tokio::time::timeout(self.options.queue_timeout, self.driver.clone().lock_owned())
                .await
        };
        let queued = queued_at.elapsed();

        match admitted {
            Ok(session) => Ok((session, queued)),
            Err(_) => {
                let waited_ms = queued.as_millis() as u64;
                let err = RenderError::ConcurrencyTimeout { waited_ms };
                tracing::warn!(waited_ms, "Render request timed out waiting for the panel");
                let mut stats = lock_stats(&self.stats);
                stats.queue_timeouts += 1;
                stats.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Run one hardware cycle. Returns the cycle number and the hardware time.
    async fn run(
        &self,
        mut session: Session,
        frame: PackedFrame,
    ) -> Result<(u64, Duration), RenderError> {
        let cycle = self.cycles.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!(cycle, "Render cycle admitted");

        let stats = self.stats.clone();
        let started = Instant::now();
        // Once handed to the blocking pool the cycle runs to completion even
        // if the caller goes away; the session is released when it returns.
        let joined = tokio::task::spawn_blocking(move || {
            let result = run_cycle(&mut session, &frame).map_err(RenderError::from);
            record(&stats, cycle, &result);
            result
        })
        .await;
        let hardware = started.elapsed();

        match joined {
            Ok(Ok(())) => {
                tracing::info!(
                    cycle,
                    elapsed_ms = hardware.as_millis() as u64,
                    "Render cycle complete"
                );
                Ok((cycle, hardware))
            }
            Ok(Err(e)) => Err(e),
            Err(e) => {
                let err = RenderError::Worker {
                    hardware: true,
                    message: e.to_string(),
                };
                tracing::error!(cycle, %err, "Render cycle aborted");
                let mut stats = lock_stats(&self.stats);
                stats.failed += 1;
                stats.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    pub fn status(&self) -> CoordinatorStatus {
        let stats = lock_stats(&self.stats);
        CoordinatorStatus {
            panel: self.spec.name.to_string(),
            width: self.spec.width,
            height: self.spec.height,
            state: self.panel_state(),
            completed: stats.completed,
            failed: stats.failed,
            queue_timeouts: stats.queue_timeouts,
            waiting: self.waiting.load(Ordering::SeqCst),
            last_success: stats.last_success,
            last_error: stats.last_error.clone(),
        }
    }

    async fn prepare(&self, image: RasterImage) -> Result<Prepared, RenderError> {
        let quantizer = self.quantizer.clone();
        let (width, height) = (self.spec.width, self.spec.height);
        let with_preview = self.options.preview_dir.is_some();

        tokio::task::spawn_blocking(move || -> Result<Prepared, RenderError> {
            let started = Instant::now();
            let raster = quantizer.quantize(&image, width, height)?;
            let frame = pack(&raster);
            tracing::debug!(
                source_width = image.width(),
                source_height = image.height(),
                bytes = frame.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Frame prepared"
            );

            let preview = if with_preview {
                match encode_preview(&frame, quantizer.palette()) {
                    Ok(png) => Some((frame_digest(&frame), png)),
                    Err(e) => {
                        tracing::warn!(%e, "Failed to encode preview");
                        None
                    }
                }
            } else {
                None
            };

            Ok(Prepared { frame, preview })
        })
        .await
        .map_err(|e| RenderError::Worker {
            hardware: false,
            message: e.to_string(),
        })?
    }
}

/// First 16 hex digits of the SHA-256 of the frame bytes.
fn frame_digest(frame: &PackedFrame) -> String {
    let digest = Sha256::digest(frame.as_bytes());
    hex::encode(&digest[..8])
}

/// `initialize → send → refresh → sleep`, with a best-effort sleep after a
/// failure at any step.
fn run_cycle(driver: &mut PanelDriver<BoxedBus>, frame: &PackedFrame) -> Result<(), PanelError> {
    let steps = |driver: &mut PanelDriver<BoxedBus>| -> Result<(), PanelError> {
        driver.initialize()?;
        driver.send(frame)?;
        driver.refresh()?;
        driver.sleep()
    };

    let result = steps(driver);
    if result.is_err() {
        // the originating error wins; sleep() logs its own failure
        let _ = driver.sleep();
    }
    result
}

fn record(stats: &StdMutex<Stats>, cycle: u64, result: &Result<(), RenderError>) {
    let mut stats = lock_stats(stats);
    match result {
        Ok(()) => {
            stats.completed += 1;
            stats.last_success = Some(Utc::now());
        }
        Err(e) => {
            tracing::error!(cycle, error = %e, hardware = e.hardware_touched(), "Render cycle failed");
            stats.failed += 1;
            stats.last_error = Some(e.to_string());
        }
    }
}
