//! Live monitoring loop.
//!
//! A fixed-interval timer pulls a frame from a [`FrameSource`] and analyzes
//! it on the blocking pool. A tick that fires while the previous cycle is
//! still running is dropped. Stopping ends the timer; cycles already
//! running finish, but their results are not delivered.

use super::detector::Detector;
use super::inputs::collect_image_files;
use crate::detection::Detection;
use crate::error::{Error, Result};
use crate::inference::Frame;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Supplies frames to the monitor.
pub trait FrameSource: Send {
    /// Next frame with a label for reporting, or `None` if nothing is ready.
    fn next_frame(&mut self) -> Result<Option<(String, Frame)>>;
}

/// Replays the images of a directory in order, looping at the end.
#[derive(Debug)]
pub struct DirectoryFrameSource {
    files: Vec<PathBuf>,
    position: usize,
}

impl DirectoryFrameSource {
    /// Collect the images under `dir`.
    pub fn new(dir: &Path) -> Result<Self> {
        let files = collect_image_files(&[dir.to_path_buf()])?;
        if files.is_empty() {
            return Err(Error::NoValidImageFiles);
        }
        Ok(Self { files, position: 0 })
    }

    /// Number of images in rotation.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether there are no images.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FrameSource for DirectoryFrameSource {
    fn next_frame(&mut self) -> Result<Option<(String, Frame)>> {
        let Some(path) = self.files.get(self.position) else {
            return Ok(None);
        };
        self.position = (self.position + 1) % self.files.len();
        let label = path.display().to_string();
        Frame::from_path(path).map(|frame| Some((label, frame)))
    }
}

/// Admits one cycle at a time.
#[derive(Debug, Clone, Default)]
pub struct CycleGate {
    busy: Arc<AtomicBool>,
}

impl CycleGate {
    /// Claim the gate, or `None` while a cycle holds it.
    pub fn try_enter(&self) -> Option<CycleGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| CycleGuard {
                busy: Arc::clone(&self.busy),
            })
    }

    /// Whether a cycle currently holds the gate.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Releases the [`CycleGate`] when dropped.
#[derive(Debug)]
pub struct CycleGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for CycleGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// Outcome of one cycle, as delivered to the caller.
#[derive(Debug)]
pub enum MonitorEvent {
    /// A frame was analyzed.
    Detection {
        /// Frame label.
        source: String,
        /// The detection.
        detection: Detection,
    },
    /// A frame could not be decoded or preprocessed.
    FrameSkipped {
        /// Frame label, if the frame was read.
        source: Option<String>,
        /// What went wrong.
        error: Error,
    },
    /// The source had no frame ready.
    Idle,
}

/// Counters for a finished monitoring run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorSummary {
    /// Cycles started.
    pub cycles: usize,
    /// Ticks dropped because a cycle was in flight.
    pub skipped_ticks: usize,
    /// Detections delivered.
    pub detections: usize,
    /// Frames skipped due to frame errors.
    pub frame_errors: usize,
}

/// Stops a running [`Monitor`] from any thread.
#[derive(Debug, Clone)]
pub struct MonitorHandle {
    stop: Arc<watch::Sender<bool>>,
    active: Arc<AtomicBool>,
}

impl MonitorHandle {
    /// Request the monitor to stop.
    pub fn stop(&self) {
        self.stop.send_replace(true);
    }

    /// Whether the monitor loop is running.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

type SharedSource = Arc<Mutex<Box<dyn FrameSource>>>;

/// Fixed-interval monitoring loop over a shared detector.
pub struct Monitor {
    detector: Arc<Mutex<Detector>>,
    source: SharedSource,
    interval: Duration,
    max_cycles: Option<usize>,
    gate: CycleGate,
    stop: watch::Receiver<bool>,
    handle: MonitorHandle,
}

impl std::fmt::Debug for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("interval", &self.interval)
            .field("max_cycles", &self.max_cycles)
            .finish_non_exhaustive()
    }
}

impl Monitor {
    /// Create a monitor polling `source` every `interval`.
    pub fn new(
        detector: Arc<Mutex<Detector>>,
        source: Box<dyn FrameSource>,
        interval: Duration,
    ) -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            detector,
            source: Arc::new(Mutex::new(source)),
            interval,
            max_cycles: None,
            gate: CycleGate::default(),
            stop: rx,
            handle: MonitorHandle {
                stop: Arc::new(tx),
                active: Arc::new(AtomicBool::new(false)),
            },
        }
    }

    /// Stop by itself after `max` completed cycles.
    #[must_use]
    pub fn with_max_cycles(mut self, max: usize) -> Self {
        self.max_cycles = Some(max);
        self
    }

    /// Handle for stopping the loop.
    pub fn handle(&self) -> MonitorHandle {
        self.handle.clone()
    }

    /// Run until stopped, the cycle limit is reached, or a cycle fails
    /// with a non-frame error.
    pub async fn run<F>(mut self, mut on_event: F) -> Result<MonitorSummary>
    where
        F: FnMut(&MonitorEvent),
    {
        let mut summary = MonitorSummary::default();
        let (tx, mut rx) = mpsc::unbounded_channel::<Result<MonitorEvent>>();
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut completed = 0usize;
        let limit = self.max_cycles.unwrap_or(usize::MAX);

        self.handle.active.store(true, Ordering::SeqCst);
        info!("Monitoring every {} ms", self.interval.as_millis());

        let outcome = loop {
            if completed >= limit {
                break Ok(());
            }
            tokio::select! {
                changed = self.stop.changed() => {
                    if changed.is_err() || *self.stop.borrow() {
                        info!("Monitoring stopped");
                        break Ok(());
                    }
                }
                _ = ticker.tick() => {
                    if summary.cycles >= limit {
                        continue;
                    }
                    let Some(guard) = self.gate.try_enter() else {
                        summary.skipped_ticks += 1;
                        debug!("Cycle still running, skipping tick");
                        continue;
                    };
                    summary.cycles += 1;
                    let detector = Arc::clone(&self.detector);
                    let source = Arc::clone(&self.source);
                    let tx = tx.clone();
                    tokio::task::spawn_blocking(move || {
                        let _guard = guard;
                        // The receiver is gone once the loop has stopped.
                        let _ = tx.send(run_cycle(&detector, &source));
                    });
                }
                Some(result) = rx.recv() => {
                    completed += 1;
                    match result {
                        Ok(event) => {
                            match &event {
                                MonitorEvent::Detection { .. } => summary.detections += 1,
                                MonitorEvent::FrameSkipped { source, error } => {
                                    summary.frame_errors += 1;
                                    warn!(
                                        "Skipping frame {}: {error}",
                                        source.as_deref().unwrap_or("<unread>")
                                    );
                                }
                                MonitorEvent::Idle => {}
                            }
                            on_event(&event);
                        }
                        Err(e) => {
                            error!("Monitoring cycle failed: {e}");
                            break Err(e);
                        }
                    }
                }
            }
        };

        self.handle.active.store(false, Ordering::SeqCst);
        outcome.map(|()| summary)
    }
}

fn lock_poisoned(what: &str) -> Error {
    Error::Internal {
        message: format!("{what} lock poisoned"),
    }
}

fn run_cycle(detector: &Mutex<Detector>, source: &SharedSource) -> Result<MonitorEvent> {
    let next = source
        .lock()
        .map_err(|_| lock_poisoned("frame source"))?
        .next_frame();
    let (label, frame) = match next {
        Ok(Some(item)) => item,
        Ok(None) => return Ok(MonitorEvent::Idle),
        Err(e) if e.is_frame_error() => {
            return Ok(MonitorEvent::FrameSkipped {
                source: None,
                error: e,
            });
        }
        Err(e) => return Err(e),
    };

    let mut detector = detector.lock().map_err(|_| lock_poisoned("detector"))?;
    match detector.analyze(&frame) {
        Ok(detection) => Ok(MonitorEvent::Detection {
            source: label,
            detection,
        }),
        Err(e) if e.is_frame_error() => Ok(MonitorEvent::FrameSkipped {
            source: Some(label),
            error: e,
        }),
        Err(e) => Err(e),
    }
}
