//! Outlets for transforms, pose estimates and annotated frames.
//!
//! The pipeline never talks to a transport directly; it hands its outputs to
//! an injected [`FrameSink`].

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use aruco_localizer_core::{FrameTransform, Stamp};
use image::RgbImage;
use serde::Serialize;

use crate::composer::PoseEstimate;

/// Receiver of per-frame outputs. Implementations must tolerate calls from
/// several threads.
pub trait FrameSink: Send + Sync {
    fn send_transforms(&self, transforms: &[FrameTransform]);

    fn send_estimate(&self, _estimate: &PoseEstimate) {}

    /// Every frame that carried an image, annotated or not.
    fn send_image(&self, _seq: u64, _stamp: Stamp, _image: &RgbImage) {}
}

/// Discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl FrameSink for NullSink {
    fn send_transforms(&self, _transforms: &[FrameTransform]) {}
}

/// Keeps every output in memory. Mostly useful in tests.
#[derive(Debug, Default)]
pub struct CapturingSink {
    transforms: Mutex<Vec<FrameTransform>>,
    estimates: Mutex<Vec<PoseEstimate>>,
    images: Mutex<Vec<(u64, Stamp)>>,
}

impl CapturingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transforms(&self) -> Vec<FrameTransform> {
        lock(&self.transforms).clone()
    }

    pub fn estimates(&self) -> Vec<PoseEstimate> {
        lock(&self.estimates).clone()
    }

    /// `(seq, stamp)` of every annotated image received.
    pub fn images(&self) -> Vec<(u64, Stamp)> {
        lock(&self.images).clone()
    }
}

impl FrameSink for CapturingSink {
    fn send_transforms(&self, transforms: &[FrameTransform]) {
        lock(&self.transforms).extend_from_slice(transforms);
    }

    fn send_estimate(&self, estimate: &PoseEstimate) {
        lock(&self.estimates).push(estimate.clone());
    }

    fn send_image(&self, seq: u64, stamp: Stamp, _image: &RgbImage) {
        lock(&self.images).push((seq, stamp));
    }
}

#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
enum Record<'a> {
    Transform(&'a FrameTransform),
    Estimate(&'a PoseEstimate),
}

/// Writes one JSON object per line: `{"transform": ...}` or `{"estimate": ...}`.
pub struct JsonLinesSink<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self, record: &Record<'_>) {
        let mut out = lock(&self.out);
        let res = serde_json::to_writer(&mut *out, record)
            .map_err(std::io::Error::from)
            .and_then(|()| out.write_all(b"\n"))
            .and_then(|()| out.flush());
        if let Err(err) = res {
            log::error!("failed to write output record: {err}");
        }
    }
}

impl<W: Write + Send> FrameSink for JsonLinesSink<W> {
    fn send_transforms(&self, transforms: &[FrameTransform]) {
        for tf in transforms {
            self.write(&Record::Transform(tf));
        }
    }

    fn send_estimate(&self, estimate: &PoseEstimate) {
        self.write(&Record::Estimate(estimate));
    }
}

/// Saves output frames as `frame_NNNNNN.png` into a directory.
#[derive(Clone, Debug)]
pub struct ImageDirSink {
    dir: PathBuf,
}

impl ImageDirSink {
    /// Create the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn frame_path(&self, seq: u64) -> PathBuf {
        self.dir.join(format!("frame_{seq:06}.png"))
    }
}

impl FrameSink for ImageDirSink {
    fn send_transforms(&self, _transforms: &[FrameTransform]) {}

    fn send_image(&self, seq: u64, _stamp: Stamp, image: &RgbImage) {
        let path = self.frame_path(seq);
        if let Err(err) = image.save(&path) {
            log::error!("failed to save frame {}: {err}", path.display());
        }
    }
}

/// Forwards every output to each inner sink in order.
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn FrameSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn FrameSink>>) -> Self {
        Self { sinks }
    }

    pub fn push(&mut self, sink: Arc<dyn FrameSink>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl FrameSink for FanoutSink {
    fn send_transforms(&self, transforms: &[FrameTransform]) {
        for s in &self.sinks {
            s.send_transforms(transforms);
        }
    }

    fn send_estimate(&self, estimate: &PoseEstimate) {
        for s in &self.sinks {
            s.send_estimate(estimate);
        }
    }

    fn send_image(&self, seq: u64, stamp: Stamp, image: &RgbImage) {
        for s in &self.sinks {
            s.send_image(seq, stamp, image);
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
