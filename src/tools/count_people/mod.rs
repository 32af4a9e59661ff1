//! Camera people counter
//!
//! Each sampled frame goes through every configured detector; the detector
//! reporting the most faces wins, its boxes are de-duplicated, and the
//! largest count across frames is reported.

mod camera;
mod detect;
mod vision;

use std::sync::Arc;

use async_trait::async_trait;

pub use camera::CommandCamera;
pub use detect::{FaceBox, overlap_ratio, remove_duplicates, select_best_detections};
pub use vision::{VisionFaceDetector, parse_face_boxes};

use super::Tool;
use crate::{Error, Result};

/// One encoded still image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub data: Vec<u8>,
    pub mime_type: String,
}

impl Frame {
    /// Wrap encoded image bytes, sniffing PNG vs JPEG from the header
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        let mime_type = if data.starts_with(b"\x89PNG") {
            "image/png"
        } else {
            "image/jpeg"
        };
        Self {
            data,
            mime_type: mime_type.to_string(),
        }
    }
}

/// Exclusive camera device
pub trait Camera: Send + Sync {
    /// Acquire the camera; dropping the session releases it
    ///
    /// # Errors
    ///
    /// Returns error if the camera is unavailable or already in use
    fn open(&self) -> Result<Box<dyn CameraSession>>;
}

/// An acquired camera
#[async_trait]
pub trait CameraSession: Send {
    /// Grab one frame; `None` when the device returned nothing
    ///
    /// # Errors
    ///
    /// Returns error if the capture fails
    async fn capture_frame(&mut self) -> Result<Option<Frame>>;
}

/// Finds face boxes in a frame
#[async_trait]
pub trait FaceDetector: Send + Sync {
    /// Detect faces in `frame`
    ///
    /// # Errors
    ///
    /// Returns error if the detector backend fails
    async fn detect(&self, frame: &Frame) -> Result<Vec<FaceBox>>;

    /// Detector name for logging
    fn name(&self) -> &str;
}

/// Counts people visible to the camera
pub struct CountPeople {
    camera: Arc<dyn Camera>,
    detectors: Vec<Arc<dyn FaceDetector>>,
    frames: usize,
    overlap_threshold: f32,
}

impl CountPeople {
    /// Create a counter sampling 3 frames with a 0.3 overlap threshold
    #[must_use]
    pub fn new(camera: Arc<dyn Camera>, detectors: Vec<Arc<dyn FaceDetector>>) -> Self {
        Self {
            camera,
            detectors,
            frames: 3,
            overlap_threshold: 0.3,
        }
    }

    /// Number of frames to sample
    #[must_use]
    pub fn with_frames(mut self, frames: usize) -> Self {
        self.frames = frames.max(1);
        self
    }

    /// Overlap ratio above which two boxes are the same face
    #[must_use]
    pub const fn with_overlap_threshold(mut self, threshold: f32) -> Self {
        self.overlap_threshold = threshold;
        self
    }

    /// Count distinct faces in one frame
    async fn count_faces(&self, frame: &Frame) -> Result<usize> {
        let mut detections = Vec::with_capacity(self.detectors.len());
        let mut last_error = None;

        for detector in &self.detectors {
            match detector.detect(frame).await {
                Ok(faces) => {
                    tracing::debug!(detector = detector.name(), faces = faces.len(), "detector result");
                    detections.push(faces);
                }
                Err(e) => {
                    tracing::warn!(detector = detector.name(), error = %e, "detector failed");
                    last_error = Some(e);
                }
            }
        }

        if detections.is_empty() {
            return Err(last_error
                .unwrap_or_else(|| Error::Tool("no face detectors configured".to_string())));
        }

        let best = select_best_detections(detections);
        Ok(remove_duplicates(&best, self.overlap_threshold).len())
    }
}

#[async_trait]
impl Tool for CountPeople {
    async fn execute(&self) -> Result<String> {
        tracing::info!(frames = self.frames, "counting people");

        let mut session = self.camera.open()?;
        let mut max_faces = 0;
        let mut captured = 0;
        let mut capture_error = None;

        for index in 0..self.frames {
            match session.capture_frame().await {
                Ok(Some(frame)) => {
                    captured += 1;
                    let faces = self.count_faces(&frame).await?;
                    max_faces = max_faces.max(faces);
                }
                Ok(None) => tracing::debug!(index, "camera returned no frame"),
                Err(e) => {
                    tracing::warn!(index, error = %e, "frame capture failed");
                    capture_error = Some(e);
                }
            }
        }

        drop(session);

        // A broken camera must not read as an empty room
        if let (0, Some(e)) = (captured, capture_error) {
            return Err(match e {
                Error::Camera(_) => e,
                other => Error::Camera(format!("no frame captured: {other}")),
            });
        }

        if max_faces > 0 {
            Ok(format!("detected {max_faces} people in the current frame"))
        } else {
            Ok("no people detected in the current frame".to_string())
        }
    }
}
