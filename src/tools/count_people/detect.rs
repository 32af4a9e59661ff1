//! Face box selection and de-duplication

use serde::{Deserialize, Serialize};

/// Axis-aligned face bounding box in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FaceBox {
    #[must_use]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Box area in square pixels
    #[must_use]
    pub const fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Intersection area divided by the smaller box's area
///
/// Returns 0.0 for disjoint boxes or when either box is empty.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn overlap_ratio(a: &FaceBox, b: &FaceBox) -> f32 {
    let left = a.x.max(b.x);
    let top = a.y.max(b.y);
    let right = a.x.saturating_add(a.width).min(b.x.saturating_add(b.width));
    let bottom = a.y.saturating_add(a.height).min(b.y.saturating_add(b.height));

    if right <= left || bottom <= top {
        return 0.0;
    }

    let smaller = a.area().min(b.area());
    if smaller == 0 {
        return 0.0;
    }

    let intersection = u64::from(right - left) * u64::from(bottom - top);
    (intersection as f64 / smaller as f64) as f32
}

/// Pick the detector result with the most boxes
///
/// Ties go to the earliest detector.
#[must_use]
pub fn select_best_detections(detections: Vec<Vec<FaceBox>>) -> Vec<FaceBox> {
    detections
        .into_iter()
        .reduce(|best, candidate| {
            if candidate.len() > best.len() {
                candidate
            } else {
                best
            }
        })
        .unwrap_or_default()
}

/// Greedy de-duplication by descending area
///
/// A box is dropped when its overlap ratio with any already kept box exceeds
/// `threshold`.
#[must_use]
pub fn remove_duplicates(faces: &[FaceBox], threshold: f32) -> Vec<FaceBox> {
    let mut sorted = faces.to_vec();
    // Stable, so equal areas keep detector order
    sorted.sort_by(|a, b| b.area().cmp(&a.area()));

    let mut kept: Vec<FaceBox> = Vec::with_capacity(sorted.len());
    for face in sorted {
        if kept.iter().all(|k| overlap_ratio(&face, k) <= threshold) {
            kept.push(face);
        }
    }
    kept
}
