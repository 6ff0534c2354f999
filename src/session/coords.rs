//! Preview-to-document coordinate resolution

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};

/// A document-space point on one page (0-indexed page, PDF units)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectedPoint {
    pub page: u32,
    pub x: f64,
    pub y: f64,
}

/// Pointer position relative to the top-left corner of a rendered preview,
/// in preview pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewOffset {
    pub x: f64,
    pub y: f64,
}

impl PreviewOffset {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Map a pointer offset on a preview rendered at `scale` back to document units.
///
/// Negative results clamp to zero. Points past the page edge are kept as-is;
/// the processing engine decides whether to clip or reject them.
pub fn resolve_point(
    page: u32,
    offset: PreviewOffset,
    scale: f64,
) -> Result<SelectedPoint, ValidationError> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(ValidationError::InvalidScale { scale });
    }
    if !offset.x.is_finite() {
        return Err(ValidationError::NonFinite { field: "x" });
    }
    if !offset.y.is_finite() {
        return Err(ValidationError::NonFinite { field: "y" });
    }

    Ok(SelectedPoint {
        page,
        x: (offset.x / scale).max(0.0),
        y: (offset.y / scale).max(0.0),
    })
}
