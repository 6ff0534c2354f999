//! Edit operation catalog
//!
//! Every operation the processing engine understands, in its wire shape.
//! Point-anchored constructors take the session's current selection and
//! refuse to build anything without one. Builders return new values; an
//! operation is never edited in place once it has been appended.

use crate::error::ValidationError;
use crate::session::SelectedPoint;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;

const NAMED_COLORS: [&str; 5] = ["black", "red", "green", "blue", "white"];

/// A color the engine can paint with: a named color or `#rgb` / `#rrggbb`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color(String);

impl Color {
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let valid = if let Some(hex) = value.strip_prefix('#') {
            matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit())
        } else {
            NAMED_COLORS
                .iter()
                .any(|name| name.eq_ignore_ascii_case(value))
        };

        if valid {
            Ok(Self(value.to_string()))
        } else {
            Err(ValidationError::InvalidColor {
                value: value.to_string(),
            })
        }
    }

    pub fn black() -> Self {
        Self("black".to_string())
    }

    pub fn red() -> Self {
        Self("red".to_string())
    }

    pub fn blue() -> Self {
        Self("blue".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Color {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn check_finite(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::NonFinite { field })
    }
}

fn check_positive(field: &'static str, value: f64) -> Result<(), ValidationError> {
    check_finite(field, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(ValidationError::NonPositive { field, value })
    }
}

fn check_page(page: u32, page_count: u32) -> Result<(), ValidationError> {
    if page < page_count {
        Ok(())
    } else {
        Err(ValidationError::PageOutOfBounds { page, page_count })
    }
}

fn require_point(point: Option<SelectedPoint>) -> Result<SelectedPoint, ValidationError> {
    point.ok_or(ValidationError::NoSelectedPoint)
}

// ============================================================================
// Rotation
// ============================================================================

/// Rotate one page. Rotations on the same page are kept as separate entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotateOp {
    pub page: u32,
    pub degrees: i32,
}

impl RotateOp {
    /// Rotation applied by the editor's rotate tool
    pub const DEFAULT_DEGREES: i32 = 90;

    pub fn new(page: u32, degrees: i32) -> Result<Self, ValidationError> {
        let op = Self { page, degrees };
        op.validate()?;
        Ok(op)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.degrees % 90 != 0 {
            return Err(ValidationError::InvalidRotation {
                degrees: self.degrees,
            });
        }
        Ok(())
    }
}

// ============================================================================
// Text
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextOp {
    pub page: u32,
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub font_size: f64,
    pub color: Color,
}

impl TextOp {
    pub const DEFAULT_FONT_SIZE: f64 = 14.0;

    /// Text anchored at the selected point, in the default font size and color
    pub fn anchored(
        point: Option<SelectedPoint>,
        text: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let point = require_point(point)?;
        let op = Self {
            page: point.page,
            text: text.into(),
            x: point.x,
            y: point.y,
            font_size: Self::DEFAULT_FONT_SIZE,
            color: Color::black(),
        };
        op.validate()?;
        Ok(op)
    }

    pub fn with_font_size(self, font_size: f64) -> Self {
        Self { font_size, ..self }
    }

    pub fn with_color(self, color: Color) -> Self {
        Self { color, ..self }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.text.is_empty() {
            return Err(ValidationError::EmptyText { field: "text" });
        }
        check_finite("x", self.x)?;
        check_finite("y", self.y)?;
        check_positive("font_size", self.font_size)
    }
}

// ============================================================================
// Image
// ============================================================================

/// Image stamped onto a page. The payload travels inline as base64.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageOp {
    pub page: u32,
    pub image_data: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ImageOp {
    pub const DEFAULT_WIDTH: f64 = 120.0;
    pub const DEFAULT_HEIGHT: f64 = 80.0;

    /// Encode `image` and anchor it at the selected point.
    ///
    /// The bytes must be in a raster format the `image` crate recognizes.
    pub fn anchored(point: Option<SelectedPoint>, image: &[u8]) -> Result<Self, ValidationError> {
        let point = require_point(point)?;
        if image.is_empty() {
            return Err(ValidationError::UnsupportedImage {
                reason: "empty payload".to_string(),
            });
        }
        image::guess_format(image).map_err(|e| ValidationError::UnsupportedImage {
            reason: e.to_string(),
        })?;

        let op = Self {
            page: point.page,
            image_data: base64::engine::general_purpose::STANDARD.encode(image),
            x: point.x,
            y: point.y,
            width: Self::DEFAULT_WIDTH,
            height: Self::DEFAULT_HEIGHT,
        };
        op.validate()?;
        Ok(op)
    }

    pub fn with_size(self, width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            ..self
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.image_data.is_empty() {
            return Err(ValidationError::UnsupportedImage {
                reason: "empty payload".to_string(),
            });
        }
        check_finite("x", self.x)?;
        check_finite("y", self.y)?;
        check_positive("width", self.width)?;
        check_positive("height", self.height)
    }
}

// ============================================================================
// Drawings
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineShape {
    pub page: u32,
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub width: f64,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RectangleShape {
    pub page: u32,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub border_width: f64,
    pub color: Color,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<Color>,
}

/// A vector shape drawn on a page, tagged by `type` on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DrawingOp {
    Line(LineShape),
    Rectangle(RectangleShape),
}

impl DrawingOp {
    /// Line from the selected point to `(x + 120, y + 10)`, 2pt red
    pub fn line_from(point: Option<SelectedPoint>) -> Result<Self, ValidationError> {
        let point = require_point(point)?;
        let op = DrawingOp::Line(LineShape {
            page: point.page,
            x1: point.x,
            y1: point.y,
            x2: point.x + 120.0,
            y2: point.y + 10.0,
            width: 2.0,
            color: Color::red(),
        });
        op.validate()?;
        Ok(op)
    }

    /// 140x80 rectangle with its top-left corner at the selected point
    pub fn rectangle_at(point: Option<SelectedPoint>) -> Result<Self, ValidationError> {
        let point = require_point(point)?;
        let op = DrawingOp::Rectangle(RectangleShape {
            page: point.page,
            x: point.x,
            y: point.y,
            width: 140.0,
            height: 80.0,
            border_width: 2.0,
            color: Color::blue(),
            fill_color: Some(Color("#e0f2fe".to_string())),
        });
        op.validate()?;
        Ok(op)
    }

    pub fn page(&self) -> u32 {
        match self {
            DrawingOp::Line(line) => line.page,
            DrawingOp::Rectangle(rect) => rect.page,
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        match self {
            DrawingOp::Line(line) => {
                for (field, value) in [
                    ("x1", line.x1),
                    ("y1", line.y1),
                    ("x2", line.x2),
                    ("y2", line.y2),
                ] {
                    check_finite(field, value)?;
                }
                check_positive("width", line.width)
            }
            DrawingOp::Rectangle(rect) => {
                check_finite("x", rect.x)?;
                check_finite("y", rect.y)?;
                check_positive("width", rect.width)?;
                check_positive("height", rect.height)?;
                check_positive("border_width", rect.border_width)
            }
        }
    }
}

// ============================================================================
// Redaction
// ============================================================================

/// Solid occlusion of a page region. Unlike a filled rectangle, the engine
/// removes the content underneath.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedactionOp {
    pub page: u32,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub fill: Color,
}

impl RedactionOp {
    pub const DEFAULT_WIDTH: f64 = 120.0;
    pub const DEFAULT_HEIGHT: f64 = 30.0;

    pub fn anchored(point: Option<SelectedPoint>) -> Result<Self, ValidationError> {
        let point = require_point(point)?;
        let op = Self {
            page: point.page,
            x: point.x,
            y: point.y,
            width: Self::DEFAULT_WIDTH,
            height: Self::DEFAULT_HEIGHT,
            fill: Color::black(),
        };
        op.validate()?;
        Ok(op)
    }

    pub fn with_size(self, width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            ..self
        }
    }

    pub fn with_fill(self, fill: Color) -> Self {
        Self { fill, ..self }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        check_finite("x", self.x)?;
        check_finite("y", self.y)?;
        check_positive("width", self.width)?;
        check_positive("height", self.height)
    }
}

// ============================================================================
// Watermark
// ============================================================================

/// Text stamped across every page. A session holds at most one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatermarkOp {
    pub text: String,
    pub size: f64,
    pub opacity: f64,
    pub rotation: f64,
}

impl WatermarkOp {
    pub fn new(text: impl Into<String>) -> Result<Self, ValidationError> {
        let op = Self {
            text: text.into(),
            size: 32.0,
            opacity: 0.25,
            rotation: 30.0,
        };
        op.validate()?;
        Ok(op)
    }

    pub fn with_style(self, size: f64, opacity: f64, rotation: f64) -> Self {
        Self {
            size,
            opacity,
            rotation,
            ..self
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.text.is_empty() {
            return Err(ValidationError::EmptyText { field: "watermark" });
        }
        check_positive("size", self.size)?;
        check_finite("rotation", self.rotation)?;
        if !(self.opacity > 0.0 && self.opacity <= 1.0) {
            return Err(ValidationError::OpacityOutOfRange {
                value: self.opacity,
            });
        }
        Ok(())
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Kind of an edit operation, named after its manifest key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Reorder,
    Rotate,
    InsertText,
    InsertImage,
    DrawShape,
    Redact,
    DeletePage,
    Watermark,
}

impl OperationKind {
    pub fn manifest_key(self) -> &'static str {
        match self {
            OperationKind::Reorder => "reorder",
            OperationKind::Rotate => "rotate",
            OperationKind::InsertText => "add_text",
            OperationKind::InsertImage => "images",
            OperationKind::DrawShape => "drawings",
            OperationKind::Redact => "redactions",
            OperationKind::DeletePage => "delete_pages",
            OperationKind::Watermark => "watermark",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.manifest_key())
    }
}

/// One edit, as accumulated into a manifest
#[derive(Debug, Clone, PartialEq)]
pub enum EditOperation {
    /// The complete page order; replaces any earlier reorder
    Reorder(Vec<u32>),
    Rotate(RotateOp),
    InsertText(TextOp),
    InsertImage(ImageOp),
    DrawShape(DrawingOp),
    Redact(RedactionOp),
    /// Repeats are accepted here and collapsed when the manifest is built
    DeletePage(u32),
    /// Replaces any earlier watermark
    Watermark(WatermarkOp),
}

impl EditOperation {
    pub fn kind(&self) -> OperationKind {
        match self {
            EditOperation::Reorder(_) => OperationKind::Reorder,
            EditOperation::Rotate(_) => OperationKind::Rotate,
            EditOperation::InsertText(_) => OperationKind::InsertText,
            EditOperation::InsertImage(_) => OperationKind::InsertImage,
            EditOperation::DrawShape(_) => OperationKind::DrawShape,
            EditOperation::Redact(_) => OperationKind::Redact,
            EditOperation::DeletePage(_) => OperationKind::DeletePage,
            EditOperation::Watermark(_) => OperationKind::Watermark,
        }
    }

    /// Page the operation targets, if it targets a single page
    pub fn page(&self) -> Option<u32> {
        match self {
            EditOperation::Rotate(op) => Some(op.page),
            EditOperation::InsertText(op) => Some(op.page),
            EditOperation::InsertImage(op) => Some(op.page),
            EditOperation::DrawShape(op) => Some(op.page()),
            EditOperation::Redact(op) => Some(op.page),
            EditOperation::DeletePage(page) => Some(*page),
            EditOperation::Reorder(_) | EditOperation::Watermark(_) => None,
        }
    }

    /// Validate every field against a document of `page_count` pages
    pub fn validate(&self, page_count: u32) -> Result<(), ValidationError> {
        if let Some(page) = self.page() {
            check_page(page, page_count)?;
        }
        match self {
            EditOperation::Reorder(order) => {
                if crate::session::is_permutation(order, page_count) {
                    Ok(())
                } else {
                    Err(ValidationError::NotAPermutation { page_count })
                }
            }
            EditOperation::Rotate(op) => op.validate(),
            EditOperation::InsertText(op) => op.validate(),
            EditOperation::InsertImage(op) => op.validate(),
            EditOperation::DrawShape(op) => op.validate(),
            EditOperation::Redact(op) => op.validate(),
            EditOperation::DeletePage(_) => Ok(()),
            EditOperation::Watermark(op) => op.validate(),
        }
    }
}

impl From<RotateOp> for EditOperation {
    fn from(op: RotateOp) -> Self {
        EditOperation::Rotate(op)
    }
}

impl From<TextOp> for EditOperation {
    fn from(op: TextOp) -> Self {
        EditOperation::InsertText(op)
    }
}

impl From<ImageOp> for EditOperation {
    fn from(op: ImageOp) -> Self {
        EditOperation::InsertImage(op)
    }
}

impl From<DrawingOp> for EditOperation {
    fn from(op: DrawingOp) -> Self {
        EditOperation::DrawShape(op)
    }
}

impl From<RedactionOp> for EditOperation {
    fn from(op: RedactionOp) -> Self {
        EditOperation::Redact(op)
    }
}

impl From<WatermarkOp> for EditOperation {
    fn from(op: WatermarkOp) -> Self {
        EditOperation::Watermark(op)
    }
}
