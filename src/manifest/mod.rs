//! Edit manifest model
//!
//! This module provides the catalog of edit operations and the accumulator
//! that projects them into the manifest submitted to the processing engine.

mod log;
mod ops;

pub use log::{Manifest, OperationLog};
pub use ops::{
    Color, DrawingOp, EditOperation, ImageOp, LineShape, OperationKind, RectangleShape,
    RedactionOp, RotateOp, TextOp, WatermarkOp,
};
