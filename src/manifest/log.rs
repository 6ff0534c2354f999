//! Operation accumulation and manifest projection

use crate::error::Result;
use crate::manifest::ops::{
    DrawingOp, EditOperation, ImageOp, OperationKind, RedactionOp, RotateOp, TextOp, WatermarkOp,
};
use serde::{Deserialize, Serialize};

/// Snapshot of pending edits in the engine's `apply` body shape.
///
/// Only non-empty categories are serialized, so an untouched session
/// produces `{}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reorder: Option<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rotate: Vec<RotateOp>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub add_text: Vec<TextOp>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImageOp>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub drawings: Vec<DrawingOp>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub delete_pages: Vec<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub redactions: Vec<RedactionOp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watermark: Option<WatermarkOp>,
}

impl Manifest {
    pub fn is_empty(&self) -> bool {
        self.operation_count() == 0
    }

    /// Number of individual edits carried, counting reorder and watermark as one each
    pub fn operation_count(&self) -> usize {
        usize::from(self.reorder.is_some())
            + self.rotate.len()
            + self.add_text.len()
            + self.images.len()
            + self.drawings.len()
            + self.delete_pages.len()
            + self.redactions.len()
            + usize::from(self.watermark.is_some())
    }

    /// Manifest keys present, in serialization order
    pub fn keys(&self) -> Vec<&'static str> {
        let present = [
            (OperationKind::Reorder, self.reorder.is_some()),
            (OperationKind::Rotate, !self.rotate.is_empty()),
            (OperationKind::InsertText, !self.add_text.is_empty()),
            (OperationKind::InsertImage, !self.images.is_empty()),
            (OperationKind::DrawShape, !self.drawings.is_empty()),
            (OperationKind::DeletePage, !self.delete_pages.is_empty()),
            (OperationKind::Redact, !self.redactions.is_empty()),
            (OperationKind::Watermark, self.watermark.is_some()),
        ];
        present
            .into_iter()
            .filter(|(_, present)| *present)
            .map(|(kind, _)| kind.manifest_key())
            .collect()
    }

    /// Pretty JSON for live preview
    pub fn to_pretty_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Ordered accumulation of pending edits, one list per operation kind.
///
/// Within a kind, entries keep insertion order. Reorder and watermark are
/// single slots: a new value replaces the old one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationLog {
    reorder: Option<Vec<u32>>,
    rotate: Vec<RotateOp>,
    add_text: Vec<TextOp>,
    images: Vec<ImageOp>,
    drawings: Vec<DrawingOp>,
    delete_pages: Vec<u32>,
    redactions: Vec<RedactionOp>,
    watermark: Option<WatermarkOp>,
}

impl OperationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an operation to the list for its kind
    pub fn append(&mut self, operation: EditOperation) {
        match operation {
            EditOperation::Reorder(order) => self.reorder = Some(order),
            EditOperation::Rotate(op) => self.rotate.push(op),
            EditOperation::InsertText(op) => self.add_text.push(op),
            EditOperation::InsertImage(op) => self.images.push(op),
            EditOperation::DrawShape(op) => self.drawings.push(op),
            EditOperation::Redact(op) => self.redactions.push(op),
            EditOperation::DeletePage(page) => self.delete_pages.push(page),
            EditOperation::Watermark(op) => self.watermark = Some(op),
        }
    }

    /// Empty the watermark slot, returning what was there
    pub fn clear_watermark(&mut self) -> Option<WatermarkOp> {
        self.watermark.take()
    }

    pub fn watermark(&self) -> Option<&WatermarkOp> {
        self.watermark.as_ref()
    }

    pub fn rotations(&self) -> &[RotateOp] {
        &self.rotate
    }

    pub fn deleted_pages(&self) -> &[u32] {
        &self.delete_pages
    }

    /// Number of entries accumulated for one kind
    pub fn count(&self, kind: OperationKind) -> usize {
        match kind {
            OperationKind::Reorder => usize::from(self.reorder.is_some()),
            OperationKind::Rotate => self.rotate.len(),
            OperationKind::InsertText => self.add_text.len(),
            OperationKind::InsertImage => self.images.len(),
            OperationKind::DrawShape => self.drawings.len(),
            OperationKind::Redact => self.redactions.len(),
            OperationKind::DeletePage => self.delete_pages.len(),
            OperationKind::Watermark => usize::from(self.watermark.is_some()),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Project the log into a manifest without touching the log.
    ///
    /// A recorded page order equal to document order carries no edit and is
    /// left out. Repeated deletions of a page are submitted once, in order of
    /// first deletion: the engine deletes once per entry.
    pub fn build(&self) -> Manifest {
        let reorder = self
            .reorder
            .as_ref()
            .filter(|order| !order.iter().enumerate().all(|(i, &p)| i == p as usize))
            .cloned();

        Manifest {
            reorder,
            rotate: self.rotate.clone(),
            add_text: self.add_text.clone(),
            images: self.images.clone(),
            drawings: self.drawings.clone(),
            delete_pages: first_occurrences(&self.delete_pages),
            redactions: self.redactions.clone(),
            watermark: self.watermark.clone(),
        }
    }
}

fn first_occurrences(pages: &[u32]) -> Vec<u32> {
    let mut unique = Vec::with_capacity(pages.len());
    for &page in pages {
        if !unique.contains(&page) {
            unique.push(page);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SelectedPoint;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use serde_json::json;

    fn at(page: u32, x: f64, y: f64) -> Option<SelectedPoint> {
        Some(SelectedPoint { page, x, y })
    }

    fn text(page: u32, body: &str) -> EditOperation {
        TextOp::anchored(at(page, 1.0, 1.0), body).unwrap().into()
    }

    #[test]
    fn test_empty_log_builds_empty_manifest() {
        let log = OperationLog::new();
        let manifest = log.build();
        assert!(manifest.is_empty());
        assert_eq!(serde_json::to_value(&manifest).unwrap(), json!({}));
        assert!(manifest.keys().is_empty());
    }

    #[test]
    fn test_build_is_pure() {
        let mut log = OperationLog::new();
        log.append(text(0, "a"));
        log.append(EditOperation::DeletePage(1));
        let before = log.clone();

        let first = log.build();
        let second = log.build();
        assert_eq!(first, second);
        assert_eq!(log, before);
    }

    #[test]
    fn test_mutating_snapshot_leaves_log() {
        let mut log = OperationLog::new();
        log.append(text(0, "a"));

        let mut snapshot = log.build();
        snapshot.add_text.clear();
        snapshot.delete_pages.push(9);

        assert_eq!(log.build().add_text.len(), 1);
        assert!(log.build().delete_pages.is_empty());
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut log = OperationLog::new();
        let bodies = ["first", "second", "third", "fourth", "fifth"];
        for body in bodies {
            log.append(text(0, body));
        }
        let built: Vec<String> = log.build().add_text.into_iter().map(|t| t.text).collect();
        assert_eq!(built, bodies);
    }

    #[test]
    fn test_watermark_single_slot() {
        let mut log = OperationLog::new();
        log.append(WatermarkOp::new("DRAFT").unwrap().into());
        log.append(WatermarkOp::new("FINAL").unwrap().into());

        assert_eq!(log.count(OperationKind::Watermark), 1);
        assert_eq!(log.build().watermark.unwrap().text, "FINAL");

        assert_eq!(log.clear_watermark().unwrap().text, "FINAL");
        assert!(log.build().watermark.is_none());
    }

    #[test]
    fn test_duplicate_deletions_submitted_once() {
        let mut log = OperationLog::new();
        for page in [2, 0, 2, 2, 0, 1] {
            log.append(EditOperation::DeletePage(page));
        }
        assert_eq!(log.count(OperationKind::DeletePage), 6);
        assert_eq!(
            serde_json::to_value(log.build()).unwrap(),
            json!({ "delete_pages": [2, 0, 1] })
        );
    }

    #[test]
    fn test_same_page_rotations_not_composed() {
        let mut log = OperationLog::new();
        log.append(RotateOp::new(0, 90).unwrap().into());
        log.append(RotateOp::new(0, 90).unwrap().into());
        assert_eq!(
            serde_json::to_value(log.build()).unwrap(),
            json!({ "rotate": [
                { "page": 0, "degrees": 90 },
                { "page": 0, "degrees": 90 }
            ]})
        );
    }

    #[test]
    fn test_reorder_replaced_not_accumulated() {
        let mut log = OperationLog::new();
        log.append(EditOperation::Reorder(vec![1, 0, 2]));
        log.append(EditOperation::Reorder(vec![2, 1, 0]));
        assert_eq!(log.count(OperationKind::Reorder), 1);
        assert_eq!(log.build().reorder, Some(vec![2, 1, 0]));
    }

    #[test]
    fn test_identity_reorder_omitted() {
        let mut log = OperationLog::new();
        log.append(EditOperation::Reorder(vec![0, 1, 2]));
        let manifest = log.build();
        assert!(manifest.reorder.is_none());
        assert!(manifest.is_empty());
    }

    #[test]
    fn test_keys_follow_serialization_order() {
        let mut log = OperationLog::new();
        log.append(WatermarkOp::new("W").unwrap().into());
        log.append(EditOperation::DeletePage(0));
        log.append(EditOperation::Reorder(vec![1, 0]));
        log.append(text(0, "t"));

        let manifest = log.build();
        assert_eq!(
            manifest.keys(),
            vec!["reorder", "add_text", "delete_pages", "watermark"]
        );
        assert_eq!(manifest.operation_count(), 4);

        let value = serde_json::to_value(&manifest).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 4);
    }

    #[test]
    fn test_manifest_accepts_engine_body() {
        let body = json!({
            "rotate": [{ "page": 0, "degrees": 90 }],
            "add_text": [{
                "page": 0, "text": "Added Note", "x": 200, "y": 200,
                "font_size": 14, "color": "blue"
            }],
            "watermark": { "text": "CONFIDENTIAL", "size": 24, "opacity": 0.3, "rotation": 30 },
            "redactions": [{ "page": 0, "x": 60, "y": 60, "width": 150, "height": 30, "fill": "white" }]
        });
        let manifest: Manifest = serde_json::from_value(body).unwrap();
        assert_eq!(manifest.operation_count(), 4);
        assert_eq!(manifest.redactions[0].fill.as_str(), "white");
        assert_eq!(manifest.add_text[0].x, 200.0);
    }

    #[test]
    fn test_pretty_json() {
        let mut log = OperationLog::new();
        log.append(EditOperation::DeletePage(1));
        let pretty = log.build().to_pretty_json().unwrap();
        assert!(pretty.contains("\"delete_pages\""));
        assert!(pretty.contains('\n'));
    }

    fn operation() -> impl Strategy<Value = EditOperation> {
        let page = 0u32..5;
        let coord = 0.0..600.0f64;
        prop_oneof![
            (page.clone(), "[a-z]{1,8}").prop_map(|(page, body)| text(page, &body)),
            (
                page.clone(),
                prop::sample::select(vec![-270, -180, -90, 0, 90, 180, 270])
            )
                .prop_map(|(page, degrees)| RotateOp::new(page, degrees).unwrap().into()),
            page.clone().prop_map(EditOperation::DeletePage),
            (page.clone(), coord.clone(), coord.clone()).prop_map(|(page, x, y)| {
                RedactionOp::anchored(at(page, x, y)).unwrap().into()
            }),
            (page, coord.clone(), coord).prop_map(|(page, x, y)| {
                DrawingOp::line_from(at(page, x, y)).unwrap().into()
            }),
            "[A-Z]{1,10}".prop_map(|body| WatermarkOp::new(body).unwrap().into()),
            Just(EditOperation::Reorder(vec![4, 3, 2, 1, 0])),
        ]
    }

    fn log_of(operations: &[EditOperation]) -> OperationLog {
        let mut log = OperationLog::new();
        for op in operations {
            log.append(op.clone());
        }
        log
    }

    proptest! {
        #[test]
        fn test_build_is_repeatable(operations in prop::collection::vec(operation(), 0..60)) {
            let log = log_of(&operations);
            let before = log.clone();
            prop_assert_eq!(log.build(), log.build());
            prop_assert_eq!(log, before);
        }

        #[test]
        fn test_same_kind_order_survives(operations in prop::collection::vec(operation(), 0..60)) {
            let manifest = log_of(&operations).build();

            let texts: Vec<&TextOp> = operations
                .iter()
                .filter_map(|op| match op {
                    EditOperation::InsertText(t) => Some(t),
                    _ => None,
                })
                .collect();
            prop_assert_eq!(manifest.add_text.iter().collect::<Vec<_>>(), texts);

            let rotations: Vec<&RotateOp> = operations
                .iter()
                .filter_map(|op| match op {
                    EditOperation::Rotate(r) => Some(r),
                    _ => None,
                })
                .collect();
            prop_assert_eq!(manifest.rotate.iter().collect::<Vec<_>>(), rotations);

            let redactions: Vec<&RedactionOp> = operations
                .iter()
                .filter_map(|op| match op {
                    EditOperation::Redact(r) => Some(r),
                    _ => None,
                })
                .collect();
            prop_assert_eq!(manifest.redactions.iter().collect::<Vec<_>>(), redactions);

            let drawings: Vec<&DrawingOp> = operations
                .iter()
                .filter_map(|op| match op {
                    EditOperation::DrawShape(d) => Some(d),
                    _ => None,
                })
                .collect();
            prop_assert_eq!(manifest.drawings.iter().collect::<Vec<_>>(), drawings);

            let deletions: Vec<u32> = operations
                .iter()
                .filter_map(|op| match op {
                    EditOperation::DeletePage(page) => Some(*page),
                    _ => None,
                })
                .collect();
            let first_seen: Vec<u32> = deletions
                .iter()
                .enumerate()
                .filter(|&(i, page)| !deletions[..i].contains(page))
                .map(|(_, page)| *page)
                .collect();
            prop_assert_eq!(&manifest.delete_pages, &first_seen);

            let last_watermark = operations.iter().rev().find_map(|op| match op {
                EditOperation::Watermark(w) => Some(w),
                _ => None,
            });
            prop_assert_eq!(manifest.watermark.as_ref(), last_watermark);
        }
    }
}
