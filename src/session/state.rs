//! Session state and interaction dispatch

use crate::engine::{DocumentId, JobId};
use crate::error::ValidationError;
use crate::manifest::{
    DrawingOp, EditOperation, ImageOp, Manifest, OperationLog, RedactionOp, RotateOp, TextOp,
    WatermarkOp,
};
use crate::session::coords::{resolve_point, PreviewOffset, SelectedPoint};
use crate::session::order::PageOrder;

/// A user interaction, as delivered by the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    /// Pointer click on a page preview rendered at `scale`
    PreviewClicked {
        page: u32,
        offset: PreviewOffset,
        scale: f64,
    },
    /// Thumbnail dragged from display position `from` and dropped at `to`
    PageDropped { from: usize, to: usize },
    RotatePage { page: u32, degrees: i32 },
    /// Rotate the page holding the current selection
    RotateSelectedPage { degrees: i32 },
    DeletePage { page: u32 },
    /// Delete the page holding the current selection
    DeleteSelectedPage,
    AddText { text: String },
    AddLine,
    AddRectangle,
    AddRedaction,
    /// Raw image file contents picked by the user
    AddImage { data: Vec<u8> },
    /// Watermark input changed; empty text removes the watermark
    SetWatermark { text: String },
    ClearWatermark,
}

/// Result of handling one interaction.
///
/// Refused edits are dropped without disturbing the session; the reason is
/// returned for display.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub enum EventOutcome {
    Applied,
    Discarded(ValidationError),
}

impl EventOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, EventOutcome::Applied)
    }

    fn from_result(result: Result<(), ValidationError>) -> Self {
        match result {
            Ok(()) => EventOutcome::Applied,
            Err(reason) => {
                tracing::debug!(reason = %reason, "edit discarded");
                EventOutcome::Discarded(reason)
            }
        }
    }
}

/// Client-held editing state for one uploaded document
#[derive(Debug, Clone)]
pub struct Session {
    document_id: DocumentId,
    page_count: u32,
    page_order: PageOrder,
    selected_point: Option<SelectedPoint>,
    operations: OperationLog,
    current_job: Option<JobId>,
}

impl Session {
    /// Start a session for a freshly uploaded document of `page_count` pages
    pub fn new(document_id: DocumentId, page_count: u32) -> Self {
        Self {
            document_id,
            page_count,
            page_order: PageOrder::identity(page_count),
            selected_point: None,
            operations: OperationLog::new(),
            current_job: None,
        }
    }

    pub fn document_id(&self) -> &DocumentId {
        &self.document_id
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn page_order(&self) -> &PageOrder {
        &self.page_order
    }

    /// Page order with pages queued for deletion left out
    pub fn live_pages(&self) -> Vec<u32> {
        let deleted = self.operations.deleted_pages();
        self.page_order
            .iter()
            .filter(|page| !deleted.contains(page))
            .collect()
    }

    pub fn selected_point(&self) -> Option<SelectedPoint> {
        self.selected_point
    }

    pub fn operations(&self) -> &OperationLog {
        &self.operations
    }

    /// Job most recently submitted for this session, until it is settled
    pub fn current_job(&self) -> Option<&JobId> {
        self.current_job.as_ref()
    }

    pub(crate) fn record_job(&mut self, job_id: JobId) {
        self.current_job = Some(job_id);
    }

    pub(crate) fn clear_job(&mut self) {
        self.current_job = None;
    }

    /// Manifest for the current state. Repeated calls without edits in
    /// between return equal manifests.
    pub fn build_manifest(&self) -> Manifest {
        self.operations.build()
    }

    /// Dispatch one interaction
    pub fn handle(&mut self, event: EditorEvent) -> EventOutcome {
        let result = match event {
            EditorEvent::PreviewClicked {
                page,
                offset,
                scale,
            } => self.select(page, offset, scale),
            EditorEvent::PageDropped { from, to } => self.move_page(from, to),
            EditorEvent::RotatePage { page, degrees } => self.rotate(page, degrees),
            EditorEvent::RotateSelectedPage { degrees } => self
                .require_selection()
                .and_then(|point| self.rotate(point.page, degrees)),
            EditorEvent::DeletePage { page } => self.append(EditOperation::DeletePage(page)),
            EditorEvent::DeleteSelectedPage => self
                .require_selection()
                .and_then(|point| self.append(EditOperation::DeletePage(point.page))),
            EditorEvent::AddText { text } => TextOp::anchored(self.selected_point, text)
                .and_then(|op| self.append(op.into())),
            EditorEvent::AddLine => {
                DrawingOp::line_from(self.selected_point).and_then(|op| self.append(op.into()))
            }
            EditorEvent::AddRectangle => {
                DrawingOp::rectangle_at(self.selected_point).and_then(|op| self.append(op.into()))
            }
            EditorEvent::AddRedaction => {
                RedactionOp::anchored(self.selected_point).and_then(|op| self.append(op.into()))
            }
            EditorEvent::AddImage { data } => ImageOp::anchored(self.selected_point, &data)
                .and_then(|op| self.append(op.into())),
            EditorEvent::SetWatermark { text } if text.is_empty() => {
                self.clear_watermark();
                Ok(())
            }
            EditorEvent::SetWatermark { text } => {
                WatermarkOp::new(text).and_then(|op| self.append(op.into()))
            }
            EditorEvent::ClearWatermark => {
                self.clear_watermark();
                Ok(())
            }
        };
        EventOutcome::from_result(result)
    }

    /// Remove the watermark, returning it if one was set
    pub fn clear_watermark(&mut self) -> Option<WatermarkOp> {
        self.operations.clear_watermark()
    }

    /// Append a constructed operation after checking it against this document.
    ///
    /// A reorder replaces the page order as a whole.
    pub fn apply(&mut self, operation: impl Into<EditOperation>) -> EventOutcome {
        EventOutcome::from_result(self.append(operation.into()))
    }

    fn append(&mut self, operation: EditOperation) -> Result<(), ValidationError> {
        operation.validate(self.page_count)?;
        if let EditOperation::Reorder(order) = &operation {
            self.page_order.replace(order.clone())?;
        }
        tracing::debug!(kind = %operation.kind(), "edit queued");
        self.operations.append(operation);
        Ok(())
    }

    fn select(
        &mut self,
        page: u32,
        offset: PreviewOffset,
        scale: f64,
    ) -> Result<(), ValidationError> {
        if page >= self.page_count {
            return Err(ValidationError::PageOutOfBounds {
                page,
                page_count: self.page_count,
            });
        }
        self.selected_point = Some(resolve_point(page, offset, scale)?);
        Ok(())
    }

    fn move_page(&mut self, from: usize, to: usize) -> Result<(), ValidationError> {
        self.page_order.move_page(from, to)?;
        self.operations
            .append(EditOperation::Reorder(self.page_order.to_vec()));
        Ok(())
    }

    fn rotate(&mut self, page: u32, degrees: i32) -> Result<(), ValidationError> {
        let op = RotateOp::new(page, degrees)?;
        self.append(op.into())
    }

    fn require_selection(&self) -> Result<SelectedPoint, ValidationError> {
        self.selected_point.ok_or(ValidationError::NoSelectedPoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::OperationKind;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    fn session(pages: u32) -> Session {
        Session::new(DocumentId::new("doc-1"), pages)
    }

    fn click(page: u32, x: f64, y: f64) -> EditorEvent {
        EditorEvent::PreviewClicked {
            page,
            offset: PreviewOffset::new(x, y),
            scale: 1.0,
        }
    }

    #[test]
    fn test_new_session() {
        let s = session(3);
        assert_eq!(s.page_order().as_slice(), &[0, 1, 2]);
        assert!(s.selected_point().is_none());
        assert!(s.current_job().is_none());
        assert!(s.build_manifest().is_empty());
    }

    #[test]
    fn test_add_text_scenario() {
        let mut s = session(3);
        assert!(s.handle(click(1, 50.0, 60.0)).is_applied());
        assert!(s
            .handle(EditorEvent::AddText {
                text: "Hi".to_string()
            })
            .is_applied());

        let manifest = serde_json::to_value(s.build_manifest()).unwrap();
        assert_eq!(
            manifest,
            json!({
                "add_text": [{
                    "page": 1, "text": "Hi", "x": 50.0, "y": 60.0,
                    "font_size": 14.0, "color": "black"
                }]
            })
        );
    }

    #[test]
    fn test_point_ops_without_selection_are_discarded() {
        let mut s = session(2);
        let events = vec![
            EditorEvent::AddText {
                text: "x".to_string(),
            },
            EditorEvent::AddLine,
            EditorEvent::AddRectangle,
            EditorEvent::AddRedaction,
            EditorEvent::AddImage {
                data: PNG_HEADER.to_vec(),
            },
            EditorEvent::RotateSelectedPage { degrees: 90 },
            EditorEvent::DeleteSelectedPage,
        ];
        for event in events {
            assert_eq!(
                s.handle(event),
                EventOutcome::Discarded(ValidationError::NoSelectedPoint)
            );
        }
        assert!(s.build_manifest().is_empty());
    }

    #[test]
    fn test_selection_is_last_write_wins() {
        let mut s = session(3);
        let _ = s.handle(click(0, 1.0, 1.0));
        let _ = s.handle(click(2, 7.0, 8.0));
        assert_eq!(
            s.selected_point(),
            Some(SelectedPoint {
                page: 2,
                x: 7.0,
                y: 8.0
            })
        );
    }

    #[test]
    fn test_selection_not_consumed_by_ops() {
        let mut s = session(1);
        let _ = s.handle(click(0, 10.0, 10.0));
        let _ = s.handle(EditorEvent::AddRedaction);
        let _ = s.handle(EditorEvent::AddLine);
        assert!(s.selected_point().is_some());
        assert_eq!(s.operations().count(OperationKind::Redact), 1);
        assert_eq!(s.operations().count(OperationKind::DrawShape), 1);
    }

    #[test]
    fn test_select_rejects_unknown_page() {
        let mut s = session(2);
        assert_eq!(
            s.handle(click(2, 1.0, 1.0)),
            EventOutcome::Discarded(ValidationError::PageOutOfBounds {
                page: 2,
                page_count: 2
            })
        );
        assert!(s.selected_point().is_none());
    }

    #[test]
    fn test_select_uses_preview_scale() {
        let mut s = session(1);
        let _ = s.handle(EditorEvent::PreviewClicked {
            page: 0,
            offset: PreviewOffset::new(10.0, 12.0),
            scale: 0.5,
        });
        let point = s.selected_point().unwrap();
        assert_eq!((point.x, point.y), (20.0, 24.0));
    }

    #[test]
    fn test_rotate_and_delete_need_no_selection() {
        let mut s = session(3);
        assert!(s
            .handle(EditorEvent::RotatePage {
                page: 0,
                degrees: 180
            })
            .is_applied());
        assert!(s.handle(EditorEvent::DeletePage { page: 1 }).is_applied());
        assert_eq!(s.build_manifest().keys(), vec!["rotate", "delete_pages"]);
    }

    #[test]
    fn test_delete_twice_submits_once() {
        let mut s = session(3);
        assert!(s.handle(EditorEvent::DeletePage { page: 2 }).is_applied());
        assert!(s.handle(EditorEvent::DeletePage { page: 2 }).is_applied());
        assert_eq!(
            serde_json::to_value(s.build_manifest()).unwrap(),
            json!({ "delete_pages": [2] })
        );
        assert_eq!(s.live_pages(), vec![0, 1]);
        assert_eq!(s.page_order().len(), 3);
    }

    #[test]
    fn test_rotations_accumulate_in_order() {
        let mut s = session(2);
        let _ = s.handle(click(1, 0.0, 0.0));
        let _ = s.handle(EditorEvent::RotateSelectedPage { degrees: 90 });
        let _ = s.handle(EditorEvent::RotateSelectedPage { degrees: 90 });
        let _ = s.handle(EditorEvent::RotatePage {
            page: 0,
            degrees: -90,
        });
        let rotations: Vec<(u32, i32)> = s
            .build_manifest()
            .rotate
            .iter()
            .map(|r| (r.page, r.degrees))
            .collect();
        assert_eq!(rotations, vec![(1, 90), (1, 90), (0, -90)]);
    }

    #[test]
    fn test_drag_reorder_final_order_only() {
        let mut s = session(4);
        let _ = s.handle(EditorEvent::PageDropped { from: 0, to: 3 });
        let _ = s.handle(EditorEvent::PageDropped { from: 0, to: 1 });
        assert_eq!(s.page_order().as_slice(), &[2, 1, 3, 0]);

        let manifest = s.build_manifest();
        assert_eq!(manifest.reorder, Some(vec![2, 1, 3, 0]));
        assert_eq!(s.operations().count(OperationKind::Reorder), 1);
    }

    #[test]
    fn test_drag_back_to_document_order_drops_reorder() {
        let mut s = session(3);
        let _ = s.handle(EditorEvent::PageDropped { from: 0, to: 2 });
        let _ = s.handle(EditorEvent::PageDropped { from: 2, to: 0 });
        assert!(s.build_manifest().reorder.is_none());
    }

    #[test]
    fn test_bad_drop_keeps_order() {
        let mut s = session(2);
        assert!(!s.handle(EditorEvent::PageDropped { from: 0, to: 5 }).is_applied());
        assert!(s.page_order().is_identity());
    }

    #[test]
    fn test_apply_reorder_replaces_page_order() {
        let mut s = session(3);
        assert!(s.apply(EditOperation::Reorder(vec![2, 0, 1])).is_applied());
        assert_eq!(s.page_order().as_slice(), &[2, 0, 1]);

        assert!(!s.apply(EditOperation::Reorder(vec![2, 2, 1])).is_applied());
        assert_eq!(s.page_order().as_slice(), &[2, 0, 1]);
    }

    #[test]
    fn test_watermark_replace_and_clear() {
        let mut s = session(1);
        let _ = s.handle(EditorEvent::SetWatermark {
            text: "DRAFT".to_string(),
        });
        let _ = s.handle(EditorEvent::SetWatermark {
            text: "CONFIDENTIAL".to_string(),
        });
        assert_eq!(
            s.build_manifest().watermark.map(|w| w.text),
            Some("CONFIDENTIAL".to_string())
        );

        let _ = s.handle(EditorEvent::ClearWatermark);
        assert!(s.build_manifest().is_empty());
    }

    #[test]
    fn test_emptied_watermark_text_removes_watermark() {
        let mut s = session(2);
        let _ = s.handle(EditorEvent::SetWatermark {
            text: "DRAFT".to_string(),
        });
        assert_eq!(
            s.handle(EditorEvent::SetWatermark {
                text: String::new(),
            }),
            EventOutcome::Applied
        );
        assert!(s.operations().watermark().is_none());
        assert!(s.build_manifest().is_empty());
    }

    #[test]
    fn test_add_image_at_selection() {
        let mut s = session(1);
        let _ = s.handle(click(0, 3.0, 4.0));
        assert!(s
            .handle(EditorEvent::AddImage {
                data: PNG_HEADER.to_vec()
            })
            .is_applied());
        let manifest = s.build_manifest();
        assert_eq!(manifest.images.len(), 1);
        assert_eq!((manifest.images[0].x, manifest.images[0].y), (3.0, 4.0));
    }

    #[test]
    fn test_apply_rejects_out_of_bounds_page() {
        let mut s = session(2);
        let op = RotateOp::new(5, 90).unwrap();
        assert_eq!(
            s.apply(op),
            EventOutcome::Discarded(ValidationError::PageOutOfBounds {
                page: 5,
                page_count: 2
            })
        );
    }

    #[test]
    fn test_job_reference() {
        let mut s = session(1);
        s.record_job(JobId::new("job-1"));
        assert_eq!(s.current_job().map(JobId::as_str), Some("job-1"));
        s.clear_job();
        assert!(s.current_job().is_none());
    }
}
