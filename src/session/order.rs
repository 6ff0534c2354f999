//! Page ordering

use crate::error::ValidationError;
use serde::Serialize;

/// Check that `order` holds every index in `0..page_count` exactly once
pub fn is_permutation(order: &[u32], page_count: u32) -> bool {
    if order.len() != page_count as usize {
        return false;
    }
    let mut seen = vec![false; order.len()];
    for &page in order {
        match seen.get_mut(page as usize) {
            Some(slot) if !*slot => *slot = true,
            _ => return false,
        }
    }
    true
}

/// Display order of a document's pages.
///
/// Always a permutation of `0..page_count`: moves shift entries around but
/// never add or drop one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PageOrder(Vec<u32>);

impl PageOrder {
    /// Document order, `[0, 1, .., page_count - 1]`
    pub fn identity(page_count: u32) -> Self {
        Self((0..page_count).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }

    /// Whether pages are still in document order
    pub fn is_identity(&self) -> bool {
        self.0.iter().enumerate().all(|(i, &page)| i == page as usize)
    }

    /// Display position of a page index
    pub fn position_of(&self, page: u32) -> Option<usize> {
        self.0.iter().position(|&p| p == page)
    }

    /// Drag-and-drop move: take the entry at position `from` out and insert
    /// it at position `to`
    pub fn move_page(&mut self, from: usize, to: usize) -> Result<(), ValidationError> {
        let len = self.0.len();
        if from >= len || to >= len {
            return Err(ValidationError::MoveOutOfRange { from, to, len });
        }
        let page = self.0.remove(from);
        self.0.insert(to, page);
        Ok(())
    }

    /// Replace the whole order, provided it is a permutation of the same pages
    pub fn replace(&mut self, order: Vec<u32>) -> Result<(), ValidationError> {
        let page_count = self.0.len() as u32;
        if !is_permutation(&order, page_count) {
            return Err(ValidationError::NotAPermutation { page_count });
        }
        self.0 = order;
        Ok(())
    }

    pub fn to_vec(&self) -> Vec<u32> {
        self.0.clone()
    }
}
