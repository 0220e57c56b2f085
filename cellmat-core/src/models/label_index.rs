use std::collections::BTreeSet;

use crate::errors::{MatrixError, Result};
use crate::models::label::Label;

///
/// An ordered, duplicate-free sequence of labels with logarithmic lookup.
///
/// Alongside the labels the index keeps their sort permutation, so the position of a label in
/// the original (unsorted) order is found by a binary search over the sorted view. The labels are
/// never mutated in place: every filter or union produces a new index with a freshly computed
/// permutation.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelIndex<L> {
    labels: Vec<L>,
    order: Vec<usize>,
}

impl<L: Label> LabelIndex<L> {
    ///
    /// Build an index over `labels`, keeping their order.
    ///
    /// Fails with [`MatrixError::DuplicateLabel`] if a label occurs more than once.
    ///
    pub fn build(labels: Vec<L>) -> Result<Self> {
        let order = argsort(&labels);

        if let Some(pair) = order
            .windows(2)
            .find(|pair| labels[pair[0]] == labels[pair[1]])
        {
            return Err(MatrixError::DuplicateLabel {
                axis: L::AXIS,
                label: labels[pair[0]].to_text(),
            });
        }

        Ok(LabelIndex { labels, order })
    }

    /// Build an index from raw byte labels, as read from a store or bundle.
    pub fn from_bytes(labels: Vec<Vec<u8>>) -> Result<Self> {
        Self::build(labels.into_iter().map(L::from_bytes).collect())
    }

    /// Union of several indexes, in sorted label order.
    pub fn union<'a, I>(indexes: I) -> Self
    where
        I: IntoIterator<Item = &'a LabelIndex<L>>,
        L: 'a,
    {
        let labels: BTreeSet<&L> = indexes
            .into_iter()
            .flat_map(|index| index.labels.iter())
            .collect();
        let labels: Vec<L> = labels.into_iter().cloned().collect();
        let order = (0..labels.len()).collect();

        LabelIndex { labels, order }
    }

    ///
    /// Position of `label` in the original label order.
    ///
    /// Returns `None` when the label is not part of the index.
    ///
    pub fn position_of(&self, label: &L) -> Option<usize> {
        self.order
            .binary_search_by(|&i| self.labels[i].cmp(label))
            .ok()
            .map(|k| self.order[k])
    }

    pub fn contains(&self, label: &L) -> bool {
        self.position_of(label).is_some()
    }

    /// Keep the labels at `positions`, in that order.
    pub fn select(&self, positions: &[usize]) -> Self {
        let labels: Vec<L> = positions.iter().map(|&i| self.labels[i].clone()).collect();
        let order = argsort(&labels);

        LabelIndex { labels, order }
    }

    pub fn labels(&self) -> &[L] {
        &self.labels
    }

    pub fn get(&self, position: usize) -> Option<&L> {
        self.labels.get(position)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, L> {
        self.labels.iter()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Lossy UTF-8 copies of the labels.
    pub fn to_text(&self) -> Vec<String> {
        self.labels.iter().map(Label::to_text).collect()
    }

    pub fn into_labels(self) -> Vec<L> {
        self.labels
    }
}

impl<'a, L> IntoIterator for &'a LabelIndex<L> {
    type Item = &'a L;
    type IntoIter = std::slice::Iter<'a, L>;

    fn into_iter(self) -> Self::IntoIter {
        self.labels.iter()
    }
}

fn argsort<L: Ord>(labels: &[L]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..labels.len()).collect();
    order.sort_by(|&a, &b| labels[a].cmp(&labels[b]));
    order
}
