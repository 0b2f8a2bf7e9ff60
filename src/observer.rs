//! Mutation records and the subscription stream delivering them.
//!
//! `Document::observe` hands out a `MutationStream`: a lazy sequence of
//! mutation batches feeding the single consumer that performs serialized
//! checks. Records produced while the consumer is busy coalesce into the
//! next batch, so a burst of mutations is delivered and checked as one
//! cycle.

use crate::dom::Element;
use tokio::sync::mpsc;

/// One observed change to the document body
#[derive(Debug, Clone)]
pub enum MutationRecord {
    /// Children were inserted or removed; added elements carry a snapshot
    /// of the subtree as it was inserted
    ChildList { added: Vec<Element>, removed: usize },
    /// An attribute changed on the target element
    Attributes { target: String, attribute: String },
    /// Text content changed under the target element
    CharacterData { target: String },
}

/// A set of records delivered together
#[derive(Debug, Clone, Default)]
pub struct MutationBatch {
    pub records: Vec<MutationRecord>,
}

impl MutationBatch {
    /// Element snapshots added by any record in this batch, in delivery order
    pub fn added_elements(&self) -> Vec<&Element> {
        self.records
            .iter()
            .filter_map(|r| match r {
                MutationRecord::ChildList { added, .. } => Some(added.iter()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Identifies one `Document::observe` registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription {
    id: u64,
}

pub(crate) fn subscription(id: u64) -> Subscription {
    Subscription { id }
}

pub(crate) fn subscription_id(sub: &Subscription) -> u64 {
    sub.id
}

/// Lazy sequence of mutation batches for one subscription
pub struct MutationStream {
    rx: mpsc::UnboundedReceiver<MutationRecord>,
}

pub(crate) fn stream(rx: mpsc::UnboundedReceiver<MutationRecord>) -> MutationStream {
    MutationStream { rx }
}

impl MutationStream {
    /// Await the next batch: blocks for the first record, then drains every
    /// record already queued into the same batch. Returns `None` once the
    /// subscription is disconnected and the queue is empty.
    pub async fn next_batch(&mut self) -> Option<MutationBatch> {
        let first = self.rx.recv().await?;
        let mut batch = MutationBatch {
            records: vec![first],
        };
        while let Ok(record) = self.rx.try_recv() {
            batch.records.push(record);
        }
        Some(batch)
    }

    /// Drain whatever is queued right now without waiting
    pub fn try_batch(&mut self) -> Option<MutationBatch> {
        let mut batch = MutationBatch::default();
        while let Ok(record) = self.rx.try_recv() {
            batch.records.push(record);
        }
        if batch.is_empty() {
            None
        } else {
            Some(batch)
        }
    }
}
