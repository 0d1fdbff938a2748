//! K-way merge of record streams by local timestamp.
//!
//! Holds at most one pending record per input in a min-heap. Equal
//! timestamps are released in input order, and each input's own order is
//! preserved. The first error from any input ends the merged stream.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::pin::Pin;

use futures::{Stream, StreamExt};

use crate::errors::SourceError;
use crate::record::Record;
use crate::source::RecordStream;

/// Merged stream whose items carry the index of the input they came from.
pub type TaggedRecordStream =
    Pin<Box<dyn Stream<Item = Result<(usize, Record), SourceError>> + Send>>;

struct Pending {
    record: Record,
    input: usize,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    // Reversed so `BinaryHeap` pops the earliest record first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .record
            .local_timestamp
            .cmp(&self.record.local_timestamp)
            .then_with(|| other.input.cmp(&self.input))
    }
}

/// Merge `inputs`, tagging each record with its input index.
pub fn merge_tagged(mut inputs: Vec<RecordStream>) -> TaggedRecordStream {
    Box::pin(async_stream::stream! {
        let mut heap = BinaryHeap::with_capacity(inputs.len());
        for (input, stream) in inputs.iter_mut().enumerate() {
            match stream.next().await {
                Some(Ok(record)) => heap.push(Pending { record, input }),
                Some(Err(err)) => {
                    yield Err(err);
                    return;
                }
                None => {}
            }
        }
        while let Some(Pending { record, input }) = heap.pop() {
            yield Ok((input, record));
            match inputs[input].next().await {
                Some(Ok(next)) => heap.push(Pending { record: next, input }),
                Some(Err(err)) => {
                    yield Err(err);
                    return;
                }
                None => {}
            }
        }
    })
}

/// Merge `inputs` into one timestamp-ordered stream.
pub fn merge_by_timestamp(inputs: Vec<RecordStream>) -> RecordStream {
    if inputs.len() == 1 {
        if let Some(only) = inputs.into_iter().next() {
            return only;
        }
        return Box::pin(futures::stream::empty());
    }
    Box::pin(merge_tagged(inputs).map(|item| item.map(|(_, record)| record)))
}
