//! Row iteration plan for a rows event.
//!
//! Update events interleave `(before, after)` images, so the dispatcher
//! visits every odd index and reads the preceding row as the before image.
//! Insert and delete events visit every row.

use crate::event::RowAction;

/// Where to start and how far to step through an event's rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterationPlan {
    pub start: usize,
    pub stride: usize,
}

impl IterationPlan {
    /// Row indices to visit for an event with `rows` row images.
    ///
    /// A trailing unpaired update image is never visited.
    pub fn indices(self, rows: usize) -> impl Iterator<Item = usize> {
        (self.start..rows).step_by(self.stride)
    }

    /// Whether each visited index is paired with the image before it.
    pub fn is_paired(self) -> bool {
        self.stride == 2
    }
}

pub fn plan(action: RowAction) -> IterationPlan {
    match action {
        RowAction::Update => IterationPlan {
            start: 1,
            stride: 2,
        },
        RowAction::Insert | RowAction::Delete => IterationPlan {
            start: 0,
            stride: 1,
        },
    }
}
