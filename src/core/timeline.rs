use super::state::{ProcId, Ticks};
use serde::Serialize;

/// Who held the CPU over a timeline block. `Proc` carries the task index,
/// which is also the index into the per-process stats of a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Occupant {
    Idle,
    Proc { id: ProcId },
}

/// Half-open interval [start, end) of uninterrupted occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimelineBlock {
    pub occupant: Occupant,
    pub start: Ticks,
    pub end: Ticks,
    pub duration: Ticks,
}

/// Run-length-encoded execution history. Blocks are contiguous and
/// non-overlapping; recording the same occupant again extends the last
/// block instead of appending.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    blocks: Vec<TimelineBlock>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, occupant: Occupant, start: Ticks, end: Ticks) {
        debug_assert!(start < end, "timeline block must have positive duration");
        debug_assert_eq!(
            self.blocks.last().map_or(start, |b| b.end),
            start,
            "timeline blocks must be contiguous"
        );

        match self.blocks.last_mut() {
            Some(last) if last.occupant == occupant => {
                last.end = end;
                last.duration = last.end - last.start;
            }
            _ => self.blocks.push(TimelineBlock {
                occupant,
                start,
                end,
                duration: end - start,
            }),
        }
    }

    pub fn blocks(&self) -> &[TimelineBlock] {
        &self.blocks
    }

    pub fn total_duration(&self) -> Ticks {
        self.blocks.last().map_or(0, |b| b.end)
    }
}
