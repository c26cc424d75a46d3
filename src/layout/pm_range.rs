//! Document-position ranges for fragments
//!
//! Positions are editor document offsets: inclusive start, exclusive end.
//! Lines map to positions through their run/character range; runs without
//! position info are skipped over rather than failing the whole range.

use crate::document::{Block, Line, ParagraphBlock, Run};
use crate::layout::table::MAX_NESTING_DEPTH;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PmRange {
    pub start: u32,
    pub end: u32,
}

impl PmRange {
    /// Range with `end` raised to `start` if needed
    pub fn new(start: u32, end: u32) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    /// Smallest range covering both
    pub fn union(self, other: PmRange) -> Self {
        Self::new(self.start.min(other.start), self.end.max(other.end))
    }

    /// Union of two optional ranges
    pub fn merge(a: Option<PmRange>, b: Option<PmRange>) -> Option<PmRange> {
        match (a, b) {
            (Some(a), Some(b)) => Some(a.union(b)),
            (a, None) => a,
            (None, b) => b,
        }
    }
}

fn position_in_run(run: &Run, offset: usize) -> Option<u32> {
    let start = run.pm_start?;
    let pos = start.saturating_add(offset as u32);
    Some(match run.pm_end {
        Some(end) => pos.min(end.max(start)),
        None => pos,
    })
}

fn start_position(runs: &[Run], run: usize, offset: usize) -> Option<u32> {
    runs.get(run)
        .and_then(|r| position_in_run(r, offset))
        .or_else(|| runs.iter().skip(run + 1).find_map(|r| r.pm_start))
}

fn end_position(runs: &[Run], run: usize, offset: usize) -> Option<u32> {
    runs.get(run)
        .and_then(|r| position_in_run(r, offset))
        .or_else(|| {
            runs.iter()
                .take(run.min(runs.len()))
                .rev()
                .find_map(|r| r.pm_end.or(r.pm_start))
        })
}

/// Range covered by one measured line
pub fn line_range(runs: &[Run], line: &Line) -> Option<PmRange> {
    let start = start_position(runs, line.from_run, line.from_char)?;
    let end = end_position(runs, line.to_run, line.to_char).unwrap_or(start);
    Some(PmRange::new(start, end))
}

/// Range of the whole paragraph
pub fn paragraph_range(paragraph: &ParagraphBlock) -> Option<PmRange> {
    paragraph
        .runs
        .iter()
        .filter_map(|r| {
            let start = r.pm_start?;
            Some(PmRange::new(start, r.pm_end.unwrap_or(start)))
        })
        .reduce(PmRange::union)
}

/// Range covered by lines `[from, to)` of a paragraph.
///
/// A slice spanning every line resolves to the paragraph's full range so that
/// measures without character offsets still annotate correctly.
pub fn lines_range(
    paragraph: &ParagraphBlock,
    lines: &[Line],
    from: usize,
    to: usize,
) -> Option<PmRange> {
    let to = to.min(lines.len());
    if from == 0 && to == lines.len() {
        return paragraph_range(paragraph);
    }
    lines
        .get(from..to)?
        .iter()
        .filter_map(|line| line_range(&paragraph.runs, line))
        .reduce(PmRange::union)
}

/// Range of a whole block, descending into tables and lists
pub fn block_range(block: &Block) -> Option<PmRange> {
    block_range_at_depth(block, 0)
}

fn block_range_at_depth(block: &Block, depth: usize) -> Option<PmRange> {
    match block {
        Block::Paragraph(p) => paragraph_range(p),
        Block::Image(o) | Block::Drawing(o) => {
            let start = o.pm_start?;
            Some(PmRange::new(start, o.pm_end.unwrap_or(start.saturating_add(1))))
        }
        Block::List(list) => list
            .items
            .iter()
            .filter_map(|item| paragraph_range(&item.paragraph))
            .reduce(PmRange::union),
        Block::Table(table) if depth < MAX_NESTING_DEPTH => table
            .rows
            .iter()
            .flat_map(|row| &row.cells)
            .flat_map(|cell| &cell.blocks)
            .filter_map(|b| block_range_at_depth(b, depth + 1))
            .reduce(PmRange::union),
        _ => None,
    }
}
