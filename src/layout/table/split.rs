//! Row-boundary and mid-row split decisions

use log::debug;

use crate::document::attrs::{self, CellPadding, RowHeight};
use crate::document::{Block, Measure, RowAttrs, Run, TableBlock, TableMeasure, TableRow};
use crate::layout::paginator::EPSILON;
use crate::layout::pm_range::{self, PmRange};
use crate::layout::{CellLines, PartialRowInfo};

use super::MIN_PARTIAL_ROW_HEIGHT;

/// Smallest unit of cell content that can move to the next page:
/// a paragraph line, a nested table row, or an image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub height: f32,
    pub pm: Option<PmRange>,
}

/// Read-only view of a table and its measure used by the splitter
pub struct TableContext<'a> {
    pub table: &'a TableBlock,
    pub measure: &'a TableMeasure,
    /// Last row index reached by any cell starting in each row
    reach: Vec<usize>,
}

impl<'a> TableContext<'a> {
    pub fn new(table: &'a TableBlock, measure: &'a TableMeasure) -> Self {
        let reach = (0..measure.rows.len())
            .map(|r| {
                let span = table
                    .rows
                    .get(r)
                    .map_or(1, |row| row.cells.iter().map(|c| c.row_span()).max().unwrap_or(1));
                r + span - 1
            })
            .collect();
        Self {
            table,
            measure,
            reach,
        }
    }

    pub fn row_count(&self) -> usize {
        self.measure.rows.len()
    }

    pub fn row(&self, index: usize) -> Option<&'a TableRow> {
        self.table.rows.get(index)
    }

    fn row_attrs(&self, index: usize) -> Option<&'a RowAttrs> {
        self.row(index).map(|r| &r.attrs)
    }

    pub fn row_height(&self, index: usize) -> f32 {
        self.measure.rows.get(index).map_or(0.0, |r| r.height.max(0.0))
    }

    /// Combined height of rows `[from, to)`
    pub fn rows_height(&self, from: usize, to: usize) -> f32 {
        (from..to).map(|r| self.row_height(r)).sum()
    }

    pub fn cant_split(&self, index: usize) -> bool {
        self.row_attrs(index).is_some_and(|a| a.cant_split)
    }

    pub fn explicit_height(&self, index: usize) -> Option<RowHeight> {
        attrs::row_height(self.row_attrs(index).and_then(|a| a.row_height.as_ref()))
            .filter(RowHeight::is_explicit)
    }

    /// Cells with a measure in `row`
    pub fn cell_count(&self, row: usize) -> usize {
        self.measure.rows.get(row).map_or(0, |r| r.cells.len())
    }

    pub fn cell_padding(&self, row: usize, cell: usize) -> CellPadding {
        let padding = self
            .row(row)
            .and_then(|r| r.cells.get(cell))
            .and_then(|c| c.attrs.padding.as_ref());
        attrs::cell_padding(padding)
    }

    /// Farthest row any span starting before `row` reaches
    fn reach_before(&self, row: usize) -> Option<usize> {
        self.reach[..row.min(self.reach.len())].iter().copied().max()
    }

    /// Splittable content units of one cell, in order
    pub fn cell_segments(&self, row: usize, cell: usize) -> Vec<Segment> {
        let Some(cell_measure) = self.measure.rows.get(row).and_then(|r| r.cells.get(cell)) else {
            return Vec::new();
        };
        let cell_block = self.row(row).and_then(|r| r.cells.get(cell));

        let mut segments = Vec::new();
        for (index, measure) in cell_measure.blocks.iter().enumerate() {
            let block = cell_block.and_then(|c| c.blocks.get(index));
            push_segments(block, measure, &mut segments);
        }

        if segments.is_empty() && cell_measure.blocks.is_empty() {
            // Bare measure: treat the content box as one unit
            let content = cell_measure.height - self.cell_padding(row, cell).vertical();
            if content > 0.0 {
                segments.push(Segment {
                    height: content,
                    pm: None,
                });
            }
        }
        segments
    }

    /// Room the next unrendered segment of `row` needs, padding included,
    /// over every cell with content left after `from_lines`
    pub fn next_segment_height(&self, row: usize, from_lines: &[usize]) -> f32 {
        (0..self.cell_count(row))
            .filter_map(|cell| {
                let start = from_lines.get(cell).copied().unwrap_or(0);
                self.cell_segments(row, cell)
                    .get(start)
                    .map(|s| s.height + self.cell_padding(row, cell).vertical())
            })
            .fold(0.0, f32::max)
    }

    /// Tallest cell content of a row, padding included
    fn content_height(&self, row: usize) -> f32 {
        (0..self.cell_count(row))
            .map(|c| {
                let content: f32 = self.cell_segments(row, c).iter().map(|s| s.height).sum();
                content + self.cell_padding(row, c).vertical()
            })
            .fold(0.0, f32::max)
    }

    /// The row must be placed whole: `cantSplit`, or an explicit height with
    /// slack beyond its content that fits on a page.
    pub fn is_effectively_unsplittable(&self, row: usize, full_height: f32) -> bool {
        if self.cant_split(row) {
            return true;
        }
        let height = self.row_height(row);
        self.explicit_height(row).is_some_and(|explicit| {
            explicit.value > self.content_height(row) + EPSILON && height <= full_height + EPSILON
        })
    }
}

fn push_segments(block: Option<&Block>, measure: &Measure, out: &mut Vec<Segment>) {
    match measure {
        Measure::Paragraph(paragraph) => {
            let runs: &[Run] = match block {
                Some(Block::Paragraph(p)) => &p.runs,
                _ => &[],
            };
            out.extend(paragraph.lines.iter().map(|line| Segment {
                height: line.height,
                pm: pm_range::line_range(runs, line),
            }));
        }
        Measure::List(list) => {
            for (index, item) in list.items.iter().enumerate() {
                let runs: &[Run] = match block {
                    Some(Block::List(l)) => l
                        .items
                        .get(index)
                        .map_or(&[][..], |i| i.paragraph.runs.as_slice()),
                    _ => &[],
                };
                out.extend(item.paragraph.lines.iter().map(|line| Segment {
                    height: line.height,
                    pm: pm_range::line_range(runs, line),
                }));
            }
        }
        Measure::Table(table) => {
            let nested = match block {
                Some(Block::Table(t)) => Some(t),
                _ => None,
            };
            for (index, row) in table.rows.iter().enumerate() {
                let pm = nested.and_then(|t| t.rows.get(index)).and_then(|row| {
                    row.cells
                        .iter()
                        .flat_map(|c| &c.blocks)
                        .filter_map(pm_range::block_range)
                        .reduce(PmRange::union)
                });
                out.push(Segment {
                    height: row.height,
                    pm,
                });
            }
        }
        Measure::Image(object) | Measure::Drawing(object) => out.push(Segment {
            height: object.height,
            pm: block.and_then(pm_range::block_range),
        }),
        _ => {}
    }
}

/// Number of leading `repeatHeader` rows
pub fn count_header_rows(table: &TableBlock) -> usize {
    table
        .rows
        .iter()
        .take_while(|row| row.attrs.repeat_header)
        .count()
}

/// Render as much of row `row` as fits in `available`, continuing each cell
/// from `from_lines`.
///
/// Cells advance independently and only take segments that fit whole. A
/// segment is forced in, clipped, when it alone is taller than
/// `full_height`; `force_progress` extends that to the first pending segment
/// whatever its size.
pub fn compute_partial_row(
    ctx: &TableContext<'_>,
    row: usize,
    from_lines: &[usize],
    available: f32,
    full_height: f32,
    force_progress: bool,
) -> PartialRowInfo {
    let cell_count = ctx.cell_count(row);
    let mut from_line_by_cell = CellLines::with_capacity(cell_count);
    let mut to_line_by_cell = CellLines::with_capacity(cell_count);
    let mut partial_height: f32 = 0.0;
    let mut exhausted = true;
    let mut forced = false;

    for cell in 0..cell_count {
        let segments = ctx.cell_segments(row, cell);
        let padding = ctx.cell_padding(row, cell).vertical();
        let start = from_lines.get(cell).copied().unwrap_or(0).min(segments.len());
        let budget = (available - padding).max(0.0);

        let mut used = 0.0;
        let mut end = start;
        while let Some(segment) = segments.get(end) {
            if used + segment.height > budget + EPSILON {
                break;
            }
            used += segment.height;
            end += 1;
        }

        if end == start {
            if let Some(segment) = segments.get(start) {
                let oversized = segment.height > (full_height - padding).max(0.0) + EPSILON;
                if oversized || (force_progress && !forced) {
                    debug!(
                        "row {} cell {}: forcing segment of {:.1}px into {:.1}px",
                        row, cell, segment.height, budget
                    );
                    used = segment.height.min(budget);
                    end = start + 1;
                    forced = true;
                }
            }
        }

        if end < segments.len() {
            exhausted = false;
        }
        if end > start {
            partial_height = partial_height.max(used + padding);
        }
        from_line_by_cell.push(start);
        to_line_by_cell.push(end);
    }

    PartialRowInfo {
        row_index: row,
        is_first_part: from_line_by_cell.iter().all(|&l| l == 0),
        is_last_part: exhausted,
        from_line_by_cell,
        to_line_by_cell,
        partial_height: partial_height.min(available.max(0.0)),
    }
}

/// Where a fragment starting at some row stops
#[derive(Debug, Clone, PartialEq)]
pub struct SplitPoint {
    /// Whole rows `[start, end_row)` go into the fragment
    pub end_row: usize,
    /// Row `end_row` rendered partially after the whole rows
    pub partial: Option<PartialRowInfo>,
}

impl SplitPoint {
    /// Whether the fragment would render anything
    pub fn makes_progress(&self, start: usize) -> bool {
        self.end_row > start
            || self
                .partial
                .as_ref()
                .is_some_and(|p| p.made_progress() || p.is_last_part)
    }
}

/// Accumulate rows from `start` into `available` and choose a break.
///
/// A break before row `i` is clean when no row span crosses it. When the
/// natural break is not clean, the last clean break in this fragment wins.
pub fn find_split_point(
    ctx: &TableContext<'_>,
    start: usize,
    available: f32,
    full_height: f32,
) -> SplitPoint {
    let row_count = ctx.row_count();
    let mut used = 0.0;
    let mut span_reach = ctx.reach_before(start);
    let mut last_clean: Option<usize> = None;

    for row in start..row_count {
        let crosses_span = span_reach.is_some_and(|reach| reach >= row);
        if row > start && !crosses_span {
            last_clean = Some(row);
        }

        let height = ctx.row_height(row);
        if used + height <= available + EPSILON {
            used += height;
            span_reach = Some(span_reach.map_or(ctx.reach[row], |r| r.max(ctx.reach[row])));
            continue;
        }

        let remaining = available - used;
        let fallback = |natural: usize| match last_clean {
            Some(clean) if crosses_span && clean < natural => {
                debug!("table break moved from row {} to clean row {}", natural, clean);
                clean
            }
            _ => natural,
        };

        if height > full_height + EPSILON {
            debug!("row {} ({:.1}px) is taller than a page, splitting mid-row", row, height);
            let part = compute_partial_row(ctx, row, &[], remaining, full_height, false);
            return SplitPoint {
                end_row: row,
                partial: part.made_progress().then_some(part),
            };
        }

        if ctx.is_effectively_unsplittable(row, full_height) {
            return SplitPoint {
                end_row: fallback(row),
                partial: None,
            };
        }

        if remaining >= MIN_PARTIAL_ROW_HEIGHT {
            let part = compute_partial_row(ctx, row, &[], remaining, full_height, false);
            if part.made_progress() {
                return SplitPoint {
                    end_row: row,
                    partial: Some(part),
                };
            }
        }

        return SplitPoint {
            end_row: fallback(row),
            partial: None,
        };
    }

    SplitPoint {
        end_row: row_count,
        partial: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{CellAttrs, CellMeasure, RowMeasure, TableCell};
    use serde_json::json;

    fn cell_row(heights: &[&[f32]]) -> RowMeasure {
        let cells: Vec<CellMeasure> = heights.iter().map(|h| CellMeasure::with_lines(h)).collect();
        let height = cells.iter().map(|c| c.height + 4.0).fold(0.0, f32::max);
        RowMeasure { height, cells }
    }

    fn table_with(rows: Vec<TableRow>) -> TableBlock {
        TableBlock {
            rows,
            ..TableBlock::default()
        }
    }

    fn row_of(cells: usize, attrs: RowAttrs) -> TableRow {
        TableRow {
            cells: (0..cells).map(|_| TableCell::default()).collect(),
            attrs,
            ..TableRow::default()
        }
    }

    fn uniform_table(rows: usize, height: f32) -> (TableBlock, TableMeasure) {
        let table = table_with((0..rows).map(|_| row_of(1, RowAttrs::default())).collect());
        let measure = TableMeasure {
            rows: (0..rows)
                .map(|_| RowMeasure {
                    height,
                    cells: vec![CellMeasure::with_lines(&[height - 4.0])],
                })
                .collect(),
            ..TableMeasure::default()
        };
        (table, measure)
    }

    #[test]
    fn test_count_header_rows() {
        let header = RowAttrs {
            repeat_header: true,
            ..RowAttrs::default()
        };
        let table = table_with(vec![
            row_of(1, header.clone()),
            row_of(1, header.clone()),
            row_of(1, RowAttrs::default()),
            row_of(1, header),
        ]);
        assert_eq!(count_header_rows(&table), 2);
    }

    #[test]
    fn test_split_at_row_boundary() {
        let (table, measure) = uniform_table(3, 50.0);
        let ctx = TableContext::new(&table, &measure);
        let split = find_split_point(&ctx, 0, 100.0, 100.0);
        assert_eq!(split.end_row, 2);
        assert!(split.partial.is_none());

        let split = find_split_point(&ctx, 2, 100.0, 100.0);
        assert_eq!(split.end_row, 3);
    }

    #[test]
    fn test_cells_advance_independently() {
        let table = table_with(vec![row_of(2, RowAttrs::default())]);
        let measure = TableMeasure {
            rows: vec![cell_row(&[&[10.0; 6], &[25.0; 3]])],
            ..TableMeasure::default()
        };
        let ctx = TableContext::new(&table, &measure);

        let part = compute_partial_row(&ctx, 0, &[], 44.0, 500.0, false);
        // 40px of content after 4px vertical padding
        assert_eq!(part.to_line_by_cell.as_slice(), &[4, 1]);
        assert!(part.is_first_part);
        assert!(!part.is_last_part);
        assert_eq!(part.partial_height, 44.0);

        let rest = compute_partial_row(&ctx, 0, &part.to_line_by_cell, 500.0, 500.0, false);
        assert_eq!(rest.from_line_by_cell.as_slice(), &[4, 1]);
        assert_eq!(rest.to_line_by_cell.as_slice(), &[6, 3]);
        assert!(rest.is_last_part);
    }

    #[test]
    fn test_oversized_segment_is_forced_and_clipped() {
        let table = table_with(vec![row_of(1, RowAttrs::default())]);
        let measure = TableMeasure {
            rows: vec![cell_row(&[&[300.0]])],
            ..TableMeasure::default()
        };
        let ctx = TableContext::new(&table, &measure);

        let part = compute_partial_row(&ctx, 0, &[], 100.0, 200.0, false);
        assert_eq!(part.to_line_by_cell.as_slice(), &[1]);
        assert!(part.is_last_part);
        assert_eq!(part.partial_height, 100.0);
    }

    #[test]
    fn test_cant_split_breaks_before_row() {
        let (mut table, measure) = uniform_table(3, 50.0);
        table.rows[1].attrs.cant_split = true;
        let ctx = TableContext::new(&table, &measure);

        let split = find_split_point(&ctx, 0, 90.0, 500.0);
        assert_eq!(split.end_row, 1);
        assert!(split.partial.is_none());
    }

    #[test]
    fn test_splittable_row_splits_mid_row() {
        let table = table_with(vec![
            row_of(1, RowAttrs::default()),
            row_of(1, RowAttrs::default()),
        ]);
        let measure = TableMeasure {
            rows: vec![cell_row(&[&[20.0]]), cell_row(&[&[20.0, 20.0, 20.0]])],
            ..TableMeasure::default()
        };
        let ctx = TableContext::new(&table, &measure);

        let split = find_split_point(&ctx, 0, 70.0, 500.0);
        assert_eq!(split.end_row, 1);
        let part = split.partial.unwrap();
        assert_eq!(part.row_index, 1);
        assert_eq!(part.to_line_by_cell.as_slice(), &[2]);
    }

    #[test]
    fn test_no_partial_below_minimum_height() {
        let (table, measure) = uniform_table(2, 50.0);
        let ctx = TableContext::new(&table, &measure);
        let split = find_split_point(&ctx, 0, 65.0, 500.0);
        assert_eq!(split.end_row, 1);
        assert!(split.partial.is_none());
    }

    #[test]
    fn test_rowspan_prefers_clean_break() {
        let (mut table, measure) = uniform_table(4, 30.0);
        table.rows[1].cells[0].attrs = CellAttrs {
            row_span: Some(2),
            ..CellAttrs::default()
        };
        table.rows[2].attrs.cant_split = true;
        let ctx = TableContext::new(&table, &measure);

        // rows 0..2 fit, row 2 does not; breaking before row 2 would cut the span
        let split = find_split_point(&ctx, 0, 70.0, 500.0);
        assert_eq!(split.end_row, 1);
    }

    #[test]
    fn test_explicit_height_slack_is_unsplittable() {
        let (mut table, measure) = uniform_table(1, 50.0);
        table.rows[0].attrs.row_height = Some(json!({"value": 80, "rule": "atLeast"}));
        let ctx = TableContext::new(&table, &measure);
        assert!(ctx.is_effectively_unsplittable(0, 500.0));
        assert!(!ctx.is_effectively_unsplittable(0, 40.0));
    }
}
