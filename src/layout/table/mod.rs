//! Table splitting across columns and pages
//!
//! A flowing table becomes one fragment per column it touches. Each fragment
//! covers whole rows `[from_row, to_row)` and at most one partially rendered
//! row, described by its `partial_row`. Floating tables are never split.

mod geometry;
mod split;

pub use geometry::{
    column_boundaries, rescale_column_widths, resolve_table_frame, TableFrame, MIN_COLUMN_WIDTH,
};
pub use split::{
    compute_partial_row, count_header_rows, find_split_point, Segment, SplitPoint, TableContext,
};

use log::debug;

use crate::document::{TableBlock, TableMeasure};
use crate::error::Result;
use crate::layout::paginator::EPSILON;
use crate::layout::pm_range::{self, PmRange};
use crate::layout::{Fragment, Paginator, PartialRowInfo, TableFragment};

/// Recursion bound for tables nested inside cells
pub const MAX_NESTING_DEPTH: usize = 8;

/// Smallest space worth starting a mid-row split in
pub const MIN_PARTIAL_ROW_HEIGHT: f32 = 20.0;

/// Vertical extent and row coverage of one table fragment
#[derive(Debug, Clone)]
pub struct FragmentSpec {
    pub from_row: usize,
    pub to_row: usize,
    pub y: f32,
    pub height: f32,
    pub repeat_header_count: usize,
    pub partial_row: Option<PartialRowInfo>,
    pub continues_from_prev: bool,
    pub continues_on_next: bool,
    pub is_anchored: bool,
}

impl FragmentSpec {
    /// The whole table in one piece
    pub fn monolithic(row_count: usize, y: f32, height: f32) -> Self {
        Self {
            from_row: 0,
            to_row: row_count,
            y,
            height,
            repeat_header_count: 0,
            partial_row: None,
            continues_from_prev: false,
            continues_on_next: false,
            is_anchored: false,
        }
    }
}

/// A table at least as wide as its column lays out inline even when anchored
pub fn is_full_width(measure: &TableMeasure, column_width: f32) -> bool {
    measure.measured_width() >= column_width - EPSILON
}

fn has_floating_props(table: &TableBlock) -> bool {
    table
        .attrs
        .floating
        .as_ref()
        .is_some_and(|f| !f.is_empty())
}

/// Build a table fragment inside the column at `base_x`
pub fn table_fragment(
    ctx: &TableContext<'_>,
    base_x: f32,
    column_width: f32,
    spec: FragmentSpec,
) -> TableFragment {
    let measured_width = ctx.measure.measured_width();
    let table_width = if measured_width > 0.0 {
        measured_width.min(column_width)
    } else {
        column_width
    };
    let frame = resolve_table_frame(base_x, column_width, table_width, &ctx.table.attrs);

    let resolved = ctx.measure.resolved_column_widths();
    let column_widths = rescale_column_widths(&resolved, measured_width, frame.width);
    let column_boundaries = column_boundaries(column_widths.as_deref().unwrap_or(&resolved));

    let pm = table_pm_range(ctx, spec.from_row, spec.to_row, spec.partial_row.as_ref());
    TableFragment {
        block_id: ctx.table.id.clone(),
        from_row: spec.from_row,
        to_row: spec.to_row,
        x: frame.x,
        y: spec.y,
        width: frame.width,
        height: spec.height,
        continues_from_prev: spec.continues_from_prev,
        continues_on_next: spec.continues_on_next,
        repeat_header_count: spec.repeat_header_count,
        partial_row: spec.partial_row,
        column_widths,
        column_boundaries,
        is_anchored: spec.is_anchored,
        pm_start: pm.map(|r| r.start),
        pm_end: pm.map(|r| r.end),
    }
}

fn full_row_range(ctx: &TableContext<'_>, row: usize) -> Option<PmRange> {
    ctx.row(row)?
        .cells
        .iter()
        .flat_map(|c| &c.blocks)
        .filter_map(pm_range::block_range)
        .reduce(PmRange::union)
}

fn partial_row_range(ctx: &TableContext<'_>, partial: &PartialRowInfo) -> Option<PmRange> {
    let row = partial.row_index;
    (0..ctx.cell_count(row))
        .filter_map(|cell| {
            let segments = ctx.cell_segments(row, cell);
            let len = segments.len();
            let lines = match (
                partial.from_line_by_cell.get(cell),
                partial.to_line_by_cell.get(cell),
            ) {
                (Some(&from), Some(&to)) => {
                    let from = from.min(len);
                    &segments[from..to.clamp(from, len)]
                }
                _ => &segments[..],
            };
            lines.iter().filter_map(|s| s.pm).reduce(PmRange::union)
        })
        .reduce(PmRange::union)
}

/// Document range of rows `[from_row, to_row)` plus the partial row, with
/// repeated headers excluded
fn table_pm_range(
    ctx: &TableContext<'_>,
    from_row: usize,
    to_row: usize,
    partial: Option<&PartialRowInfo>,
) -> Option<PmRange> {
    let mut range = None;
    for row in from_row..to_row {
        let row_range = match partial {
            Some(p) if p.row_index == row => partial_row_range(ctx, p),
            _ => full_row_range(ctx, row),
        };
        range = PmRange::merge(range, row_range);
    }
    if let Some(p) = partial.filter(|p| p.row_index >= to_row) {
        range = PmRange::merge(range, partial_row_range(ctx, p));
    }
    range
}

fn emit(paginator: &mut Paginator, ctx: &TableContext<'_>, spec: FragmentSpec) -> Result<()> {
    let state = paginator.ensure_page()?;
    let base_x = state.column_x(state.column_index);
    let column_width = state.column_width();
    state.advance_cursor(spec.height);
    state.trailing_spacing = 0.0;

    debug!(
        "table {} rows [{}, {}) at y={:.1} h={:.1}{}",
        ctx.table.id,
        spec.from_row,
        spec.to_row,
        spec.y,
        spec.height,
        if spec.partial_row.is_some() { " (partial row)" } else { "" }
    );
    let fragment = table_fragment(ctx, base_x, column_width, spec);
    paginator.push_fragment(Fragment::Table(fragment));
    Ok(())
}

/// Advance before row 0 when it cannot usefully start in the remaining space
fn preflight(paginator: &mut Paginator, ctx: &TableContext<'_>) -> Result<()> {
    let state = paginator.ensure_page()?;
    if state.is_column_empty() {
        return Ok(());
    }
    let full_height = state.content_bottom - state.top_margin;
    let first_height = ctx.row_height(0);

    let advance = if ctx.is_effectively_unsplittable(0, full_height) {
        !state.fits(first_height)
    } else if state.fits(first_height) {
        false
    } else {
        let part = compute_partial_row(ctx, 0, &[], state.remaining(), full_height, false);
        !part.made_progress()
    };

    if advance {
        debug!("table {}: first row does not fit, advancing", ctx.table.id);
        paginator.advance_column()?;
    }
    Ok(())
}

/// Repeating the header on a fresh column would split what the bare column
/// holds whole: a `cantSplit` row, or the next pending segment of a row.
/// `pending` is the per-cell line progress of a continued row.
fn header_forces_split(
    ctx: &TableContext<'_>,
    row: usize,
    pending: Option<&[usize]>,
    remaining: f32,
    header_height: f32,
) -> bool {
    let below_header = remaining - header_height;
    let needed = match pending {
        None if ctx.cant_split(row) => ctx.row_height(row),
        _ => ctx.next_segment_height(row, pending.unwrap_or(&[])),
    };
    needed > below_header + EPSILON && needed <= remaining + EPSILON
}

/// Lay out a table at the cursor, splitting it across columns and pages
pub fn layout_table(
    paginator: &mut Paginator,
    table: &TableBlock,
    measure: &TableMeasure,
) -> Result<()> {
    let ctx = TableContext::new(table, measure);
    let row_count = ctx.row_count();
    if row_count == 0 {
        return Ok(());
    }
    if has_floating_props(table) {
        return layout_floating_table(paginator, &ctx);
    }

    let header_count = count_header_rows(table).min(row_count);
    let header_height = ctx.rows_height(0, header_count);

    preflight(paginator, &ctx)?;

    let mut row = 0;
    let mut continuation: Option<PartialRowInfo> = None;
    let mut first = true;

    while row < row_count {
        let state = paginator.ensure_page()?;
        let full_height = state.content_bottom - state.top_margin;
        let at_top = state.is_column_empty();
        let remaining = state.remaining();
        let y = state.cursor_y;

        let mut repeat_header_count = 0;
        if !first
            && at_top
            && header_count > 0
            && row >= header_count
            && header_height < remaining - EPSILON
        {
            let pending = continuation.as_ref().map(|p| p.to_line_by_cell.as_slice());
            if header_forces_split(&ctx, row, pending, remaining, header_height) {
                debug!("table {}: skipping header repeat before row {}", table.id, row);
            } else {
                repeat_header_count = header_count;
            }
        }
        let headers = if repeat_header_count > 0 { header_height } else { 0.0 };
        let available = remaining - headers;

        if let Some(previous) = continuation.take() {
            let mut part = compute_partial_row(
                &ctx,
                row,
                &previous.to_line_by_cell,
                available,
                full_height,
                false,
            );
            if !part.made_progress() && !part.is_last_part {
                if !at_top {
                    continuation = Some(previous);
                    paginator.advance_column()?;
                    continue;
                }
                debug!("table {}: row {} does not fit a fresh column, forcing", table.id, row);
                part = compute_partial_row(
                    &ctx,
                    row,
                    &previous.to_line_by_cell,
                    available,
                    full_height,
                    true,
                );
            }

            let last = part.is_last_part;
            let to_row = if last { row + 1 } else { row };
            let spec = FragmentSpec {
                from_row: row,
                to_row,
                y,
                height: headers + part.partial_height,
                repeat_header_count,
                partial_row: Some(part.clone()),
                continues_from_prev: true,
                continues_on_next: !last || to_row < row_count,
                is_anchored: false,
            };
            emit(paginator, &ctx, spec)?;
            first = false;
            row = to_row;
            if !last {
                continuation = Some(part);
                paginator.advance_column()?;
            }
            continue;
        }

        let mut split = find_split_point(&ctx, row, available, full_height);
        if !split.makes_progress(row) {
            if !at_top {
                paginator.advance_column()?;
                continue;
            }
            debug!("table {}: row {} does not fit a fresh column, forcing", table.id, row);
            split = SplitPoint {
                end_row: row,
                partial: Some(compute_partial_row(&ctx, row, &[], available, full_height, true)),
            };
        }

        let partial_height = split.partial.as_ref().map_or(0.0, |p| p.partial_height);
        let last_part = split.partial.as_ref().is_some_and(|p| p.is_last_part);
        let to_row = if last_part { split.end_row + 1 } else { split.end_row };
        let pending = split.partial.clone().filter(|p| !p.is_last_part);
        let more = pending.is_some() || to_row < row_count;

        let spec = FragmentSpec {
            from_row: row,
            to_row,
            y,
            height: headers + ctx.rows_height(row, split.end_row) + partial_height,
            repeat_header_count,
            partial_row: split.partial,
            continues_from_prev: !first,
            continues_on_next: more,
            is_anchored: false,
        };
        emit(paginator, &ctx, spec)?;
        first = false;
        row = to_row;
        continuation = pending;
        if more {
            paginator.advance_column()?;
        }
    }
    Ok(())
}

/// One fragment at the cursor, offset by the floating position and clipped
/// to the content bottom as a last resort
fn layout_floating_table(paginator: &mut Paginator, ctx: &TableContext<'_>) -> Result<()> {
    let height = ctx.measure.height();
    let state = paginator.ensure_page()?;
    if !state.is_column_empty() && !state.fits(height) {
        paginator.advance_column()?;
    }

    let floating = ctx.table.attrs.floating.clone().unwrap_or_default();
    let state = paginator.ensure_page()?;
    let base_x = state.column_x(state.column_index) + floating.horizontal_offset.unwrap_or(0.0);
    let column_width = state.column_width();
    let y = state.cursor_y + floating.vertical_offset.unwrap_or(0.0);
    let clipped = height.min((state.content_bottom - y).max(0.0));
    if clipped < height {
        debug!("floating table {} clipped to {:.1}px", ctx.table.id, clipped);
    }
    let bottom = y + clipped;
    state.advance_cursor((bottom - state.cursor_y).max(0.0));
    state.trailing_spacing = 0.0;

    let spec = FragmentSpec::monolithic(ctx.row_count(), y, clipped);
    let fragment = table_fragment(ctx, base_x, column_width, spec);
    paginator.push_fragment(Fragment::Table(fragment));
    Ok(())
}
