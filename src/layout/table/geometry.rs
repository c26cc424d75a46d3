//! Horizontal table geometry

use crate::document::attrs;
use crate::document::{TableAttrs, TableJustification};
use crate::layout::ColumnBoundary;

/// Narrowest a column may be resized to
pub const MIN_COLUMN_WIDTH: f32 = 10.0;

/// Resolved horizontal placement of a table fragment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableFrame {
    pub x: f32,
    pub width: f32,
}

/// Place a table of `table_width` inside the column starting at `base_x`.
///
/// Center and right justification ignore the indent. Otherwise a positive
/// indent shifts right and trims the width only on overflow, while a
/// negative indent shifts into the margin and widens the table by the same
/// amount.
pub fn resolve_table_frame(
    base_x: f32,
    column_width: f32,
    table_width: f32,
    attrs: &TableAttrs,
) -> TableFrame {
    let slack = (column_width - table_width).max(0.0);
    match attrs.justification {
        Some(TableJustification::Center) => TableFrame {
            x: base_x + slack / 2.0,
            width: table_width,
        },
        Some(TableJustification::Right | TableJustification::End) => TableFrame {
            x: base_x + slack,
            width: table_width,
        },
        _ => {
            let indent = attrs::table_indent(attrs.table_indent.as_ref());
            let width = if indent >= 0.0 {
                table_width.min(column_width - indent)
            } else {
                table_width - indent
            };
            TableFrame {
                x: base_x + indent,
                width: width.max(0.0),
            }
        }
    }
}

/// Scale `widths` down to `frame_width` when the table was measured wider.
///
/// Each width is rounded and the last column absorbs the rounding residual,
/// so the result sums to `frame_width.round()`. Returns `None` when no
/// rescale is needed.
pub fn rescale_column_widths(
    widths: &[f32],
    measured_width: f32,
    frame_width: f32,
) -> Option<Vec<f32>> {
    if widths.is_empty() || measured_width <= frame_width || measured_width <= 0.0 {
        return None;
    }
    let scale = frame_width.max(0.0) / measured_width;
    let mut scaled: Vec<f32> = widths.iter().map(|w| (w * scale).round()).collect();

    let (last, rest) = scaled.split_last_mut()?;
    let rest_sum: f32 = rest.iter().sum();
    *last = frame_width.max(0.0).round() - rest_sum;
    Some(scaled)
}

/// Resize-handle metadata for column `widths`, relative to the fragment
pub fn column_boundaries(widths: &[f32]) -> Vec<ColumnBoundary> {
    let mut x = 0.0;
    widths
        .iter()
        .enumerate()
        .map(|(index, &width)| {
            let boundary = ColumnBoundary {
                index,
                x,
                width,
                min_width: MIN_COLUMN_WIDTH,
                resizable: true,
            };
            x += width;
            boundary
        })
        .collect()
}
