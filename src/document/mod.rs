//! Input model: blocks and their measures

pub mod attrs;
mod block;
mod measure;

pub use block::{
    AnchorSpec, Block, BlockId, BreakBlock, CellAttrs, Exclusion, FloatAlignment, FrameSpec,
    FrameWrap, HRelativeFrom, ListBlock, ListItem, MarginOverrides, NumberFormat, ObjectBlock,
    Orientation, PageNumbering, ParagraphAttrs, ParagraphBlock, RowAttrs, Run,
    SectionBreakBlock, SectionBreakType, Spacing, TableAttrs, TableBlock, TableCell,
    TableFloatingProps, TableJustification, TableRow, VRelativeFrom,
};
pub use measure::{
    CellMeasure, Line, ListItemMeasure, ListMeasure, Measure, ObjectMeasure, ParagraphMeasure,
    RowMeasure, TableMeasure,
};

use crate::error::{LayoutError, Result};

/// Verify that `measures` pairs 1:1 with `blocks`, by position and by kind
pub fn check_measures(blocks: &[Block], measures: &[Measure]) -> Result<()> {
    if blocks.len() != measures.len() {
        return Err(LayoutError::MeasureCountMismatch {
            blocks: blocks.len(),
            measures: measures.len(),
        });
    }

    for (index, (block, measure)) in blocks.iter().zip(measures).enumerate() {
        let matches = matches!(
            (block, measure),
            (Block::Paragraph(_), Measure::Paragraph(_))
                | (Block::Table(_), Measure::Table(_))
                | (Block::Image(_), Measure::Image(_))
                | (Block::Drawing(_), Measure::Drawing(_))
                | (Block::List(_), Measure::List(_))
                | (Block::SectionBreak(_), Measure::SectionBreak)
                | (Block::ColumnBreak(_), Measure::ColumnBreak)
                | (Block::PageBreak(_), Measure::PageBreak)
        );
        if !matches {
            return Err(LayoutError::MeasureKindMismatch {
                index,
                block_id: block.id().to_string(),
                expected: block.kind_name(),
            });
        }
    }

    Ok(())
}
