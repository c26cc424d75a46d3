//! Shared builders for integration tests

#![allow(dead_code)]

use page_flow::document::{
    CellMeasure, ParagraphBlock, ParagraphMeasure, RowAttrs, RowMeasure, Run, SectionBreakBlock,
    SectionBreakType, TableBlock, TableCell, TableMeasure, TableRow,
};
use page_flow::{Block, BlockId, LayoutOptions, Margins, Measure, PageSize};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn options(w: f32, h: f32, margin: f32) -> LayoutOptions {
    LayoutOptions::new(PageSize::new(w, h), Margins::uniform(margin))
}

/// Builds a block sequence with positionally matching measures
#[derive(Default)]
pub struct Doc {
    pub blocks: Vec<Block>,
    pub measures: Vec<Measure>,
    next_pm: u32,
}

impl Doc {
    pub fn new() -> Self {
        Self {
            next_pm: 1,
            ..Self::default()
        }
    }

    /// Paragraph with one run; each line covers `chars_per_line` characters
    pub fn paragraph(&mut self, id: &str, heights: &[f32]) -> &mut Self {
        let chars_per_line = 10;
        let text = "x".repeat(chars_per_line * heights.len().max(1));
        let run = Run::new(text, self.next_pm);
        self.next_pm = run.pm_end.unwrap_or(self.next_pm) + 2;

        let mut measure = ParagraphMeasure::from_heights(heights);
        for (i, line) in measure.lines.iter_mut().enumerate() {
            line.from_char = i * chars_per_line;
            line.to_char = (i + 1) * chars_per_line;
        }
        self.blocks.push(Block::Paragraph(ParagraphBlock::new(id, vec![run])));
        self.measures.push(Measure::Paragraph(measure));
        self
    }

    /// Table whose cells each hold one paragraph with the given line heights
    pub fn table(&mut self, id: &str, rows: &[Vec<Vec<f32>>], width: f32) -> &mut Self {
        let mut block_rows = Vec::new();
        let mut measure_rows = Vec::new();
        for (r, cells) in rows.iter().enumerate() {
            let mut block_cells = Vec::new();
            let mut measure_cells = Vec::new();
            for (c, lines) in cells.iter().enumerate() {
                let run = Run::new("y".repeat(lines.len().max(1)), self.next_pm);
                self.next_pm = run.pm_end.unwrap_or(self.next_pm) + 2;
                block_cells.push(TableCell {
                    blocks: vec![Block::Paragraph(ParagraphBlock::new(
                        format!("{}-r{}c{}", id, r, c),
                        vec![run],
                    ))],
                    ..TableCell::default()
                });
                let mut measure = CellMeasure::with_lines(lines);
                measure.height += 4.0; // default vertical padding
                measure.width = width / cells.len().max(1) as f32;
                measure_cells.push(measure);
            }
            let height = measure_cells.iter().map(|c| c.height).fold(0.0, f32::max);
            block_rows.push(TableRow {
                cells: block_cells,
                ..TableRow::default()
            });
            measure_rows.push(RowMeasure {
                height,
                cells: measure_cells,
            });
        }
        let columns = rows.first().map_or(1, |r| r.len().max(1));
        self.blocks.push(Block::Table(TableBlock {
            id: BlockId::new(id),
            rows: block_rows,
            ..TableBlock::default()
        }));
        self.measures.push(Measure::Table(TableMeasure {
            rows: measure_rows,
            column_widths: vec![width / columns as f32; columns],
            total_width: width,
            total_height: 0.0,
        }));
        self
    }

    /// Set the attributes of row `row` in the last table
    pub fn row_attrs(&mut self, row: usize, attrs: RowAttrs) -> &mut Self {
        if let Some(Block::Table(table)) = self.blocks.last_mut() {
            if let Some(target) = table.rows.get_mut(row) {
                target.attrs = attrs;
            }
        }
        self
    }

    pub fn section(&mut self, section: SectionBreakBlock) -> &mut Self {
        self.blocks.push(Block::SectionBreak(section));
        self.measures.push(Measure::SectionBreak);
        self
    }

    pub fn section_break(&mut self, id: &str, break_type: SectionBreakType) -> &mut Self {
        self.section(SectionBreakBlock::new(id, break_type))
    }

    pub fn page_break(&mut self) -> &mut Self {
        self.blocks.push(Block::PageBreak(Default::default()));
        self.measures.push(Measure::PageBreak);
        self
    }

    pub fn column_break(&mut self) -> &mut Self {
        self.blocks.push(Block::ColumnBreak(Default::default()));
        self.measures.push(Measure::ColumnBreak);
        self
    }
}
