//! Pre-computed block geometry
//!
//! Measures are produced by the editor's text measurement and are positional
//! with the block sequence: `measures[i]` describes `blocks[i]`.

use serde::{Deserialize, Serialize};

use crate::document::BlockId;

/// One measured line of a paragraph
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Line {
    pub from_run: usize,
    pub from_char: usize,
    pub to_run: usize,
    pub to_char: usize,
    pub width: f32,
    #[serde(alias = "lineHeight")]
    pub height: f32,
}

impl Line {
    pub fn new(height: f32) -> Self {
        Self {
            height,
            ..Self::default()
        }
    }

    /// Line covering `from_char..to_char` of run `run`
    pub fn in_run(run: usize, from_char: usize, to_char: usize, width: f32, height: f32) -> Self {
        Self {
            from_run: run,
            from_char,
            to_run: run,
            to_char,
            width,
            height,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParagraphMeasure {
    pub lines: Vec<Line>,
}

impl ParagraphMeasure {
    pub fn new(lines: Vec<Line>) -> Self {
        Self { lines }
    }

    /// Measure with one line per height
    pub fn from_heights(heights: &[f32]) -> Self {
        Self {
            lines: heights.iter().map(|&h| Line::new(h)).collect(),
        }
    }

    pub fn total_height(&self) -> f32 {
        self.lines.iter().map(|l| l.height).sum()
    }

    /// Widest line, used for horizontal alignment overrides
    pub fn max_width(&self) -> f32 {
        self.lines.iter().map(|l| l.width).fold(0.0, f32::max)
    }
}

/// Image or drawing box
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct ObjectMeasure {
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CellMeasure {
    /// Measures of the cell's nested blocks, positional with `TableCell::blocks`
    pub blocks: Vec<Measure>,
    pub width: f32,
    pub height: f32,
}

impl CellMeasure {
    /// Cell holding one paragraph with the given line heights
    pub fn with_lines(heights: &[f32]) -> Self {
        let measure = ParagraphMeasure::from_heights(heights);
        Self {
            height: measure.total_height(),
            blocks: vec![Measure::Paragraph(measure)],
            width: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct RowMeasure {
    pub height: f32,
    pub cells: Vec<CellMeasure>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableMeasure {
    pub rows: Vec<RowMeasure>,
    pub column_widths: Vec<f32>,
    pub total_width: f32,
    pub total_height: f32,
}

impl TableMeasure {
    /// Column widths, falling back to the first row's cell widths
    pub fn resolved_column_widths(&self) -> Vec<f32> {
        if !self.column_widths.is_empty() {
            return self.column_widths.clone();
        }
        self.rows
            .first()
            .map(|row| row.cells.iter().map(|c| c.width).collect())
            .unwrap_or_default()
    }

    /// Measured width, falling back to the sum of the column widths
    pub fn measured_width(&self) -> f32 {
        if self.total_width > 0.0 {
            self.total_width
        } else {
            self.resolved_column_widths().iter().sum()
        }
    }

    pub fn height(&self) -> f32 {
        if self.total_height > 0.0 {
            self.total_height
        } else {
            self.rows.iter().map(|r| r.height).sum()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListItemMeasure {
    pub item_id: BlockId,
    pub marker_width: f32,
    pub paragraph: ParagraphMeasure,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct ListMeasure {
    pub items: Vec<ListItemMeasure>,
}

/// Geometry of one block
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Measure {
    Paragraph(ParagraphMeasure),
    Table(TableMeasure),
    Image(ObjectMeasure),
    Drawing(ObjectMeasure),
    List(ListMeasure),
    SectionBreak,
    ColumnBreak,
    PageBreak,
}

impl Measure {
    /// Height the measured block occupies when laid out in one piece
    pub fn flow_height(&self) -> f32 {
        match self {
            Measure::Paragraph(p) => p.total_height(),
            Measure::Table(t) => t.height(),
            Measure::Image(o) | Measure::Drawing(o) => o.height,
            Measure::List(l) => l.items.iter().map(|i| i.paragraph.total_height()).sum(),
            Measure::SectionBreak | Measure::ColumnBreak | Measure::PageBreak => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paragraph_measure_totals() {
        let mut measure = ParagraphMeasure::from_heights(&[10.0, 12.0, 14.0]);
        assert_eq!(measure.total_height(), 36.0);
        measure.lines[1].width = 80.0;
        assert_eq!(measure.max_width(), 80.0);
    }

    #[test]
    fn test_table_measure_fallbacks() {
        let measure = TableMeasure {
            rows: vec![RowMeasure {
                height: 20.0,
                cells: vec![
                    CellMeasure { width: 40.0, ..CellMeasure::default() },
                    CellMeasure { width: 60.0, ..CellMeasure::default() },
                ],
            }],
            ..TableMeasure::default()
        };
        assert_eq!(measure.resolved_column_widths(), vec![40.0, 60.0]);
        assert_eq!(measure.measured_width(), 100.0);
        assert_eq!(measure.height(), 20.0);
    }

    #[test]
    fn test_deserialize_line_height_alias() {
        let json = r#"{"kind": "paragraph", "lines": [{"lineHeight": 18, "width": 120, "toChar": 5}]}"#;
        let measure: Measure = serde_json::from_str(json).unwrap();
        assert_eq!(measure.flow_height(), 18.0);
    }
}
