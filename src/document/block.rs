//! Block-level input model
//!
//! Blocks are immutable descriptions of document units, supplied by the
//! editor in document order. Kind-specific payloads live in their own structs;
//! loosely-typed OOXML attributes stay as raw JSON and are read through
//! [`crate::document::attrs`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::layout::{ColumnLayout, PageSize};

/// Stable identifier of a block
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(pub String);

impl BlockId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A text run with its document position range
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Run {
    pub text: String,
    pub pm_start: Option<u32>,
    pub pm_end: Option<u32>,
}

impl Run {
    pub fn new(text: impl Into<String>, pm_start: u32) -> Self {
        let text = text.into();
        let len = text.chars().count() as u32;
        Self {
            text,
            pm_start: Some(pm_start),
            pm_end: Some(pm_start + len),
        }
    }
}

/// Spacing before/after a paragraph, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct Spacing {
    pub before: f32,
    pub after: f32,
}

/// Horizontal alignment override within the column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FloatAlignment {
    Left,
    Center,
    Right,
}

impl FloatAlignment {
    /// X offset of an item of `width` inside a box of `available` width
    pub fn offset(self, available: f32, width: f32) -> f32 {
        let slack = (available - width).max(0.0);
        match self {
            FloatAlignment::Left => 0.0,
            FloatAlignment::Center => slack / 2.0,
            FloatAlignment::Right => slack,
        }
    }
}

/// Text-frame wrapping mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FrameWrap {
    #[default]
    Around,
    None,
    NotBeside,
    Through,
    Tight,
    Auto,
}

/// Paragraph text frame (`w:framePr`)
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FrameSpec {
    pub wrap: FrameWrap,
    pub x: f32,
    pub y: f32,
    pub x_align: Option<FloatAlignment>,
}

/// Horizontal space taken away from a paragraph by floats, precomputed by the
/// float manager
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct Exclusion {
    pub left: f32,
    pub right: f32,
}

impl Exclusion {
    pub fn is_empty(&self) -> bool {
        self.left.max(0.0) + self.right.max(0.0) <= 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParagraphAttrs {
    pub spacing: Spacing,
    pub keep_next: bool,
    pub keep_lines: bool,
    pub contextual_spacing: bool,
    pub style_id: Option<String>,
    pub page_break_before: bool,
    pub float_alignment: Option<FloatAlignment>,
    pub frame: Option<FrameSpec>,
    pub float_exclusion: Option<Exclusion>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParagraphBlock {
    pub id: BlockId,
    #[serde(default)]
    pub runs: Vec<Run>,
    #[serde(default)]
    pub attrs: ParagraphAttrs,
}

impl ParagraphBlock {
    pub fn new(id: impl Into<String>, runs: Vec<Run>) -> Self {
        Self {
            id: BlockId::new(id),
            runs,
            attrs: ParagraphAttrs::default(),
        }
    }

    /// True when no run carries any text
    pub fn is_empty(&self) -> bool {
        self.runs.iter().all(|r| r.text.is_empty())
    }

    /// Frame that removes this paragraph from the vertical flow
    pub fn overlay_frame(&self) -> Option<FrameSpec> {
        self.attrs.frame.filter(|f| f.wrap == FrameWrap::None)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListItem {
    pub id: BlockId,
    #[serde(default)]
    pub marker_text: Option<String>,
    pub paragraph: ParagraphBlock,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListBlock {
    pub id: BlockId,
    #[serde(default)]
    pub items: Vec<ListItem>,
}

/// Horizontal reference box of an anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HRelativeFrom {
    #[default]
    Column,
    Character,
    Margin,
    Page,
}

/// Vertical reference box of an anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VRelativeFrom {
    #[default]
    Paragraph,
    Line,
    Margin,
    Page,
}

/// Floating placement descriptor (`wp:anchor`)
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnchorSpec {
    pub is_anchored: bool,
    pub h_relative_from: HRelativeFrom,
    pub v_relative_from: VRelativeFrom,
    pub offset_h: f32,
    pub offset_v: f32,
    pub align_h: Option<FloatAlignment>,
    /// Pure z-order directive; never affects layout
    pub behind_doc: bool,
    pub z_index: Option<i32>,
}

/// Image or drawing payload
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectBlock {
    pub id: BlockId,
    #[serde(default)]
    pub anchor: Option<AnchorSpec>,
    #[serde(default)]
    pub float_alignment: Option<FloatAlignment>,
    #[serde(default)]
    pub pm_start: Option<u32>,
    #[serde(default)]
    pub pm_end: Option<u32>,
}

impl ObjectBlock {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: BlockId::new(id),
            ..Self::default()
        }
    }

    pub fn is_anchored(&self) -> bool {
        self.anchor.is_some_and(|a| a.is_anchored)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TableJustification {
    Left,
    Start,
    Center,
    Right,
    End,
}

/// Floating table position (`w:tblpPr`)
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableFloatingProps {
    pub horizontal_offset: Option<f32>,
    pub vertical_offset: Option<f32>,
    pub horizontal_anchor: Option<String>,
    pub vertical_anchor: Option<String>,
}

impl TableFloatingProps {
    pub fn is_empty(&self) -> bool {
        self.horizontal_offset.is_none()
            && self.vertical_offset.is_none()
            && self.horizontal_anchor.is_none()
            && self.vertical_anchor.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableAttrs {
    pub justification: Option<TableJustification>,
    /// Raw `{ width, type }` value; see [`crate::document::attrs::table_indent`]
    pub table_indent: Option<Value>,
    pub floating: Option<TableFloatingProps>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RowAttrs {
    pub repeat_header: bool,
    pub cant_split: bool,
    /// Raw `{ value, rule }` value; see [`crate::document::attrs::row_height`]
    pub row_height: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CellAttrs {
    pub row_span: Option<u32>,
    pub col_span: Option<u32>,
    /// Raw `{ top, right, bottom, left }` value; see [`crate::document::attrs::cell_padding`]
    pub padding: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableCell {
    pub id: Option<BlockId>,
    pub blocks: Vec<Block>,
    pub attrs: CellAttrs,
}

impl TableCell {
    pub fn row_span(&self) -> usize {
        self.attrs.row_span.unwrap_or(1).max(1) as usize
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableRow {
    pub id: Option<BlockId>,
    pub cells: Vec<TableCell>,
    pub attrs: RowAttrs,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableBlock {
    pub id: BlockId,
    #[serde(default)]
    pub rows: Vec<TableRow>,
    #[serde(default)]
    pub attrs: TableAttrs,
    #[serde(default)]
    pub anchor: Option<AnchorSpec>,
}

impl TableBlock {
    pub fn is_anchored(&self) -> bool {
        self.anchor.is_some_and(|a| a.is_anchored)
    }

    /// Tables with floating or anchor properties render as one fragment
    pub fn is_floating(&self) -> bool {
        self.is_anchored()
            || self
                .attrs
                .floating
                .as_ref()
                .is_some_and(|f| !f.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SectionBreakType {
    #[default]
    Continuous,
    NextPage,
    EvenPage,
    OddPage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NumberFormat {
    #[default]
    Decimal,
    LowerRoman,
    UpperRoman,
    LowerLetter,
    UpperLetter,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct PageNumbering {
    pub start: Option<u32>,
    pub format: Option<NumberFormat>,
}

/// Partial margin override; unset sides keep their current value
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct MarginOverrides {
    pub top: Option<f32>,
    pub right: Option<f32>,
    pub bottom: Option<f32>,
    pub left: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionBreakBlock {
    pub id: BlockId,
    #[serde(rename = "type", default)]
    pub break_type: SectionBreakType,
    #[serde(default)]
    pub margins: Option<MarginOverrides>,
    #[serde(default)]
    pub page_size: Option<PageSize>,
    #[serde(default)]
    pub orientation: Option<Orientation>,
    #[serde(default)]
    pub columns: Option<ColumnLayout>,
    #[serde(default)]
    pub require_page_boundary: bool,
    #[serde(default)]
    pub page_numbering: Option<PageNumbering>,
}

impl SectionBreakBlock {
    pub fn new(id: impl Into<String>, break_type: SectionBreakType) -> Self {
        Self {
            id: BlockId::new(id),
            break_type,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct BreakBlock {
    pub id: BlockId,
}

/// One document unit to lay out
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Block {
    Paragraph(ParagraphBlock),
    Table(TableBlock),
    Image(ObjectBlock),
    Drawing(ObjectBlock),
    List(ListBlock),
    SectionBreak(SectionBreakBlock),
    ColumnBreak(BreakBlock),
    PageBreak(BreakBlock),
}

impl Block {
    pub fn id(&self) -> &BlockId {
        match self {
            Block::Paragraph(p) => &p.id,
            Block::Table(t) => &t.id,
            Block::Image(o) | Block::Drawing(o) => &o.id,
            Block::List(l) => &l.id,
            Block::SectionBreak(s) => &s.id,
            Block::ColumnBreak(b) | Block::PageBreak(b) => &b.id,
        }
    }

    /// Name of the measure kind this block pairs with
    pub fn kind_name(&self) -> &'static str {
        match self {
            Block::Paragraph(_) => "paragraph",
            Block::Table(_) => "table",
            Block::Image(_) => "image",
            Block::Drawing(_) => "drawing",
            Block::List(_) => "list",
            Block::SectionBreak(_) => "sectionBreak",
            Block::ColumnBreak(_) => "columnBreak",
            Block::PageBreak(_) => "pageBreak",
        }
    }

    /// Check if this block is an empty paragraph
    pub fn is_empty_paragraph(&self) -> bool {
        matches!(self, Block::Paragraph(p) if p.is_empty())
    }

    pub fn is_paragraph(&self) -> bool {
        matches!(self, Block::Paragraph(_))
    }

    /// Floating objects positioned relative to an anchor paragraph
    pub fn is_anchored(&self) -> bool {
        match self {
            Block::Image(o) | Block::Drawing(o) => o.is_anchored(),
            Block::Table(t) => t.is_anchored(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_kind() {
        let para = Block::Paragraph(ParagraphBlock::new("p1", vec![Run::new("Hi", 1)]));
        assert!(para.is_paragraph());
        assert!(!para.is_empty_paragraph());
        assert_eq!(para.kind_name(), "paragraph");
        assert_eq!(para.id().as_str(), "p1");

        let empty = Block::Paragraph(ParagraphBlock::new("p2", vec![]));
        assert!(empty.is_empty_paragraph());
    }

    #[test]
    fn test_deserialize_tagged_blocks() {
        let json = r#"[
            {"kind": "paragraph", "id": "p1", "runs": [{"text": "Hello", "pmStart": 1, "pmEnd": 6}],
             "attrs": {"spacing": {"before": 4, "after": 8}, "keepNext": true}},
            {"kind": "sectionBreak", "id": "s1", "type": "evenPage", "columns": {"count": 2, "gap": 24}},
            {"kind": "image", "id": "i1", "anchor": {"isAnchored": true, "behindDoc": true}},
            {"kind": "pageBreak", "id": "b1"}
        ]"#;
        let blocks: Vec<Block> = serde_json::from_str(json).unwrap();
        assert_eq!(blocks.len(), 4);

        match &blocks[0] {
            Block::Paragraph(p) => {
                assert_eq!(p.attrs.spacing.after, 8.0);
                assert!(p.attrs.keep_next);
                assert_eq!(p.runs[0].pm_end, Some(6));
            }
            other => panic!("unexpected block {:?}", other),
        }
        match &blocks[1] {
            Block::SectionBreak(s) => {
                assert_eq!(s.break_type, SectionBreakType::EvenPage);
                assert_eq!(s.columns.map(|c| c.count), Some(2));
            }
            other => panic!("unexpected block {:?}", other),
        }
        assert!(blocks[2].is_anchored());
    }

    #[test]
    fn test_table_floating_detection() {
        let mut table = TableBlock::default();
        assert!(!table.is_floating());

        table.attrs.floating = Some(TableFloatingProps::default());
        assert!(!table.is_floating());

        table.attrs.floating = Some(TableFloatingProps {
            vertical_offset: Some(12.0),
            ..TableFloatingProps::default()
        });
        assert!(table.is_floating());
    }

    #[test]
    fn test_float_alignment_offset() {
        assert_eq!(FloatAlignment::Left.offset(100.0, 40.0), 0.0);
        assert_eq!(FloatAlignment::Center.offset(100.0, 40.0), 30.0);
        assert_eq!(FloatAlignment::Right.offset(100.0, 40.0), 60.0);
        assert_eq!(FloatAlignment::Right.offset(30.0, 40.0), 0.0);
    }
}
