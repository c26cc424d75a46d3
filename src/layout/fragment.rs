//! Layout output: fragments, pages and layouts

use serde::Serialize;
use smallvec::SmallVec;

use crate::document::{BlockId, Line};
use crate::layout::pm_range::PmRange;
use crate::layout::{ColumnLayout, Margins, PageSize};

/// Per-cell line indices; most tables have few columns
pub type CellLines = SmallVec<[usize; 8]>;

/// A placement of (part of) a paragraph
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParaFragment {
    pub block_id: BlockId,
    pub from_line: usize,
    pub to_line: usize,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub continues_from_prev: bool,
    pub continues_on_next: bool,
    pub pm_start: Option<u32>,
    pub pm_end: Option<u32>,
    /// Lines re-measured at a narrowed width, when they differ from the measure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines: Option<Vec<Line>>,
}

/// A placement of (part of) one list item
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListItemFragment {
    pub block_id: BlockId,
    pub item_id: BlockId,
    pub from_line: usize,
    pub to_line: usize,
    pub marker_width: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker_text: Option<String>,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub continues_from_prev: bool,
    pub continues_on_next: bool,
    pub pm_start: Option<u32>,
    pub pm_end: Option<u32>,
}

/// An image or drawing placement
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectFragment {
    pub block_id: BlockId,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub is_anchored: bool,
    pub behind_doc: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i32>,
    pub pm_start: Option<u32>,
    pub pm_end: Option<u32>,
}

/// Mid-row split state of a table row
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialRowInfo {
    pub row_index: usize,
    pub from_line_by_cell: CellLines,
    /// Exclusive end per cell
    pub to_line_by_cell: CellLines,
    pub is_first_part: bool,
    pub is_last_part: bool,
    pub partial_height: f32,
}

impl PartialRowInfo {
    /// Whether any cell renders at least one line
    pub fn made_progress(&self) -> bool {
        self.from_line_by_cell
            .iter()
            .zip(&self.to_line_by_cell)
            .any(|(from, to)| to > from)
    }
}

/// Resize-handle metadata for one table column
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnBoundary {
    pub index: usize,
    /// X relative to the fragment's left edge
    pub x: f32,
    pub width: f32,
    pub min_width: f32,
    pub resizable: bool,
}

/// A placement of a run of table rows
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableFragment {
    pub block_id: BlockId,
    /// Whole rows `[from_row, to_row)`. A row split mid-row is counted in the
    /// fragment holding its last part; earlier parts only appear in
    /// `partial_row`.
    pub from_row: usize,
    pub to_row: usize,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub continues_from_prev: bool,
    pub continues_on_next: bool,
    pub repeat_header_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial_row: Option<PartialRowInfo>,
    /// Rescaled column widths; `None` when the measured widths fit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_widths: Option<Vec<f32>>,
    pub column_boundaries: Vec<ColumnBoundary>,
    pub is_anchored: bool,
    pub pm_start: Option<u32>,
    pub pm_end: Option<u32>,
}

/// One rendered placement on a page
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Fragment {
    Para(ParaFragment),
    Table(TableFragment),
    Image(ObjectFragment),
    Drawing(ObjectFragment),
    ListItem(ListItemFragment),
}

macro_rules! fragment_field {
    ($self:ident, $field:ident) => {
        match $self {
            Fragment::Para(f) => f.$field,
            Fragment::Table(f) => f.$field,
            Fragment::Image(f) | Fragment::Drawing(f) => f.$field,
            Fragment::ListItem(f) => f.$field,
        }
    };
}

impl Fragment {
    pub fn block_id(&self) -> &BlockId {
        match self {
            Fragment::Para(f) => &f.block_id,
            Fragment::Table(f) => &f.block_id,
            Fragment::Image(f) | Fragment::Drawing(f) => &f.block_id,
            Fragment::ListItem(f) => &f.block_id,
        }
    }

    pub fn x(&self) -> f32 {
        fragment_field!(self, x)
    }

    pub fn y(&self) -> f32 {
        fragment_field!(self, y)
    }

    pub fn width(&self) -> f32 {
        fragment_field!(self, width)
    }

    pub fn height(&self) -> f32 {
        fragment_field!(self, height)
    }

    pub fn bottom(&self) -> f32 {
        self.y() + self.height()
    }

    pub fn pm_start(&self) -> Option<u32> {
        fragment_field!(self, pm_start)
    }

    pub fn pm_end(&self) -> Option<u32> {
        fragment_field!(self, pm_end)
    }

    /// Annotate the document-position range; done once, right after creation
    pub fn set_pm_range(&mut self, range: Option<PmRange>) {
        let (start, end) = match range {
            Some(r) => (Some(r.start), Some(r.end)),
            None => (None, None),
        };
        match self {
            Fragment::Para(f) => (f.pm_start, f.pm_end) = (start, end),
            Fragment::Table(f) => (f.pm_start, f.pm_end) = (start, end),
            Fragment::Image(f) | Fragment::Drawing(f) => (f.pm_start, f.pm_end) = (start, end),
            Fragment::ListItem(f) => (f.pm_start, f.pm_end) = (start, end),
        }
    }

    pub fn is_anchored(&self) -> bool {
        match self {
            Fragment::Image(f) | Fragment::Drawing(f) => f.is_anchored,
            Fragment::Table(f) => f.is_anchored,
            _ => false,
        }
    }

    /// Anchored behind the text; a pure z-order directive
    pub fn is_behind_doc(&self) -> bool {
        matches!(self, Fragment::Image(f) | Fragment::Drawing(f) if f.is_anchored && f.behind_doc)
    }

    pub fn as_table(&self) -> Option<&TableFragment> {
        match self {
            Fragment::Table(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_para(&self) -> Option<&ParaFragment> {
        match self {
            Fragment::Para(f) => Some(f),
            _ => None,
        }
    }
}

/// A laid-out page
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    /// 1-based physical page number
    pub number: u32,
    /// Display page number in the section's format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_text: Option<String>,
    pub margins: Margins,
    /// Page size, when it differs from the layout default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<PageSize>,
    pub section_index: usize,
    /// Column configuration at the top of the page
    pub columns: ColumnLayout,
    pub fragments: Vec<Fragment>,
}

impl Page {
    pub fn is_blank(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Fragments belonging to `block_id`, in placement order
    pub fn fragments_for<'a>(&'a self, block_id: &'a str) -> impl Iterator<Item = &'a Fragment> {
        self.fragments
            .iter()
            .filter(move |f| f.block_id().as_str() == block_id)
    }
}

/// Result of paginating a document
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    pub page_size: PageSize,
    pub pages: Vec<Page>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<ColumnLayout>,
}

impl Layout {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// All fragments of `block_id` across pages, in order
    pub fn fragments_for<'a>(&'a self, block_id: &'a str) -> Vec<&'a Fragment> {
        self.pages
            .iter()
            .flat_map(|p| p.fragments_for(block_id))
            .collect()
    }
}

/// Result of laying out a header or footer container
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderFooterLayout {
    pub size: PageSize,
    pub pages: Vec<Page>,
    /// Content height, excluding behind-document anchors
    pub height: f32,
    /// Smallest fragment Y, used to normalise negative anchor offsets
    pub min_y: f32,
}

impl HeaderFooterLayout {
    pub fn fragments_for<'a>(&'a self, block_id: &'a str) -> Vec<&'a Fragment> {
        self.pages
            .iter()
            .flat_map(|p| p.fragments_for(block_id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn para(y: f32, height: f32) -> Fragment {
        Fragment::Para(ParaFragment {
            block_id: BlockId::new("p1"),
            from_line: 0,
            to_line: 1,
            x: 10.0,
            y,
            width: 100.0,
            height,
            continues_from_prev: false,
            continues_on_next: false,
            pm_start: None,
            pm_end: None,
            lines: None,
        })
    }

    #[test]
    fn test_fragment_accessors() {
        let mut fragment = para(20.0, 30.0);
        assert_eq!(fragment.bottom(), 50.0);
        assert_eq!(fragment.block_id().as_str(), "p1");

        fragment.set_pm_range(Some(PmRange::new(3, 9)));
        assert_eq!(fragment.pm_start(), Some(3));
        assert_eq!(fragment.pm_end(), Some(9));
    }

    #[test]
    fn test_fragment_serializes_kind_tag() {
        let value = serde_json::to_value(para(0.0, 10.0)).unwrap();
        assert_eq!(value["kind"], "para");
        assert_eq!(value["fromLine"], 0);
        assert_eq!(value["continuesOnNext"], false);
        assert!(value.get("lines").is_none());
    }

    #[test]
    fn test_partial_row_progress() {
        let info = PartialRowInfo {
            row_index: 0,
            from_line_by_cell: CellLines::from_slice(&[1, 2]),
            to_line_by_cell: CellLines::from_slice(&[1, 3]),
            is_first_part: false,
            is_last_part: false,
            partial_height: 20.0,
        };
        assert!(info.made_progress());
    }
}
