//! Flat buffer protocol for zero-copy WASM bridge
//!
//! Binary format for a paginated layout:
//!
//! ## u32 Buffer Layout:
//! ```text
//! Header:
//! [0]     MAGIC (0x50464C57 = "PFLW" for validation)
//! [1]     SCHEMA_VERSION (protocol version, currently 1)
//! [2]     page_count
//! [3]     fragment_count (all pages)
//! [4]     text_buffer_len
//! [5..]   page data...
//!
//! Per-page:
//!   number
//!   section_index
//!   fragment_count
//!   per-fragment: [kind, id_offset, id_len, id_utf16_offset, id_utf16_len,
//!                  flags, from, to, pm_start, pm_end, repeat_header_count]
//!     id_offset/id_len: byte offsets in text_data (UTF-8)
//!     id_utf16_offset/id_utf16_len: offsets for JS substring (after single decode)
//!     from/to: line range for text fragments, row range for tables, 0 otherwise
//!     pm_start/pm_end: u32::MAX when absent
//! ```
//!
//! ## f32 Buffer Layout:
//! ```text
//! Per-page: [width, height, margin_top, margin_right, margin_bottom, margin_left]
//! Per-fragment: [x, y, width, height]
//! ```

use crate::layout::{Fragment, Layout, Page, PageSize};

/// Magic number for format validation: "PFLW" (Page-FLoW)
pub const MAGIC: u32 = 0x50464C57;

/// Schema version for protocol compatibility checking
pub const SCHEMA_VERSION: u32 = 1;

/// Header size in u32 elements
pub const HEADER_SIZE: usize = 5;

/// Opcodes for fragment kinds
pub const KIND_PARA: u32 = 0;
pub const KIND_TABLE: u32 = 1;
pub const KIND_IMAGE: u32 = 2;
pub const KIND_DRAWING: u32 = 3;
pub const KIND_LIST_ITEM: u32 = 4;

/// Flags bitmask
pub const FLAG_CONTINUES_FROM_PREV: u32 = 0b00001;
pub const FLAG_CONTINUES_ON_NEXT: u32 = 0b00010;
pub const FLAG_ANCHORED: u32 = 0b00100;
pub const FLAG_BEHIND_DOC: u32 = 0b01000;
pub const FLAG_PARTIAL_ROW: u32 = 0b10000;

/// Marker for an absent document position
pub const NO_POSITION: u32 = u32::MAX;

/// Number of u32 values per page header
pub const U32_PER_PAGE: usize = 3;

/// Number of f32 values per page
pub const F32_PER_PAGE: usize = 6;

/// Number of u32 values per fragment
pub const U32_PER_FRAGMENT: usize = 11;

/// Number of f32 values per fragment
pub const F32_PER_FRAGMENT: usize = 4;

/// Fragment buffer for zero-copy WASM transfer
pub struct FragmentBuffer {
    /// Integer data (counts, offsets, opcodes, ranges)
    pub u32_data: Vec<u32>,
    /// Float data (positions, dimensions)
    pub f32_data: Vec<f32>,
    /// UTF-8 block id buffer
    pub text_data: Vec<u8>,

    // Track cumulative UTF-16 offset for efficient JS decoding
    utf16_text_offset: usize,
    fragment_count: u32,
}

impl Default for FragmentBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl FragmentBuffer {
    pub fn new() -> Self {
        Self {
            u32_data: Vec::with_capacity(1024),
            f32_data: Vec::with_capacity(1024),
            text_data: Vec::with_capacity(4096),
            utf16_text_offset: 0,
            fragment_count: 0,
        }
    }

    pub fn clear(&mut self) {
        self.u32_data.clear();
        self.f32_data.clear();
        self.text_data.clear();
        self.utf16_text_offset = 0;
        self.fragment_count = 0;
    }

    /// Pre-allocate buffers to avoid reallocation while writing.
    /// JS holds pointers to these buffers, so a realloc would invalidate them.
    pub fn prepare(&mut self, u32_needed: usize, f32_needed: usize, text_needed: usize) {
        let u32_target = u32_needed + 32;
        let f32_target = f32_needed + 32;
        let text_target = text_needed + 256;

        // Reuse buffers when capacity is sufficient
        if self.u32_data.capacity() < u32_target {
            self.u32_data = Vec::with_capacity(u32_target);
        } else {
            self.u32_data.clear();
        }

        if self.f32_data.capacity() < f32_target {
            self.f32_data = Vec::with_capacity(f32_target);
        } else {
            self.f32_data.clear();
        }

        if self.text_data.capacity() < text_target {
            self.text_data = Vec::with_capacity(text_target);
        } else {
            self.text_data.clear();
        }

        self.utf16_text_offset = 0;
        self.fragment_count = 0;
    }

    /// Write header; counts are synchronized in `finalize()`
    pub fn write_header(&mut self, page_count: u32) {
        self.u32_data.push(MAGIC); //          [0] magic number
        self.u32_data.push(SCHEMA_VERSION); // [1] schema version
        self.u32_data.push(page_count); //     [2] page_count
        self.u32_data.push(0); //              [3] fragment_count (placeholder)
        self.u32_data.push(0); //              [4] text_buffer_len (placeholder)
    }

    /// Sync header counts. Must be called after all pages are written.
    pub fn finalize(&mut self) {
        if self.u32_data.len() < HEADER_SIZE {
            return;
        }
        self.u32_data[3] = self.fragment_count;
        self.u32_data[4] = self.text_data.len() as u32;
    }

    /// Write page header, returns index where fragment_count should be written
    pub fn begin_page(&mut self, page: &Page, size: PageSize) -> usize {
        self.u32_data.push(page.number);
        self.u32_data.push(page.section_index as u32);
        let fragment_count_idx = self.u32_data.len();
        self.u32_data.push(0); // fragment_count placeholder

        let margins = page.margins;
        self.f32_data.extend_from_slice(&[
            size.w,
            size.h,
            margins.top,
            margins.right,
            margins.bottom,
            margins.left,
        ]);

        fragment_count_idx
    }

    /// Update fragment count for a page
    pub fn set_fragment_count(&mut self, idx: usize, count: u32) {
        if idx < self.u32_data.len() {
            self.u32_data[idx] = count;
        }
    }

    /// Append the block id to the text buffer; returns (offset, len, utf16_offset, utf16_len)
    fn write_text(&mut self, text: &str) -> [u32; 4] {
        let offset = self.text_data.len() as u32;
        self.text_data.extend_from_slice(text.as_bytes());

        let utf16_offset = self.utf16_text_offset as u32;
        let utf16_len = text.chars().map(|c| c.len_utf16()).sum::<usize>();
        self.utf16_text_offset += utf16_len;

        [offset, text.len() as u32, utf16_offset, utf16_len as u32]
    }

    /// Write one fragment
    pub fn write_fragment(&mut self, fragment: &Fragment) {
        let (kind, from, to, repeat) = match fragment {
            Fragment::Para(p) => (KIND_PARA, p.from_line, p.to_line, 0),
            Fragment::ListItem(l) => (KIND_LIST_ITEM, l.from_line, l.to_line, 0),
            Fragment::Table(t) => (KIND_TABLE, t.from_row, t.to_row, t.repeat_header_count),
            Fragment::Image(_) => (KIND_IMAGE, 0, 0, 0),
            Fragment::Drawing(_) => (KIND_DRAWING, 0, 0, 0),
        };

        let mut flags = 0;
        let (continues_from_prev, continues_on_next) = match fragment {
            Fragment::Para(p) => (p.continues_from_prev, p.continues_on_next),
            Fragment::ListItem(l) => (l.continues_from_prev, l.continues_on_next),
            Fragment::Table(t) => (t.continues_from_prev, t.continues_on_next),
            Fragment::Image(_) | Fragment::Drawing(_) => (false, false),
        };
        if continues_from_prev {
            flags |= FLAG_CONTINUES_FROM_PREV;
        }
        if continues_on_next {
            flags |= FLAG_CONTINUES_ON_NEXT;
        }
        if fragment.is_anchored() {
            flags |= FLAG_ANCHORED;
        }
        if fragment.is_behind_doc() {
            flags |= FLAG_BEHIND_DOC;
        }
        if fragment.as_table().is_some_and(|t| t.partial_row.is_some()) {
            flags |= FLAG_PARTIAL_ROW;
        }

        let id = self.write_text(fragment.block_id().as_str());
        self.u32_data.extend_from_slice(&id);
        self.u32_data.push(kind);
        self.u32_data.push(flags);
        self.u32_data.push(from as u32);
        self.u32_data.push(to as u32);
        self.u32_data.push(fragment.pm_start().unwrap_or(NO_POSITION));
        self.u32_data.push(fragment.pm_end().unwrap_or(NO_POSITION));
        self.u32_data.push(repeat as u32);

        self.f32_data.extend_from_slice(&[
            fragment.x(),
            fragment.y(),
            fragment.width(),
            fragment.height(),
        ]);
        self.fragment_count += 1;
    }

    /// Encode a whole layout, reusing existing capacity
    pub fn write_layout(&mut self, layout: &Layout) {
        let fragments: usize = layout.pages.iter().map(|p| p.fragments.len()).sum();
        let text: usize = layout
            .pages
            .iter()
            .flat_map(|p| p.fragments.iter())
            .map(|f| f.block_id().as_str().len())
            .sum();
        self.prepare(
            HEADER_SIZE + layout.pages.len() * U32_PER_PAGE + fragments * U32_PER_FRAGMENT,
            layout.pages.len() * F32_PER_PAGE + fragments * F32_PER_FRAGMENT,
            text,
        );

        self.write_header(layout.pages.len() as u32);
        for page in &layout.pages {
            let idx = self.begin_page(page, page.size.unwrap_or(layout.page_size));
            for fragment in &page.fragments {
                self.write_fragment(fragment);
            }
            self.set_fragment_count(idx, page.fragments.len() as u32);
        }
        self.finalize();
    }

    // Accessors for WASM
    // u32 rather than usize: wasm32 linear memory offsets are u32

    pub fn u32_ptr(&self) -> u32 {
        self.u32_data.as_ptr() as u32
    }

    pub fn u32_len(&self) -> u32 {
        self.u32_data.len() as u32
    }

    pub fn f32_ptr(&self) -> u32 {
        self.f32_data.as_ptr() as u32
    }

    pub fn f32_len(&self) -> u32 {
        self.f32_data.len() as u32
    }

    pub fn text_ptr(&self) -> u32 {
        self.text_data.as_ptr() as u32
    }

    pub fn text_len(&self) -> u32 {
        self.text_data.len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Block, Measure, ParagraphBlock, ParagraphMeasure, Run};
    use crate::layout::{layout_document, LayoutOptions, Margins};

    fn layout(line_heights: &[f32]) -> Layout {
        let blocks = vec![Block::Paragraph(ParagraphBlock::new("p1", vec![Run::new("Hello", 1)]))];
        let measures = vec![Measure::Paragraph(ParagraphMeasure::from_heights(line_heights))];
        let options = LayoutOptions::new(PageSize::new(400.0, 240.0), Margins::uniform(30.0));
        layout_document(&blocks, &measures, &options).unwrap()
    }

    #[test]
    fn test_fragment_buffer_header() {
        let mut buf = FragmentBuffer::new();
        buf.write_layout(&layout(&[90.0, 90.0, 90.0]));

        assert_eq!(buf.u32_data[0], MAGIC);
        assert_eq!(buf.u32_data[1], SCHEMA_VERSION);
        assert_eq!(buf.u32_data[2], 2); // page_count
        assert_eq!(buf.u32_data[3], 2); // fragment_count
        assert_eq!(buf.u32_data[4], 4); // "p1" twice
        assert_eq!(buf.text_data, b"p1p1");
    }

    #[test]
    fn test_fragment_records() {
        let mut buf = FragmentBuffer::new();
        buf.write_layout(&layout(&[90.0, 90.0, 90.0]));

        // First page header, then its single fragment
        assert_eq!(buf.u32_data[HEADER_SIZE], 1); // number
        assert_eq!(buf.u32_data[HEADER_SIZE + 2], 1); // fragment_count
        let first = HEADER_SIZE + U32_PER_PAGE;
        assert_eq!(buf.u32_data[first + 4], KIND_PARA);
        assert_eq!(buf.u32_data[first + 5], FLAG_CONTINUES_ON_NEXT);
        assert_eq!(buf.u32_data[first + 6], 0); // from_line
        assert_eq!(buf.u32_data[first + 7], 2); // to_line

        let second = first + U32_PER_FRAGMENT + U32_PER_PAGE;
        assert_eq!(buf.u32_data[second + 2], 2); // utf16 offset of the second id
        assert_eq!(buf.u32_data[second + 5], FLAG_CONTINUES_FROM_PREV);

        // Page geometry followed by fragment geometry
        assert_eq!(&buf.f32_data[..2], &[400.0, 240.0]);
        assert_eq!(&buf.f32_data[F32_PER_PAGE..F32_PER_PAGE + 4], &[30.0, 30.0, 340.0, 180.0]);
    }

    #[test]
    fn test_absent_positions_use_sentinel() {
        let blocks = vec![Block::Paragraph(ParagraphBlock::new("p1", vec![]))];
        let measures = vec![Measure::Paragraph(ParagraphMeasure::from_heights(&[10.0]))];
        let layout = layout_document(&blocks, &measures, &LayoutOptions::default()).unwrap();

        let mut buf = FragmentBuffer::new();
        buf.write_layout(&layout);
        let first = HEADER_SIZE + U32_PER_PAGE;
        assert_eq!(buf.u32_data[first + 8], NO_POSITION);
        assert_eq!(buf.u32_data[first + 9], NO_POSITION);
    }

    #[test]
    fn test_prepare_prevents_reallocation() {
        let layout = layout(&[20.0; 40]);
        let mut buf = FragmentBuffer::new();
        buf.write_layout(&layout);
        let capacities = (
            buf.u32_data.capacity(),
            buf.f32_data.capacity(),
            buf.text_data.capacity(),
        );

        // Re-encoding the same layout reuses every buffer
        buf.write_layout(&layout);
        assert_eq!(
            (buf.u32_data.capacity(), buf.f32_data.capacity(), buf.text_data.capacity()),
            capacities
        );
    }

    #[test]
    fn test_utf16_offsets_for_batch_decode() {
        let mut buf = FragmentBuffer::new();
        buf.write_header(0);
        assert_eq!(buf.write_text("Привет"), [0, 12, 0, 6]);
        assert_eq!(buf.write_text("😀"), [12, 4, 6, 2]);
        assert_eq!(buf.utf16_text_offset, 8);
    }
}
