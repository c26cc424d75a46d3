//! Page and column cursor management

use log::debug;

use crate::document::{MarginOverrides, NumberFormat, PageNumbering};
use crate::error::{LayoutError, Result};
use crate::layout::sections::format_page_number;
use crate::layout::{
    ColumnLayout, Fragment, LayoutOptions, Margins, Page, PageCreatedHook, PageSize,
};

/// Tolerance for fit checks; absorbs float noise in measured heights
pub const EPSILON: f32 = 0.01;

/// A mid-page column configuration change
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstraintBoundary {
    pub y: f32,
    pub columns: ColumnLayout,
}

/// Live cursor state of the page being filled
#[derive(Debug, Clone)]
pub struct PageState {
    pub cursor_y: f32,
    pub column_index: usize,
    pub top_margin: f32,
    pub content_bottom: f32,
    pub margins: Margins,
    pub size: PageSize,
    /// Columns at the top of the page
    pub columns: ColumnLayout,
    pub constraint_boundaries: Vec<ConstraintBoundary>,
    pub active_constraint_index: Option<usize>,
    /// Spacing-after of the last placed block, already added to `cursor_y`
    pub trailing_spacing: f32,
    pub last_paragraph_style_id: Option<String>,
    pub last_contextual_spacing: bool,
    /// Lowest cursor reached in any column of the active region
    pub region_max_y: f32,
    pub display_number: u32,
}

impl PageState {
    fn new(size: PageSize, margins: Margins, columns: ColumnLayout, display_number: u32) -> Self {
        Self {
            cursor_y: margins.top,
            column_index: 0,
            top_margin: margins.top,
            content_bottom: size.h - margins.bottom,
            margins,
            size,
            columns,
            constraint_boundaries: Vec::new(),
            active_constraint_index: None,
            trailing_spacing: 0.0,
            last_paragraph_style_id: None,
            last_contextual_spacing: false,
            region_max_y: margins.top,
            display_number,
        }
    }

    /// Column configuration of the active region
    pub fn active_columns(&self) -> ColumnLayout {
        self.active_constraint_index
            .and_then(|i| self.constraint_boundaries.get(i))
            .map_or(self.columns, |b| b.columns)
    }

    /// Top Y of the active column region
    pub fn region_top(&self) -> f32 {
        self.active_constraint_index
            .and_then(|i| self.constraint_boundaries.get(i))
            .map_or(self.top_margin, |b| b.y)
    }

    pub fn content_width(&self) -> f32 {
        self.size.w - self.margins.left - self.margins.right
    }

    pub fn column_width(&self) -> f32 {
        self.active_columns().column_width(self.content_width())
    }

    /// Left edge of column `index` in the active region
    pub fn column_x(&self, index: usize) -> f32 {
        let columns = self.active_columns();
        let gap = if columns.count() > 1 { columns.gap.max(0.0) } else { 0.0 };
        self.margins.left + index as f32 * (self.column_width() + gap)
    }

    pub fn remaining(&self) -> f32 {
        self.content_bottom - self.cursor_y
    }

    /// Height of the active region from its top
    pub fn region_height(&self) -> f32 {
        self.content_bottom - self.region_top()
    }

    /// Nothing has been placed in the current column yet
    pub fn is_column_empty(&self) -> bool {
        self.cursor_y <= self.region_top() + EPSILON
    }

    pub fn has_next_column(&self) -> bool {
        self.column_index + 1 < self.active_columns().count()
    }

    /// Whether `height` fits below the cursor
    pub fn fits(&self, height: f32) -> bool {
        height <= self.remaining() + EPSILON
    }

    /// Move the cursor down, tracking the region's lowest point
    pub fn advance_cursor(&mut self, dy: f32) {
        self.cursor_y += dy;
        self.region_max_y = self.region_max_y.max(self.cursor_y);
    }

    /// Forget the previous block's spacing, as at the top of a column
    pub fn reset_spacing(&mut self) {
        self.trailing_spacing = 0.0;
        self.last_paragraph_style_id = None;
        self.last_contextual_spacing = false;
    }
}

/// Section properties waiting for the next page
#[derive(Debug, Clone, Default)]
pub struct PendingSection {
    pub margins: Option<MarginOverrides>,
    pub page_size: Option<PageSize>,
    pub columns: Option<ColumnLayout>,
    pub numbering: Option<PageNumbering>,
}

impl PendingSection {
    pub fn is_empty(&self) -> bool {
        self.margins.is_none()
            && self.page_size.is_none()
            && self.columns.is_none()
            && self.numbering.is_none()
    }
}

/// Owns the pages of one pagination call and the cursor of the last one
pub struct Paginator {
    pages: Vec<Page>,
    state: Option<PageState>,
    default_size: PageSize,
    pub(crate) page_size: PageSize,
    pub(crate) margins: Margins,
    pub(crate) columns: ColumnLayout,
    pub(crate) pending: PendingSection,
    pub(crate) section_index: usize,
    next_display_number: u32,
    number_format: NumberFormat,
    on_page_created: Option<PageCreatedHook>,
}

impl Paginator {
    pub fn new(options: &LayoutOptions) -> Self {
        Self {
            pages: Vec::new(),
            state: None,
            default_size: options.page_size,
            page_size: options.page_size,
            margins: options.margins,
            columns: options.columns.unwrap_or_default(),
            pending: PendingSection::default(),
            section_index: 0,
            next_display_number: 1,
            number_format: NumberFormat::Decimal,
            on_page_created: options.on_page_created.clone(),
        }
    }

    pub fn has_page(&self) -> bool {
        self.state.is_some()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Current page state, creating the first page on first call
    pub fn ensure_page(&mut self) -> Result<&mut PageState> {
        match self.state {
            Some(ref mut state) => Ok(state),
            None => self.create_page(),
        }
    }

    /// State of the current page, if one exists
    pub fn state(&self) -> Option<&PageState> {
        self.state.as_ref()
    }

    /// Move to the next column of the active region, or to a new page
    pub fn advance_column(&mut self) -> Result<&mut PageState> {
        let moved = match self.state.as_mut() {
            Some(state) if state.has_next_column() => {
                state.column_index += 1;
                state.cursor_y = state.region_top();
                state.reset_spacing();
                debug!(
                    "advance to column {} on page {}",
                    state.column_index + 1,
                    self.pages.len()
                );
                true
            }
            _ => false,
        };
        if !moved {
            return self.create_page();
        }
        self.ensure_page()
    }

    /// Cursor at the top of the first column of a page with no fragments
    pub fn at_page_start(&self) -> bool {
        let page_empty = self.pages.last().map_or(true, |p| p.fragments.is_empty());
        page_empty
            && self.state.as_ref().map_or(true, |s| {
                s.column_index == 0 && s.active_constraint_index.is_none() && s.is_column_empty()
            })
    }

    /// Unconditionally start a new page
    pub fn start_new_page(&mut self) -> Result<&mut PageState> {
        self.create_page()
    }

    /// Left edge of column `index` on the current page
    pub fn column_x(&self, index: usize) -> f32 {
        self.state
            .as_ref()
            .map_or(self.margins.left, |s| s.column_x(index))
    }

    /// Height available to a block after the next advance
    pub fn fresh_height(&self) -> f32 {
        match self.state.as_ref() {
            Some(state) if state.has_next_column() => state.region_height(),
            _ => {
                let size = self.pending.page_size.unwrap_or(self.page_size);
                let margins = self
                    .pending
                    .margins
                    .as_ref()
                    .map_or(self.margins, |o| self.margins.with_overrides(o));
                size.h - margins.top - margins.bottom
            }
        }
    }

    /// Display number the next created page would get
    pub fn next_display_number(&self) -> u32 {
        self.pending
            .numbering
            .and_then(|n| n.start)
            .unwrap_or(self.next_display_number)
    }

    /// Append a fragment to the current page
    pub fn push_fragment(&mut self, fragment: Fragment) {
        if let Some(page) = self.pages.last_mut() {
            page.fragments.push(fragment);
        }
    }

    /// Apply section properties that do not need a page boundary to take effect
    pub(crate) fn configure(
        &mut self,
        margins: Margins,
        page_size: PageSize,
        columns: ColumnLayout,
    ) {
        self.margins = margins;
        self.page_size = page_size;
        self.columns = columns;
    }

    pub(crate) fn set_numbering(&mut self, numbering: PageNumbering) {
        if let Some(start) = numbering.start {
            self.next_display_number = start;
        }
        if let Some(format) = numbering.format {
            self.number_format = format;
        }
    }

    /// Start a new column region at the lowest point of the current one
    pub(crate) fn push_constraint_boundary(&mut self, columns: ColumnLayout) -> Result<()> {
        self.columns = columns;
        let Some(state) = self.state.as_mut() else {
            return Ok(());
        };
        let y = state.region_max_y.max(state.cursor_y);
        if y >= state.content_bottom - EPSILON {
            debug!("column change at page bottom, continuing on a new page");
            self.create_page()?;
            return Ok(());
        }
        state.constraint_boundaries.push(ConstraintBoundary { y, columns });
        state.active_constraint_index = Some(state.constraint_boundaries.len() - 1);
        state.column_index = 0;
        state.cursor_y = y;
        state.region_max_y = y;
        state.reset_spacing();
        debug!("column region {}x at y={}", columns.count(), y);
        Ok(())
    }

    fn apply_pending(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        if let Some(overrides) = pending.margins.as_ref() {
            self.margins = self.margins.with_overrides(overrides);
        }
        if let Some(size) = pending.page_size {
            self.page_size = size;
        }
        if let Some(columns) = pending.columns {
            self.columns = columns;
        }
        if let Some(numbering) = pending.numbering {
            self.set_numbering(numbering);
        }
    }

    fn create_page(&mut self) -> Result<&mut PageState> {
        self.apply_pending();

        let width = self.page_size.w - self.margins.left - self.margins.right;
        let height = self.page_size.h - self.margins.top - self.margins.bottom;
        if !(width > 0.0 && height > 0.0) {
            return Err(LayoutError::InvalidContentArea { width, height });
        }

        let display_number = self.next_display_number;
        self.next_display_number = display_number.saturating_add(1);

        let page = Page {
            number: self.pages.len() as u32 + 1,
            number_text: Some(format_page_number(display_number, self.number_format)),
            margins: self.margins,
            size: (self.page_size != self.default_size).then_some(self.page_size),
            section_index: self.section_index,
            columns: self.columns,
            fragments: Vec::new(),
        };
        debug!(
            "page {} created (section {}, {}x{} content)",
            page.number, page.section_index, width, height
        );
        if let Some(hook) = &self.on_page_created {
            hook(&page);
        }

        self.pages.push(page);
        Ok(self.state.insert(PageState::new(
            self.page_size,
            self.margins,
            self.columns,
            display_number,
        )))
    }

    /// Finished pages
    pub fn into_pages(self) -> Vec<Page> {
        self.pages
    }
}
