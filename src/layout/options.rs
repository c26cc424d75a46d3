//! Layout configuration

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::document::{MarginOverrides, Orientation, ParagraphBlock, ParagraphMeasure};
use crate::layout::Page;

/// Re-measures a paragraph at a narrower width (float exclusions)
pub type RemeasureFn = Arc<dyn Fn(&ParagraphBlock, f32) -> ParagraphMeasure + Send + Sync>;

/// Observes every page the paginator creates
pub type PageCreatedHook = Arc<dyn Fn(&Page) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub w: f32,
    pub h: f32,
}

impl PageSize {
    pub fn new(w: f32, h: f32) -> Self {
        Self { w, h }
    }

    /// Swap dimensions so that they match `orientation`
    pub fn oriented(self, orientation: Orientation) -> Self {
        let landscape = self.w >= self.h;
        match (orientation, landscape) {
            (Orientation::Landscape, false) | (Orientation::Portrait, true)
                if self.w != self.h =>
            {
                Self { w: self.h, h: self.w }
            }
            _ => self,
        }
    }
}

impl Default for PageSize {
    fn default() -> Self {
        // 8.5" x 11" at 96 DPI
        Self { w: 816.0, h: 1056.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Margins {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Margins {
    pub fn uniform(value: f32) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }

    /// Apply the sides set in `overrides`
    pub fn with_overrides(self, overrides: &MarginOverrides) -> Self {
        Self {
            top: overrides.top.unwrap_or(self.top),
            right: overrides.right.unwrap_or(self.right),
            bottom: overrides.bottom.unwrap_or(self.bottom),
            left: overrides.left.unwrap_or(self.left),
        }
    }
}

impl Default for Margins {
    fn default() -> Self {
        // 1" margins
        Self::uniform(96.0)
    }
}

/// Column configuration of a page region
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnLayout {
    pub count: u32,
    pub gap: f32,
}

impl ColumnLayout {
    pub fn single() -> Self {
        Self { count: 1, gap: 0.0 }
    }

    pub fn new(count: u32, gap: f32) -> Self {
        Self { count, gap }
    }

    /// Column count, at least one
    pub fn count(&self) -> usize {
        self.count.max(1) as usize
    }

    /// Width of one column within `content_width`
    pub fn column_width(&self, content_width: f32) -> f32 {
        let count = self.count() as f32;
        let gap = if self.count() > 1 { self.gap.max(0.0) } else { 0.0 };
        ((content_width - gap * (count - 1.0)) / count).max(0.0)
    }

    /// Same column geometry, treating counts of 0 and 1 alike
    pub fn same_geometry(&self, other: &ColumnLayout) -> bool {
        self.count() == other.count() && (self.count() == 1 || self.gap == other.gap)
    }
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self::single()
    }
}

/// Options for one pagination call
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutOptions {
    pub page_size: PageSize,
    pub margins: Margins,
    pub columns: Option<ColumnLayout>,
    #[serde(skip)]
    pub remeasure_paragraph: Option<RemeasureFn>,
    #[serde(skip)]
    pub on_page_created: Option<PageCreatedHook>,
}

impl LayoutOptions {
    pub fn new(page_size: PageSize, margins: Margins) -> Self {
        Self {
            page_size,
            margins,
            ..Self::default()
        }
    }

    pub fn with_columns(mut self, columns: ColumnLayout) -> Self {
        self.columns = Some(columns);
        self
    }

    pub fn content_width(&self) -> f32 {
        self.page_size.w - self.margins.left - self.margins.right
    }

    pub fn content_height(&self) -> f32 {
        self.page_size.h - self.margins.top - self.margins.bottom
    }
}

impl std::fmt::Debug for LayoutOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutOptions")
            .field("page_size", &self.page_size)
            .field("margins", &self.margins)
            .field("columns", &self.columns)
            .field("remeasure_paragraph", &self.remeasure_paragraph.is_some())
            .field("on_page_created", &self.on_page_created.is_some())
            .finish()
    }
}

/// Container for header/footer layout
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HeaderFooterConstraints {
    pub width: f32,
    pub height: f32,
    /// Physical page width, for page-relative anchor alignment
    pub page_width: Option<f32>,
    /// Page margins, for translating page-relative anchor offsets
    pub margins: Option<Margins>,
}
