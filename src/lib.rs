//! Page-Flow: word-processor pagination for a WYSIWYG editor
//!
//! This crate turns a linear sequence of pre-measured blocks into pages of
//! positioned fragments:
//! - Line-level paragraph splitting with spacing collapse and keep rules
//! - Table splitting at row boundaries and mid-row, with repeated headers
//! - Section breaks that change margins, page size, columns and numbering
//! - Document-position ranges on every fragment for selection mapping

pub mod document;
pub mod error;
pub mod layout;
pub mod wasm;

// Re-export WASM types for direct use
pub use wasm::WasmPaginator;

// Re-export primary types
pub use document::{Block, BlockId, Line, Measure};
pub use error::{LayoutError, Result};
pub use layout::{
    layout_document, layout_header_footer, ColumnLayout, Fragment, HeaderFooterConstraints,
    HeaderFooterLayout, Layout, LayoutOptions, Margins, Page, PageSize,
};

use serde::Deserialize;

/// One pagination call in serialized form
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LayoutRequest {
    pub blocks: Vec<Block>,
    pub measures: Vec<Measure>,
    pub options: LayoutOptions,
}

impl LayoutRequest {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn layout(&self) -> Result<Layout> {
        layout_document(&self.blocks, &self.measures, &self.options)
    }
}

/// Header/footer pagination call in serialized form
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct HeaderFooterRequest {
    pub blocks: Vec<Block>,
    pub measures: Vec<Measure>,
    pub constraints: HeaderFooterConstraints,
}

/// Paginate a JSON [`LayoutRequest`] and return the [`Layout`] as JSON
pub fn layout_document_json(request: &str) -> Result<String> {
    let layout = LayoutRequest::from_json(request)?.layout()?;
    Ok(serde_json::to_string(&layout)?)
}

/// Lay out a JSON [`HeaderFooterRequest`] and return the result as JSON
pub fn layout_header_footer_json(request: &str) -> Result<String> {
    let request: HeaderFooterRequest = serde_json::from_str(request)?;
    let layout = layout_header_footer(&request.blocks, &request.measures, &request.constraints)?;
    Ok(serde_json::to_string(&layout)?)
}
