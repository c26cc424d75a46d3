//! WASM bindings for the paginator

pub mod flat_buffer;

use wasm_bindgen::prelude::*;

use crate::error::LayoutError;
use crate::layout::{
    layout_document, layout_header_footer, HeaderFooterConstraints, Layout, LayoutOptions, Margins,
    PageSize,
};
use crate::{HeaderFooterRequest, LayoutRequest};
use flat_buffer::FragmentBuffer;

/// Initialize panic hook for better error messages
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

fn to_js_error(err: LayoutError) -> JsValue {
    js_sys::Error::new(&err.to_string()).into()
}

/// WASM-exposed paginator holding page options and the last layout
#[wasm_bindgen]
pub struct WasmPaginator {
    options: LayoutOptions,
    layout: Option<Layout>,
    buffer: FragmentBuffer,
}

#[wasm_bindgen]
impl WasmPaginator {
    /// Create a paginator with the default page size (US Letter, 1" margins)
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self::with_options(LayoutOptions::default())
    }

    /// Create a paginator with custom page dimensions
    #[wasm_bindgen(js_name = withDimensions)]
    pub fn with_dimensions(
        page_width: f32,
        page_height: f32,
        margin_top: f32,
        margin_right: f32,
        margin_bottom: f32,
        margin_left: f32,
    ) -> Self {
        let margins = Margins {
            top: margin_top,
            right: margin_right,
            bottom: margin_bottom,
            left: margin_left,
        };
        Self::with_options(LayoutOptions::new(PageSize::new(page_width, page_height), margins))
    }

    /// Paginate `{ blocks, measures, options? }` and return the layout as JSON.
    ///
    /// Options in the request replace the paginator's own for this call only.
    pub fn layout(&mut self, request_json: &str) -> Result<String, JsValue> {
        let layout = self.run_layout(request_json).map_err(to_js_error)?;
        let json =
            serde_json::to_string(&layout).map_err(|e| to_js_error(LayoutError::from(e)))?;
        self.buffer.write_layout(&layout);
        self.layout = Some(layout);
        Ok(json)
    }

    /// Lay out header/footer content: `{ blocks, measures, constraints }`
    #[wasm_bindgen(js_name = layoutHeaderFooter)]
    pub fn layout_header_footer(&self, request_json: &str) -> Result<String, JsValue> {
        let request: HeaderFooterRequest = serde_json::from_str(request_json)
            .map_err(|e| to_js_error(LayoutError::from(e)))?;
        let layout = layout_header_footer(&request.blocks, &request.measures, &request.constraints)
            .map_err(to_js_error)?;
        serde_json::to_string(&layout).map_err(|e| to_js_error(LayoutError::from(e)))
    }

    /// Header/footer height for content laid out at `width`, unbounded height
    #[wasm_bindgen(js_name = measureHeaderFooter)]
    pub fn measure_header_footer(&self, request_json: &str, width: f32) -> Result<f32, JsValue> {
        let request: LayoutRequest = serde_json::from_str(request_json)
            .map_err(|e| to_js_error(LayoutError::from(e)))?;
        let constraints = HeaderFooterConstraints {
            width,
            margins: Some(self.options.margins),
            page_width: Some(self.options.page_size.w),
            ..HeaderFooterConstraints::default()
        };
        layout_header_footer(&request.blocks, &request.measures, &constraints)
            .map(|layout| layout.height)
            .map_err(to_js_error)
    }

    /// Page count of the last layout
    #[wasm_bindgen(js_name = pageCount)]
    pub fn page_count(&self) -> usize {
        self.layout.as_ref().map_or(0, Layout::page_count)
    }

    // Flat buffer accessors for the last layout

    #[wasm_bindgen(js_name = u32Ptr)]
    pub fn u32_ptr(&self) -> u32 {
        self.buffer.u32_ptr()
    }

    #[wasm_bindgen(js_name = u32Len)]
    pub fn u32_len(&self) -> u32 {
        self.buffer.u32_len()
    }

    #[wasm_bindgen(js_name = f32Ptr)]
    pub fn f32_ptr(&self) -> u32 {
        self.buffer.f32_ptr()
    }

    #[wasm_bindgen(js_name = f32Len)]
    pub fn f32_len(&self) -> u32 {
        self.buffer.f32_len()
    }

    #[wasm_bindgen(js_name = textPtr)]
    pub fn text_ptr(&self) -> u32 {
        self.buffer.text_ptr()
    }

    #[wasm_bindgen(js_name = textLen)]
    pub fn text_len(&self) -> u32 {
        self.buffer.text_len()
    }
}

impl WasmPaginator {
    pub fn with_options(options: LayoutOptions) -> Self {
        Self {
            options,
            layout: None,
            buffer: FragmentBuffer::new(),
        }
    }

    /// Last layout produced by [`WasmPaginator::layout`]
    pub fn last_layout(&self) -> Option<&Layout> {
        self.layout.as_ref()
    }

    fn run_layout(&self, request_json: &str) -> crate::Result<Layout> {
        let value: serde_json::Value = serde_json::from_str(request_json)?;
        let has_options = value.get("options").is_some();
        let request: LayoutRequest = serde_json::from_value(value)?;
        let options = if has_options { &request.options } else { &self.options };
        layout_document(&request.blocks, &request.measures, options)
    }
}

impl Default for WasmPaginator {
    fn default() -> Self {
        Self::new()
    }
}
