//! Pagination engine
//!
//! [`layout_document`] turns measured blocks into pages of positioned
//! fragments; [`layout_header_footer`] does the same for one fixed container.

pub mod anchors;
mod flow;
mod fragment;
mod header_footer;
mod options;
pub mod paginator;
pub mod pm_range;
pub mod sections;
pub mod table;

pub use flow::layout_document;
pub use fragment::{
    CellLines, ColumnBoundary, Fragment, HeaderFooterLayout, Layout, ListItemFragment,
    ObjectFragment, Page, ParaFragment, PartialRowInfo, TableFragment,
};
pub use header_footer::layout_header_footer;
pub use options::{
    ColumnLayout, HeaderFooterConstraints, LayoutOptions, Margins, PageCreatedHook, PageSize,
    RemeasureFn,
};
pub use paginator::{PageState, Paginator};
