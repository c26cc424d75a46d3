//! Header and footer layout
//!
//! Runs the flow driver inside one fixed container instead of a page. The
//! container only breaks into further pages when content overflows its
//! height; a non-positive height means the container grows without bound.

use log::debug;

use crate::document::{check_measures, Block, Measure};
use crate::error::{LayoutError, Result};
use crate::layout::anchors::HBox;
use crate::layout::flow::{Flow, FlowMode};
use crate::layout::{
    HeaderFooterConstraints, HeaderFooterLayout, LayoutOptions, Margins, Page, PageSize,
};

/// Height used for unbounded containers
const UNBOUNDED_HEIGHT: f32 = 1.0e7;

/// Lay out header or footer content into `constraints`.
///
/// Anchors relative to the physical page are translated into container
/// coordinates using `constraints.margins`. The returned height ignores
/// behind-document anchors.
pub fn layout_header_footer(
    blocks: &[Block],
    measures: &[Measure],
    constraints: &HeaderFooterConstraints,
) -> Result<HeaderFooterLayout> {
    if !(constraints.width.is_finite() && constraints.width > 0.0) {
        return Err(LayoutError::InvalidHeaderFooterWidth(constraints.width));
    }
    check_measures(blocks, measures)?;

    let height = if constraints.height.is_finite() && constraints.height > 0.0 {
        constraints.height
    } else {
        UNBOUNDED_HEIGHT
    };
    let size = PageSize::new(constraints.width, height);
    let options = LayoutOptions::new(size, Margins::uniform(0.0));

    let page_margins = constraints.margins.unwrap_or_else(|| Margins::uniform(0.0));
    let page = HBox {
        x: -page_margins.left,
        width: constraints
            .page_width
            .unwrap_or(constraints.width + page_margins.left + page_margins.right),
    };

    let mut flow = Flow::new(blocks, measures, &options, FlowMode::HeaderFooter { page });
    flow.run()?;
    let pages = flow.finish()?;

    let (content_height, min_y) = measure_content(&pages);
    debug!(
        "header/footer: {} blocks, {} pages, height {:.1}",
        blocks.len(),
        pages.len(),
        content_height
    );

    Ok(HeaderFooterLayout {
        size: PageSize::new(constraints.width, constraints.height.max(0.0)),
        pages,
        height: content_height,
        min_y,
    })
}

/// Content height and smallest fragment Y over all pages.
///
/// Behind-document anchors never count toward the height, however far they
/// are offset. Anchors above the container (negative Y) extend it upward.
fn measure_content(pages: &[Page]) -> (f32, f32) {
    let fragments = || pages.iter().flat_map(|p| p.fragments.iter());

    let min_y = fragments().map(|f| f.y()).reduce(f32::min).unwrap_or(0.0);
    let max_bottom = fragments()
        .filter(|f| !f.is_behind_doc())
        .map(|f| f.bottom())
        .fold(0.0, f32::max);
    let top = fragments()
        .filter(|f| !f.is_behind_doc())
        .map(|f| f.y())
        .fold(0.0, f32::min);
    ((max_bottom - top).max(0.0), min_y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{
        AnchorSpec, HRelativeFrom, ObjectBlock, ObjectMeasure, ParagraphBlock, ParagraphMeasure,
        Run, VRelativeFrom,
    };

    fn constraints(width: f32, height: f32) -> HeaderFooterConstraints {
        HeaderFooterConstraints {
            width,
            height,
            ..HeaderFooterConstraints::default()
        }
    }

    fn para(id: &str) -> Block {
        Block::Paragraph(ParagraphBlock::new(id, vec![Run::new("Page", 1)]))
    }

    fn lines(heights: &[f32]) -> Measure {
        Measure::Paragraph(ParagraphMeasure::from_heights(heights))
    }

    fn anchored(id: &str, anchor: AnchorSpec) -> Block {
        Block::Image(ObjectBlock {
            anchor: Some(AnchorSpec {
                is_anchored: true,
                ..anchor
            }),
            ..ObjectBlock::new(id)
        })
    }

    #[test]
    fn test_rejects_non_positive_width() {
        for width in [0.0, -10.0, f32::NAN] {
            let err = layout_header_footer(&[], &[], &constraints(width, 50.0)).unwrap_err();
            assert!(matches!(err, LayoutError::InvalidHeaderFooterWidth(_)));
        }
    }

    #[test]
    fn test_height_of_flow_content() {
        let blocks = vec![para("h1"), para("h2")];
        let measures = vec![lines(&[14.0]), lines(&[14.0, 14.0])];
        let layout = layout_header_footer(&blocks, &measures, &constraints(500.0, 100.0)).unwrap();

        assert_eq!(layout.pages.len(), 1);
        assert_eq!(layout.height, 42.0);
        assert_eq!(layout.min_y, 0.0);
        assert_eq!(layout.pages[0].fragments[0].x(), 0.0);
    }

    #[test]
    fn test_overflow_creates_pages() {
        let blocks = vec![para("h1")];
        let measures = vec![lines(&[20.0, 20.0, 20.0])];
        let layout = layout_header_footer(&blocks, &measures, &constraints(500.0, 45.0)).unwrap();
        assert_eq!(layout.pages.len(), 2);
    }

    #[test]
    fn test_unbounded_height() {
        let blocks = vec![para("h1")];
        let measures = vec![lines(&[400.0, 400.0])];
        let layout = layout_header_footer(&blocks, &measures, &constraints(500.0, 0.0)).unwrap();
        assert_eq!(layout.pages.len(), 1);
        assert_eq!(layout.height, 800.0);
    }

    #[test]
    fn test_behind_doc_anchor_excluded_from_height() {
        let blocks = vec![
            para("h1"),
            anchored(
                "watermark",
                AnchorSpec {
                    behind_doc: true,
                    offset_v: -40.0,
                    ..AnchorSpec::default()
                },
            ),
        ];
        let measures = vec![
            lines(&[20.0]),
            Measure::Image(ObjectMeasure { width: 300.0, height: 600.0 }),
        ];
        let layout = layout_header_footer(&blocks, &measures, &constraints(500.0, 80.0)).unwrap();

        assert_eq!(layout.height, 20.0);
        assert_eq!(layout.min_y, -40.0);
    }

    #[test]
    fn test_in_front_anchor_counts_toward_height() {
        let blocks = vec![
            para("h1"),
            anchored(
                "logo",
                AnchorSpec {
                    offset_v: 10.0,
                    ..AnchorSpec::default()
                },
            ),
        ];
        let measures = vec![
            lines(&[20.0]),
            Measure::Image(ObjectMeasure { width: 50.0, height: 50.0 }),
        ];
        let layout = layout_header_footer(&blocks, &measures, &constraints(500.0, 80.0)).unwrap();
        assert_eq!(layout.height, 60.0);
    }

    #[test]
    fn test_page_relative_anchor_subtracts_left_margin() {
        let blocks = vec![
            para("h1"),
            anchored(
                "logo",
                AnchorSpec {
                    h_relative_from: HRelativeFrom::Page,
                    v_relative_from: VRelativeFrom::Paragraph,
                    offset_h: 30.0,
                    ..AnchorSpec::default()
                },
            ),
        ];
        let measures = vec![
            lines(&[20.0]),
            Measure::Image(ObjectMeasure { width: 50.0, height: 10.0 }),
        ];
        let mut constraints = constraints(500.0, 80.0);
        constraints.margins = Some(Margins::uniform(72.0));
        constraints.page_width = Some(644.0);

        let layout = layout_header_footer(&blocks, &measures, &constraints).unwrap();
        let logo = layout.fragments_for("logo");
        assert_eq!(logo[0].x(), 30.0 - 72.0);
    }
}
