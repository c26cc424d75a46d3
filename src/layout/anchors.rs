//! Anchored (floating) objects
//!
//! Anchored images, drawings and tables leave the vertical flow. Each one is
//! attached to a paragraph and positioned from its anchor once that
//! paragraph's first fragment is on the page. They never move the cursor.

use log::debug;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::document::{
    AnchorSpec, Block, HRelativeFrom, Measure, ObjectBlock, ObjectMeasure, TableBlock, TableMeasure,
    VRelativeFrom,
};
use crate::layout::paginator::PageState;
use crate::layout::table::{self, FragmentSpec, TableContext};
use crate::layout::{Fragment, ObjectFragment};

/// Which paragraph each anchored block hangs off
#[derive(Debug, Default)]
pub struct AnchorMap {
    by_paragraph: FxHashMap<usize, Vec<usize>>,
    placed: FxHashSet<usize>,
}

impl AnchorMap {
    /// Attach every anchored block to the nearest preceding paragraph, or the
    /// next one when none precedes it. Blocks with neither stay unattached and
    /// are placed where they occur.
    pub fn build(blocks: &[Block]) -> Self {
        let mut by_paragraph: FxHashMap<usize, Vec<usize>> = FxHashMap::default();
        let mut last_paragraph = None;
        let mut waiting = Vec::new();

        for (index, block) in blocks.iter().enumerate() {
            if block.is_paragraph() {
                if !waiting.is_empty() {
                    by_paragraph
                        .entry(index)
                        .or_default()
                        .extend(waiting.drain(..));
                }
                last_paragraph = Some(index);
            } else if block.is_anchored() {
                match last_paragraph {
                    Some(paragraph) => by_paragraph.entry(paragraph).or_default().push(index),
                    None => waiting.push(index),
                }
            }
        }

        Self {
            by_paragraph,
            placed: FxHashSet::default(),
        }
    }

    /// Anchored blocks attached to `paragraph`, removed from the map
    pub fn take_for_paragraph(&mut self, paragraph: usize) -> Vec<usize> {
        self.by_paragraph.remove(&paragraph).unwrap_or_default()
    }

    pub fn mark_placed(&mut self, index: usize) {
        self.placed.insert(index);
    }

    pub fn is_placed(&self, index: usize) -> bool {
        self.placed.contains(&index)
    }
}

/// A horizontal reference box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HBox {
    pub x: f32,
    pub width: f32,
}

/// Reference boxes of the page an anchor is resolved on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorFrame {
    pub column: HBox,
    pub margin: HBox,
    pub page: HBox,
    pub margin_top: f32,
    pub content_bottom: f32,
}

impl AnchorFrame {
    pub fn from_state(state: &PageState) -> Self {
        Self {
            column: HBox {
                x: state.column_x(state.column_index),
                width: state.column_width(),
            },
            margin: HBox {
                x: state.margins.left,
                width: state.content_width(),
            },
            page: HBox {
                x: 0.0,
                width: state.size.w,
            },
            margin_top: state.margins.top,
            content_bottom: state.content_bottom,
        }
    }
}

/// Box of the paragraph the object is anchored to
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorOrigin {
    pub x: f32,
    pub y: f32,
    pub width: f32,
}

/// Top-left corner of an anchored box of `width`
pub fn anchor_position(
    anchor: &AnchorSpec,
    width: f32,
    origin: AnchorOrigin,
    frame: &AnchorFrame,
) -> (f32, f32) {
    let reference = match anchor.h_relative_from {
        HRelativeFrom::Column => frame.column,
        HRelativeFrom::Character => HBox {
            x: origin.x,
            width: origin.width,
        },
        HRelativeFrom::Margin => frame.margin,
        HRelativeFrom::Page => frame.page,
    };
    let x = match anchor.align_h {
        Some(align) => reference.x + align.offset(reference.width, width),
        None => reference.x + anchor.offset_h,
    };
    let y = match anchor.v_relative_from {
        VRelativeFrom::Paragraph | VRelativeFrom::Line => origin.y + anchor.offset_v,
        VRelativeFrom::Margin => frame.margin_top + anchor.offset_v,
        VRelativeFrom::Page => anchor.offset_v,
    };
    (x, y)
}

fn object_fragment(
    object: &ObjectBlock,
    measure: &ObjectMeasure,
    origin: AnchorOrigin,
    frame: &AnchorFrame,
) -> ObjectFragment {
    let anchor = object.anchor.unwrap_or_default();
    let (x, y) = anchor_position(&anchor, measure.width, origin, frame);
    ObjectFragment {
        block_id: object.id.clone(),
        x,
        y,
        width: measure.width,
        height: measure.height,
        is_anchored: true,
        behind_doc: anchor.behind_doc,
        z_index: anchor.z_index,
        pm_start: None,
        pm_end: None,
    }
}

fn table_fragment(
    table: &TableBlock,
    measure: &TableMeasure,
    origin: AnchorOrigin,
    frame: &AnchorFrame,
) -> Fragment {
    let ctx = TableContext::new(table, measure);
    let anchor = table.anchor.unwrap_or_default();
    let width = measure.measured_width().min(frame.column.width);
    let (x, y) = anchor_position(&anchor, width, origin, frame);

    let height = measure.height();
    let clipped = if y + height > frame.content_bottom {
        let clipped = (frame.content_bottom - y).max(0.0);
        debug!("anchored table {} clipped to {:.1}px", table.id, clipped);
        clipped
    } else {
        height
    };

    let spec = FragmentSpec {
        is_anchored: true,
        ..FragmentSpec::monolithic(ctx.row_count(), y, clipped)
    };
    Fragment::Table(table::table_fragment(&ctx, x, width, spec))
}

/// Fragment for an anchored block, or `None` when it should flow inline
/// instead (full-width tables, non-anchored blocks).
pub fn anchored_fragment(
    block: &Block,
    measure: &Measure,
    origin: AnchorOrigin,
    frame: &AnchorFrame,
) -> Option<Fragment> {
    let mut fragment = match (block, measure) {
        (Block::Image(object), Measure::Image(m)) if object.is_anchored() => {
            Fragment::Image(object_fragment(object, m, origin, frame))
        }
        (Block::Drawing(object), Measure::Drawing(m)) if object.is_anchored() => {
            Fragment::Drawing(object_fragment(object, m, origin, frame))
        }
        (Block::Table(t), Measure::Table(m))
            if t.is_anchored() && !table::is_full_width(m, frame.column.width) =>
        {
            table_fragment(t, m, origin, frame)
        }
        _ => return None,
    };
    if !matches!(fragment, Fragment::Table(_)) {
        fragment.set_pm_range(crate::layout::pm_range::block_range(block));
    }
    Some(fragment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{BreakBlock, FloatAlignment, ParagraphBlock};

    fn frame() -> AnchorFrame {
        AnchorFrame {
            column: HBox { x: 50.0, width: 500.0 },
            margin: HBox { x: 50.0, width: 500.0 },
            page: HBox { x: 0.0, width: 600.0 },
            margin_top: 50.0,
            content_bottom: 750.0,
        }
    }

    fn anchored_image(id: &str, anchor: AnchorSpec) -> Block {
        Block::Image(ObjectBlock {
            anchor: Some(AnchorSpec {
                is_anchored: true,
                ..anchor
            }),
            ..ObjectBlock::new(id)
        })
    }

    #[test]
    fn test_anchor_map_attaches_to_preceding_paragraph() {
        let blocks = vec![
            anchored_image("i0", AnchorSpec::default()),
            Block::Paragraph(ParagraphBlock::new("p1", vec![])),
            anchored_image("i2", AnchorSpec::default()),
            Block::PageBreak(BreakBlock::default()),
            Block::Paragraph(ParagraphBlock::new("p4", vec![])),
        ];
        let mut map = AnchorMap::build(&blocks);
        assert_eq!(map.take_for_paragraph(1), vec![0, 2]);
        assert!(map.take_for_paragraph(4).is_empty());
    }

    #[test]
    fn test_anchor_position_reference_boxes() {
        let origin = AnchorOrigin { x: 80.0, y: 200.0, width: 300.0 };
        let page = AnchorSpec {
            h_relative_from: HRelativeFrom::Page,
            v_relative_from: VRelativeFrom::Page,
            offset_h: 10.0,
            offset_v: 20.0,
            ..AnchorSpec::default()
        };
        assert_eq!(anchor_position(&page, 100.0, origin, &frame()), (10.0, 20.0));

        let centered = AnchorSpec {
            align_h: Some(FloatAlignment::Center),
            offset_v: 5.0,
            ..AnchorSpec::default()
        };
        assert_eq!(anchor_position(&centered, 100.0, origin, &frame()), (250.0, 205.0));

        let character = AnchorSpec {
            h_relative_from: HRelativeFrom::Character,
            v_relative_from: VRelativeFrom::Margin,
            offset_h: 4.0,
            ..AnchorSpec::default()
        };
        assert_eq!(anchor_position(&character, 100.0, origin, &frame()), (84.0, 50.0));
    }

    #[test]
    fn test_anchored_image_fragment() {
        let block = anchored_image(
            "i1",
            AnchorSpec {
                behind_doc: true,
                z_index: Some(-3),
                ..AnchorSpec::default()
            },
        );
        let measure = Measure::Image(ObjectMeasure { width: 40.0, height: 30.0 });
        let origin = AnchorOrigin { x: 50.0, y: 100.0, width: 500.0 };
        let fragment = anchored_fragment(&block, &measure, origin, &frame()).unwrap();
        assert!(fragment.is_anchored());
        assert!(fragment.is_behind_doc());
        assert_eq!(fragment.y(), 100.0);
    }

    #[test]
    fn test_full_width_anchored_table_flows_inline() {
        let block = Block::Table(TableBlock {
            anchor: Some(AnchorSpec {
                is_anchored: true,
                ..AnchorSpec::default()
            }),
            ..TableBlock::default()
        });
        let measure = Measure::Table(TableMeasure {
            total_width: 500.0,
            ..TableMeasure::default()
        });
        let origin = AnchorOrigin { x: 50.0, y: 100.0, width: 500.0 };
        assert!(anchored_fragment(&block, &measure, origin, &frame()).is_none());
    }
}
