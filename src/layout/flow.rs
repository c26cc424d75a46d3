//! Document flow driver
//!
//! Walks the block sequence once, placing each block at the paginator's
//! cursor. Paragraphs and list items split line by line, tables go to the
//! table splitter, and section breaks reconfigure the paginator.

use log::{debug, trace};

use crate::document::{
    check_measures, Block, BlockId, Exclusion, FrameSpec, Line, ListBlock, ListItem, ListMeasure,
    Measure, ObjectBlock, ObjectMeasure, ParagraphAttrs, ParagraphBlock, ParagraphMeasure,
};
use crate::error::Result;
use crate::layout::anchors::{self, AnchorFrame, AnchorMap, AnchorOrigin, HBox};
use crate::layout::paginator::EPSILON;
use crate::layout::pm_range;
use crate::layout::sections::apply_section_break;
use crate::layout::table;
use crate::layout::{
    Fragment, Layout, LayoutOptions, ListItemFragment, ObjectFragment, Page, Paginator,
    ParaFragment, RemeasureFn,
};

/// Lay out `blocks` into pages.
///
/// `measures` must pair 1:1 with `blocks`. Fails on a length or kind
/// mismatch, and when margins leave no content area.
pub fn layout_document(
    blocks: &[Block],
    measures: &[Measure],
    options: &LayoutOptions,
) -> Result<Layout> {
    check_measures(blocks, measures)?;

    let mut flow = Flow::new(blocks, measures, options, FlowMode::Document);
    flow.run()?;
    let pages = flow.finish()?;
    debug!("laid out {} blocks into {} pages", blocks.len(), pages.len());

    Ok(Layout {
        page_size: options.page_size,
        pages,
        columns: options.columns,
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum FlowMode {
    Document,
    /// Fixed container; section breaks are ignored and page-relative anchors
    /// resolve against `page`, expressed in container coordinates
    HeaderFooter { page: HBox },
}

/// A paragraph-like unit placed line by line
struct TextItem<'a> {
    paragraph: &'a ParagraphBlock,
    list: Option<(&'a ListBlock, &'a ListItem, f32)>,
    /// Index of the paragraph block anchors attach to
    anchor_index: Option<usize>,
    /// Height that must follow on the same page (`keepNext`)
    keep_with: Option<f32>,
}

impl TextItem<'_> {
    fn fragment(&self, spec: LineSpan<'_>) -> Fragment {
        match self.list {
            None => Fragment::Para(ParaFragment {
                block_id: self.paragraph.id.clone(),
                from_line: spec.from,
                to_line: spec.to,
                x: spec.x,
                y: spec.y,
                width: spec.width,
                height: spec.height,
                continues_from_prev: spec.from > 0,
                continues_on_next: spec.to < spec.lines.len(),
                pm_start: None,
                pm_end: None,
                lines: spec
                    .remeasured
                    .then(|| spec.lines[spec.from..spec.to].to_vec()),
            }),
            Some((list, item, marker_width)) => Fragment::ListItem(ListItemFragment {
                block_id: list.id.clone(),
                item_id: item.id.clone(),
                from_line: spec.from,
                to_line: spec.to,
                marker_width,
                marker_text: if spec.from == 0 { item.marker_text.clone() } else { None },
                x: spec.x,
                y: spec.y,
                width: spec.width,
                height: spec.height,
                continues_from_prev: spec.from > 0,
                continues_on_next: spec.to < spec.lines.len(),
                pm_start: None,
                pm_end: None,
            }),
        }
    }
}

/// Geometry of one placed run of lines
struct LineSpan<'a> {
    lines: &'a [Line],
    from: usize,
    to: usize,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    remeasured: bool,
}

/// Horizontal shift for aligned paragraphs; returns `(dx, width)`
fn aligned_box(attrs: &ParagraphAttrs, lines: &[Line], width: f32) -> (f32, f32) {
    let content = lines.iter().map(|l| l.width).fold(0.0, f32::max);
    match attrs.float_alignment {
        Some(align) if content > 0.0 => (align.offset(width, content), content.min(width)),
        _ => (0.0, width),
    }
}

pub(crate) struct Flow<'a> {
    blocks: &'a [Block],
    measures: &'a [Measure],
    remeasure: Option<RemeasureFn>,
    paginator: Paginator,
    anchors: AnchorMap,
    mode: FlowMode,
}

impl<'a> Flow<'a> {
    pub(crate) fn new(
        blocks: &'a [Block],
        measures: &'a [Measure],
        options: &LayoutOptions,
        mode: FlowMode,
    ) -> Self {
        Self {
            blocks,
            measures,
            remeasure: options.remeasure_paragraph.clone(),
            paginator: Paginator::new(options),
            anchors: AnchorMap::build(blocks),
            mode,
        }
    }

    pub(crate) fn run(&mut self) -> Result<()> {
        let blocks = self.blocks;
        let measures = self.measures;

        for (index, (block, measure)) in blocks.iter().zip(measures).enumerate() {
            if block.is_anchored() && self.place_anchored_in_flow(index, block, measure)? {
                continue;
            }

            match (block, measure) {
                (Block::Paragraph(paragraph), Measure::Paragraph(m)) => {
                    if self.is_elided(index) {
                        debug!("skipping section placeholder paragraph {}", paragraph.id);
                        continue;
                    }
                    let item = TextItem {
                        paragraph,
                        list: None,
                        anchor_index: Some(index),
                        keep_with: self.keep_next_height(index, &paragraph.attrs),
                    };
                    self.place_text(item, m)?;
                }
                (Block::List(list), Measure::List(m)) => self.layout_list(list, m)?,
                (Block::Image(object), Measure::Image(m))
                | (Block::Drawing(object), Measure::Drawing(m)) => {
                    self.layout_object(block, object, m)?;
                }
                (Block::Table(t), Measure::Table(m)) => {
                    self.paginator.ensure_page()?;
                    table::layout_table(&mut self.paginator, t, m)?;
                    self.paginator.ensure_page()?.reset_spacing();
                }
                (Block::SectionBreak(section), _) => {
                    if self.mode == FlowMode::Document {
                        apply_section_break(&mut self.paginator, section)?;
                    }
                }
                (Block::ColumnBreak(_), _) => {
                    self.paginator.ensure_page()?;
                    self.paginator.advance_column()?;
                }
                (Block::PageBreak(_), _) => {
                    self.paginator.ensure_page()?;
                    self.paginator.start_new_page()?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Finished pages; an empty document still gets one page
    pub(crate) fn finish(mut self) -> Result<Vec<Page>> {
        self.paginator.ensure_page()?;
        Ok(self.paginator.into_pages())
    }

    /// Empty paragraph between a page break and a section break: a converter
    /// artifact that only carries section properties
    fn is_elided(&self, index: usize) -> bool {
        index > 0
            && self.blocks[index].is_empty_paragraph()
            && matches!(self.blocks.get(index - 1), Some(Block::PageBreak(_)))
            && matches!(self.blocks.get(index + 1), Some(Block::SectionBreak(_)))
    }

    /// Height the next flow block needs on the same page as a `keepNext` paragraph
    fn keep_next_height(&self, index: usize, attrs: &ParagraphAttrs) -> Option<f32> {
        if !attrs.keep_next {
            return None;
        }
        let (block, measure) = self
            .blocks
            .iter()
            .zip(self.measures)
            .skip(index + 1)
            .find(|(block, _)| !block.is_anchored())?;
        let before = match block {
            Block::Paragraph(p) => p.attrs.spacing.before,
            Block::SectionBreak(_) | Block::ColumnBreak(_) | Block::PageBreak(_) => return None,
            _ => 0.0,
        };
        let height = match measure {
            Measure::Table(t) => t.rows.first().map_or(0.0, |r| r.height),
            other => other.flow_height(),
        };
        Some(attrs.spacing.after.max(before) + height)
    }

    /// Collapsed gap between the previous block and a paragraph
    fn spacing_gap(&mut self, attrs: &ParagraphAttrs) -> Result<f32> {
        let state = self.paginator.ensure_page()?;
        let before = attrs.spacing.before.max(0.0);
        let contextual = attrs.contextual_spacing
            && state.last_contextual_spacing
            && attrs.style_id.is_some()
            && attrs.style_id == state.last_paragraph_style_id;

        let gap = if contextual {
            before - state.trailing_spacing
        } else {
            (before - state.trailing_spacing).max(0.0)
        };

        let full = state.content_bottom - state.top_margin;
        if gap >= full {
            debug!("spacing of {:.1}px exceeds the content area, skipped", gap);
            return Ok(0.0);
        }
        Ok(gap)
    }

    fn anchor_frame(&mut self) -> Result<AnchorFrame> {
        let state = self.paginator.ensure_page()?;
        let mut frame = AnchorFrame::from_state(state);
        if let FlowMode::HeaderFooter { page } = self.mode {
            frame.page = page;
        }
        Ok(frame)
    }

    /// Position the anchored blocks attached to paragraph `index`
    fn place_anchors(&mut self, index: usize, origin: AnchorOrigin) -> Result<()> {
        let attached = self.anchors.take_for_paragraph(index);
        if attached.is_empty() {
            return Ok(());
        }
        let frame = self.anchor_frame()?;
        for anchored in attached {
            let (Some(block), Some(measure)) =
                (self.blocks.get(anchored), self.measures.get(anchored))
            else {
                continue;
            };
            if let Some(fragment) = anchors::anchored_fragment(block, measure, origin, &frame) {
                trace!(
                    "anchored {} placed at ({:.1}, {:.1})",
                    block.id(),
                    fragment.x(),
                    fragment.y()
                );
                self.paginator.push_fragment(fragment);
                self.anchors.mark_placed(anchored);
            }
        }
        Ok(())
    }

    /// Anchored block reached in the flow. Returns `false` when it should be
    /// laid out inline instead.
    fn place_anchored_in_flow(
        &mut self,
        index: usize,
        block: &Block,
        measure: &Measure,
    ) -> Result<bool> {
        if self.anchors.is_placed(index) {
            return Ok(true);
        }
        let state = self.paginator.ensure_page()?;
        let origin = AnchorOrigin {
            x: state.column_x(state.column_index),
            y: state.cursor_y,
            width: state.column_width(),
        };
        let frame = self.anchor_frame()?;
        match anchors::anchored_fragment(block, measure, origin, &frame) {
            Some(fragment) => {
                self.paginator.push_fragment(fragment);
                self.anchors.mark_placed(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn place_text(&mut self, item: TextItem<'_>, measure: &ParagraphMeasure) -> Result<()> {
        let paragraph = item.paragraph;
        let attrs = &paragraph.attrs;

        if let Some(frame) = paragraph.overlay_frame() {
            return self.place_overlay(&item, &measure.lines, frame);
        }

        if attrs.page_break_before && !self.paginator.at_page_start() {
            debug!("page break before {}", paragraph.id);
            self.paginator.ensure_page()?;
            self.paginator.start_new_page()?;
        }

        let exclusion = attrs
            .float_exclusion
            .filter(|e| !e.is_empty())
            .unwrap_or_default();
        let remeasured = match self.remeasure.clone() {
            Some(remeasure) if !exclusion.is_empty() => {
                let width = self.narrowed_width(&exclusion)?;
                debug!("re-measuring {} at {:.1}px", paragraph.id, width);
                Some(remeasure(paragraph, width))
            }
            _ => None,
        };
        let lines: &[Line] = remeasured.as_ref().map_or(&measure.lines, |m| &m.lines);
        let total: f32 = lines.iter().map(|l| l.height).sum();

        let gap = self.spacing_gap(attrs)?;
        let fresh = self.paginator.fresh_height();
        let state = self.paginator.ensure_page()?;
        if !state.is_column_empty() {
            let keep_lines =
                attrs.keep_lines && !state.fits(gap + total) && total <= fresh + EPSILON;
            let keep_next = item.keep_with.is_some_and(|next| {
                let combined = total + next;
                !state.fits(gap + combined) && combined <= fresh + EPSILON
            });
            if keep_lines || keep_next {
                debug!(
                    "{} moves to the next column (keep {})",
                    paragraph.id,
                    if keep_lines { "lines" } else { "next" }
                );
                self.paginator.advance_column()?;
            }
        }

        let mut from = 0;
        let mut placed_first = false;
        loop {
            let gap = if placed_first { 0.0 } else { self.spacing_gap(attrs)? };
            let state = self.paginator.ensure_page()?;
            let available = state.remaining() - gap;

            let mut to = from;
            let mut used = 0.0;
            while let Some(line) = lines.get(to) {
                if used + line.height > available + EPSILON {
                    break;
                }
                used += line.height;
                to += 1;
            }
            if to == from && from < lines.len() {
                if !state.is_column_empty() {
                    self.paginator.advance_column()?;
                    continue;
                }
                debug!("line {} of {} is taller than the column, forcing", from, paragraph.id);
                used = lines[from].height;
                to = from + 1;
            }

            let column_width = state.column_width();
            let inset = exclusion.left.max(0.0) + exclusion.right.max(0.0);
            let base_x = state.column_x(state.column_index) + exclusion.left.max(0.0);
            let (dx, width) = aligned_box(attrs, lines, (column_width - inset).max(0.0));
            let y = state.cursor_y + gap;
            state.advance_cursor(gap + used);
            trace!("{} lines [{}, {}) at y={:.1}", paragraph.id, from, to, y);

            let mut fragment = item.fragment(LineSpan {
                lines,
                from,
                to,
                x: base_x + dx,
                y,
                width,
                height: used,
                remeasured: remeasured.is_some(),
            });
            fragment.set_pm_range(pm_range::lines_range(paragraph, lines, from, to));
            self.paginator.push_fragment(fragment);

            if !placed_first {
                if let Some(index) = item.anchor_index {
                    self.place_anchors(index, AnchorOrigin { x: base_x + dx, y, width })?;
                }
                placed_first = true;
            }

            from = to;
            if from >= lines.len() {
                break;
            }
            self.paginator.advance_column()?;
        }

        let state = self.paginator.ensure_page()?;
        let after = attrs.spacing.after.max(0.0);
        state.advance_cursor(after);
        state.trailing_spacing = after;
        state.last_paragraph_style_id = attrs.style_id.clone();
        state.last_contextual_spacing = attrs.contextual_spacing;
        Ok(())
    }

    fn narrowed_width(&mut self, exclusion: &Exclusion) -> Result<f32> {
        let state = self.paginator.ensure_page()?;
        Ok((state.column_width() - exclusion.left.max(0.0) - exclusion.right.max(0.0)).max(0.0))
    }

    /// Absolutely positioned paragraph (`frame` with `wrap: none`); the
    /// cursor does not move
    fn place_overlay(
        &mut self,
        item: &TextItem<'_>,
        lines: &[Line],
        frame: FrameSpec,
    ) -> Result<()> {
        let state = self.paginator.ensure_page()?;
        let column_x = state.column_x(state.column_index);
        let column_width = state.column_width();
        let content = lines.iter().map(|l| l.width).fold(0.0, f32::max);
        let width = if content > 0.0 { content } else { column_width };
        let x = match frame.x_align {
            Some(align) => column_x + align.offset(column_width, width),
            None => column_x + frame.x,
        };
        let y = state.cursor_y + frame.y;

        let mut fragment = item.fragment(LineSpan {
            lines,
            from: 0,
            to: lines.len(),
            x,
            y,
            width,
            height: lines.iter().map(|l| l.height).sum(),
            remeasured: false,
        });
        fragment.set_pm_range(pm_range::lines_range(item.paragraph, lines, 0, lines.len()));
        self.paginator.push_fragment(fragment);

        if let Some(index) = item.anchor_index {
            self.place_anchors(index, AnchorOrigin { x, y, width })?;
        }
        Ok(())
    }

    fn layout_list(&mut self, list: &ListBlock, measure: &ListMeasure) -> Result<()> {
        let count = list.items.len().min(measure.items.len());
        for index in 0..count {
            let (item, item_measure) = (&list.items[index], &measure.items[index]);
            let keep_with = item.paragraph.attrs.keep_next.then(|| {
                measure.items.get(index + 1).map_or(0.0, |next| {
                    let before = list
                        .items
                        .get(index + 1)
                        .map_or(0.0, |i| i.paragraph.attrs.spacing.before);
                    item.paragraph.attrs.spacing.after.max(before) + next.paragraph.total_height()
                })
            });
            let text = TextItem {
                paragraph: &item.paragraph,
                list: Some((list, item, item_measure.marker_width)),
                anchor_index: None,
                keep_with,
            };
            self.place_text(text, &item_measure.paragraph)?;
        }
        Ok(())
    }

    /// Inline image or drawing
    fn layout_object(
        &mut self,
        block: &Block,
        object: &ObjectBlock,
        measure: &ObjectMeasure,
    ) -> Result<()> {
        let state = self.paginator.ensure_page()?;
        if !state.is_column_empty() && !state.fits(measure.height) {
            self.paginator.advance_column()?;
        }

        let state = self.paginator.ensure_page()?;
        let column_width = state.column_width();
        let dx = object
            .float_alignment
            .map_or(0.0, |align| align.offset(column_width, measure.width));
        let x = state.column_x(state.column_index) + dx;
        let y = state.cursor_y;
        state.advance_cursor(measure.height);
        state.reset_spacing();

        let payload = ObjectFragment {
            block_id: BlockId::clone(&object.id),
            x,
            y,
            width: measure.width,
            height: measure.height,
            is_anchored: false,
            behind_doc: false,
            z_index: None,
            pm_start: None,
            pm_end: None,
        };
        let mut fragment = match block {
            Block::Drawing(_) => Fragment::Drawing(payload),
            _ => Fragment::Image(payload),
        };
        fragment.set_pm_range(pm_range::block_range(block));
        self.paginator.push_fragment(fragment);
        Ok(())
    }
}
