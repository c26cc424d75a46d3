//! Benchmarks for the pagination engine

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use page_flow::document::{
    CellMeasure, ParagraphBlock, ParagraphMeasure, RowAttrs, RowMeasure, Run, SectionBreakBlock,
    SectionBreakType, TableBlock, TableCell, TableMeasure, TableRow,
};
use page_flow::wasm::flat_buffer::FragmentBuffer;
use page_flow::{layout_document, Block, ColumnLayout, LayoutOptions, Margins, Measure, PageSize};

fn default_options() -> LayoutOptions {
    LayoutOptions::new(PageSize::new(612.0, 792.0), Margins::uniform(72.0))
}

fn paragraph(i: usize, pm: &mut u32) -> (Block, Measure) {
    let text = format!("Paragraph {} contains enough text to span multiple lines.", i);
    let run = Run::new(text, *pm);
    *pm = run.pm_end.unwrap_or(*pm) + 2;
    let block = Block::Paragraph(ParagraphBlock::new(format!("p{}", i), vec![run]));
    let lines = 1 + i % 5;
    let measure = Measure::Paragraph(ParagraphMeasure::from_heights(&vec![18.0; lines]));
    (block, measure)
}

fn long_document(paragraphs: usize) -> (Vec<Block>, Vec<Measure>) {
    let mut pm = 0;
    (0..paragraphs).map(|i| paragraph(i, &mut pm)).unzip()
}

fn large_table(rows: usize, cols: usize) -> (Block, Measure) {
    let table = TableBlock {
        rows: (0..rows)
            .map(|r| TableRow {
                cells: (0..cols).map(|_| TableCell::default()).collect(),
                attrs: RowAttrs {
                    repeat_header: r == 0,
                    ..RowAttrs::default()
                },
                ..TableRow::default()
            })
            .collect(),
        ..TableBlock::default()
    };
    let measure = TableMeasure {
        rows: (0..rows)
            .map(|r| {
                let heights = vec![16.0; 1 + r % 12];
                let cells: Vec<CellMeasure> = (0..cols)
                    .map(|_| CellMeasure {
                        width: 468.0 / cols as f32,
                        ..CellMeasure::with_lines(&heights)
                    })
                    .collect();
                RowMeasure {
                    height: heights.iter().sum(),
                    cells,
                }
            })
            .collect(),
        column_widths: vec![468.0 / cols as f32; cols],
        total_width: 468.0,
        total_height: 0.0,
    };
    (Block::Table(table), Measure::Table(measure))
}

fn multi_section(sections: usize) -> (Vec<Block>, Vec<Measure>) {
    let mut blocks = Vec::new();
    let mut measures = Vec::new();
    let mut pm = 0;
    for s in 0..sections {
        for i in 0..30 {
            let (block, measure) = paragraph(s * 30 + i, &mut pm);
            blocks.push(block);
            measures.push(measure);
        }
        let break_type = match s % 3 {
            0 => SectionBreakType::Continuous,
            1 => SectionBreakType::NextPage,
            _ => SectionBreakType::OddPage,
        };
        blocks.push(Block::SectionBreak(SectionBreakBlock {
            columns: Some(ColumnLayout::new(1 + (s % 3) as u32, 24.0)),
            ..SectionBreakBlock::new(format!("s{}", s), break_type)
        }));
        measures.push(Measure::SectionBreak);
    }
    (blocks, measures)
}

fn bench_layout_small(c: &mut Criterion) {
    let (blocks, measures) = long_document(10);
    let options = default_options();
    c.bench_function("layout_small_document", |b| {
        b.iter(|| layout_document(black_box(&blocks), black_box(&measures), &options));
    });
}

fn bench_layout_long(c: &mut Criterion) {
    let (blocks, measures) = long_document(2_000);
    let options = default_options();
    c.bench_function("layout_long_document", |b| {
        b.iter(|| layout_document(black_box(&blocks), black_box(&measures), &options));
    });
}

fn bench_layout_large_table(c: &mut Criterion) {
    let (block, measure) = large_table(400, 6);
    let blocks = vec![block];
    let measures = vec![measure];
    let options = default_options();
    c.bench_function("layout_large_table", |b| {
        b.iter(|| layout_document(black_box(&blocks), black_box(&measures), &options));
    });
}

fn bench_layout_sections(c: &mut Criterion) {
    let (blocks, measures) = multi_section(60);
    let options = default_options();
    c.bench_function("layout_multi_section", |b| {
        b.iter(|| layout_document(black_box(&blocks), black_box(&measures), &options));
    });
}

fn bench_fragment_buffer(c: &mut Criterion) {
    let (blocks, measures) = long_document(2_000);
    let layout = match layout_document(&blocks, &measures, &default_options()) {
        Ok(layout) => layout,
        Err(err) => panic!("benchmark layout failed: {}", err),
    };
    c.bench_function("write_fragment_buffer", |b| {
        let mut buffer = FragmentBuffer::new();
        b.iter(|| {
            buffer.write_layout(black_box(&layout));
        });
    });
}

criterion_group!(
    benches,
    bench_layout_small,
    bench_layout_long,
    bench_layout_large_table,
    bench_layout_sections,
    bench_fragment_buffer,
);

criterion_main!(benches);
