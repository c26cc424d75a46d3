//! Section break scheduling and page numbering

use log::debug;

use crate::document::{
    MarginOverrides, NumberFormat, PageNumbering, SectionBreakBlock, SectionBreakType,
};
use crate::error::Result;
use crate::layout::{Paginator, PageSize};

/// Render `number` in a page-number format
pub fn format_page_number(number: u32, format: NumberFormat) -> String {
    if number == 0 {
        return number.to_string();
    }
    match format {
        NumberFormat::Decimal => number.to_string(),
        NumberFormat::LowerRoman => to_roman(number).to_lowercase(),
        NumberFormat::UpperRoman => to_roman(number),
        NumberFormat::LowerLetter => to_letters(number),
        NumberFormat::UpperLetter => to_letters(number).to_uppercase(),
    }
}

fn to_roman(mut number: u32) -> String {
    const NUMERALS: [(u32, &str); 13] = [
        (1000, "M"),
        (900, "CM"),
        (500, "D"),
        (400, "CD"),
        (100, "C"),
        (90, "XC"),
        (50, "L"),
        (40, "XL"),
        (10, "X"),
        (9, "IX"),
        (5, "V"),
        (4, "IV"),
        (1, "I"),
    ];
    let mut out = String::new();
    for &(value, numeral) in NUMERALS.iter() {
        while number >= value {
            out.push_str(numeral);
            number -= value;
        }
    }
    out
}

// a..z, then aa..zz, aaa..; the letter repeats rather than carrying
fn to_letters(number: u32) -> String {
    let index = (number - 1) % 26;
    let repeat = ((number - 1) / 26 + 1) as usize;
    let letter = char::from(b'a' + index as u8);
    std::iter::repeat(letter).take(repeat).collect()
}

fn merge_margins(current: Option<MarginOverrides>, next: MarginOverrides) -> MarginOverrides {
    let Some(current) = current else {
        return next;
    };
    MarginOverrides {
        top: next.top.or(current.top),
        right: next.right.or(current.right),
        bottom: next.bottom.or(current.bottom),
        left: next.left.or(current.left),
    }
}

fn merge_numbering(current: Option<PageNumbering>, next: PageNumbering) -> PageNumbering {
    let Some(current) = current else {
        return next;
    };
    PageNumbering {
        start: next.start.or(current.start),
        format: next.format.or(current.format),
    }
}

/// Page size a break asks for, normalised to its orientation
fn requested_page_size(section: &SectionBreakBlock, current: PageSize) -> Option<PageSize> {
    match (section.page_size, section.orientation) {
        (Some(size), Some(orientation)) => Some(size.oriented(orientation)),
        (Some(size), None) => Some(size),
        (None, Some(orientation)) => Some(current.oriented(orientation)),
        (None, None) => None,
    }
}

/// Apply a section break to the paginator.
///
/// Before the first page exists the break configures the document directly.
/// Afterwards its margins and page size wait for the next page, while a
/// column change on a continuous break opens a new column region mid-page.
pub fn apply_section_break(paginator: &mut Paginator, section: &SectionBreakBlock) -> Result<()> {
    let page_size = requested_page_size(section, paginator.page_size);

    if !paginator.has_page() {
        let margins = section
            .margins
            .as_ref()
            .map_or(paginator.margins, |o| paginator.margins.with_overrides(o));
        let columns = section.columns.unwrap_or(paginator.columns);
        paginator.configure(margins, page_size.unwrap_or(paginator.page_size), columns);
        if let Some(numbering) = section.page_numbering {
            paginator.set_numbering(numbering);
        }
        debug!("section {} configures the document start", section.id);
        return Ok(());
    }

    paginator.section_index += 1;
    if let Some(margins) = section.margins {
        paginator.pending.margins = Some(merge_margins(paginator.pending.margins, margins));
    }
    if let Some(size) = page_size {
        paginator.pending.page_size = Some(size);
    }
    if let Some(numbering) = section.page_numbering {
        paginator.pending.numbering = Some(merge_numbering(paginator.pending.numbering, numbering));
    }

    match section.break_type {
        SectionBreakType::Continuous if !section.require_page_boundary => {
            let Some(columns) = section.columns else {
                return Ok(());
            };
            let active = paginator.ensure_page()?.active_columns();
            if active.same_geometry(&columns) {
                paginator.columns = columns;
            } else {
                debug!(
                    "section {}: continuous column change {} -> {}",
                    section.id,
                    active.count(),
                    columns.count()
                );
                paginator.push_constraint_boundary(columns)?;
            }
        }
        SectionBreakType::Continuous | SectionBreakType::NextPage => {
            if let Some(columns) = section.columns {
                paginator.pending.columns = Some(columns);
            }
            debug!("section {}: page boundary", section.id);
            paginator.start_new_page()?;
        }
        SectionBreakType::EvenPage | SectionBreakType::OddPage => {
            if let Some(columns) = section.columns {
                paginator.pending.columns = Some(columns);
            }
            let want_even = section.break_type == SectionBreakType::EvenPage;
            let state = paginator.start_new_page()?;
            if (state.display_number % 2 == 0) != want_even {
                debug!("section {}: blank page inserted for parity", section.id);
                paginator.start_new_page()?;
            }
        }
    }
    Ok(())
}
