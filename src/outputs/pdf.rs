//! Styled PDF rendering.
//!
//! The layout is a single-column A4 document: a title block with the run
//! date and coverage window, the lead set large with an accent bar, then the
//! sections with ruled headings and bordered tables. Content flows top to
//! bottom through a cursor; whenever a block would cross the bottom limit
//! the current page is closed with a footer and a fresh one begins.
//!
//! Only the PDF built-in Helvetica faces are used, so rendering needs no
//! font files on disk.

use chrono::NaiveDate;
use printpdf::{
    BuiltinFont, Color, Line, LinePoint, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, Point, Pt,
    Rgb, TextItem,
};

use crate::error::RunError;
use crate::models::{ReportSection, ReportTable, StructuredReport};

use super::{COVERAGE_DAYS, REPORT_TITLE};

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 18.0;
const CONTENT_WIDTH_MM: f32 = PAGE_WIDTH_MM - 2.0 * MARGIN_MM;
/// Content must stop above this line so the footer keeps clear space.
const BOTTOM_LIMIT_MM: f32 = 272.0;
const FOOTER_BASELINE_MM: f32 = 284.0;

const BODY_SIZE: f32 = 10.5;
const TABLE_SIZE: f32 = 9.5;

/// Points per millimeter, for width estimates.
const PT_PER_MM: f32 = 2.834_65;

fn navy() -> Color {
    rgb(0x0D, 0x1B, 0x2A)
}

fn teal() -> Color {
    rgb(0x4F, 0xB3, 0xBF)
}

fn slate() -> Color {
    rgb(0x31, 0x3D, 0x4F)
}

fn grey_blue() -> Color {
    rgb(0x8C, 0xA3, 0xC0)
}

fn rgb(r: u8, g: u8, b: u8) -> Color {
    Color::Rgb(Rgb {
        r: r as f32 / 255.0,
        g: g as f32 / 255.0,
        b: b as f32 / 255.0,
        icc_profile: None,
    })
}

/// Render the report to finished PDF bytes.
pub fn render(report: &StructuredReport, run_date: NaiveDate) -> Result<Vec<u8>, RunError> {
    let mut composer = PageComposer::new();
    composer.title_block(run_date);
    composer.lead_block(&report.lead_message);
    for section in &report.sections {
        composer.section(section);
    }

    let bytes = composer.finish();
    if !bytes.starts_with(b"%PDF") {
        return Err(RunError::Render(
            "PDF serializer produced an unrecognizable document".to_string(),
        ));
    }
    Ok(bytes)
}

/// Cursor-driven page builder. `cursor_mm` is measured down from the top of
/// the page; PDF coordinates run bottom-up, so every draw call flips it.
struct PageComposer {
    pages: Vec<PdfPage>,
    ops: Vec<Op>,
    cursor_mm: f32,
    page_number: usize,
}

impl PageComposer {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            ops: Vec::new(),
            cursor_mm: MARGIN_MM,
            page_number: 1,
        }
    }

    fn title_block(&mut self, run_date: NaiveDate) {
        self.cursor_mm += 10.0;
        self.text_at(REPORT_TITLE, 22.0, BuiltinFont::HelveticaBold, navy(), MARGIN_MM);
        self.cursor_mm += 9.0;
        self.text_at(
            &run_date.format("%B %-d, %Y").to_string(),
            12.0,
            BuiltinFont::Helvetica,
            slate(),
            MARGIN_MM,
        );
        self.cursor_mm += 6.0;
        self.text_at(
            &format!(
                "Covering the {COVERAGE_DAYS} days ending {}",
                run_date.format("%Y-%m-%d")
            ),
            10.0,
            BuiltinFont::Helvetica,
            grey_blue(),
            MARGIN_MM,
        );
        self.cursor_mm += 4.0;
        self.horizontal_rule(teal(), 2.5);
        self.cursor_mm += 6.0;
    }

    fn lead_block(&mut self, lead: &str) {
        let start_page = self.page_number;
        let start_mm = self.cursor_mm;

        let indent = MARGIN_MM + 5.0;
        self.text_block(
            lead,
            12.0,
            BuiltinFont::HelveticaBold,
            navy(),
            indent,
            CONTENT_WIDTH_MM - 5.0,
        );

        // Accent bar beside the lead. Skipped in the unlikely case the lead
        // wrapped onto a new page, where a single bar no longer lines up.
        if self.page_number == start_page {
            let x = MARGIN_MM + 1.0;
            self.stroke(
                teal(),
                2.0,
                vec![
                    line_point(x, PAGE_HEIGHT_MM - start_mm),
                    line_point(x, PAGE_HEIGHT_MM - self.cursor_mm),
                ],
            );
        }
        self.cursor_mm += 6.0;
    }

    fn section(&mut self, section: &ReportSection) {
        self.ensure_room(20.0);
        self.cursor_mm += 8.0;
        self.text_at(
            &section.heading,
            15.0,
            BuiltinFont::HelveticaBold,
            navy(),
            MARGIN_MM,
        );
        self.cursor_mm += 2.0;
        self.horizontal_rule(teal(), 1.0);
        self.cursor_mm += 4.0;

        self.body_text(&section.body);
        if let Some(table) = &section.table {
            self.cursor_mm += 2.0;
            self.table(table);
        }
    }

    /// Flow prose onto the page. Bullet lines keep their own indent; other
    /// consecutive lines of a paragraph are reflowed together.
    fn body_text(&mut self, body: &str) {
        let mut paragraph = String::new();
        for line in body.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                self.flush_paragraph(&mut paragraph);
                continue;
            }
            if let Some(item) = bullet_text(trimmed) {
                self.flush_paragraph(&mut paragraph);
                self.text_block(
                    &format!("- {}", strip_inline_markup(item)),
                    BODY_SIZE,
                    BuiltinFont::Helvetica,
                    slate(),
                    MARGIN_MM + 4.0,
                    CONTENT_WIDTH_MM - 4.0,
                );
                self.cursor_mm += 1.0;
                continue;
            }
            if !paragraph.is_empty() {
                paragraph.push(' ');
            }
            paragraph.push_str(trimmed);
        }
        self.flush_paragraph(&mut paragraph);
    }

    fn flush_paragraph(&mut self, paragraph: &mut String) {
        if paragraph.is_empty() {
            return;
        }
        let text = strip_inline_markup(&std::mem::take(paragraph));
        self.text_block(
            &text,
            BODY_SIZE,
            BuiltinFont::Helvetica,
            slate(),
            MARGIN_MM,
            CONTENT_WIDTH_MM,
        );
        self.cursor_mm += 2.5;
    }

    fn table(&mut self, table: &ReportTable) {
        let columns = table.header.len().max(1);
        let col_width = CONTENT_WIDTH_MM / columns as f32;
        let row_height = 7.2_f32;

        self.table_row(
            &table.header,
            BuiltinFont::HelveticaBold,
            navy(),
            col_width,
            row_height,
            true,
        );
        for row in &table.rows {
            // A row that would cross the bottom limit starts a fresh page,
            // with the header repeated above it.
            if self.cursor_mm + row_height > BOTTOM_LIMIT_MM {
                self.break_page();
                self.table_row(
                    &table.header,
                    BuiltinFont::HelveticaBold,
                    navy(),
                    col_width,
                    row_height,
                    true,
                );
            }
            self.table_row(
                row,
                BuiltinFont::Helvetica,
                slate(),
                col_width,
                row_height,
                false,
            );
        }
        self.cursor_mm += 3.0;
    }

    fn table_row(
        &mut self,
        cells: &[String],
        font: BuiltinFont,
        color: Color,
        col_width: f32,
        row_height: f32,
        with_top_border: bool,
    ) {
        self.ensure_room(row_height);
        let top = self.cursor_mm;
        let bottom = top + row_height;
        let y_top = PAGE_HEIGHT_MM - top;
        let y_bottom = PAGE_HEIGHT_MM - bottom;
        let columns = cells.len().max(1);

        if with_top_border {
            self.stroke(
                grey_blue(),
                0.75,
                vec![
                    line_point(MARGIN_MM, y_top),
                    line_point(MARGIN_MM + CONTENT_WIDTH_MM, y_top),
                ],
            );
        }
        self.stroke(
            grey_blue(),
            0.75,
            vec![
                line_point(MARGIN_MM, y_bottom),
                line_point(MARGIN_MM + CONTENT_WIDTH_MM, y_bottom),
            ],
        );
        for k in 0..=columns {
            let x = MARGIN_MM + k as f32 * col_width;
            self.stroke(
                grey_blue(),
                0.75,
                vec![line_point(x, y_top), line_point(x, y_bottom)],
            );
        }

        let pad = 2.0;
        let cell_chars = chars_per_line(col_width - 2.0 * pad, TABLE_SIZE);
        self.cursor_mm = bottom - 2.2;
        for (k, cell) in cells.iter().enumerate() {
            let x = MARGIN_MM + k as f32 * col_width + pad;
            let clipped = clip_to(strip_inline_markup(cell), cell_chars);
            self.text_at(&clipped, TABLE_SIZE, font, color.clone(), x);
        }
        self.cursor_mm = bottom;
    }

    /// Wrap text to the given width and emit it line by line.
    fn text_block(
        &mut self,
        text: &str,
        size: f32,
        font: BuiltinFont,
        color: Color,
        x_mm: f32,
        width_mm: f32,
    ) {
        let line_mm = line_height_mm(size);
        for line in wrap(text, chars_per_line(width_mm, size)) {
            self.ensure_room(line_mm);
            self.cursor_mm += line_mm;
            self.text_at(&line, size, font, color.clone(), x_mm);
        }
    }

    /// Draw one line of text with its baseline at the current cursor.
    fn text_at(&mut self, text: &str, size: f32, font: BuiltinFont, color: Color, x_mm: f32) {
        let pos = point(x_mm, PAGE_HEIGHT_MM - self.cursor_mm);
        self.ops.extend([
            Op::SetFillColor { col: color },
            Op::StartTextSection,
            Op::SetTextCursor { pos },
            Op::SetFontSizeBuiltinFont {
                size: Pt(size),
                font,
            },
            Op::WriteTextBuiltinFont {
                items: vec![TextItem::Text(text.to_string())],
                font,
            },
            Op::EndTextSection,
        ]);
    }

    fn horizontal_rule(&mut self, color: Color, thickness_pt: f32) {
        let y = PAGE_HEIGHT_MM - self.cursor_mm;
        self.stroke(
            color,
            thickness_pt,
            vec![
                line_point(MARGIN_MM, y),
                line_point(MARGIN_MM + CONTENT_WIDTH_MM, y),
            ],
        );
    }

    fn stroke(&mut self, color: Color, thickness_pt: f32, points: Vec<LinePoint>) {
        self.ops.extend([
            Op::SetOutlineColor { col: color },
            Op::SetOutlineThickness {
                pt: Pt(thickness_pt),
            },
            Op::DrawLine {
                line: Line {
                    points,
                    is_closed: false,
                },
            },
        ]);
    }

    fn ensure_room(&mut self, needed_mm: f32) {
        if self.cursor_mm + needed_mm > BOTTOM_LIMIT_MM {
            self.break_page();
        }
    }

    fn break_page(&mut self) {
        self.footer();
        let ops = std::mem::take(&mut self.ops);
        self.pages
            .push(PdfPage::new(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), ops));
        self.page_number += 1;
        self.cursor_mm = MARGIN_MM;
    }

    fn footer(&mut self) {
        let saved = self.cursor_mm;
        self.cursor_mm = FOOTER_BASELINE_MM;
        self.text_at(
            &format!("{REPORT_TITLE}  |  Page {}", self.page_number),
            8.0,
            BuiltinFont::Helvetica,
            grey_blue(),
            MARGIN_MM,
        );
        self.cursor_mm = saved;
    }

    fn finish(mut self) -> Vec<u8> {
        self.break_page();
        let mut warnings = Vec::new();
        PdfDocument::new(REPORT_TITLE)
            .with_pages(self.pages)
            .save(&PdfSaveOptions::default(), &mut warnings)
    }
}

fn point(x_mm: f32, y_mm: f32) -> Point {
    Point {
        x: Mm(x_mm).into_pt(),
        y: Mm(y_mm).into_pt(),
    }
}

fn line_point(x_mm: f32, y_mm: f32) -> LinePoint {
    LinePoint {
        p: point(x_mm, y_mm),
        bezier: false,
    }
}

fn line_height_mm(size_pt: f32) -> f32 {
    size_pt * 1.45 / PT_PER_MM
}

/// Estimated character budget for one line of Helvetica at `size_pt`.
fn chars_per_line(width_mm: f32, size_pt: f32) -> usize {
    let avg_char_mm = size_pt * 0.52 / PT_PER_MM;
    ((width_mm / avg_char_mm) as usize).max(8)
}

fn bullet_text(line: &str) -> Option<&str> {
    line.strip_prefix("- ").or_else(|| line.strip_prefix("* "))
}

/// Drop the inline markers Markdown uses for emphasis; the PDF styles with
/// fonts instead.
fn strip_inline_markup(text: &str) -> String {
    text.replace("**", "").replace('`', "")
}

fn clip_to(text: String, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text;
    }
    let keep = max_chars.saturating_sub(3).max(1);
    let mut clipped: String = text.chars().take(keep).collect();
    clipped.push_str("...");
    clipped
}

/// Greedy word wrap; words longer than a line are hard-split.
fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(8);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        let current_len = current.chars().count();

        if !current.is_empty() && current_len + 1 + word_len <= max_chars {
            current.push(' ');
            current.push_str(word);
            continue;
        }
        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if word_len <= max_chars {
            current = word.to_string();
        } else {
            let chars: Vec<char> = word.chars().collect();
            let mut start = 0;
            while chars.len() - start > max_chars {
                lines.push(chars[start..start + max_chars].iter().collect());
                start += max_chars;
            }
            current = chars[start..].iter().collect();
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_report() -> StructuredReport {
        StructuredReport {
            lead_message: "A short week with one launch.".to_string(),
            sections: vec![ReportSection {
                heading: "Executive Summary".to_string(),
                body: "One launch, no anomalies.".to_string(),
                table: None,
            }],
        }
    }

    fn run_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, 22).unwrap()
    }

    #[test]
    fn test_rendered_bytes_are_a_pdf() {
        let bytes = render(&small_report(), run_date()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(bytes.len() > 1_000);
    }

    #[test]
    fn test_long_reports_produce_more_output() {
        let mut long = small_report();
        long.sections[0].body = "A paragraph about orbital mechanics.\n\n".repeat(300);
        long.sections.push(ReportSection {
            heading: "Key Events".to_string(),
            body: String::new(),
            table: Some(ReportTable {
                header: vec!["Date".to_string(), "Event".to_string(), "Why".to_string()],
                rows: (0..40)
                    .map(|i| {
                        vec![
                            format!("2025-08-{:02}", (i % 28) + 1),
                            format!("Event number {i}"),
                            "Schedule pressure".to_string(),
                        ]
                    })
                    .collect(),
            }),
        });

        let small = render(&small_report(), run_date()).unwrap();
        let big = render(&long, run_date()).unwrap();
        assert!(big.len() > small.len());
    }

    #[test]
    fn test_table_spanning_pages_repeats_its_header() {
        let table = ReportTable {
            header: vec!["Date".to_string(), "Event".to_string()],
            rows: (0..60)
                .map(|i| {
                    vec![
                        format!("2025-08-{:02}", (i % 28) + 1),
                        format!("Event number {i}"),
                    ]
                })
                .collect(),
        };

        let mut composer = PageComposer::new();
        composer.table(&table);

        assert_eq!(composer.pages.len(), 1, "sixty rows must spill onto a second page");
        // The page that holds the continuation rows gets its own header row.
        let continuation_headers = composer
            .ops
            .iter()
            .filter(|op| match op {
                Op::WriteTextBuiltinFont {
                    items,
                    font: BuiltinFont::HelveticaBold,
                } => items
                    .iter()
                    .any(|item| matches!(item, TextItem::Text(text) if text == "Date")),
                _ => false,
            })
            .count();
        assert_eq!(continuation_headers, 1);
    }

    #[test]
    fn test_wrap_respects_the_character_budget() {
        let lines = wrap("one two three four five six seven eight nine ten", 12);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(line.chars().count() <= 12, "line too long: {line}");
        }
    }

    #[test]
    fn test_wrap_hard_splits_oversized_words() {
        let lines = wrap(&"x".repeat(30), 10);
        assert_eq!(lines.len(), 3);
        assert!(lines.iter().all(|l| l.chars().count() == 10));
    }

    #[test]
    fn test_wrap_of_empty_text_is_empty() {
        assert!(wrap("", 40).is_empty());
        assert!(wrap("   ", 40).is_empty());
    }

    #[test]
    fn test_cell_clipping_keeps_the_budget() {
        assert_eq!(clip_to("short".to_string(), 10), "short");
        let clipped = clip_to("a very long cell value".to_string(), 10);
        assert_eq!(clipped.chars().count(), 10);
        assert!(clipped.ends_with("..."));
    }

    #[test]
    fn test_inline_markup_is_stripped() {
        assert_eq!(strip_inline_markup("a **bold** `code` word"), "a bold code word");
    }
}
