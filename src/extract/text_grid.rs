// src/extract/text_grid.rs

use anyhow::{anyhow, Context, Result};
use lopdf::Document;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tracing::{debug, instrument};

use super::{PageExtractor, RawTable};

/// A cell starts at the line start, or after a tab or two or more spaces.
static CELL_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\t| {2,})(\S)").expect("cell start regex"));

/// Default extractor: reads page text with `lopdf` and cuts every line at
/// fixed character positions. The first non-blank line is the header row.
///
/// Column starts come from configuration when the layout is known. Without
/// them they are read off the header line, which cannot see unlabelled
/// columns, so layouts with a blank spacer header need explicit starts.
///
/// This only works for text-layer PDFs whose text keeps its horizontal
/// layout; anything fancier should come from a real table detector plugged
/// in through [`PageExtractor`].
#[derive(Debug, Default, Clone)]
pub struct TextGridExtractor {
    column_starts: Option<Vec<usize>>,
}

/// Text of every page, read from one load of the PDF.
#[derive(Debug, Clone)]
pub struct PdfText {
    /// Page text in page order, or the reason it could not be read.
    pages: Vec<Result<String, String>>,
}

impl TextGridExtractor {
    pub fn new(column_starts: Option<Vec<usize>>) -> Self {
        Self { column_starts }
    }
}

impl PageExtractor for TextGridExtractor {
    type Document = PdfText;

    #[instrument(level = "debug", skip(self, path), fields(doc = %path.display()))]
    fn open(&self, path: &Path) -> Result<PdfText> {
        let doc = Document::load(path).with_context(|| format!("loading PDF {}", path.display()))?;
        let pages: Vec<Result<String, String>> = doc
            .get_pages()
            .keys()
            .map(|&page_no| {
                doc.extract_text(&[page_no])
                    .map_err(|e| format!("extracting text of page {}: {}", page_no, e))
            })
            .collect();
        debug!(pages = pages.len(), "loaded page text");
        Ok(PdfText { pages })
    }

    fn page_count(&self, document: &PdfText) -> usize {
        document.pages.len()
    }

    fn extract_page(&self, document: &PdfText, page: usize) -> Result<RawTable> {
        let text = page
            .checked_sub(1)
            .and_then(|i| document.pages.get(i))
            .ok_or_else(|| anyhow!("page {} not found", page))?
            .as_deref()
            .map_err(|e| anyhow!("{}", e))?;
        let table = parse_text_grid(text, self.column_starts.as_deref());
        debug!(
            page,
            rows = table.num_rows(),
            cols = table.num_columns(),
            "parsed text grid"
        );
        Ok(table)
    }
}

/// Split page text into a header row and body rows, cutting every line at
/// the same column starts. Blank cells stay in place as `""`.
pub fn parse_text_grid(text: &str, column_starts: Option<&[usize]>) -> RawTable {
    let mut lines = text.lines().filter(|line| !line.trim().is_empty());
    let Some(header) = lines.next() else {
        return RawTable::default();
    };

    let starts = match column_starts {
        Some(starts) => starts.to_vec(),
        None => header_column_starts(header),
    };
    let headers = cut_line(header, &starts);
    let rows = lines.map(|line| cut_line(line, &starts)).collect();
    RawTable::new(headers, rows)
}

/// Character offsets where the header line's labels begin.
pub fn header_column_starts(header: &str) -> Vec<usize> {
    CELL_START
        .captures_iter(header)
        .filter_map(|caps| caps.get(1))
        .map(|m| header[..m.start()].chars().count())
        .collect()
}

/// Cut `line` into one cell per start position; text before the first start
/// is ignored and positions past the line end give empty cells.
fn cut_line(line: &str, starts: &[usize]) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(chars.len()).min(chars.len());
            if start < end {
                chars[start..end].iter().collect::<String>().trim().to_string()
            } else {
                String::new()
            }
        })
        .collect()
}
