use anyhow::{Context, Result};
use std::{env, path::Path, process::exit};
use taxroll::{
    config::ParserConfig,
    extract::{PageExtractor, RawTable, TextGridExtractor},
    process::{normalize::normalize_page, PageProcessor},
};

fn main() {
    // Expect a PDF path and a 1-based page number.
    let args: Vec<String> = env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage: {} <PDF_FILE> <PAGE>", args[0]);
        exit(1);
    }
    if let Err(e) = dump_page(Path::new(&args[1]), &args[2]) {
        eprintln!("Error: {:#}", e);
        exit(1);
    }
}

/// Print what the extractor sees on a page and what the pipeline makes of it.
fn dump_page(path: &Path, page: &str) -> Result<()> {
    let page: usize = page
        .parse()
        .with_context(|| format!("invalid page number {:?}", page))?;
    let config = ParserConfig::load()?;
    let extractor = TextGridExtractor::new(config.column_starts.clone());

    let document = extractor.open(path)?;
    let total = extractor.page_count(&document);
    let raw = extractor.extract_page(&document, page)?;
    let is_last = page == total;

    println!("=== {} : page {} of {} ===", path.display(), page, total);
    print_raw(&raw);
    println!();

    println!("=== Normalized ===");
    match normalize_page(&raw, config.expected_columns, config.footer_rows, is_last) {
        Ok(table) => {
            println!("{}", table.columns.join(" | "));
            for row in &table.rows {
                let cells: Vec<&str> = row.iter().map(|c| c.as_deref().unwrap_or("-")).collect();
                println!("{}", cells.join(" | "));
            }
        }
        Err(e) => println!("rejected: {}", e),
    }
    println!();

    println!("=== Long form ===");
    match PageProcessor::new(&config).process(&raw, is_last) {
        Ok(outcome) => {
            println!("{} record pairs, {} rows kept", outcome.pairs, outcome.records.len());
            for rec in &outcome.records {
                let ids: Vec<&str> = rec.ids.iter().map(|c| c.as_deref().unwrap_or("")).collect();
                println!("{} | {} | {} | {}", ids.join(" | "), rec.year, rec.app_no, rec.amt);
            }
        }
        Err(e) => println!("page skipped: {}", e),
    }
    Ok(())
}

fn print_raw(raw: &RawTable) {
    println!("Columns: {}  Rows: {}", raw.num_columns(), raw.num_rows());
    for (i, h) in raw.headers.iter().enumerate() {
        println!("- [{:>2}] {:?}", i, h);
    }
    for row in &raw.rows {
        println!("{:?}", row);
    }
}
