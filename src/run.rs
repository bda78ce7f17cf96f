// src/run.rs

use anyhow::{Context, Result};
use chrono::Local;
use glob::glob;
use rayon::prelude::*;
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Instant,
};
use tracing::{error, info, instrument, warn};

use crate::config::ParserConfig;
use crate::diagnostics::RunLog;
use crate::extract::PageExtractor;
use crate::output::{output_path, write_document};
use crate::process::table::ConsolidatedTable;
use crate::process::{PageError, PageOutcome, PageProcessor};

/// Per-document result of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSummary {
    pub document: PathBuf,
    pub output: PathBuf,
    pub pages: usize,
    pub failed_pages: usize,
    pub rows: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub log_path: PathBuf,
    pub documents: Vec<DocumentSummary>,
    /// Documents never started because the run was cancelled.
    pub skipped: Vec<PathBuf>,
}

/// Documents in `input_dir` whose file name matches `pattern`, sorted.
pub fn list_documents(input_dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let full = input_dir.join(pattern);
    let full = full.to_string_lossy();
    let mut docs: Vec<PathBuf> = glob(&full)
        .with_context(|| format!("invalid document pattern {}", full))?
        .filter_map(|entry| match entry {
            Ok(path) if path.is_file() => Some(path),
            Ok(_) => None,
            Err(e) => {
                warn!("skipping unreadable path: {}", e);
                None
            }
        })
        .collect();
    docs.sort();
    Ok(docs)
}

/// Drives a whole run: every document, every page, one output per document.
pub struct Runner<E: PageExtractor> {
    config: ParserConfig,
    extractor: E,
    pages: PageProcessor,
    cancel: Arc<AtomicBool>,
}

impl<E: PageExtractor> Runner<E> {
    pub fn new(config: ParserConfig, extractor: E) -> Self {
        let pages = PageProcessor::new(&config);
        Self {
            config,
            extractor,
            pages,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag that stops the run before the next document starts.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn run(&self) -> Result<RunSummary> {
        let docs = list_documents(&self.config.input_dir, &self.config.document_pattern)?;
        info!(count = docs.len(), dir = %self.config.input_dir.display(), "found documents");

        fs::create_dir_all(&self.config.output_dir).with_context(|| {
            format!("creating output directory {}", self.config.output_dir.display())
        })?;
        let log = RunLog::create(&self.config.output_dir, Local::now(), &docs)?;

        let mut summary = RunSummary {
            log_path: log.path().to_path_buf(),
            ..RunSummary::default()
        };
        for (i, doc) in docs.iter().enumerate() {
            if self.cancel.load(Ordering::SeqCst) {
                warn!(remaining = docs.len() - i, "run cancelled");
                summary.skipped = docs[i..].to_vec();
                log.run_cancelled(&summary.skipped)?;
                break;
            }
            summary.documents.push(self.process_document(doc, &log)?);
        }
        Ok(summary)
    }

    /// Parse every page of one document and write its output. Page failures
    /// are logged and skipped; only I/O on the log or output is fatal.
    #[instrument(level = "info", skip(self, document, log), fields(doc = %document.display()))]
    pub fn process_document(&self, document: &Path, log: &RunLog) -> Result<DocumentSummary> {
        let start = Instant::now();
        let mut table = ConsolidatedTable::new(self.pages.projection().output_id_columns());
        let mut failed_pages = 0;

        // One open per document; its pages then share the loaded content.
        let (pages, results): (usize, Vec<(usize, Result<PageOutcome, PageError>)>) =
            match self.extractor.open(document) {
                Ok(opened) => {
                    let pages = self.extractor.page_count(&opened);
                    let results = (1..=pages)
                        .into_par_iter()
                        .map(|page| (page, self.process_page(&opened, page, pages)))
                        .collect();
                    (pages, results)
                }
                Err(e) => {
                    error!("cannot open document: {:#}", e);
                    log.document_failed(document, &format!("{:#}", e))?;
                    (0, Vec::new())
                }
            };
        log.document_started(document, pages)?;

        for (page, result) in results {
            match result {
                Ok(outcome) => table.append(outcome.records),
                Err(e) => {
                    warn!(page, "page skipped: {}", e);
                    failed_pages += 1;
                    log.page_failed(document, page, &e.to_string())?;
                }
            }
        }

        let output = output_path(&self.config.output_dir, document, self.config.output_format);
        write_document(&table, &output, self.config.output_format)?;
        log.document_finished(document, start.elapsed())?;

        info!(
            pages,
            failed_pages,
            rows = table.len(),
            elapsed = ?start.elapsed(),
            "document done"
        );
        Ok(DocumentSummary {
            document: document.to_path_buf(),
            output,
            pages,
            failed_pages,
            rows: table.len(),
        })
    }

    fn process_page(
        &self,
        document: &E::Document,
        page: usize,
        total: usize,
    ) -> Result<PageOutcome, PageError> {
        let raw = self
            .extractor
            .extract_page(document, page)
            .map_err(|e| PageError::Extraction(format!("{:#}", e)))?;
        self.pages.process(&raw, page == total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::RawTable;
    use anyhow::anyhow;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;
    use tempfile::tempdir;

    /// Serves pre-built tables keyed by document file name.
    #[derive(Default)]
    struct FakeExtractor {
        docs: HashMap<String, Vec<RawTable>>,
        opens: AtomicUsize,
    }

    impl FakeExtractor {
        fn with(mut self, name: &str, pages: Vec<RawTable>) -> Self {
            self.docs.insert(name.to_string(), pages);
            self
        }

        fn pages(&self, document: &Path) -> Result<&Vec<RawTable>> {
            let name = document.file_name().unwrap().to_string_lossy().into_owned();
            self.docs
                .get(&name)
                .ok_or_else(|| anyhow!("not a PDF: {}", name))
        }
    }

    impl PageExtractor for FakeExtractor {
        type Document = Vec<RawTable>;

        fn open(&self, path: &Path) -> Result<Vec<RawTable>> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            Ok(self.pages(path)?.clone())
        }

        fn page_count(&self, document: &Vec<RawTable>) -> usize {
            document.len()
        }

        fn extract_page(&self, document: &Vec<RawTable>, page: usize) -> Result<RawTable> {
            document
                .get(page - 1)
                .cloned()
                .ok_or_else(|| anyhow!("page {} missing", page))
        }
    }

    fn table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable::new(
            headers.iter().map(|s| s.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }

    fn config(input: &Path, output: &Path) -> ParserConfig {
        ParserConfig {
            expected_columns: 3,
            column_rename: [("id".to_string(), "prop_id".to_string())]
                .into_iter()
                .collect(),
            input_dir: input.to_path_buf(),
            output_dir: output.to_path_buf(),
            drop_columns: vec![],
            id_columns: vec!["id".into()],
            year_columns: vec!["2020".into(), "2021".into()],
            realignment: None,
            ..ParserConfig::default()
        }
    }

    fn good_page() -> RawTable {
        table(
            &["id", "2020", "2021"],
            &[
                &["1", "A-1", "A-2"],
                &["", "10", "20"],
                &["2", "A-3", ""],
                &["", "30", "40"],
            ],
        )
    }

    fn wide_page() -> RawTable {
        table(
            &["id", "2020", "2021", "stray"],
            &[&["3", "A-9", "A-9", "x"], &["", "90", "90", "x"]],
        )
    }

    fn last_page() -> RawTable {
        table(
            &["id", "2020", "2021"],
            &[
                &["4", "", "A-5"],
                &["", "", "50"],
                &["Total", "40", "110"],
                &["", "", ""],
            ],
        )
    }

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let p = dir.join(name);
        fs::write(&p, b"%PDF-1.4").unwrap();
        p
    }

    #[test]
    fn lists_only_matching_documents_sorted() -> Result<()> {
        let dir = tempdir()?;
        touch(dir.path(), "b.pdf");
        touch(dir.path(), "a.pdf");
        touch(dir.path(), "notes.txt");
        fs::create_dir(dir.path().join("sub.pdf"))?;

        let docs = list_documents(dir.path(), "*.pdf")?;
        let names: Vec<_> = docs
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.pdf", "b.pdf"]);
        Ok(())
    }

    #[test]
    fn mismatched_page_is_skipped_and_logged_once() -> Result<()> {
        let input = tempdir()?;
        let output = tempdir()?;
        touch(input.path(), "roll.pdf");

        let extractor =
            FakeExtractor::default().with("roll.pdf", vec![good_page(), wide_page(), last_page()]);
        let runner = Runner::new(config(input.path(), output.path()), extractor);
        let summary = runner.run()?;

        assert_eq!(summary.documents.len(), 1);
        let doc = &summary.documents[0];
        assert_eq!(doc.pages, 3);
        assert_eq!(doc.failed_pages, 1);

        let csv = fs::read_to_string(output.path().join("roll.pdf.csv"))?;
        assert_eq!(
            csv,
            "prop_id,year,app_no,amt\n\
             1,2020,A-1,10\n\
             2,2020,A-3,30\n\
             1,2021,A-2,20\n\
             4,2021,A-5,50\n"
        );
        assert_eq!(doc.rows, 4);

        let log = fs::read_to_string(&summary.log_path)?;
        assert_eq!(log.matches("Encountered the below error").count(), 1);
        assert!(log.contains(
            "parsing page 2 of file roll.pdf:\nExpected 3 columns, but found 4 columns\n"
        ));
        assert!(log.contains("Number of pages found: 3\n"));
        Ok(())
    }

    #[test]
    fn each_document_is_opened_once() -> Result<()> {
        let input = tempdir()?;
        let output = tempdir()?;
        touch(input.path(), "a.pdf");
        touch(input.path(), "b.pdf");

        let extractor = FakeExtractor::default()
            .with("a.pdf", vec![good_page(), good_page(), last_page()])
            .with("b.pdf", vec![good_page(), last_page()]);
        let runner = Runner::new(config(input.path(), output.path()), extractor);
        let summary = runner.run()?;

        assert_eq!(summary.documents.iter().map(|d| d.pages).sum::<usize>(), 5);
        assert_eq!(runner.extractor.opens.load(Ordering::SeqCst), 2);
        Ok(())
    }

    #[test]
    fn rerun_is_byte_identical() -> Result<()> {
        let input = tempdir()?;
        let output = tempdir()?;
        touch(input.path(), "roll.pdf");
        let make = || {
            FakeExtractor::default().with("roll.pdf", vec![good_page(), good_page(), last_page()])
        };

        let cfg = config(input.path(), output.path());
        Runner::new(cfg.clone(), make()).run()?;
        let first = fs::read(output.path().join("roll.pdf.csv"))?;
        Runner::new(cfg, make()).run()?;
        let second = fs::read(output.path().join("roll.pdf.csv"))?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn all_pages_failing_still_writes_output() -> Result<()> {
        let input = tempdir()?;
        let output = tempdir()?;
        touch(input.path(), "bad.pdf");
        touch(input.path(), "broken.pdf");

        let extractor = FakeExtractor::default().with("bad.pdf", vec![wide_page(), wide_page()]);
        let summary = Runner::new(config(input.path(), output.path()), extractor).run()?;

        assert_eq!(summary.documents.len(), 2);
        for name in ["bad.pdf.csv", "broken.pdf.csv"] {
            let csv = fs::read_to_string(output.path().join(name))?;
            assert_eq!(csv, "prop_id,year,app_no,amt\n");
        }
        let bad = &summary.documents[0];
        assert_eq!((bad.pages, bad.failed_pages, bad.rows), (2, 2, 0));

        // broken.pdf is unknown to the extractor: no page count
        let log = fs::read_to_string(&summary.log_path)?;
        assert!(log.contains("Could not read file broken.pdf:\nnot a PDF: broken.pdf\n"));
        Ok(())
    }

    #[test]
    fn extraction_error_is_page_level() -> Result<()> {
        struct Flaky;
        impl PageExtractor for Flaky {
            type Document = ();
            fn open(&self, _: &Path) -> Result<()> {
                Ok(())
            }
            fn page_count(&self, _: &()) -> usize {
                2
            }
            fn extract_page(&self, _: &(), page: usize) -> Result<RawTable> {
                if page == 1 {
                    Err(anyhow!("garbled content stream"))
                } else {
                    Ok(last_page())
                }
            }
        }

        let input = tempdir()?;
        let output = tempdir()?;
        touch(input.path(), "roll.pdf");
        let summary = Runner::new(config(input.path(), output.path()), Flaky).run()?;
        assert_eq!(summary.documents[0].failed_pages, 1);
        assert_eq!(summary.documents[0].rows, 1);

        let log = fs::read_to_string(&summary.log_path)?;
        assert!(log.contains("page 1 of file roll.pdf:\ntable extraction failed: garbled content stream\n"));
        Ok(())
    }

    #[test]
    fn cancelled_run_skips_remaining_documents() -> Result<()> {
        let input = tempdir()?;
        let output = tempdir()?;
        touch(input.path(), "a.pdf");
        touch(input.path(), "b.pdf");

        let extractor = FakeExtractor::default()
            .with("a.pdf", vec![last_page()])
            .with("b.pdf", vec![last_page()]);
        let runner = Runner::new(config(input.path(), output.path()), extractor);
        runner.cancel_flag().store(true, Ordering::SeqCst);
        let summary = runner.run()?;

        assert!(summary.documents.is_empty());
        assert_eq!(summary.skipped.len(), 2);
        assert!(!output.path().join("a.pdf.csv").exists());
        let log = fs::read_to_string(&summary.log_path)?;
        assert!(log.contains("Run cancelled; the following PDFS were not parsed:\na.pdf\nb.pdf\n"));
        Ok(())
    }
}
