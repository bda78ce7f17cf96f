// src/diagnostics/mod.rs

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
    sync::Mutex,
    time::Duration,
};

const BEGIN_BANNER: &str = "-----------------------BEGIN PARSING-----------------------";
const SEPARATOR: &str = "-----------------------------------------------------------";

/// Plain-text run log kept next to the outputs.
///
/// Every entry opens the file in append mode and closes it again, so the
/// log is readable while a run is still going. Writes are serialized.
#[derive(Debug)]
pub struct RunLog {
    path: PathBuf,
    lock: Mutex<()>,
}

fn display_name(document: &Path) -> String {
    document
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| document.display().to_string())
}

impl RunLog {
    /// Create `PDFParserLog_<start>_.txt` in `out_dir` and write the run header.
    pub fn create(out_dir: &Path, started: DateTime<Local>, documents: &[PathBuf]) -> Result<Self> {
        fs::create_dir_all(out_dir)
            .with_context(|| format!("creating output directory {}", out_dir.display()))?;

        let stamp = started.format("%Y-%m-%d %H:%M:%S%.6f").to_string();
        let path = out_dir.join(format!("PDFParserLog_{}_.txt", stamp.replace(':', "_")));

        let mut header = format!("{}\n\nBegan parsing PDFs at: {}\n\n", BEGIN_BANNER, stamp);
        header.push_str("The following PDFS were found in the input folder:\n");
        for doc in documents {
            header.push_str(&display_name(doc));
            header.push('\n');
        }
        header.push_str(&format!("\n{}\n\n", SEPARATOR));

        fs::write(&path, header).with_context(|| format!("creating log {}", path.display()))?;
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn document_started(&self, document: &Path, pages: usize) -> Result<()> {
        self.append(&format!(
            "Parsing file: {}\nNumber of pages found: {}\n",
            display_name(document),
            pages
        ))
    }

    pub fn page_failed(&self, document: &Path, page: usize, message: &str) -> Result<()> {
        self.append(&format!(
            "Encountered the below error when parsing page {} of file {}:\n{}\n\n",
            page,
            display_name(document),
            message
        ))
    }

    /// The document could not be opened at all; nothing was parsed.
    pub fn document_failed(&self, document: &Path, message: &str) -> Result<()> {
        self.append(&format!(
            "Could not read file {}:\n{}\n\n",
            display_name(document),
            message
        ))
    }

    pub fn document_finished(&self, document: &Path, elapsed: Duration) -> Result<()> {
        self.append(&format!(
            "Completed parsing file: {}\nTime taken to parse file: {}\n\n{}\n\n",
            display_name(document),
            elapsed.as_secs_f64() / 60.0,
            SEPARATOR
        ))
    }

    pub fn run_cancelled(&self, skipped: &[PathBuf]) -> Result<()> {
        let mut text = String::from("Run cancelled; the following PDFS were not parsed:\n");
        for doc in skipped {
            text.push_str(&display_name(doc));
            text.push('\n');
        }
        text.push_str(&format!("\n{}\n\n", SEPARATOR));
        self.append(&text)
    }

    fn append(&self, text: &str) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .with_context(|| format!("opening log {}", self.path.display()))?;
        file.write_all(text.as_bytes())
            .with_context(|| format!("writing log {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    #[test]
    fn log_has_header_and_document_block() -> Result<()> {
        let dir = tempdir()?;
        let started = Local.with_ymd_and_hms(2024, 3, 5, 9, 15, 30).unwrap();
        let docs = vec![PathBuf::from("in/a.pdf"), PathBuf::from("in/b.pdf")];
        let log = RunLog::create(dir.path(), started, &docs)?;

        let name = log.path().file_name().unwrap().to_string_lossy().into_owned();
        assert_eq!(name, "PDFParserLog_2024-03-05 09_15_30.000000_.txt");

        log.document_started(&docs[0], 3)?;
        log.page_failed(&docs[0], 2, "Expected 17 columns, but found 18 columns")?;
        log.document_finished(&docs[0], Duration::from_secs(90))?;

        let text = fs::read_to_string(log.path())?;
        assert!(text.starts_with(BEGIN_BANNER));
        assert!(text.contains("Began parsing PDFs at: 2024-03-05 09:15:30.000000\n"));
        assert!(text.contains("input folder:\na.pdf\nb.pdf\n"));
        assert!(text.contains("Parsing file: a.pdf\nNumber of pages found: 3\n"));
        assert!(text.contains(
            "Encountered the below error when parsing page 2 of file a.pdf:\nExpected 17 columns, but found 18 columns\n\n"
        ));
        assert!(text.contains("Completed parsing file: a.pdf\nTime taken to parse file: 1.5\n"));
        assert!(text.trim_end().ends_with(SEPARATOR));
        Ok(())
    }
}
