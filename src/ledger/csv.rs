use std::borrow::Cow;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use csv::ByteRecord;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use super::Ledger;
use crate::models::{Review, ReviewSet};

const HEADER: [&str; 7] = [
    "Review ID",
    "Rating",
    "Review Text",
    "Author",
    "Device",
    "Date",
    "Notified",
];

/// CSV file-backed review state
pub struct CsvLedger {
    path: PathBuf,
}

impl CsvLedger {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_to(&self, file: &mut NamedTempFile, reviews: &ReviewSet) -> Result<()> {
        let mut writer = csv::Writer::from_writer(file.as_file_mut());
        writer.write_record(HEADER).context("Failed to write header")?;

        for review in reviews {
            let rating = review.rating.to_string();
            let date = review.date.to_rfc3339();
            let notified = review.notified.to_string();
            writer
                .write_record([
                    review.id.as_str(),
                    rating.as_str(),
                    review.text.as_str(),
                    review.author.as_str(),
                    review.device.as_str(),
                    date.as_str(),
                    notified.as_str(),
                ])
                .with_context(|| format!("Failed to write record {}", review.id))?;
        }

        writer.flush().context("Failed to flush state file")?;
        Ok(())
    }
}

/// Fields that could not be parsed and were replaced by defaults
#[derive(Debug, Default)]
struct LenientRead {
    defaulted: usize,
}

impl LenientRead {
    /// Decode column `idx`, replacing invalid UTF-8. `None` when the row is too short.
    fn field(&mut self, row: &ByteRecord, idx: usize, line: u64) -> Option<String> {
        let bytes = row.get(idx)?;
        Some(match String::from_utf8_lossy(bytes) {
            Cow::Borrowed(s) => s.to_string(),
            Cow::Owned(s) => {
                warn!(line, column = HEADER[idx], "Invalid UTF-8 in state file, replacing");
                self.defaulted += 1;
                s
            }
        })
    }

    fn parse_row(&mut self, row: &ByteRecord, line: u64) -> Option<Review> {
        let Some(id) = self.field(row, 0, line).filter(|id| !id.is_empty()) else {
            warn!(line, "Skipping state row without review ID");
            return None;
        };

        let missing = HEADER.len().saturating_sub(row.len());
        if missing > 0 {
            warn!(line, id = %id, columns = row.len(), "Short row in state file, defaulting missing columns");
            self.defaulted += missing;
        }

        let rating = match self.field(row, 1, line) {
            Some(value) => value.trim().parse::<u8>().unwrap_or_else(|_| {
                warn!(line, id = %id, value = %value, "Unparseable rating, using 0");
                self.defaulted += 1;
                0
            }),
            None => 0,
        };

        let date = match self.field(row, 5, line) {
            Some(value) => DateTime::parse_from_rfc3339(value.trim())
                .map(|d| d.with_timezone(&Utc))
                .unwrap_or_else(|_| {
                    warn!(line, id = %id, value = %value, "Unparseable date, using epoch");
                    self.defaulted += 1;
                    DateTime::<Utc>::UNIX_EPOCH
                }),
            None => DateTime::<Utc>::UNIX_EPOCH,
        };

        let notified = match self.field(row, 6, line) {
            Some(value) => parse_bool(&value).unwrap_or_else(|| {
                warn!(line, id = %id, value = %value, "Unparseable notified flag, using false");
                self.defaulted += 1;
                false
            }),
            None => false,
        };

        Some(Review {
            rating,
            text: self.field(row, 2, line).unwrap_or_default(),
            author: self.field(row, 3, line).unwrap_or_default(),
            device: self.field(row, 4, line).unwrap_or_default(),
            date,
            notified,
            id,
        })
    }
}

/// Accepts the boolean spellings older state files were written with
fn parse_bool(value: &str) -> Option<bool> {
    match value.trim() {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

impl Ledger for CsvLedger {
    fn load(&self) -> Result<ReviewSet> {
        if !self.path.exists() {
            info!(path = %self.path.display(), "State file not found, starting empty");
            return Ok(ReviewSet::new());
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)
            .with_context(|| format!("Failed to open state file: {}", self.path.display()))?;

        let mut lenient = LenientRead::default();
        let mut reviews = ReviewSet::new();

        for result in reader.byte_records() {
            let row = result
                .with_context(|| format!("Failed to read state file: {}", self.path.display()))?;
            let line = row.position().map_or(0, |p| p.line());
            if let Some(review) = lenient.parse_row(&row, line) {
                reviews.upsert(review);
            }
        }

        if lenient.defaulted > 0 {
            warn!(
                path = %self.path.display(),
                defaulted = lenient.defaulted,
                "State file contained unparseable fields"
            );
        }

        info!(count = reviews.len(), "Found existing reviews in state file");

        Ok(reviews)
    }

    fn save(&self, reviews: &ReviewSet) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;

        let mut tmp = NamedTempFile::new_in(&dir)
            .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;

        self.write_to(&mut tmp, reviews)?;

        tmp.as_file_mut()
            .flush()
            .and_then(|_| tmp.as_file().sync_all())
            .context("Failed to sync state file")?;

        tmp.persist(&self.path)
            .with_context(|| format!("Failed to replace state file: {}", self.path.display()))?;

        debug!(path = %self.path.display(), count = reviews.len(), "Saved review state");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn review(id: &str, notified: bool) -> Review {
        Review {
            id: id.to_string(),
            rating: 4,
            text: "Works, mostly".to_string(),
            author: "Ada \"Quotes\" Lovelace".to_string(),
            device: "Pixel 8".to_string(),
            date: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            notified,
        }
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let ledger = CsvLedger::new(dir.path().join("reviews.csv"));

        assert!(ledger.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let ledger = CsvLedger::new(dir.path().join("reviews.csv"));

        let set: ReviewSet = vec![review("a", true), review("b", false)]
            .into_iter()
            .collect();
        ledger.save(&set).unwrap();

        let loaded = ledger.load().unwrap();
        assert_eq!(loaded, set);
    }

    #[test]
    fn test_save_writes_header_and_rfc3339() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reviews.csv");
        let ledger = CsvLedger::new(&path);

        ledger.save(&[review("a", true)].into_iter().collect()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next(),
            Some("Review ID,Rating,Review Text,Author,Device,Date,Notified")
        );
        let row = lines.next().unwrap();
        assert!(row.starts_with("a,4,\"Works, mostly\","));
        assert!(row.ends_with("2023-11-14T22:13:20+00:00,true"));
    }

    #[test]
    fn test_save_overwrites_previous_content() {
        let dir = tempdir().unwrap();
        let ledger = CsvLedger::new(dir.path().join("reviews.csv"));

        ledger
            .save(&[review("a", true), review("b", true)].into_iter().collect())
            .unwrap();
        ledger.save(&[review("c", false)].into_iter().collect()).unwrap();

        let loaded = ledger.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded.get("c").is_some());
    }

    #[test]
    fn test_save_creates_parent_directory() {
        let dir = tempdir().unwrap();
        let ledger = CsvLedger::new(dir.path().join("state/nested/reviews.csv"));

        ledger.save(&ReviewSet::new()).unwrap();

        assert!(ledger.path().exists());
        assert!(ledger.load().unwrap().is_empty());
    }

    #[test]
    fn test_lenient_load_defaults_bad_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reviews.csv");
        fs::write(
            &path,
            "Review ID,Rating,Review Text,Author,Device,Date,Notified\n\
             good,5,Great,Bob,Pixel,2024-01-02T03:04:05Z,true\n\
             bad,five,Meh,Eve,Unknown,yesterday,maybe\n\
             short,3\n\
             ,2,no id,Ann,Pixel,2024-01-02T03:04:05Z,true\n",
        )
        .unwrap();

        let loaded = CsvLedger::new(&path).load().unwrap();
        assert_eq!(loaded.len(), 3);

        let good = loaded.get("good").unwrap();
        assert_eq!(good.rating, 5);
        assert!(good.notified);

        let bad = loaded.get("bad").unwrap();
        assert_eq!(bad.rating, 0);
        assert_eq!(bad.date, DateTime::<Utc>::UNIX_EPOCH);
        assert!(!bad.notified);
        assert_eq!(bad.text, "Meh");

        let short = loaded.get("short").unwrap();
        assert_eq!(short.rating, 3);
        assert_eq!(short.text, "");
        assert_eq!(short.device, "");
        assert_eq!(short.date, DateTime::<Utc>::UNIX_EPOCH);
        assert!(!short.notified);
    }

    #[test]
    fn test_short_row_survives_load_and_save() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reviews.csv");
        fs::write(
            &path,
            "Review ID,Rating,Review Text,Author,Device,Date,Notified\n\
             keep,5,Great,Bob,Pixel,2024-01-02T03:04:05Z,true\n\
             legacy,4,Nice,Ann,Pixel,2024-01-02T03:04:05Z\n",
        )
        .unwrap();

        let ledger = CsvLedger::new(&path);
        let loaded = ledger.load().unwrap();
        ledger.save(&loaded).unwrap();

        let reloaded = ledger.load().unwrap();
        assert_eq!(reloaded.len(), 2);
        let legacy = reloaded.get("legacy").unwrap();
        assert_eq!(legacy.rating, 4);
        assert_eq!(legacy.text, "Nice");
        assert_eq!(legacy.author, "Ann");
        assert_eq!(legacy.date, Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap());
        assert!(!legacy.notified);
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reviews.csv");
        let mut content =
            b"Review ID,Rating,Review Text,Author,Device,Date,Notified\n".to_vec();
        content.extend_from_slice(b"r1,5,caf\xE9,Bob,Pixel,2024-01-02T03:04:05Z,true\n");
        content.extend_from_slice(b"r2,3,plain,Eve,Pixel,2024-01-02T03:04:05Z,false\n");
        fs::write(&path, content).unwrap();

        let loaded = CsvLedger::new(&path).load().unwrap();
        assert_eq!(loaded.len(), 2);

        let r1 = loaded.get("r1").unwrap();
        assert_eq!(r1.text, "caf\u{FFFD}");
        assert!(r1.notified);
        assert_eq!(loaded.get("r2").unwrap().text, "plain");
    }

    #[test]
    fn test_header_only_file_is_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reviews.csv");
        fs::write(&path, "Review ID,Rating,Review Text,Author,Device,Date,Notified\n").unwrap();

        assert!(CsvLedger::new(&path).load().unwrap().is_empty());
    }
}
