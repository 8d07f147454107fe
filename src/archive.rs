use chrono::{DateTime, Local};
use std::fs::{create_dir_all, read, write};
use std::path::PathBuf;

use crate::error::{ArchiveError, ConversionError};
use crate::report::{ReportDocument, markdown_to_html};

/// Record of one persisted report. At most one is created per archive call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub file_name: String,
    pub path: PathBuf,
    pub created_at: DateTime<Local>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArchiveMode {
    /// Never overwrite: a name collision gets a numeric disambiguator after
    /// the timestamp suffix.
    #[default]
    Append,
    /// Rewrite the same logical report in place (retry of the same run).
    Overwrite,
}

/// The only component allowed to write to the persistence layer: a flat
/// directory of reports, one primary markdown artifact per completed run,
/// with an optional HTML sibling sharing the base name.
#[derive(Debug, Clone)]
pub struct Archivist {
    reports_dir: PathBuf,
}

impl Archivist {
    pub fn new(reports_dir: impl Into<PathBuf>) -> Self {
        Archivist {
            reports_dir: reports_dir.into(),
        }
    }

    pub fn reports_dir(&self) -> &PathBuf {
        &self.reports_dir
    }

    /// Persists the document under a sanitized name derived from the hint
    /// plus the document's generation timestamp. Using the document's own
    /// timestamp (not the wall clock at write) makes a retry of the same
    /// report target the same file name.
    pub fn archive(
        &self,
        document: &ReportDocument,
        name_hint: &str,
        mode: ArchiveMode,
    ) -> Result<ArchiveEntry, ArchiveError> {
        create_dir_all(&self.reports_dir)?;

        let base = sanitize_name(name_hint)?;
        let stamp = document.generated_at().format("%Y%m%d_%H%M%S");
        let mut file_name = format!("{base}_{stamp}.md");

        if mode == ArchiveMode::Append {
            let mut counter = 1;
            while self.reports_dir.join(&file_name).exists() {
                file_name = format!("{base}_{stamp}_{counter}.md");
                counter += 1;
            }
        }

        let path = self.reports_dir.join(&file_name);
        write(&path, document.to_markdown())?;

        Ok(ArchiveEntry {
            file_name,
            path,
            created_at: Local::now(),
        })
    }

    /// Converts the already-written primary artifact to a distributable HTML
    /// sibling. A pure function of the file on disk; failure here never rolls
    /// back the markdown artifact.
    pub fn convert_to_html(&self, entry: &ArchiveEntry) -> Result<PathBuf, ConversionError> {
        let markdown = std::fs::read_to_string(&entry.path)?;
        let html = markdown_to_html(&markdown);
        let sibling = entry.path.with_extension("html");
        write(&sibling, html)?;
        Ok(sibling)
    }

    /// Reads back an archived artifact by file name, for the download
    /// endpoint. Names carrying path separators are rejected before any
    /// filesystem access.
    pub fn open(&self, file_name: &str) -> Result<Vec<u8>, ArchiveError> {
        if file_name.contains(['/', '\\']) || file_name.contains("..") {
            return Err(ArchiveError::InvalidName(file_name.to_string()));
        }
        let path = self.reports_dir.join(file_name);
        if !path.is_file() {
            return Err(ArchiveError::NotFound(file_name.to_string()));
        }
        Ok(read(path)?)
    }
}

/// Reduces a free-text hint to a filesystem-safe base name.
pub fn sanitize_name(hint: &str) -> Result<String, ArchiveError> {
    let mut base = String::new();
    let mut last_was_separator = true;
    for character in hint.chars() {
        if character.is_ascii_alphanumeric() {
            base.push(character);
            last_was_separator = false;
        } else if !last_was_separator {
            base.push('_');
            last_was_separator = true;
        }
    }
    let base = base.trim_matches('_').to_string();
    if base.is_empty() {
        return Err(ArchiveError::EmptyName(hint.to_string()));
    }
    Ok(base.chars().take(80).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Section;
    use tempfile::tempdir;

    fn document() -> ReportDocument {
        ReportDocument::new(
            "Player Report: Virat Kohli",
            vec![Section {
                heading: "Batting Statistics".to_string(),
                body: "| Matches | 292 |".to_string(),
            }],
        )
    }

    #[test]
    fn sanitizes_disallowed_characters() {
        assert_eq!(
            sanitize_name("India vs Australia: Final! (2023)").expect("name"),
            "India_vs_Australia_Final_2023"
        );
        assert!(sanitize_name("???").is_err());
    }

    #[test]
    fn archived_document_round_trips_byte_identical() {
        let dir = tempdir().expect("tempdir");
        let archivist = Archivist::new(dir.path());
        let document = document();
        let entry = archivist
            .archive(&document, "Virat Kohli", ArchiveMode::Append)
            .expect("archives");
        let read_back = archivist.open(&entry.file_name).expect("readable");
        assert_eq!(read_back, document.to_markdown().into_bytes());
    }

    #[test]
    fn overwrite_mode_is_idempotent_append_mode_is_not() {
        let dir = tempdir().expect("tempdir");
        let archivist = Archivist::new(dir.path());
        let document = document();

        let first = archivist
            .archive(&document, "Virat Kohli", ArchiveMode::Overwrite)
            .expect("archives");
        let second = archivist
            .archive(&document, "Virat Kohli", ArchiveMode::Overwrite)
            .expect("archives");
        assert_eq!(first.file_name, second.file_name);

        let third = archivist
            .archive(&document, "Virat Kohli", ArchiveMode::Append)
            .expect("archives");
        assert_ne!(third.file_name, first.file_name);
        let entries = std::fs::read_dir(dir.path()).expect("dir").count();
        assert_eq!(entries, 2);
    }

    #[test]
    fn conversion_failure_never_touches_the_primary_artifact() {
        let dir = tempdir().expect("tempdir");
        let archivist = Archivist::new(dir.path());
        let document = document();
        let entry = archivist
            .archive(&document, "Virat Kohli", ArchiveMode::Append)
            .expect("archives");

        let sibling = archivist.convert_to_html(&entry).expect("converts");
        assert_eq!(sibling.extension().and_then(|e| e.to_str()), Some("html"));
        let html = std::fs::read_to_string(sibling).expect("html");
        assert!(html.contains("<table>") || html.contains("292"));

        // Primary artifact untouched by conversion.
        let read_back = archivist.open(&entry.file_name).expect("readable");
        assert_eq!(read_back, document.to_markdown().into_bytes());
    }

    #[test]
    fn open_rejects_path_traversal() {
        let dir = tempdir().expect("tempdir");
        let archivist = Archivist::new(dir.path());
        assert!(matches!(
            archivist.open("../etc/passwd"),
            Err(ArchiveError::InvalidName(_))
        ));
        assert!(matches!(
            archivist.open("missing.md"),
            Err(ArchiveError::NotFound(_))
        ));
    }
}
