//! Free-form bulk import.
//!
//! Takes an arbitrary pile of files, keeps the Word documents, recovers
//! year, week and category from each filename and feeds the survivors
//! through the regular pipeline. Files the parser cannot place are
//! reported back instead of being silently dropped.

use serde::Serialize;
use tracing::{info, warn};

use crate::candidate::{
    parse_report_filename, Category, CwLabel, FilePayload, ParseMode, UploadCandidate,
};
use crate::summary::UploadSummary;

use super::runner::UploadPipeline;

const SUPPORTED_EXTENSIONS: &[&str] = &["docx"];

/// Values applied to every file in a bulk run, overriding whatever the
/// filename says.
#[derive(Debug, Clone, Default)]
pub struct ImportOverrides {
    pub year: Option<i32>,
    pub week: Option<CwLabel>,
    pub category: Option<Category>,
    pub parse_mode: Option<ParseMode>,
}

/// A file excluded from the run before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedFile {
    pub file_name: String,
    pub reason: String,
}

/// Result of a bulk run: the pipeline summary plus everything that never
/// entered the pipeline.
#[derive(Debug)]
pub struct BulkImportReport {
    pub summary: UploadSummary,
    pub skipped: Vec<SkippedFile>,
}

/// Plans and runs bulk imports on top of an [`UploadPipeline`].
pub struct BulkImportCoordinator {
    pipeline: UploadPipeline,
}

impl BulkImportCoordinator {
    pub fn new(pipeline: UploadPipeline) -> Self {
        Self { pipeline }
    }

    /// Splits files into upload candidates and skipped files without
    /// touching the network.
    pub fn plan(
        files: Vec<FilePayload>,
        overrides: &ImportOverrides,
    ) -> (Vec<UploadCandidate>, Vec<SkippedFile>) {
        let mut candidates = Vec::new();
        let mut skipped = Vec::new();
        let parse_mode = overrides.parse_mode.unwrap_or(ParseMode::Simple);

        for file in files {
            match file.extension() {
                Some(ext) if SUPPORTED_EXTENSIONS.contains(&ext.as_str()) => {}
                _ => {
                    skipped.push(SkippedFile {
                        file_name: file.name.clone(),
                        reason: "unsupported file type, expected .docx".to_string(),
                    });
                    continue;
                }
            }

            let needs_parsing =
                overrides.year.is_none() || overrides.week.is_none() || overrides.category.is_none();
            let meta = if needs_parsing {
                match parse_report_filename(&file.name) {
                    Ok(meta) => Some(meta),
                    Err(e) => {
                        warn!(file = %file.name, error = %e, "Skipping file in bulk import");
                        skipped.push(SkippedFile {
                            file_name: file.name.clone(),
                            reason: e.to_string(),
                        });
                        continue;
                    }
                }
            } else {
                None
            };

            let year = overrides
                .year
                .or_else(|| meta.as_ref().map(|m| m.year))
                .unwrap_or_default();
            let week = overrides
                .week
                .clone()
                .or_else(|| meta.as_ref().map(|m| m.week.clone()));
            let category = overrides.category.or_else(|| meta.as_ref().map(|m| m.category));
            let (Some(week), Some(category)) = (week, category) else {
                // Unreachable in practice: parse succeeds or the file is
                // already skipped, and overrides fill the rest.
                skipped.push(SkippedFile {
                    file_name: file.name.clone(),
                    reason: "could not determine week or category".to_string(),
                });
                continue;
            };

            candidates.push(UploadCandidate::new(category, file, year, week, parse_mode));
        }
        (candidates, skipped)
    }

    /// Plans and runs a bulk import.
    pub async fn run(
        &self,
        files: Vec<FilePayload>,
        overrides: &ImportOverrides,
    ) -> BulkImportReport {
        let total = files.len();
        let (candidates, skipped) = Self::plan(files, overrides);
        info!(
            total,
            planned = candidates.len(),
            skipped = skipped.len(),
            "Bulk import planned"
        );
        let summary = self.pipeline.run(candidates).await;
        BulkImportReport { summary, skipped }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str) -> FilePayload {
        FilePayload::new(name, vec![0u8; 4])
    }

    #[test]
    fn test_plan_filters_non_docx() {
        let (candidates, skipped) = BulkImportCoordinator::plan(
            vec![file("2025_CW01_DEV.docx"), file("notes.txt"), file("report.pdf")],
            &ImportOverrides::default(),
        );
        assert_eq!(candidates.len(), 1);
        assert_eq!(skipped.len(), 2);
        assert!(skipped[0].reason.contains("unsupported"));
    }

    #[test]
    fn test_plan_skips_unparsable_names() {
        let (candidates, skipped) = BulkImportCoordinator::plan(
            vec![file("2025_CW01_DEV.docx"), file("random_notes.docx")],
            &ImportOverrides::default(),
        );
        assert_eq!(candidates.len(), 1);
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].file_name, "random_notes.docx");
    }

    #[test]
    fn test_plan_applies_overrides() {
        let overrides = ImportOverrides {
            year: Some(2024),
            week: Some(CwLabel::parse("CW09").unwrap()),
            category: Some(Category::Finance),
            parse_mode: Some(ParseMode::Ai),
        };
        // With full overrides even an unparsable name goes through.
        let (candidates, skipped) =
            BulkImportCoordinator::plan(vec![file("whatever.docx")], &overrides);
        assert!(skipped.is_empty());
        let candidate = &candidates[0];
        assert_eq!(candidate.target_year, 2024);
        assert_eq!(candidate.week.as_str(), "CW09");
        assert_eq!(candidate.category, Category::Finance);
        assert_eq!(candidate.parse_mode, ParseMode::Ai);
    }

    #[test]
    fn test_plan_partial_override_still_parses_filename() {
        let overrides = ImportOverrides {
            year: Some(2023),
            ..ImportOverrides::default()
        };
        let (candidates, _) =
            BulkImportCoordinator::plan(vec![file("2025_CW14_EPC.docx")], &overrides);
        let candidate = &candidates[0];
        assert_eq!(candidate.target_year, 2023);
        assert_eq!(candidate.week.as_str(), "CW14");
        assert_eq!(candidate.category, Category::Epc);
    }
}
