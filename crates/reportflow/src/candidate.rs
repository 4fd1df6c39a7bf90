use std::sync::OnceLock;

use chrono::{Datelike, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Business category a weekly report belongs to.
///
/// Fixed-slot uploads always process in `SLOT_ORDER`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "DEV", alias = "Development")]
    Dev,
    #[serde(rename = "EPC")]
    Epc,
    #[serde(rename = "Finance", alias = "FINANCE")]
    Finance,
    #[serde(rename = "Investment", alias = "INVESTMENT")]
    Investment,
}

/// Deterministic processing order for the fixed-slot upload form.
pub const SLOT_ORDER: [Category; 4] = [
    Category::Dev,
    Category::Epc,
    Category::Finance,
    Category::Investment,
];

impl Category {
    /// Raw tag used in filenames and `override_category` query params.
    pub fn as_override(&self) -> &'static str {
        match self {
            Category::Dev => "DEV",
            Category::Epc => "EPC",
            Category::Finance => "FINANCE",
            Category::Investment => "INVESTMENT",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Category::Dev => "Development",
            Category::Epc => "EPC",
            Category::Finance => "Finance",
            Category::Investment => "Investment",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// How the backend should parse the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseMode {
    Simple,
    Ai,
}

impl ParseMode {
    /// Value of the backend's `use_llm` query parameter.
    pub fn use_llm(&self) -> bool {
        matches!(self, ParseMode::Ai)
    }
}

/// Validated calendar-week label of the form `CW01`..`CW53`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CwLabel(String);

impl CwLabel {
    pub fn parse(label: &str) -> Result<Self, ConfigError> {
        let re = cw_label_re();
        let invalid = || ConfigError::InvalidWeekLabel {
            label: label.to_string(),
        };
        let caps = re.captures(label).ok_or_else(invalid)?;
        let week: u8 = caps[1].parse().map_err(|_| invalid())?;
        if !(1..=53).contains(&week) {
            return Err(invalid());
        }
        Ok(Self(format!("CW{week:02}")))
    }

    pub fn from_week(week: u8) -> Result<Self, ConfigError> {
        Self::parse(&format!("CW{week:02}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn week(&self) -> u8 {
        // Validated in the constructors.
        self.0[2..].parse().unwrap_or(0)
    }
}

impl std::fmt::Display for CwLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CwLabel {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CwLabel> for String {
    fn from(label: CwLabel) -> Self {
        label.0
    }
}

/// A file staged for upload: name, raw bytes and MIME type.
///
/// The MIME type is guessed from the filename when not supplied by the host.
#[derive(Debug, Clone)]
pub struct FilePayload {
    pub name: String,
    pub bytes: Vec<u8>,
    pub mime_type: Option<String>,
}

impl FilePayload {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let mime_type = mime_guess::from_path(&name).first().map(|m| m.to_string());
        Self {
            name,
            bytes,
            mime_type,
        }
    }

    pub fn with_mime(name: impl Into<String>, bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bytes,
            mime_type: Some(mime_type.into()),
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Lowercased extension without the dot, if any.
    pub fn extension(&self) -> Option<String> {
        std::path::Path::new(&self.name)
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
    }
}

/// A file staged for ingestion under a category and reporting period.
///
/// Immutable once handed to the pipeline.
#[derive(Debug, Clone)]
pub struct UploadCandidate {
    pub category: Category,
    pub file: FilePayload,
    pub target_year: i32,
    pub week: CwLabel,
    pub parse_mode: ParseMode,
}

impl UploadCandidate {
    pub fn new(
        category: Category,
        file: FilePayload,
        target_year: i32,
        week: CwLabel,
        parse_mode: ParseMode,
    ) -> Self {
        Self {
            category,
            file,
            target_year,
            week,
            parse_mode,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file.name
    }
}

/// Report metadata recovered from a filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFileMeta {
    pub year: i32,
    pub week: CwLabel,
    pub category: Category,
}

fn cw_label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^CW(\d{2})$").expect("static regex"))
}

fn strict_filename_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(?P<year>\d{4})_CW(?P<cw>\d{2})_(?P<cat>DEV|EPC|FINANCE|INVESTMENT)\.docx$")
            .expect("static regex")
    })
}

fn loose_cw_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)CW(\d{1,2})").expect("static regex"))
}

fn year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(20\d{2})\b").expect("static regex"))
}

const CATEGORY_ALIASES: &[(&str, Category)] = &[
    (r"(?i)(?:^|[^a-zA-Z])(DEV|DEVELOPMENT)(?:[^a-zA-Z]|$)", Category::Dev),
    (r"(?i)(?:^|[^a-zA-Z])(EPC)(?:[^a-zA-Z]|$)", Category::Epc),
    (
        r"(?i)(?:^|[^a-zA-Z])(FINANCE|FINANCIAL|FIN)(?:[^a-zA-Z]|$)",
        Category::Finance,
    ),
    (
        r"(?i)(?:^|[^a-zA-Z])(INVESTMENT|INVEST|INV)(?:[^a-zA-Z]|$)",
        Category::Investment,
    ),
];

fn category_res() -> &'static Vec<(Regex, Category)> {
    static RES: OnceLock<Vec<(Regex, Category)>> = OnceLock::new();
    RES.get_or_init(|| {
        CATEGORY_ALIASES
            .iter()
            .map(|(pattern, category)| (Regex::new(pattern).expect("static regex"), *category))
            .collect()
    })
}

/// Extracts year, calendar week and category from a report filename.
///
/// Tries the strict `YYYY_CWnn_CATEGORY.docx` form first, then falls back to
/// finding `CW##`, a category alias and a `20xx` year anywhere in the name.
/// A missing year falls back to the current year; a missing week or category
/// is an error.
pub fn parse_report_filename(filename: &str) -> Result<ReportFileMeta, ConfigError> {
    if let Some(caps) = strict_filename_re().captures(filename) {
        let year: i32 = caps["year"].parse().expect("digits");
        let week = CwLabel::parse(&format!("CW{}", &caps["cw"]))?;
        let category = match caps["cat"].to_ascii_uppercase().as_str() {
            "DEV" => Category::Dev,
            "EPC" => Category::Epc,
            "FINANCE" => Category::Finance,
            _ => Category::Investment,
        };
        return Ok(ReportFileMeta {
            year,
            week,
            category,
        });
    }

    let cw = loose_cw_re()
        .captures(filename)
        .ok_or_else(|| ConfigError::UnparsableFilename {
            filename: filename.to_string(),
            reason: "no calendar week (CW##) found".to_string(),
        })?;
    let week_num: u8 = cw[1].parse().map_err(|_| ConfigError::UnparsableFilename {
        filename: filename.to_string(),
        reason: "calendar week out of range".to_string(),
    })?;
    let week = CwLabel::from_week(week_num).map_err(|_| ConfigError::UnparsableFilename {
        filename: filename.to_string(),
        reason: "calendar week out of range".to_string(),
    })?;

    let category = category_res()
        .iter()
        .find(|(re, _)| re.is_match(filename))
        .map(|(_, category)| *category)
        .ok_or_else(|| ConfigError::UnparsableFilename {
            filename: filename.to_string(),
            reason: "no category (DEV, EPC, FINANCE, INVESTMENT) found".to_string(),
        })?;

    let year = year_re()
        .captures(filename)
        .map(|caps| caps[1].parse().expect("digits"))
        .unwrap_or_else(|| Utc::now().year());

    Ok(ReportFileMeta {
        year,
        week,
        category,
    })
}
