//! Teaching corpus loading.
//!
//! Every file with the configured extension in the corpus directory becomes
//! one `TeachingRecord`. The teaching number and title come from the first
//! heading that the injected `HeadingRule` recognizes.

use crate::types::TeachingRecord;
use regex::Regex;
use sage_core::config::RagSettings;
use sage_core::{AppError, AppResult, CorpusError};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Heading pattern used when `rag.heading_pattern` is not set.
///
/// Matches `# Teaching #12: Title`, `# 12. Title`, and `## #12 - Title`.
pub const DEFAULT_HEADING_PATTERN: &str =
    r"(?mi)^#{1,6}[ \t]*(?:teaching[ \t]*)?#?[ \t]*(?P<number>\d+)[ \t]*[:.\-][ \t]*(?P<title>.+?)[ \t]*\r?$";

/// Number and title extracted from a teaching heading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub number: u32,
    pub title: String,
}

/// Recognizes the heading that identifies a teaching.
pub trait HeadingRule: Send + Sync {
    /// Extract the teaching heading from a document.
    ///
    /// Returns `Ok(None)` when the document has no recognizable heading, and
    /// an error message when a heading is found but its fields are invalid.
    fn extract(&self, contents: &str) -> Result<Option<Heading>, String>;
}

/// Regex heading rule with named groups `number` and `title`.
#[derive(Debug, Clone)]
pub struct RegexHeadingRule {
    pattern: Regex,
}

impl RegexHeadingRule {
    /// Compile a heading rule from a pattern.
    ///
    /// # Errors
    /// Returns a configuration error if the pattern does not compile or lacks
    /// the `number` or `title` group.
    pub fn new(pattern: &str) -> AppResult<Self> {
        let pattern = Regex::new(pattern)
            .map_err(|e| AppError::Config(format!("Invalid rag.heading_pattern: {}", e)))?;

        for group in ["number", "title"] {
            if !pattern.capture_names().flatten().any(|name| name == group) {
                return Err(AppError::Config(format!(
                    "rag.heading_pattern must define a named group '{}'",
                    group
                )));
            }
        }

        Ok(Self { pattern })
    }

    /// The rule for `DEFAULT_HEADING_PATTERN`.
    pub fn standard() -> AppResult<Self> {
        Self::new(DEFAULT_HEADING_PATTERN)
    }

    /// Build the rule named by the settings, or the default rule.
    pub fn from_settings(settings: &RagSettings) -> AppResult<Self> {
        Self::new(
            settings
                .heading_pattern
                .as_deref()
                .unwrap_or(DEFAULT_HEADING_PATTERN),
        )
    }
}

impl HeadingRule for RegexHeadingRule {
    fn extract(&self, contents: &str) -> Result<Option<Heading>, String> {
        let Some(captures) = self.pattern.captures(contents) else {
            return Ok(None);
        };

        let raw_number = captures.name("number").map(|m| m.as_str()).unwrap_or_default();
        let number: u32 = raw_number
            .trim()
            .parse()
            .map_err(|_| format!("teaching number '{}' is not a valid integer", raw_number))?;
        if number == 0 {
            return Err("teaching number must be positive".to_string());
        }

        let title = captures
            .name("title")
            .map(|m| m.as_str().trim())
            .unwrap_or_default();
        if title.is_empty() {
            return Err(format!("teaching #{} has an empty title", number));
        }

        Ok(Some(Heading {
            number,
            title: title.to_string(),
        }))
    }
}

/// Which files in the corpus directory are teachings.
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// File extension without the dot
    pub extension: String,

    /// Descend into subdirectories
    pub recursive: bool,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            extension: "md".to_string(),
            recursive: false,
        }
    }
}

impl From<&RagSettings> for LoaderOptions {
    fn from(settings: &RagSettings) -> Self {
        Self {
            extension: settings.file_extension.trim_start_matches('.').to_string(),
            recursive: settings.recursive,
        }
    }
}

/// List the teaching files in `dir`, sorted by path.
pub fn discover_files(dir: &Path, options: &LoaderOptions) -> Result<Vec<PathBuf>, CorpusError> {
    if !dir.is_dir() {
        return Err(CorpusError::MissingDirectory(dir.to_path_buf()));
    }

    let max_depth = if options.recursive { usize::MAX } else { 1 };
    let mut files = Vec::new();

    for entry in WalkDir::new(dir)
        .max_depth(max_depth)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| CorpusError::Unreadable {
            path: e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf()),
            reason: e.to_string(),
        })?;

        let path = entry.path();
        let matches_extension = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(&options.extension));

        if entry.file_type().is_file() && matches_extension {
            files.push(path.to_path_buf());
        }
    }

    Ok(files)
}

/// Load every teaching in `dir`, sorted by teaching number.
///
/// # Errors
/// - `CorpusError::MissingDirectory` if `dir` is not a directory
/// - `CorpusError::Empty` if no file matches the extension
/// - `CorpusError::Unreadable` if a file cannot be read as UTF-8
/// - `CorpusError::Malformed` if a file has no valid heading
/// - `CorpusError::DuplicateTeaching` if two files declare the same number
pub fn load_teachings(
    dir: &Path,
    rule: &dyn HeadingRule,
    options: &LoaderOptions,
) -> Result<Vec<TeachingRecord>, CorpusError> {
    let files = discover_files(dir, options)?;

    if files.is_empty() {
        return Err(CorpusError::Empty {
            dir: dir.to_path_buf(),
            extension: options.extension.clone(),
        });
    }

    tracing::debug!("Found {} teaching files in {:?}", files.len(), dir);

    let mut records = Vec::with_capacity(files.len());
    let mut seen: HashMap<u32, PathBuf> = HashMap::new();

    for path in files {
        let body = fs::read_to_string(&path).map_err(|e| CorpusError::Unreadable {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        let heading = rule
            .extract(&body)
            .map_err(|reason| CorpusError::Malformed {
                path: path.clone(),
                reason,
            })?
            .ok_or_else(|| CorpusError::Malformed {
                path: path.clone(),
                reason: "no teaching heading found".to_string(),
            })?;

        if let Some(first) = seen.get(&heading.number) {
            return Err(CorpusError::DuplicateTeaching {
                number: heading.number,
                first: first.clone(),
                second: path,
            });
        }
        seen.insert(heading.number, path.clone());

        tracing::debug!("Loaded teaching #{}: {}", heading.number, heading.title);

        records.push(TeachingRecord {
            number: heading.number,
            title: heading.title,
            body,
            path,
        });
    }

    records.sort_by_key(|record| record.number);

    tracing::info!("Loaded {} teachings from {:?}", records.len(), dir);

    Ok(records)
}
