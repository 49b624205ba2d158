//! File selection and ownership of all per-file and per-line aggregates.

mod source_file;

pub use source_file::{SourceFile, SourceLine};

use crate::error::{Error, Result};
use regex::Regex;
use std::collections::HashMap;
use std::fmt;

/// Which files a session tracks.
#[derive(Debug, Clone)]
pub enum Selector {
    /// Exactly one file, matched by identifier equality.
    Exact(String),
    /// Every file whose identifier matches the pattern.
    Pattern(Regex),
}

impl Selector {
    pub fn exact(identifier: impl Into<String>) -> Result<Self> {
        let identifier = identifier.into();
        if identifier.is_empty() {
            return Err(Error::InvalidSelector(
                "file identifier must not be empty".to_string(),
            ));
        }
        Ok(Selector::Exact(identifier))
    }

    pub fn pattern(expr: &str) -> Result<Self> {
        if expr.is_empty() {
            return Err(Error::InvalidSelector("pattern must not be empty".to_string()));
        }
        Regex::new(expr)
            .map(Selector::Pattern)
            .map_err(|e| Error::InvalidSelector(format!("bad pattern '{}': {}", expr, e)))
    }

    /// Parse the textual form: `/expr/` is a pattern, anything else an exact
    /// identifier.
    pub fn parse(s: &str) -> Result<Self> {
        match s.strip_prefix('/').and_then(|rest| rest.strip_suffix('/')) {
            Some(expr) => Self::pattern(expr),
            None if s == "/" => Err(Error::InvalidSelector("pattern must not be empty".to_string())),
            None => Self::exact(s),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Exact(identifier) => f.write_str(identifier),
            Selector::Pattern(regex) => write!(f, "/{}/", regex.as_str()),
        }
    }
}

impl std::str::FromStr for Selector {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Selector::parse(s)
    }
}

/// Conversion into a validated `Selector` at session start.
pub trait IntoSelector {
    fn into_selector(self) -> Result<Selector>;
}

impl IntoSelector for Selector {
    fn into_selector(self) -> Result<Selector> {
        Ok(self)
    }
}

impl IntoSelector for Regex {
    fn into_selector(self) -> Result<Selector> {
        if self.as_str().is_empty() {
            return Err(Error::InvalidSelector("pattern must not be empty".to_string()));
        }
        Ok(Selector::Pattern(self))
    }
}

impl IntoSelector for &str {
    fn into_selector(self) -> Result<Selector> {
        Selector::parse(self)
    }
}

impl IntoSelector for String {
    fn into_selector(self) -> Result<Selector> {
        Selector::parse(&self)
    }
}

/// Index of a tracked file within the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileId(usize);

/// Pattern-mode classification of a file identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEntry {
    /// The pattern was evaluated and did not match.
    NotMatched,
    Tracked(FileId),
}

#[derive(Debug)]
enum Mode {
    Unconfigured,
    Exact {
        identifier: String,
        file: Option<FileId>,
    },
    Pattern {
        regex: Regex,
        entries: HashMap<String, FileEntry>,
    },
}

/// Resolves file identifiers to tracked-file records and owns the records.
#[derive(Debug)]
pub struct FileRegistry {
    mode: Mode,
    files: Vec<SourceFile>,
    line_headroom: usize,
    pattern_evaluations: u64,
}

impl FileRegistry {
    /// An unconfigured registry; every lookup misses until `configure`.
    pub fn new(line_headroom: usize) -> Self {
        FileRegistry {
            mode: Mode::Unconfigured,
            files: Vec::new(),
            line_headroom,
            pattern_evaluations: 0,
        }
    }

    /// Switch to `selector`, discarding every record.
    pub fn configure(&mut self, selector: Selector) {
        self.reset();
        self.mode = match selector {
            Selector::Exact(identifier) => Mode::Exact {
                identifier,
                file: None,
            },
            Selector::Pattern(regex) => Mode::Pattern {
                regex,
                entries: HashMap::new(),
            },
        };
    }

    /// Drop all records and tombstones, keeping the selector.
    pub fn reset(&mut self) {
        self.files.clear();
        self.pattern_evaluations = 0;
        match &mut self.mode {
            Mode::Unconfigured => {}
            Mode::Exact { file, .. } => *file = None,
            Mode::Pattern { entries, .. } => entries.clear(),
        }
    }

    /// Tracked record for `identifier`, creating it on first sight.
    pub fn lookup(&mut self, identifier: &str) -> Option<FileId> {
        let FileRegistry {
            mode,
            files,
            pattern_evaluations,
            ..
        } = self;

        match mode {
            Mode::Unconfigured => None,
            Mode::Exact {
                identifier: expected,
                file,
            } => {
                if expected.as_str() != identifier {
                    return None;
                }
                Some(*file.get_or_insert_with(|| insert(files, identifier)))
            }
            Mode::Pattern { regex, entries } => {
                if let Some(entry) = entries.get(identifier) {
                    return match entry {
                        FileEntry::NotMatched => None,
                        FileEntry::Tracked(id) => Some(*id),
                    };
                }

                *pattern_evaluations += 1;
                let entry = if regex.is_match(identifier) {
                    FileEntry::Tracked(insert(files, identifier))
                } else {
                    FileEntry::NotMatched
                };
                tracing::trace!(file = identifier, ?entry, "classified file");
                entries.insert(identifier.to_owned(), entry);

                match entry {
                    FileEntry::NotMatched => None,
                    FileEntry::Tracked(id) => Some(id),
                }
            }
        }
    }

    /// Classification recorded for `identifier` in pattern mode, if any.
    pub fn entry(&self, identifier: &str) -> Option<FileEntry> {
        match &self.mode {
            Mode::Pattern { entries, .. } => entries.get(identifier).copied(),
            _ => None,
        }
    }

    pub fn file(&self, id: FileId) -> &SourceFile {
        &self.files[id.0]
    }

    pub(crate) fn file_mut(&mut self, id: FileId) -> &mut SourceFile {
        &mut self.files[id.0]
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    pub fn line_headroom(&self) -> usize {
        self.line_headroom
    }

    /// Times the pattern has been evaluated since the last reset.
    pub fn pattern_evaluations(&self) -> u64 {
        self.pattern_evaluations
    }
}

fn insert(files: &mut Vec<SourceFile>, identifier: &str) -> FileId {
    files.push(SourceFile::new(identifier));
    FileId(files.len() - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_parse() {
        assert!(matches!(Selector::parse("a.rb").unwrap(), Selector::Exact(s) if s == "a.rb"));
        assert!(matches!(Selector::parse("/^app/.*\\.rb$/").unwrap(), Selector::Pattern(_)));
        assert!(matches!(Selector::parse(""), Err(Error::InvalidSelector(_))));
        assert!(matches!(Selector::parse("/"), Err(Error::InvalidSelector(_))));
        assert!(matches!(Selector::parse("//"), Err(Error::InvalidSelector(_))));
        assert!(matches!(Selector::parse("/(unclosed/"), Err(Error::InvalidSelector(_))));
    }

    #[test]
    fn test_selector_display_round_trips_pattern() {
        let selector = Selector::parse("/lib/").unwrap();
        assert_eq!(selector.to_string(), "/lib/");
        let Selector::Pattern(regex) = selector else {
            panic!("expected a pattern");
        };
        assert!(regex.is_match("src/lib/a.rb"));
        assert!(!regex.is_match("src/app/a.rb"));
    }

    #[test]
    fn test_exact_mode_single_record() {
        let mut registry = FileRegistry::new(100);
        registry.configure(Selector::exact("a.lib").unwrap());

        assert_eq!(registry.lookup("b.lib"), None);
        let first = registry.lookup("a.lib").expect("tracked");
        let second = registry.lookup("a.lib").expect("tracked");
        assert_eq!(first, second);
        assert_eq!(registry.files().len(), 1);
        assert_eq!(registry.file(first).name(), "a.lib");
        assert_eq!(registry.pattern_evaluations(), 0);
    }

    #[test]
    fn test_pattern_mode_negative_cache() {
        let mut registry = FileRegistry::new(100);
        registry.configure(Selector::pattern(r"^app/").unwrap());

        for _ in 0..5 {
            assert_eq!(registry.lookup("vendor/x.rb"), None);
        }
        assert_eq!(registry.pattern_evaluations(), 1);
        assert_eq!(registry.entry("vendor/x.rb"), Some(FileEntry::NotMatched));

        let a = registry.lookup("app/a.rb").expect("tracked");
        let b = registry.lookup("app/b.rb").expect("tracked");
        assert_ne!(a, b);
        assert_eq!(registry.lookup("app/a.rb"), Some(a));
        assert_eq!(registry.pattern_evaluations(), 3);
        assert_eq!(registry.files().len(), 2);
    }

    #[test]
    fn test_unconfigured_registry_tracks_nothing() {
        let mut registry = FileRegistry::new(100);
        assert_eq!(registry.lookup("a.rb"), None);
        assert!(registry.files().is_empty());
    }

    #[test]
    fn test_reset_drops_records_and_tombstones() {
        let mut registry = FileRegistry::new(100);
        registry.configure(Selector::pattern("a").unwrap());
        registry.lookup("a.rb");
        registry.lookup("b.rb");
        assert_eq!(registry.pattern_evaluations(), 2);

        registry.reset();
        assert!(registry.files().is_empty());
        assert_eq!(registry.entry("b.rb"), None);
        assert_eq!(registry.pattern_evaluations(), 0);

        registry.lookup("b.rb");
        assert_eq!(registry.pattern_evaluations(), 1);
    }

    #[test]
    fn test_into_selector() {
        assert!("a.rb".into_selector().is_ok());
        assert!(String::from("/x/").into_selector().is_ok());
        assert!(Regex::new("").unwrap().into_selector().is_err());
        assert!(matches!(
            "".into_selector(),
            Err(Error::InvalidSelector(_))
        ));
    }
}
