//! Query matching and content excerpts.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use burrow_core::{EngineError, EngineResult, Entry, Operation, extension_of};

/// Extensions content search is willing to open.
const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "md", "markdown", "rst", "log", "csv", "tsv", "json", "jsonl", "xml", "yaml", "yml",
    "toml", "ini", "cfg", "conf", "env", "properties", "html", "htm", "css", "scss", "sass",
    "less", "js", "mjs", "cjs", "jsx", "ts", "tsx", "vue", "svelte", "rs", "py", "rb", "go",
    "java", "kt", "kts", "scala", "swift", "c", "h", "cpp", "cc", "hpp", "cs", "php", "pl", "lua",
    "r", "sql", "sh", "bash", "zsh", "fish", "ps1", "bat", "cmd", "gradle", "dockerfile",
    "makefile", "tex", "srt", "vtt",
];

/// A lowercase substring query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    lowered: String,
}

impl Query {
    /// Parse a raw query. Blank queries are rejected.
    pub fn new(raw: &str) -> EngineResult<Self> {
        if raw.trim().is_empty() {
            return Err(EngineError::invalid("search query is empty"));
        }
        Ok(Self {
            lowered: raw.to_lowercase(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.lowered
    }

    /// Case-insensitive substring match on a name.
    pub fn matches_name(&self, name: &str) -> bool {
        name.to_lowercase().contains(&self.lowered)
    }

    /// Case-insensitive equality with a name.
    pub fn is_exact(&self, name: &str) -> bool {
        name.to_lowercase() == self.lowered
    }
}

/// Whether content search may open a file with this name.
pub fn is_text_file(name: &str) -> bool {
    match extension_of(name) {
        Some(ext) => TEXT_EXTENSIONS.contains(&ext.as_str()),
        None => {
            let lowered = name.to_ascii_lowercase();
            TEXT_EXTENSIONS.contains(&lowered.as_str())
        }
    }
}

/// Order name-search results: exact matches first, then by lowercase name.
pub fn rank_by_name(entries: &mut [Entry], query: &Query) {
    entries.sort_by_cached_key(|entry| {
        let lowered = entry.name.to_lowercase();
        (lowered != query.as_str(), lowered)
    });
}

/// A content hit: excerpt and 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentMatch {
    pub context: String,
    pub line_number: u32,
}

/// Scan `path` line by line for the first occurrence of `query`.
///
/// Files that cannot be opened or read yield `Ok(None)`. Lines that are not
/// valid UTF-8 are decoded lossily. Cancellation is checked per line.
pub fn find_in_file(
    path: &Path,
    query: &Query,
    context_chars: usize,
    op: &Operation,
) -> EngineResult<Option<ContentMatch>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) => {
            tracing::debug!(path = %path.display(), %err, "cannot open for content search");
            return Ok(None);
        }
    };

    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();
    let mut line_number = 0u32;
    loop {
        op.check()?;
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => return Ok(None),
            Ok(_) => {}
            Err(err) => {
                tracing::debug!(path = %path.display(), %err, "read failed during content search");
                return Ok(None);
            }
        }
        line_number = line_number.saturating_add(1);

        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(['\n', '\r']);
        if let Some(context) = excerpt(line, query, context_chars) {
            return Ok(Some(ContentMatch {
                context,
                line_number,
            }));
        }
    }
}

/// Build a trimmed excerpt around the first hit of `query` in `line`.
///
/// At most `context_chars` characters are kept on each side of the hit;
/// `...` marks a side that was cut short.
pub fn excerpt(line: &str, query: &Query, context_chars: usize) -> Option<String> {
    let lowered = line.to_lowercase();
    let start = lowered.find(query.as_str())?;
    let end = start + query.as_str().len();

    // lowercasing can change byte lengths; fall back to the lowered text then
    let source = if lowered.len() == line.len()
        && line.is_char_boundary(start)
        && line.is_char_boundary(end)
    {
        line
    } else {
        lowered.as_str()
    };

    let before = &source[..start];
    let hit = &source[start..end];
    let after = &source[end..];

    let before_chars = before.chars().count();
    let (prefix, from) = if before_chars > context_chars {
        let skip = before_chars - context_chars;
        let from = before
            .char_indices()
            .nth(skip)
            .map(|(i, _)| i)
            .unwrap_or(before.len());
        ("...", from)
    } else {
        ("", 0)
    };

    let to = after
        .char_indices()
        .nth(context_chars)
        .map(|(i, _)| i)
        .unwrap_or(after.len());
    let suffix = if to < after.len() { "..." } else { "" };

    let text = format!("{prefix}{}{hit}{}{suffix}", &before[from..], &after[..to]);
    Some(text.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(raw: &str) -> Query {
        Query::new(raw).unwrap()
    }

    #[test]
    fn test_blank_query_rejected() {
        assert!(matches!(Query::new("   "), Err(EngineError::InvalidInput { .. })));
    }

    #[test]
    fn test_excerpt_short_line_untouched() {
        let text = excerpt("  let Needle = 1;  ", &query("needle"), 60).unwrap();
        assert_eq!(text, "let Needle = 1;");
    }

    #[test]
    fn test_excerpt_truncates_both_sides() {
        let line = format!("{}needle{}", "a".repeat(100), "b".repeat(100));
        let text = excerpt(&line, &query("NEEDLE"), 60).unwrap();

        assert_eq!(text, format!("...{}needle{}...", "a".repeat(60), "b".repeat(60)));
    }

    #[test]
    fn test_excerpt_exact_boundary_has_no_marker() {
        let line = format!("{}needle{}", "a".repeat(60), "b".repeat(60));
        let text = excerpt(&line, &query("needle"), 60).unwrap();

        assert!(!text.contains("..."));
        assert_eq!(text.len(), 126);
    }

    #[test]
    fn test_excerpt_counts_characters() {
        let line = format!("{}needle", "é".repeat(70));
        let text = excerpt(&line, &query("needle"), 60).unwrap();

        assert!(text.starts_with("..."));
        assert_eq!(text.chars().count(), 3 + 60 + 6);
    }

    #[test]
    fn test_excerpt_miss() {
        assert!(excerpt("nothing here", &query("needle"), 60).is_none());
    }

    #[test]
    fn test_text_allow_list() {
        assert!(is_text_file("main.RS"));
        assert!(is_text_file("Makefile"));
        assert!(!is_text_file("photo.jpg"));
        assert!(!is_text_file("binary"));
    }

    #[test]
    fn test_find_in_file_line_number() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("notes.txt");
        std::fs::write(&path, "first\r\nsecond\nthe Needle line\nneedle again\n").unwrap();

        let hit = find_in_file(&path, &query("needle"), 60, &Operation::detached())
            .unwrap()
            .unwrap();
        assert_eq!(hit.line_number, 3);
        assert_eq!(hit.context, "the Needle line");
    }

    #[test]
    fn test_rank_exact_first() {
        let mut entries = vec![
            Entry::without_metadata("/x/report-final.txt", false),
            Entry::without_metadata("/x/Annual report.txt", false),
            Entry::without_metadata("/x/REPORT.TXT", false),
        ];
        rank_by_name(&mut entries, &query("report.txt"));

        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["REPORT.TXT", "Annual report.txt", "report-final.txt"]);
    }
}
