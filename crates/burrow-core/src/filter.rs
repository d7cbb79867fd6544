//! Caller-supplied search filters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::entry::{Entry, extension_of};

/// Broad class of entry a search should return.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum FileTypeClass {
    #[default]
    All,
    Files,
    Folders,
    Images,
    Documents,
    Video,
    Audio,
    Archives,
    Code,
}

impl FileTypeClass {
    /// Check whether an entry belongs to this class.
    pub fn accepts(&self, name: &str, is_directory: bool) -> bool {
        match self {
            Self::All => true,
            Self::Files => !is_directory,
            Self::Folders => is_directory,
            class => {
                !is_directory
                    && extension_of(name).is_some_and(|ext| classify(&ext) == Some(*class))
            }
        }
    }
}

/// Map a lowercase extension to its class.
pub fn classify(ext: &str) -> Option<FileTypeClass> {
    let class = match ext {
        "jpg" | "jpeg" | "png" | "gif" | "bmp" | "svg" | "webp" | "ico" | "tiff" | "tif"
        | "psd" | "raw" | "heic" | "heif" => FileTypeClass::Images,
        "doc" | "docx" | "pdf" | "txt" | "rtf" | "odt" | "xls" | "xlsx" | "ppt" | "pptx"
        | "csv" | "md" | "epub" => FileTypeClass::Documents,
        "mp4" | "mkv" | "avi" | "mov" | "wmv" | "flv" | "webm" | "m4v" | "mpg" | "mpeg" => {
            FileTypeClass::Video
        }
        "mp3" | "wav" | "flac" | "aac" | "ogg" | "wma" | "m4a" | "opus" => FileTypeClass::Audio,
        "zip" | "rar" | "7z" | "tar" | "gz" | "bz2" | "xz" | "zst" | "iso" | "dmg" => {
            FileTypeClass::Archives
        }
        "rs" | "py" | "js" | "ts" | "jsx" | "tsx" | "c" | "cpp" | "h" | "hpp" | "cs" | "java"
        | "go" | "rb" | "php" | "swift" | "kt" | "html" | "css" | "scss" | "json" | "xml"
        | "yaml" | "yml" | "toml" | "sql" | "sh" | "bat" | "ps1" => FileTypeClass::Code,
        _ => return None,
    };
    Some(class)
}

/// Filters applied to every candidate entry of a search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchFilters {
    /// Entry class to keep.
    pub file_type: FileTypeClass,

    /// Minimum size in bytes (files only).
    pub min_size: Option<u64>,

    /// Maximum size in bytes (files only).
    pub max_size: Option<u64>,

    /// Keep entries modified at or after this time.
    pub modified_after: Option<DateTime<Utc>>,

    /// Keep entries modified at or before this time.
    pub modified_before: Option<DateTime<Utc>>,
}

impl SearchFilters {
    /// Check the type class only.
    pub fn accepts_kind(&self, name: &str, is_directory: bool) -> bool {
        self.file_type.accepts(name, is_directory)
    }

    /// Check size and modification date.
    ///
    /// Size bounds never reject directories.
    pub fn accepts_metadata(&self, size: u64, modified: DateTime<Utc>, is_directory: bool) -> bool {
        if !is_directory {
            if self.min_size.is_some_and(|min| size < min) {
                return false;
            }
            if self.max_size.is_some_and(|max| size > max) {
                return false;
            }
        }
        if self.modified_after.is_some_and(|after| modified < after) {
            return false;
        }
        if self.modified_before.is_some_and(|before| modified > before) {
            return false;
        }
        true
    }

    /// Check every filter against a complete entry.
    pub fn accepts(&self, entry: &Entry) -> bool {
        self.accepts_kind(&entry.name, entry.is_directory)
            && self.accepts_metadata(entry.size, entry.modified, entry.is_directory)
    }
}
