//! File categorization by extension.
//!
//! This module maps upper-cased file extensions to a fixed set of categories.
//! Extensions that match no category fall into [`Category::Unknown`], whose
//! extension list grows as new ones are seen during a run.
//!
//! # Examples
//!
//! ```
//! use foldersort::file_category::{Category, CategoryTable, classify};
//!
//! let table = CategoryTable::new();
//! assert_eq!(classify("jpg", &table), (Category::Images, false));
//! assert_eq!(classify("Mp4", &table), (Category::Video, false));
//! assert_eq!(classify("xyz", &table), (Category::Unknown, true));
//! ```

use serde::Serialize;
use std::fmt;

/// A destination bucket for sorted files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// JPEG, PNG, JPG, SVG, BMP
    Images,
    /// AVI, MP4, MOV, MKV
    Video,
    /// Office documents, plain text and PDF
    Documents,
    /// MP3, OGG, WAV, AMR, M4A
    Audio,
    /// ZIP, GZ, TAR
    Archives,
    /// Python and C++ sources
    Code,
    /// XML, HTML, CSS
    Markup,
    /// Anything else, including files without an extension
    Unknown,
}

impl Category {
    /// Every category in table order.
    pub const ALL: [Category; 8] = [
        Category::Images,
        Category::Video,
        Category::Documents,
        Category::Audio,
        Category::Archives,
        Category::Code,
        Category::Markup,
        Category::Unknown,
    ];

    /// Returns the folder name for this category.
    ///
    /// # Examples
    ///
    /// ```
    /// use foldersort::file_category::Category;
    ///
    /// assert_eq!(Category::Images.dir_name(), "images");
    /// assert_eq!(Category::Video.dir_name(), "video");
    /// assert_eq!(Category::Unknown.dir_name(), "unknown");
    /// ```
    pub fn dir_name(&self) -> &'static str {
        match self {
            Category::Images => "images",
            Category::Video => "video",
            Category::Documents => "documents",
            Category::Audio => "audio",
            Category::Archives => "archives",
            Category::Code => "code",
            Category::Markup => "markup",
            Category::Unknown => "unknown",
        }
    }

    /// Returns the fixed, upper-case extension set of this category.
    ///
    /// Empty for [`Category::Unknown`]; its extensions live in a [`CategoryTable`].
    pub fn fixed_extensions(&self) -> &'static [&'static str] {
        match self {
            Category::Images => &["JPEG", "PNG", "JPG", "SVG", "BMP"],
            Category::Video => &["AVI", "MP4", "MOV", "MKV"],
            Category::Documents => &[
                "DOC", "DOCX", "ODT", "TXT", "PDF", "XLS", "XLSX", "PPT", "PPTX",
            ],
            Category::Audio => &["MP3", "OGG", "WAV", "AMR", "M4A"],
            Category::Archives => &["ZIP", "GZ", "TAR"],
            Category::Code => &["PY", "CPP", "CXX", "CC"],
            Category::Markup => &["XML", "HTML", "CSS"],
            Category::Unknown => &[],
        }
    }

    /// Returns true if `name` is the folder name of any category.
    pub fn is_category_dir(name: &str) -> bool {
        Self::ALL.iter().any(|c| c.dir_name() == name)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// The category table for one run.
///
/// The fixed categories never change. The unknown bucket keeps every
/// unmatched extension in first-seen order, each at most once.
#[derive(Debug, Clone, Default)]
pub struct CategoryTable {
    unknown: Vec<String>,
}

impl CategoryTable {
    /// Creates a table with an empty unknown bucket.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up the category for an extension (any case).
    ///
    /// The second value is true when the extension is unknown and not yet
    /// recorded in this table.
    pub fn classify(&self, extension: &str) -> (Category, bool) {
        let ext = extension.to_uppercase();
        for category in Category::ALL {
            if category.fixed_extensions().contains(&ext.as_str()) {
                return (category, false);
            }
        }
        let is_new = !self.unknown.iter().any(|known| *known == ext);
        (Category::Unknown, is_new)
    }

    /// Records an unknown extension. Returns false if it was already present.
    pub fn record_unknown(&mut self, extension: &str) -> bool {
        let ext = extension.to_uppercase();
        if self.unknown.contains(&ext) {
            return false;
        }
        self.unknown.push(ext);
        true
    }

    /// Records every extension from `extensions`, skipping duplicates.
    pub fn absorb_unknown<'a, I>(&mut self, extensions: I)
    where
        I: IntoIterator<Item = &'a String>,
    {
        for ext in extensions {
            self.record_unknown(ext);
        }
    }

    /// Extensions recorded under the unknown bucket so far.
    pub fn unknown_extensions(&self) -> &[String] {
        &self.unknown
    }

    /// Returns the current extension list of any category.
    pub fn extensions(&self, category: Category) -> Vec<String> {
        match category {
            Category::Unknown => self.unknown.clone(),
            other => other
                .fixed_extensions()
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

/// Classifies `extension` against `table`.
///
/// See [`CategoryTable::classify`].
pub fn classify(extension: &str, table: &CategoryTable) -> (Category, bool) {
    table.classify(extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_dir_names() {
        assert_eq!(Category::Images.dir_name(), "images");
        assert_eq!(Category::Video.dir_name(), "video");
        assert_eq!(Category::Documents.dir_name(), "documents");
        assert_eq!(Category::Audio.dir_name(), "audio");
        assert_eq!(Category::Archives.dir_name(), "archives");
        assert_eq!(Category::Code.dir_name(), "code");
        assert_eq!(Category::Markup.dir_name(), "markup");
        assert_eq!(Category::Unknown.dir_name(), "unknown");
    }

    #[test]
    fn test_every_fixed_extension_maps_back_to_its_category() {
        let table = CategoryTable::new();
        for category in Category::ALL {
            for ext in category.fixed_extensions() {
                assert_eq!(table.classify(ext), (category, false));
            }
        }
    }

    #[test]
    fn test_fixed_extension_sets_are_disjoint() {
        let mut seen = std::collections::HashSet::new();
        for category in Category::ALL {
            for ext in category.fixed_extensions() {
                assert!(seen.insert(*ext), "{ext} listed twice");
            }
        }
    }

    #[test]
    fn test_classify_case_insensitive() {
        let table = CategoryTable::new();
        assert_eq!(table.classify("jpeg").0, Category::Images);
        assert_eq!(table.classify("Docx").0, Category::Documents);
        assert_eq!(table.classify("cXx").0, Category::Code);
        assert_eq!(table.classify("html").0, Category::Markup);
    }

    #[test]
    fn test_unknown_extension_is_new_until_recorded() {
        let mut table = CategoryTable::new();
        assert_eq!(table.classify("xyz"), (Category::Unknown, true));
        assert!(table.record_unknown("xyz"));
        assert_eq!(table.classify("XYZ"), (Category::Unknown, false));
        assert!(!table.record_unknown("Xyz"));
        assert_eq!(table.unknown_extensions(), ["XYZ".to_string()]);
    }

    #[test]
    fn test_empty_extension_is_its_own_key() {
        let mut table = CategoryTable::new();
        assert_eq!(table.classify(""), (Category::Unknown, true));
        table.record_unknown("");
        assert_eq!(table.classify(""), (Category::Unknown, false));
        assert_eq!(table.classify("md"), (Category::Unknown, true));
    }

    #[test]
    fn test_absorb_unknown_dedupes_and_keeps_order() {
        let mut table = CategoryTable::new();
        let delta = vec!["MD".to_string(), "RS".to_string(), "MD".to_string()];
        table.absorb_unknown(&delta);
        table.absorb_unknown(&vec!["RS".to_string(), "".to_string()]);
        assert_eq!(table.extensions(Category::Unknown), vec!["MD", "RS", ""]);
    }

    #[test]
    fn test_is_category_dir() {
        assert!(Category::is_category_dir("archives"));
        assert!(Category::is_category_dir("unknown"));
        assert!(!Category::is_category_dir("Archives"));
        assert!(!Category::is_category_dir("tmp"));
    }
}
