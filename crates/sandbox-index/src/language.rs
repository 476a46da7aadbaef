//! Markup languages the indexer understands

use sandbox_core::SandboxPath;
use std::fmt::{self, Display, Formatter};

/// Source language of a tracked file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceLanguage {
    /// TypeScript with JSX
    Tsx,
    /// JavaScript with JSX
    Jsx,
}

impl SourceLanguage {
    /// Get file extensions for this language
    #[inline]
    #[must_use]
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Tsx => &["tsx"],
            Self::Jsx => &["jsx"],
        }
    }

    /// Detect language from file extension
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.') {
            "tsx" => Some(Self::Tsx),
            "jsx" => Some(Self::Jsx),
            _ => None,
        }
    }

    /// Detect language from a path
    #[must_use]
    pub fn from_path(path: &SandboxPath) -> Option<Self> {
        path.extension().and_then(Self::from_extension)
    }

    /// Tree-sitter grammar
    ///
    /// The TSX grammar is a superset that also accepts plain JSX.
    #[must_use]
    pub fn tree_sitter_language(&self) -> tree_sitter::Language {
        tree_sitter_typescript::LANGUAGE_TSX.into()
    }
}

impl Display for SourceLanguage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Tsx => "TSX",
            Self::Jsx => "JSX",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_from_extension() {
        assert_eq!(SourceLanguage::from_extension("tsx"), Some(SourceLanguage::Tsx));
        assert_eq!(SourceLanguage::from_extension(".jsx"), Some(SourceLanguage::Jsx));
        assert_eq!(SourceLanguage::from_extension("ts"), None);
        assert_eq!(SourceLanguage::from_extension("css"), None);
    }

    #[test]
    fn language_from_path() {
        let path: SandboxPath = "src/app/page.tsx".parse().unwrap();
        assert_eq!(SourceLanguage::from_path(&path), Some(SourceLanguage::Tsx));
    }
}
