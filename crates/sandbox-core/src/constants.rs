//! Fixed names shared across the engine

/// Directory the generated output of the engine itself is written to
pub const OUTPUT_DIR: &str = ".sandbox-sync";

/// Directories never watched, listed, cached or indexed
pub const IGNORED_DIRECTORIES: &[&str] = &[
    "node_modules",
    "dist",
    "build",
    "public",
    "static",
    ".git",
    ".next",
    OUTPUT_DIR,
];

/// Markup file extensions; the only files that get indexed
pub const JSX_FILE_EXTENSIONS: &[&str] = &["jsx", "tsx"];

/// Plain script extensions, cached during the initial scan but not indexed
pub const JS_FILE_EXTENSIONS: &[&str] = &["js", "ts"];

/// Stylesheet extensions cached during the initial scan
pub const STYLE_FILE_EXTENSIONS: &[&str] = &["css"];

/// Attribute carrying the element identifier
pub const OID_ATTRIBUTE: &str = "data-oid";

/// Absolute root of the project inside the sandbox
pub const SANDBOX_ROOT: &str = "/project/sandbox";

/// Durable storage key under which the cache snapshot lives
pub const CACHE_STORAGE_KEY: &str = "file-sync-cache";

/// Extensions read through the cache during the initial project scan
#[must_use]
pub fn scan_extensions() -> Vec<&'static str> {
    JSX_FILE_EXTENSIONS
        .iter()
        .chain(JS_FILE_EXTENSIONS)
        .chain(STYLE_FILE_EXTENSIONS)
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_covers_markup_and_scripts() {
        let exts = scan_extensions();
        assert_eq!(exts, vec!["jsx", "tsx", "js", "ts", "css"]);
    }

    #[test]
    fn output_dir_is_ignored() {
        assert!(IGNORED_DIRECTORIES.contains(&OUTPUT_DIR));
    }
}
