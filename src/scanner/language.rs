//! Fixed extension → language and mime lookup tables.
//!
//! The language hint feeds the block splitter prompt and is echoed into
//! every chunk document as `lang`. Unknown extensions map to `"text"`.

/// Returns the language identifier for a lowercase file extension
/// (without the leading dot).
#[must_use]
pub fn language_for_extension(ext: &str) -> &'static str {
    match ext {
        "py" => "python",
        "js" | "jsx" => "javascript",
        "ts" => "typescript",
        "tsx" => "tsx",
        "java" => "java",
        "kt" => "kotlin",
        "go" => "go",
        "rs" => "rust",
        "c" | "h" => "c",
        "cpp" | "cc" | "cxx" | "hpp" | "hh" => "cpp",
        "cs" => "csharp",
        "php" => "php",
        "rb" => "ruby",
        "swift" => "swift",
        "scala" => "scala",
        "groovy" => "groovy",
        "m" => "objective_c",
        "mm" => "objective_cpp",
        "sh" | "bash" | "zsh" | "cmd" | "bat" => "bash",
        "r" => "r",
        "lua" => "lua",
        "hs" => "haskell",
        "toml" => "toml",
        "sass" => "sass",
        "scss" => "scss",
        "jl" => "julia",
        "ps1" => "powershell",
        "sql" => "sql",
        "yaml" | "yml" => "yaml",
        "xml" => "xml",
        "html" | "htm" => "html",
        "json" => "json",
        "md" | "markdown" => "markdown",
        _ => "text",
    }
}

/// Returns a mime type for a lowercase file extension (without the dot).
#[must_use]
pub fn mime_for_extension(ext: &str) -> &'static str {
    match ext {
        "py" => "text/x-python",
        "js" | "jsx" => "text/javascript",
        "ts" | "tsx" => "text/typescript",
        "java" => "text/x-java-source",
        "kt" => "text/x-kotlin",
        "go" => "text/x-go",
        "rs" => "text/x-rust",
        "c" | "h" => "text/x-c",
        "cpp" | "cc" | "cxx" | "hpp" | "hh" => "text/x-c++",
        "cs" => "text/x-csharp",
        "php" => "text/x-php",
        "rb" => "text/x-ruby",
        "swift" => "text/x-swift",
        "sh" | "bash" | "zsh" => "text/x-shellscript",
        "toml" => "application/toml",
        "sql" => "application/sql",
        "yaml" | "yml" => "application/yaml",
        "xml" => "application/xml",
        "html" | "htm" => "text/html",
        "json" => "application/json",
        "md" | "markdown" => "text/markdown",
        "csv" => "text/csv",
        _ => "text/plain",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("py", "python")]
    #[test_case("rs", "rust")]
    #[test_case("jsx", "javascript")]
    #[test_case("tsx", "tsx")]
    #[test_case("yml", "yaml")]
    #[test_case("zsh", "bash")]
    #[test_case("weird", "text")]
    #[test_case("", "text")]
    fn test_language_for_extension(ext: &str, expected: &str) {
        assert_eq!(language_for_extension(ext), expected);
    }

    #[test_case("py", "text/x-python")]
    #[test_case("json", "application/json")]
    #[test_case("bin", "text/plain")]
    fn test_mime_for_extension(ext: &str, expected: &str) {
        assert_eq!(mime_for_extension(ext), expected);
    }
}
