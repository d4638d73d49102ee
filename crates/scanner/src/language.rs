use std::path::Path;

/// Supported programming language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Rust,
    Python,
    JavaScript,
    TypeScript,
    Go,
    Java,
    Kotlin,
    CSharp,
    C,
    Cpp,
    Ruby,
    Swift,
    Unknown,
}

/// How a language delimits nested blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStyle {
    /// `{ ... }` scoped blocks
    Braces,
    /// Indentation scoped blocks (Python, and Ruby read the same way)
    Indentation,
}

impl Language {
    pub const ALL: [Language; 12] = [
        Language::Rust,
        Language::Python,
        Language::JavaScript,
        Language::TypeScript,
        Language::Go,
        Language::Java,
        Language::Kotlin,
        Language::CSharp,
        Language::C,
        Language::Cpp,
        Language::Ruby,
        Language::Swift,
    ];

    /// Detect language from file extension
    pub fn from_extension(ext: &str) -> Self {
        let ext = ext.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|lang| lang.extensions().contains(&ext.as_str()))
            .unwrap_or(Language::Unknown)
    }

    /// Detect language from file path
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(Language::Unknown)
    }

    /// File extensions owned by this language
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Language::Rust => &["rs"],
            Language::Python => &["py", "pyw"],
            Language::JavaScript => &["js", "mjs", "cjs", "jsx"],
            Language::TypeScript => &["ts", "tsx", "mts", "cts"],
            Language::Go => &["go"],
            Language::Java => &["java"],
            Language::Kotlin => &["kt", "kts"],
            Language::CSharp => &["cs"],
            Language::C => &["c", "h"],
            Language::Cpp => &["cpp", "cc", "cxx", "hpp", "hh", "hxx"],
            Language::Ruby => &["rb"],
            Language::Swift => &["swift"],
            Language::Unknown => &[],
        }
    }

    /// Get language name as string
    pub fn as_str(self) -> &'static str {
        match self {
            Language::Rust => "rust",
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Go => "go",
            Language::Java => "java",
            Language::Kotlin => "kotlin",
            Language::CSharp => "csharp",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Ruby => "ruby",
            Language::Swift => "swift",
            Language::Unknown => "unknown",
        }
    }

    pub fn block_style(self) -> BlockStyle {
        match self {
            Language::Python | Language::Ruby => BlockStyle::Indentation,
            _ => BlockStyle::Braces,
        }
    }

    /// Line comment prefix used when lexing control flow
    pub fn line_comment(self) -> &'static str {
        match self {
            Language::Python | Language::Ruby => "#",
            _ => "//",
        }
    }

    /// Whether `'` opens a string literal (Rust uses it for lifetimes too)
    pub fn single_quote_strings(self) -> bool {
        !matches!(self, Language::Rust)
    }
}
