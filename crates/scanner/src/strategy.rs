use crate::error::{Result, ScannerError};
use crate::language::Language;
use crate::types::{ScanSummary, Symbol, SymbolKind};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

/// Per-language extraction of declarations and outgoing references.
///
/// Implementations must be deterministic: the same text always yields the
/// same summary, in source order.
pub trait ExtractionStrategy: Send + Sync {
    fn language(&self) -> Language;

    fn extract(&self, text: &str) -> ScanSummary;
}

/// How the capture of a reference rule expands into target strings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceSplit {
    /// The capture is one target
    Single,
    /// `a, b as c` lists (Python `import`)
    CommaList,
    /// Every `"quoted"` string inside the capture (Go import blocks)
    QuotedStrings,
}

struct DeclarationRule {
    regex: Regex,
    kind: SymbolKind,
}

struct ReferenceRule {
    regex: Regex,
    split: ReferenceSplit,
}

/// Regex-family strategy: declaration patterns capture a name in group 1,
/// reference patterns capture a target (or a list of targets) in group 1.
pub struct PatternStrategy {
    language: Language,
    declarations: Vec<DeclarationRule>,
    references: Vec<ReferenceRule>,
}

const RESERVED_NAMES: &[&str] = &[
    "if", "else", "for", "while", "switch", "return", "sizeof", "catch", "do", "new", "delete",
];

impl PatternStrategy {
    pub fn new(language: Language) -> Self {
        Self {
            language,
            declarations: Vec::new(),
            references: Vec::new(),
        }
    }

    /// Builder: add a declaration pattern (compiled in multi-line mode)
    pub fn declare(mut self, pattern: &str, kind: SymbolKind) -> Result<Self> {
        let regex = self.compile(pattern)?;
        self.declarations.push(DeclarationRule { regex, kind });
        Ok(self)
    }

    /// Builder: add a reference pattern (compiled in multi-line mode)
    pub fn reference(mut self, pattern: &str, split: ReferenceSplit) -> Result<Self> {
        let regex = self.compile(pattern)?;
        self.references.push(ReferenceRule { regex, split });
        Ok(self)
    }

    fn compile(&self, pattern: &str) -> Result<Regex> {
        Regex::new(&format!("(?m){pattern}"))
            .map_err(|err| ScannerError::invalid_pattern(self.language.as_str(), err))
    }

    pub fn python() -> Result<Self> {
        Self::new(Language::Python)
            .declare(r"^[ \t]*class[ \t]+([A-Za-z_]\w*)", SymbolKind::Class)?
            .declare(
                r"^[ \t]*(?:async[ \t]+)?def[ \t]+([A-Za-z_]\w*)",
                SymbolKind::Function,
            )?
            .reference(
                r"^[ \t]*from[ \t]+([\w.]+)[ \t]+import\b",
                ReferenceSplit::Single,
            )?
            // `from . import board, session`: the imported names are the targets
            .reference(
                r"^[ \t]*from[ \t]+\.+[ \t]+import[ \t]+\(?([\w \t,]+)",
                ReferenceSplit::CommaList,
            )?
            .reference(
                r"^[ \t]*import[ \t]+([\w.]+(?:[ \t]+as[ \t]+\w+)?(?:[ \t]*,[ \t]*[\w.]+(?:[ \t]+as[ \t]+\w+)?)*)",
                ReferenceSplit::CommaList,
            )
    }

    pub fn rust() -> Result<Self> {
        const VIS: &str = r"(?:pub(?:\([^)]*\))?[ \t]+)?";
        Self::new(Language::Rust)
            .declare(
                &format!(
                    r#"^[ \t]*{VIS}(?:const[ \t]+)?(?:async[ \t]+)?(?:unsafe[ \t]+)?(?:extern[ \t]+"[^"]*"[ \t]+)?fn[ \t]+([A-Za-z_]\w*)"#
                ),
                SymbolKind::Function,
            )?
            .declare(
                &format!(r"^[ \t]*{VIS}struct[ \t]+([A-Za-z_]\w*)"),
                SymbolKind::Class,
            )?
            .declare(
                &format!(r"^[ \t]*{VIS}(?:enum|trait|type|union)[ \t]+([A-Za-z_]\w*)"),
                SymbolKind::Type,
            )?
            .declare(
                &format!(r"^[ \t]*{VIS}mod[ \t]+([A-Za-z_]\w*)[ \t]*\{{"),
                SymbolKind::Module,
            )?
            .reference(&format!(r"^[ \t]*{VIS}use[ \t]+([\w:]+)"), ReferenceSplit::Single)?
            .reference(
                &format!(r"^[ \t]*{VIS}mod[ \t]+([A-Za-z_]\w*)[ \t]*;"),
                ReferenceSplit::Single,
            )?
            .reference(r"^[ \t]*extern[ \t]+crate[ \t]+(\w+)", ReferenceSplit::Single)
    }

    pub fn javascript() -> Result<Self> {
        Self::ecmascript(Language::JavaScript)
    }

    pub fn typescript() -> Result<Self> {
        Self::ecmascript(Language::TypeScript)?.declare(
            r"^[ \t]*(?:export[ \t]+)?(?:declare[ \t]+)?(?:interface|type|enum)[ \t]+([A-Za-z_$][\w$]*)",
            SymbolKind::Type,
        )
    }

    fn ecmascript(language: Language) -> Result<Self> {
        Self::new(language)
            .declare(
                r"^[ \t]*(?:export[ \t]+)?(?:default[ \t]+)?(?:abstract[ \t]+)?class[ \t]+([A-Za-z_$][\w$]*)",
                SymbolKind::Class,
            )?
            .declare(
                r"^[ \t]*(?:export[ \t]+)?(?:default[ \t]+)?(?:async[ \t]+)?function[ \t]*\*?[ \t]*([A-Za-z_$][\w$]*)",
                SymbolKind::Function,
            )?
            .declare(
                r"^[ \t]*(?:export[ \t]+)?(?:const|let|var)[ \t]+([A-Za-z_$][\w$]*)[ \t]*(?::[^=\n]+)?=[ \t]*(?:async[ \t]*)?(?:\([^)\n]*\)|[A-Za-z_$][\w$]*)[ \t]*=>",
                SymbolKind::Function,
            )?
            .reference(
                r#"^[ \t]*import[ \t]+(?:[^'"\n]*?[ \t]*from[ \t]*)?['"]([^'"\n]+)['"]"#,
                ReferenceSplit::Single,
            )?
            .reference(
                r#"^[ \t]*\}[ \t]*from[ \t]*['"]([^'"\n]+)['"]"#,
                ReferenceSplit::Single,
            )?
            .reference(
                r#"^[ \t]*export[ \t]+[^'"\n]*?from[ \t]*['"]([^'"\n]+)['"]"#,
                ReferenceSplit::Single,
            )?
            .reference(
                r#"\b(?:require|import)\([ \t]*['"]([^'"\n]+)['"][ \t]*\)"#,
                ReferenceSplit::Single,
            )
    }

    pub fn go() -> Result<Self> {
        Self::new(Language::Go)
            .declare(
                r"^func[ \t]+(?:\([^)]*\)[ \t]*)?([A-Za-z_]\w*)",
                SymbolKind::Function,
            )?
            .declare(
                r"^type[ \t]+([A-Za-z_]\w*)[ \t]+(?:struct|interface)\b",
                SymbolKind::Type,
            )?
            .reference(
                r#"^[ \t]*import[ \t]+(?:[\w.]+[ \t]+)?"([^"\n]+)""#,
                ReferenceSplit::Single,
            )?
            .reference(
                r"(?s)^[ \t]*import[ \t]*\((.*?)\)",
                ReferenceSplit::QuotedStrings,
            )
    }

    pub fn java() -> Result<Self> {
        Self::new(Language::Java)
            .declare(
                r"^[ \t]*(?:(?:public|private|protected|abstract|final|static|sealed)[ \t]+)*(?:class|interface|enum|record)[ \t]+([A-Za-z_]\w*)",
                SymbolKind::Class,
            )?
            .declare(
                r"^[ \t]*(?:(?:public|private|protected|static|final|abstract|synchronized)[ \t]+)+[\w<>\[\], ?]+[ \t]+([A-Za-z_]\w*)[ \t]*\(",
                SymbolKind::Function,
            )?
            .reference(
                r"^[ \t]*import[ \t]+(?:static[ \t]+)?([\w.]+)",
                ReferenceSplit::Single,
            )
    }

    pub fn kotlin() -> Result<Self> {
        Self::new(Language::Kotlin)
            .declare(
                r"^[ \t]*(?:(?:public|private|internal|protected|open|abstract|sealed|data|enum|inner|annotation)[ \t]+)*(?:class|interface|object)[ \t]+([A-Za-z_]\w*)",
                SymbolKind::Class,
            )?
            .declare(
                r"^[ \t]*(?:(?:public|private|internal|protected|open|override|suspend|inline)[ \t]+)*fun[ \t]+(?:<[^>]*>[ \t]*)?(?:[\w.]+\.)?([A-Za-z_]\w*)",
                SymbolKind::Function,
            )?
            .reference(r"^[ \t]*import[ \t]+([\w.]+)", ReferenceSplit::Single)
    }

    pub fn csharp() -> Result<Self> {
        Self::new(Language::CSharp)
            .declare(
                r"^[ \t]*(?:(?:public|private|protected|internal|static|abstract|sealed|partial)[ \t]+)*(?:class|interface|struct|enum|record)[ \t]+([A-Za-z_]\w*)",
                SymbolKind::Class,
            )?
            .declare(
                r"^[ \t]*(?:(?:public|private|protected|internal|static|async|override|virtual|abstract)[ \t]+)+[\w<>\[\], ?]+[ \t]+([A-Za-z_]\w*)[ \t]*\(",
                SymbolKind::Function,
            )?
            .reference(
                r"^[ \t]*using[ \t]+(?:static[ \t]+)?([\w.]+)[ \t]*;",
                ReferenceSplit::Single,
            )
    }

    pub fn c_family(language: Language) -> Result<Self> {
        Self::new(language)
            .declare(
                r"^[ \t]*(?:class|struct)[ \t]+([A-Za-z_]\w*)[^;\n]*$",
                SymbolKind::Class,
            )?
            .declare(
                r"^[A-Za-z_][\w \t\*&:<>,]*?[ \t\*&]([A-Za-z_]\w*)[ \t]*\([^;\n]*\)[ \t]*(?:const[ \t]*)?\{?[ \t]*$",
                SymbolKind::Function,
            )?
            .reference(
                r#"^[ \t]*#[ \t]*include[ \t]*[<"]([^>"\n]+)[>"]"#,
                ReferenceSplit::Single,
            )
    }

    pub fn ruby() -> Result<Self> {
        Self::new(Language::Ruby)
            .declare(r"^[ \t]*class[ \t]+([A-Z]\w*)", SymbolKind::Class)?
            .declare(r"^[ \t]*module[ \t]+([A-Z]\w*)", SymbolKind::Module)?
            .declare(
                r"^[ \t]*def[ \t]+(?:self\.)?([A-Za-z_]\w*[?!=]?)",
                SymbolKind::Function,
            )?
            .reference(
                r#"^[ \t]*require(?:_relative)?[ \t(]+['"]([^'"\n]+)['"]"#,
                ReferenceSplit::Single,
            )
    }

    pub fn swift() -> Result<Self> {
        Self::new(Language::Swift)
            .declare(
                r"^[ \t]*(?:(?:public|private|internal|open|final|fileprivate)[ \t]+)*(?:class|struct|enum|protocol|actor)[ \t]+([A-Za-z_]\w*)",
                SymbolKind::Class,
            )?
            .declare(
                r"^[ \t]*(?:(?:public|private|internal|open|static|override|mutating|final|fileprivate|@\w+)[ \t]+)*func[ \t]+([A-Za-z_]\w*)",
                SymbolKind::Function,
            )?
            .reference(
                r"^[ \t]*import[ \t]+(?:\w+[ \t]+)?([\w.]+)",
                ReferenceSplit::Single,
            )
    }
}

impl ExtractionStrategy for PatternStrategy {
    fn language(&self) -> Language {
        self.language
    }

    fn extract(&self, text: &str) -> ScanSummary {
        let lines = LineIndex::new(text);

        let mut found: Vec<(usize, Symbol)> = Vec::new();
        for rule in &self.declarations {
            for caps in rule.regex.captures_iter(text) {
                let Some(name) = caps.get(1) else {
                    continue;
                };
                if RESERVED_NAMES.contains(&name.as_str()) {
                    continue;
                }
                found.push((
                    name.start(),
                    Symbol {
                        name: name.as_str().to_string(),
                        kind: rule.kind,
                        line: lines.line_of(name.start()),
                    },
                ));
            }
        }
        // Stable: rules that hit the same offset keep registration order.
        found.sort_by_key(|(offset, _)| *offset);
        let mut seen_symbols = HashSet::new();
        let symbols = found
            .into_iter()
            .map(|(_, symbol)| symbol)
            .filter(|symbol| seen_symbols.insert((symbol.name.clone(), symbol.line)))
            .collect();

        let mut raw_refs: Vec<(usize, String)> = Vec::new();
        for rule in &self.references {
            for caps in rule.regex.captures_iter(text) {
                let Some(capture) = caps.get(1) else {
                    continue;
                };
                let offset = capture.start();
                match rule.split {
                    ReferenceSplit::Single => {
                        raw_refs.push((offset, capture.as_str().to_string()));
                    }
                    ReferenceSplit::CommaList => {
                        for part in capture.as_str().split(',') {
                            raw_refs.push((offset, part.to_string()));
                        }
                    }
                    ReferenceSplit::QuotedStrings => {
                        for (idx, quoted) in capture.as_str().split('"').enumerate() {
                            if idx % 2 == 1 {
                                raw_refs.push((offset, quoted.to_string()));
                            }
                        }
                    }
                }
            }
        }
        raw_refs.sort_by_key(|(offset, _)| *offset);
        let mut seen_refs = HashSet::new();
        let references = raw_refs
            .into_iter()
            .filter_map(|(_, raw)| normalize_reference(&raw))
            .filter(|reference| seen_refs.insert(reference.clone()))
            .collect();

        ScanSummary {
            symbols,
            references,
        }
    }
}

/// Reduce a raw import target to the form the assembler resolves against.
pub fn normalize_reference(raw: &str) -> Option<String> {
    let mut value = raw
        .trim()
        .trim_matches(|c| matches!(c, '"' | '\'' | ';' | '(' | ')'))
        .split_whitespace()
        .next()?
        .to_string();

    if let Some(idx) = value.find("::{") {
        value.truncate(idx);
    }
    while let Some(stripped) = value
        .strip_suffix("::*")
        .or_else(|| value.strip_suffix("::"))
        .or_else(|| value.strip_suffix(".*"))
    {
        value = stripped.to_string();
    }
    loop {
        let stripped = ["crate::", "self::", "super::", "./", "../"]
            .iter()
            .find_map(|prefix| value.strip_prefix(prefix));
        match stripped {
            Some(rest) => value = rest.to_string(),
            None => break,
        }
    }
    let value = value.trim_start_matches('.').trim_end_matches('.');

    if value.is_empty() || matches!(value, "crate" | "self" | "super") {
        return None;
    }
    Some(value.to_string())
}

struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(text: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(text.match_indices('\n').map(|(idx, _)| idx + 1));
        Self { starts }
    }

    fn line_of(&self, offset: usize) -> usize {
        match self.starts.binary_search(&offset) {
            Ok(idx) => idx + 1,
            Err(idx) => idx,
        }
    }
}

/// Maps file extensions to extraction strategies.
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    by_extension: HashMap<String, Arc<dyn ExtractionStrategy>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with a pattern strategy for every built-in language
    pub fn builtin() -> Result<Self> {
        let mut registry = Self::new();
        registry.register_language(PatternStrategy::python()?);
        registry.register_language(PatternStrategy::rust()?);
        registry.register_language(PatternStrategy::javascript()?);
        registry.register_language(PatternStrategy::typescript()?);
        registry.register_language(PatternStrategy::go()?);
        registry.register_language(PatternStrategy::java()?);
        registry.register_language(PatternStrategy::kotlin()?);
        registry.register_language(PatternStrategy::csharp()?);
        registry.register_language(PatternStrategy::c_family(Language::C)?);
        registry.register_language(PatternStrategy::c_family(Language::Cpp)?);
        registry.register_language(PatternStrategy::ruby()?);
        registry.register_language(PatternStrategy::swift()?);
        Ok(registry)
    }

    /// Register a strategy for every extension of its language
    pub fn register_language(&mut self, strategy: impl ExtractionStrategy + 'static) {
        let strategy: Arc<dyn ExtractionStrategy> = Arc::new(strategy);
        for ext in strategy.language().extensions() {
            self.by_extension.insert((*ext).to_string(), Arc::clone(&strategy));
        }
    }

    /// Register (or replace) a strategy for explicit extensions
    pub fn register(&mut self, extensions: &[&str], strategy: Arc<dyn ExtractionStrategy>) {
        for ext in extensions {
            self.by_extension
                .insert(ext.to_lowercase(), Arc::clone(&strategy));
        }
    }

    pub fn for_path(&self, path: impl AsRef<Path>) -> Option<&Arc<dyn ExtractionStrategy>> {
        let ext = path.as_ref().extension()?.to_str()?.to_lowercase();
        self.by_extension.get(&ext)
    }

    pub fn supports(&self, path: impl AsRef<Path>) -> bool {
        self.for_path(path).is_some()
    }
}
