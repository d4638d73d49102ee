use crate::error::Result;
use crate::preprocess;
use crate::rules::ParserRules;
use crate::structure::{DeclaredDependency, FileEntry, ProjectStructure};
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use synapse_protocol::path_filters::normalize_path;
use synapse_protocol::{FileKind, RelationKind};

const TREE_GLYPHS: &[char] = &['├', '└', '│', '─'];
const TOKEN_TRIM: &[char] = &['*', '"', '\'', '(', ')', '[', ']', '<', '>', ',', ';', ':'];
const DESCRIPTION_TRIM: &[char] = &['-', '—', '–', ':', '|', ' ', '\t'];

/// Specification-document parser.
///
/// Construction validates the rules and compiles the dependency patterns;
/// parsing is infallible.
#[derive(Debug, Clone)]
pub struct SpecParser {
    rules: ParserRules,
    bullets: Vec<String>,
    arrow_dependency: Option<Regex>,
    verb_dependency: Option<Regex>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Folder,
    File,
}

/// Line prefix analysis: list/tree anchoring and tree depth
struct Prefix<'a> {
    rest: &'a str,
    anchored: bool,
    tree_depth: Option<usize>,
}

impl SpecParser {
    pub fn new(rules: ParserRules) -> Result<Self> {
        rules.validate()?;

        let mut bullets: Vec<String> = rules
            .bullet_markers
            .iter()
            .filter(|m| !m.trim().is_empty())
            .cloned()
            .collect();
        bullets.sort_by_key(|m| std::cmp::Reverse(m.len()));

        let arrows = alternation(&rules.dependency_arrows);
        let arrow_dependency = match arrows {
            Some(arrows) => Some(Regex::new(&format!(
                r"^(?P<source>\S+?)\s*(?:{arrows})\s*(?P<target>[^\s()]+)(?:\s*\((?P<kind>[^)]*)\))?"
            ))?),
            None => None,
        };
        let verbs = alternation(&rules.dependency_verbs);
        let verb_dependency = match verbs {
            Some(verbs) => Some(Regex::new(&format!(
                r"(?i)^(?P<source>\S+)\s+(?P<verb>{verbs})\s+(?P<target>\S+)"
            ))?),
            None => None,
        };

        Ok(Self {
            rules,
            bullets,
            arrow_dependency,
            verb_dependency,
        })
    }

    pub fn rules(&self) -> &ParserRules {
        &self.rules
    }

    /// Parse a document held in memory
    pub fn parse(&self, text: &str) -> ProjectStructure {
        let cleaned = preprocess::clean(text);
        let mut builder = Builder::default();
        let mut tree: Vec<String> = Vec::new();

        for line in cleaned.lines() {
            self.parse_line(line, &mut tree, &mut builder);
        }

        let structure = builder.finish();
        log::debug!(
            "Parsed specification: {} folders, {} files, {} dependencies",
            structure.folders.len(),
            structure.files.len(),
            structure.dependencies.len()
        );
        structure
    }

    /// Parse a document from disk; an unreadable document is an empty one
    pub fn parse_file(&self, path: impl AsRef<Path>) -> ProjectStructure {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => self.parse(&text),
            Err(err) => {
                log::warn!("Cannot read specification {}: {err}", path.display());
                ProjectStructure::default()
            }
        }
    }

    fn parse_line(&self, raw: &str, tree: &mut Vec<String>, out: &mut Builder) {
        let line = raw
            .trim_start()
            .trim_start_matches(['#', '>'])
            .trim();
        if line.is_empty() {
            return;
        }

        let prefix = self.strip_prefix(raw.trim_end());
        let rest = if prefix.anchored { prefix.rest } else { line };
        if prefix.tree_depth.is_none() {
            tree.clear();
        }

        if let Some(entries) = self.scope_entries(rest) {
            out.scope.extend(entries);
            return;
        }

        let (marker, rest) = self.strip_marker(rest);

        if let Some(dependency) = self.dependency(rest) {
            out.add_dependency(dependency);
            return;
        }

        let mut parts = rest.splitn(2, char::is_whitespace);
        let raw_token = parts.next().unwrap_or_default();
        let description = parts
            .next()
            .map(|d| d.trim_matches(DESCRIPTION_TRIM).to_string())
            .filter(|d| !d.is_empty());
        let token = clean_token(raw_token);
        if token.is_empty() {
            return;
        }

        let folder_like = token.ends_with('/') || marker == Some(Marker::Folder);
        if folder_like && (marker.is_some() || prefix.anchored) {
            let name = token.trim_end_matches('/');
            if !valid_folder(name) {
                return;
            }
            let path = tree_path(tree, prefix.tree_depth, name);
            if let Some(depth) = prefix.tree_depth {
                tree.truncate(depth);
                tree.push(name.to_string());
            }
            out.add_folder(path);
            return;
        }

        if marker.is_none() && !prefix.anchored {
            return;
        }
        if !self.valid_file_path(token) {
            return;
        }
        let path = tree_path(tree, prefix.tree_depth, token);
        if let Some(depth) = prefix.tree_depth {
            tree.truncate(depth);
        }
        out.add_file(path, description);
    }

    fn strip_prefix<'a>(&self, line: &'a str) -> Prefix<'a> {
        let mut rest = line;
        let mut anchored = false;
        let mut is_tree = false;

        loop {
            let trimmed = rest.trim_start();
            let mut stripped = None;

            for bullet in &self.bullets {
                if let Some(after) = trimmed.strip_prefix(bullet.as_str()) {
                    let glyph = bullet.contains(TREE_GLYPHS);
                    if glyph || after.is_empty() || after.starts_with(char::is_whitespace) {
                        is_tree |= glyph;
                        stripped = Some(after);
                        break;
                    }
                }
            }
            if stripped.is_none() {
                stripped = strip_numbered(trimmed);
            }

            match stripped {
                Some(after) => {
                    anchored = true;
                    rest = after;
                }
                None => {
                    rest = trimmed;
                    break;
                }
            }
        }

        let consumed = line.chars().count() - rest.chars().count();
        Prefix {
            rest,
            anchored,
            tree_depth: is_tree.then(|| (consumed / 4).saturating_sub(1)),
        }
    }

    fn strip_marker<'a>(&self, rest: &'a str) -> (Option<Marker>, &'a str) {
        let candidates = self
            .rules
            .folder_markers
            .iter()
            .map(|m| (Marker::Folder, m))
            .chain(self.rules.file_markers.iter().map(|m| (Marker::File, m)));

        for (marker, text) in candidates {
            if text.is_empty() {
                continue;
            }
            if let Some(after) = strip_prefix_ignore_case(rest, text) {
                let after = after.trim_start_matches(|c: char| c == '\u{fe0f}' || c.is_whitespace());
                return (Some(marker), after);
            }
        }
        (None, rest)
    }

    fn scope_entries(&self, rest: &str) -> Option<Vec<String>> {
        let after = self
            .rules
            .scope_keywords
            .iter()
            .filter(|k| !k.is_empty())
            .find_map(|keyword| strip_prefix_ignore_case(rest, keyword))?;

        Some(
            after
                .split(|c: char| c == ',' || c.is_whitespace())
                .map(clean_token)
                .map(normalize_path)
                .filter(|entry| !entry.is_empty())
                .collect(),
        )
    }

    fn dependency(&self, rest: &str) -> Option<DeclaredDependency> {
        if let Some(caps) = self.arrow_dependency.as_ref().and_then(|re| re.captures(rest)) {
            let kind = caps
                .name("kind")
                .and_then(|k| k.as_str().parse::<RelationKind>().ok())
                .unwrap_or_default();
            return self.dependency_from(&caps["source"], &caps["target"], kind);
        }

        if let Some(caps) = self.verb_dependency.as_ref().and_then(|re| re.captures(rest)) {
            let kind = caps["verb"].parse::<RelationKind>().unwrap_or_default();
            return self.dependency_from(&caps["source"], &caps["target"], kind);
        }

        None
    }

    fn dependency_from(
        &self,
        source: &str,
        target: &str,
        kind: RelationKind,
    ) -> Option<DeclaredDependency> {
        let source = clean_token(source);
        let target = clean_token(target);
        if !self.valid_file_path(source) || !self.valid_file_path(target) {
            return None;
        }
        Some(DeclaredDependency {
            source: normalize_path(source),
            target: normalize_path(target),
            kind,
        })
    }

    /// A dotted file token: path characters only, an extension of
    /// `1..=max_extension_len` lowercase alphanumerics (not all digits) and a
    /// stem that does not read like a hyphenated phrase.
    fn valid_file_path(&self, token: &str) -> bool {
        if token.chars().count() < self.rules.min_path_len
            || token.contains("..")
            || token.contains("//")
            || !token.chars().all(is_path_char)
        {
            return false;
        }

        let file_name = token.rsplit('/').next().unwrap_or(token);
        let Some((stem, ext)) = file_name.rsplit_once('.') else {
            return false;
        };

        let ext_ok = !ext.is_empty()
            && ext.len() <= self.rules.max_extension_len
            && ext
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
            && !ext.chars().all(|c| c.is_ascii_digit());
        let stem_ok = if stem.is_empty() {
            file_name.starts_with('.')
        } else {
            stem.chars().any(char::is_alphanumeric)
                && stem.matches('-').count() <= self.rules.max_stem_hyphens
        };

        ext_ok && stem_ok
    }
}

#[derive(Default)]
struct Builder {
    folders: Vec<String>,
    files: Vec<FileEntry>,
    file_index: HashMap<String, usize>,
    dependencies: Vec<DeclaredDependency>,
    scope: Vec<String>,
}

impl Builder {
    fn add_folder(&mut self, raw: String) {
        let path = normalize_path(&raw);
        if !path.is_empty() && !self.folders.contains(&path) {
            self.folders.push(path);
        }
    }

    fn add_file(&mut self, raw: String, description: Option<String>) {
        let path = normalize_path(&raw);
        if path.is_empty() {
            return;
        }
        if let Some(&idx) = self.file_index.get(&path) {
            let existing = &mut self.files[idx];
            if existing.description.is_none() {
                existing.description = description;
            }
            return;
        }
        self.file_index.insert(path.clone(), self.files.len());
        self.files.push(FileEntry {
            kind: FileKind::from_path(&path),
            path,
            description,
        });
    }

    fn add_dependency(&mut self, dependency: DeclaredDependency) {
        if dependency.source != dependency.target && !self.dependencies.contains(&dependency) {
            self.dependencies.push(dependency);
        }
    }

    fn finish(mut self) -> ProjectStructure {
        let mut seen = std::collections::HashSet::new();
        self.scope.retain(|entry| seen.insert(entry.clone()));
        ProjectStructure {
            folders: self.folders,
            files: self.files,
            dependencies: self.dependencies,
            scope: self.scope,
        }
    }
}

fn alternation(values: &[String]) -> Option<String> {
    let mut values: Vec<&String> = values.iter().filter(|v| !v.trim().is_empty()).collect();
    if values.is_empty() {
        return None;
    }
    values.sort_by_key(|v| std::cmp::Reverse(v.len()));
    Some(
        values
            .iter()
            .map(|v| regex::escape(v))
            .collect::<Vec<_>>()
            .join("|"),
    )
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let len = prefix.len();
    if text.len() < len || !text.is_char_boundary(len) {
        return None;
    }
    text[..len]
        .eq_ignore_ascii_case(prefix)
        .then(|| &text[len..])
}

/// `1. item` / `2) item`
fn strip_numbered(text: &str) -> Option<&str> {
    let digits = text.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let after = text[digits..].strip_prefix(['.', ')'])?;
    after.starts_with(char::is_whitespace).then_some(after)
}

fn clean_token(raw: &str) -> &str {
    raw.trim_matches(TOKEN_TRIM).trim_end_matches('.')
}

fn is_path_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '/' | '@' | '+')
}

fn valid_folder(name: &str) -> bool {
    !name.is_empty()
        && !name.contains("..")
        && name.chars().all(is_path_char)
        && name.chars().any(char::is_alphanumeric)
}

fn tree_path(tree: &[String], depth: Option<usize>, name: &str) -> String {
    match depth {
        Some(depth) if depth > 0 => {
            let parents = &tree[..depth.min(tree.len())];
            if parents.is_empty() {
                name.to_string()
            } else {
                format!("{}/{name}", parents.join("/"))
            }
        }
        _ => name.to_string(),
    }
}
