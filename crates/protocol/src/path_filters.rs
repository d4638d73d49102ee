/// Canonical form of a project-relative path: forward slashes, no leading
/// `./`, no leading or trailing `/`.
pub fn normalize_path(raw: &str) -> String {
    let mut value = raw.trim().replace('\\', "/");
    while let Some(rest) = value.strip_prefix("./") {
        value = rest.to_string();
    }
    let value = value.trim_matches('/');
    if value == "." {
        return String::new();
    }
    value.to_string()
}

/// A scope is active when at least one entry survives normalization.
pub fn scope_is_active(scope: &[String]) -> bool {
    scope.iter().any(|entry| !normalize_path(entry).is_empty())
}

/// Scope allow-list check. Entries are path prefixes (`src`, `lib/core`) or
/// glob patterns (`src/*.py`). An inactive scope admits everything.
pub fn path_in_scope(rel_path: &str, scope: &[String]) -> bool {
    let rel_path = normalize_path(rel_path);
    let mut has_valid_entry = false;

    for entry in scope {
        let normalized = normalize_path(entry);
        if normalized.is_empty() {
            continue;
        }
        has_valid_entry = true;

        if normalized.contains('*') || normalized.contains('?') {
            if glob::Pattern::new(&normalized)
                .map(|p| p.matches(&rel_path))
                .unwrap_or(false)
            {
                return true;
            }
            continue;
        }

        if path_prefix_matches_normalized(&normalized, &rel_path) {
            return true;
        }
    }

    !has_valid_entry
}

fn path_prefix_matches_normalized(prefix: &str, path: &str) -> bool {
    if path == prefix {
        return true;
    }

    if !path.starts_with(prefix) {
        return false;
    }

    path.as_bytes().get(prefix.len()) == Some(&b'/')
}
