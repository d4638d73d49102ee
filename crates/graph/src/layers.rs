use crate::config::LayoutConfig;
use crate::types::{Node, NodeKind};

/// Layer and priority of a node from its kind and path keywords.
///
/// Documentation and tests have fixed slots; everything else takes the first
/// rule with a keyword matching one of the path's words.
pub fn classify(node: &Node, config: &LayoutConfig) -> (u8, i32) {
    match node.kind {
        NodeKind::Documentation => {
            return (config.documentation_layer, config.documentation_priority)
        }
        NodeKind::Test => return (config.test_layer, config.test_priority),
        _ => {}
    }

    let words = path_words(node.path().unwrap_or(&node.label));
    config
        .layer_rules
        .iter()
        .find(|rule| {
            rule.keywords
                .iter()
                .any(|keyword| words.iter().any(|word| word_matches(word, keyword)))
        })
        .map(|rule| (rule.layer, rule.priority))
        .unwrap_or((config.default_layer, config.default_priority))
}

/// Fill `layer`/`priority` where the node has none yet
pub fn assign(node: &mut Node, config: &LayoutConfig) {
    if node.layer.is_some() && node.priority.is_some() {
        return;
    }
    let (layer, priority) = classify(node, config);
    node.layer.get_or_insert(layer);
    node.priority.get_or_insert(priority);
}

/// Lowercased alphanumeric words of a path, extension excluded
fn path_words(path: &str) -> Vec<String> {
    let without_ext = match path.rsplit_once('.') {
        Some((stem, ext)) if !ext.contains('/') && !stem.is_empty() => stem,
        _ => path,
    };
    without_ext
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_ascii_lowercase)
        .collect()
}

/// Short keywords (`db`, `app`) must match a whole word; longer ones may
/// prefix it (`router` matches `routers`).
fn word_matches(word: &str, keyword: &str) -> bool {
    let keyword = keyword.to_ascii_lowercase();
    word == keyword || (keyword.len() >= 4 && word.starts_with(&keyword))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use synapse_protocol::FileKind;

    fn layer_of(path: &str) -> (u8, i32) {
        classify(
            &Node::file(path, FileKind::from_path(path)),
            &LayoutConfig::default(),
        )
    }

    #[test]
    fn keywords_pick_layers() {
        assert_eq!(layer_of("src/main.py"), (0, 100));
        assert_eq!(layer_of("src/scanner.rs"), (0, 100));
        assert_eq!(layer_of("core/routers/chat.ts"), (1, 50));
        assert_eq!(layer_of("src/prompt_builder.py"), (1, 50));
        assert_eq!(layer_of("src/db/session.py"), (2, 20));
        assert_eq!(layer_of("src/storage_manager.go"), (2, 20));
        assert_eq!(layer_of("src/helpers.py"), (1, 0));
    }

    #[test]
    fn short_keywords_need_whole_words() {
        assert_eq!(layer_of("src/dbus_bridge.c"), (1, 0));
        assert_eq!(layer_of("src/application.py"), (1, 0));
    }

    #[test]
    fn documentation_and_tests_have_fixed_slots() {
        assert_eq!(layer_of("docs/main.md"), (0, -100));
        assert_eq!(layer_of("tests/test_main.py"), (2, -50));
    }

    #[test]
    fn assign_keeps_explicit_values() {
        let mut node = Node::file("src/main.py", FileKind::Source);
        node.layer = Some(2);
        assign(&mut node, &LayoutConfig::default());
        assert_eq!((node.layer, node.priority), (Some(2), Some(100)));
    }
}
