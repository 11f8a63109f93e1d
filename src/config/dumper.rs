//! Byte-stable serializer for the configuration text format.
//!
//! Re-loading dumped output reproduces an equal tree: states, comments
//! and multi-line values all round-trip. Sections and options are sorted
//! by a pluggable comparator so output order does not depend on mutation
//! history.

use std::cmp::Ordering;
use std::path::Path;

use crate::config::node::Node;
use crate::config::parser::{ASSIGN_CHAR, COMMENT_CHAR};
use crate::error::ConfigError;
use crate::meta::ids;

/// Name comparator used to order sections and options on output.
pub type Comparator = fn(&str, &str) -> Ordering;

/// Default comparator: lexicographic, except that duplicate-index
/// suffixes compare numerically — `foo(2)` sorts before `foo(10)`.
#[must_use]
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let base_a = ids::section_base(a);
    let base_b = ids::section_base(b);
    if base_a == base_b
        && let (Some(ia), Some(ib)) =
            (ids::duplicate_index(a), ids::duplicate_index(b))
        && ia != ib
    {
        return ia.cmp(&ib);
    }
    a.cmp(b)
}

/// Serialize a tree with the default comparator.
#[must_use]
pub fn dump_string(root: &Node) -> String {
    dump_string_with(root, natural_cmp)
}

/// Serialize a tree, ordering names with `cmp`.
#[must_use]
pub fn dump_string_with(root: &Node, cmp: Comparator) -> String {
    let mut out = String::new();
    for comment in &root.comments {
        push_comment(&mut out, comment);
    }
    let Some(children) = root.children() else {
        return out;
    };

    let mut names: Vec<&str> =
        children.iter().map(|(name, _)| name.as_str()).collect();
    names.sort_by(|a, b| cmp(a, b));

    // Root-level options first, then sections.
    for &name in &names {
        if let Some(node) = root.child(name)
            && node.is_leaf()
        {
            push_option(&mut out, name, node);
        }
    }
    for &name in &names {
        if let Some(node) = root.child(name)
            && !node.is_leaf()
        {
            push_section(&mut out, name, node, cmp);
        }
    }
    out
}

/// Serialize a tree to a file with the default comparator.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when the file cannot be written.
pub fn dump_file(root: &Node, path: &Path) -> Result<(), ConfigError> {
    std::fs::write(path, dump_string(root)).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn push_comment(out: &mut String, comment: &str) {
    out.push(COMMENT_CHAR);
    out.push_str(comment);
    out.push('\n');
}

fn push_section(out: &mut String, name: &str, node: &Node, cmp: Comparator) {
    for comment in &node.comments {
        push_comment(out, comment);
    }
    out.push('[');
    out.push_str(node.state.marker());
    out.push_str(name);
    out.push_str("]\n");

    let Some(children) = node.children() else {
        return;
    };
    let mut names: Vec<&str> =
        children.iter().map(|(n, _)| n.as_str()).collect();
    names.sort_by(|a, b| cmp(a, b));
    for child_name in names {
        if let Some(child) = node.child(child_name) {
            if child.is_leaf() {
                push_option(out, child_name, child);
            } else {
                // Nested sections do not occur in the text format; any
                // that were built programmatically dump flat underneath.
                push_section(out, child_name, child, cmp);
            }
        }
    }
}

fn push_option(out: &mut String, key: &str, node: &Node) {
    for comment in &node.comments {
        push_comment(out, comment);
    }
    let value = node.value().unwrap_or_default();
    let mut lines = value.split('\n');
    out.push_str(node.state.marker());
    out.push_str(key);
    out.push(ASSIGN_CHAR);
    out.push_str(lines.next().unwrap_or_default());
    out.push('\n');
    for line in lines {
        // Continuation lines: indented, with a leading assignment
        // character the loader strips back off.
        out.push_str("    ");
        out.push(ASSIGN_CHAR);
        out.push_str(line);
        out.push('\n');
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::node::NodeState;
    use crate::config::parser::parse_str;

    fn round_trip(text: &str) -> String {
        let root = parse_str(text, "<test>").expect("fixture should parse");
        dump_string(&root)
    }

    #[test]
    fn dump_preserves_ignore_markers() {
        let text = "[foo]\nbar=Bar\n!baz=Baz\n";
        assert_eq!(round_trip(text), text);
    }

    #[test]
    fn dump_sorts_options_within_sections() {
        assert_eq!(round_trip("[s]\nb=2\na=1\n"), "[s]\na=1\nb=2\n");
    }

    #[test]
    fn dump_emits_root_options_before_sections() {
        assert_eq!(
            round_trip("[s]\nk=1\n"),
            "[s]\nk=1\n"
        );
        assert_eq!(round_trip("z=9\n[a]\nk=1\n"), "z=9\n[a]\nk=1\n");
    }

    #[test]
    fn dump_numeric_suffixes_sort_numerically() {
        let text = "[foo(10)]\n[foo(2)]\n";
        assert_eq!(round_trip(text), "[foo(2)]\n[foo(10)]\n");
    }

    #[test]
    fn natural_cmp_falls_back_to_lexicographic() {
        assert_eq!(natural_cmp("alpha", "beta"), Ordering::Less);
        assert_eq!(natural_cmp("foo(2)", "foo(10)"), Ordering::Less);
        assert_eq!(natural_cmp("foo(2)", "bar(10)"), Ordering::Greater);
    }

    #[test]
    fn dump_multi_line_values_use_continuations() {
        let root = {
            let mut r = Node::section();
            r.set(&["s", "key"], Node::leaf("one\ntwo"));
            r
        };
        assert_eq!(dump_string(&root), "[s]\nkey=one\n    =two\n");
    }

    #[test]
    fn load_dump_load_is_identity() {
        let text = "# top note\nroot=1\n[!alpha]\n# why\na=x\n!!b=y\n    =more\n[beta(2)]\nc=z\n";
        let first = parse_str(text, "<test>").unwrap();
        let dumped = dump_string(&first);
        let second = parse_str(&dumped, "<test>").unwrap();
        assert_eq!(first, second);
        // And dumping again is byte-stable.
        assert_eq!(dump_string(&second), dumped);
    }

    #[test]
    fn dump_section_comments_precede_header() {
        let text = "# note\n[s]\nk=1\n";
        assert_eq!(round_trip(text), text);
    }

    #[test]
    fn dump_file_and_load_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.conf");
        let mut root = Node::section();
        root.set(
            &["s", "k"],
            Node::leaf("v").with_state(NodeState::UserIgnored),
        );
        dump_file(&root, &path).unwrap();
        let loaded = crate::config::parser::load_file(&path).unwrap();
        assert_eq!(loaded, root);
    }
}
