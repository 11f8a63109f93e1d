//! Line-based loader for the configuration text format.
//!
//! The format is INI-like: `[STATE NAME]` section headers, `STATE
//! KEY=VALUE` option lines, `#` comments attaching to the following
//! setting, and indented continuation lines extending the current
//! option's value. STATE is the ignore marker: empty, `!` (user-ignored)
//! or `!!` (system-ignored).

use std::path::Path;

use crate::config::node::{Node, NodeData, NodeState};
use crate::error::ConfigError;

/// The assignment character of the text format.
pub const ASSIGN_CHAR: char = '=';

/// The comment character of the text format.
pub const COMMENT_CHAR: char = '#';

/// Parse a configuration file from disk.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when the file cannot be read,
/// [`ConfigError::Decode`] for non-UTF8 content, and
/// [`ConfigError::Syntax`] for malformed lines.
pub fn load_file(path: &Path) -> Result<Node, ConfigError> {
    let bytes = std::fs::read(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let text = String::from_utf8(bytes).map_err(|_| ConfigError::Decode {
        file: path.display().to_string(),
    })?;
    parse_str(&text, &path.display().to_string())
}

/// Parse configuration text. `file` labels syntax errors.
///
/// # Errors
///
/// Returns [`ConfigError::Syntax`] for a line that is neither a section
/// header, an option, a comment, a blank line nor a continuation.
pub fn parse_str(text: &str, file: &str) -> Result<Node, ConfigError> {
    let mut root = Node::section();
    let mut pending_comments: Vec<String> = Vec::new();
    // Open section/option tracked by name; lookups re-walk the tree.
    let mut current_section: Option<String> = None;
    let mut current_option: Option<String> = None;

    for (index, line) in text.lines().enumerate() {
        let line_no = index + 1;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            // A blank line resets pending comments.
            pending_comments.clear();
            continue;
        }

        if line.starts_with([' ', '\t']) {
            if let Some(option) = &current_option {
                append_continuation(
                    &mut root,
                    current_section.as_deref(),
                    option,
                    line,
                );
                continue;
            }
            return Err(syntax_error(file, line_no, line));
        }

        if let Some(comment) = trimmed.strip_prefix(COMMENT_CHAR) {
            pending_comments.push(comment.to_string());
            continue;
        }

        if trimmed.starts_with('[') {
            let (state, name) = parse_section_header(trimmed)
                .ok_or_else(|| syntax_error(file, line_no, line))?;
            open_section(&mut root, name, state, &mut pending_comments);
            current_section = Some(name.to_string());
            current_option = None;
            continue;
        }

        if let Some((state, key, value)) = parse_option_line(trimmed) {
            let node = Node {
                data: NodeData::Leaf(value.to_string()),
                state,
                comments: std::mem::take(&mut pending_comments),
            };
            match &current_section {
                Some(section) => root.set(&[section.as_str(), key], node),
                None => root.set(&[key], node),
            }
            current_option = Some(key.to_string());
            continue;
        }

        return Err(syntax_error(file, line_no, line));
    }

    Ok(root)
}

/// Split a leading ignore marker (`!!` before `!`) off a line.
fn split_marker(text: &str) -> (NodeState, &str) {
    if let Some(rest) = text.strip_prefix("!!") {
        (NodeState::SystemIgnored, rest)
    } else if let Some(rest) = text.strip_prefix('!') {
        (NodeState::UserIgnored, rest)
    } else {
        (NodeState::Normal, text)
    }
}

/// Parse `[STATE NAME]`, validating the bracket content.
fn parse_section_header(trimmed: &str) -> Option<(NodeState, &str)> {
    let inner = trimmed.strip_prefix('[')?.strip_suffix(']')?;
    if inner.contains(['[', ']']) {
        return None;
    }
    let (state, name) = split_marker(inner.trim());
    let name = name.trim();
    if name.is_empty() || !brackets_are_sound(name) {
        return None;
    }
    Some((state, name))
}

/// Scheme-decorated section names may carry `{modifier}` and `(index)`
/// decoration; reject unbalanced or misordered bracketing.
fn brackets_are_sound(name: &str) -> bool {
    let mut paren = 0i32;
    let mut brace = 0i32;
    for c in name.chars() {
        match c {
            '(' => paren += 1,
            ')' => paren -= 1,
            '{' => brace += 1,
            '}' => brace -= 1,
            _ => {}
        }
        if paren < 0 || brace < 0 {
            return false;
        }
    }
    paren == 0 && brace == 0
}

/// Parse `STATE KEY=VALUE`. Returns `None` when no assignment is present
/// or the key is empty.
fn parse_option_line(trimmed: &str) -> Option<(NodeState, &str, &str)> {
    let (state, rest) = split_marker(trimmed);
    let (key, value) = rest.split_once(ASSIGN_CHAR)?;
    let key = key.trim();
    if key.is_empty() || key.contains(['[', ']']) {
        return None;
    }
    Some((state, key, value.trim()))
}

/// Open (or re-open) a section, merging state and comments when the name
/// was already declared.
fn open_section(
    root: &mut Node,
    name: &str,
    state: NodeState,
    pending_comments: &mut Vec<String>,
) {
    let comments = std::mem::take(pending_comments);
    if let Some(existing) = root.child_mut(name) {
        existing.state = state;
        existing.comments.extend(comments);
    } else {
        let mut node = Node::section().with_state(state);
        node.comments = comments;
        root.set(&[name], node);
    }
}

/// Append a continuation line to the currently open option. The
/// continuation's own leading assignment character, if present, is
/// stripped and the remainder appended after a newline.
fn append_continuation(
    root: &mut Node,
    section: Option<&str>,
    option: &str,
    line: &str,
) {
    let stripped = line.trim_start();
    let stripped = stripped.strip_prefix(ASSIGN_CHAR).unwrap_or(stripped);
    let node = match section {
        Some(section) => root.get_mut(&[section, option]),
        None => root.get_mut(&[option]),
    };
    if let Some(node) = node
        && let NodeData::Leaf(value) = &mut node.data
    {
        value.push('\n');
        value.push_str(stripped.trim_end());
    }
}

fn syntax_error(file: &str, line_no: usize, line: &str) -> ConfigError {
    let col = line.len() - line.trim_start().len();
    ConfigError::Syntax {
        file: file.to_string(),
        line: line_no,
        col,
        text: line.to_string(),
    }
}
