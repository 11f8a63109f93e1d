//! Canonical setting identifiers.
//!
//! A setting id is `"section"` or `"section=option"`. A duplicated
//! section family uses an index suffix `"section(N)"`, and a further
//! modifier suffix `"section{M}"` may be present, in that order:
//! `base{modifier}(index)`.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

#[allow(clippy::expect_used)] // patterns are compile-time constants
fn section_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<base>[^({]+)(?:\{(?P<modifier>[^}]*)\})?(?:\((?P<index>\d+)\))?$")
            .expect("section id pattern is valid")
    })
}

/// A parsed setting id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SettingId {
    /// The section part, including any modifier/index decoration.
    pub section: String,
    /// The option part, when the id names an option rather than a section.
    pub option: Option<String>,
}

impl SettingId {
    /// Parse a canonical id string at the first `=`.
    #[must_use]
    pub fn parse(id: &str) -> Self {
        match id.split_once('=') {
            Some((section, option)) => Self {
                section: section.trim().to_string(),
                option: Some(option.trim().to_string()),
            },
            None => Self {
                section: id.trim().to_string(),
                option: None,
            },
        }
    }

    /// Construct from parts.
    #[must_use]
    pub fn new(section: impl Into<String>, option: Option<String>) -> Self {
        Self {
            section: section.into(),
            option,
        }
    }

    /// The section name with modifier and duplicate-index stripped.
    #[must_use]
    pub fn section_base(&self) -> &str {
        section_base(&self.section)
    }

    /// The duplicate index of the section, if decorated with one.
    #[must_use]
    pub fn duplicate_index(&self) -> Option<usize> {
        duplicate_index(&self.section)
    }

    /// The id with modifier and index decoration removed from the
    /// section part — the form under which metadata is declared.
    #[must_use]
    pub fn base_id(&self) -> String {
        match &self.option {
            Some(option) => format!("{}={option}", self.section_base()),
            None => self.section_base().to_string(),
        }
    }

    /// The same option addressed in another section instance.
    #[must_use]
    pub fn in_section(&self, section: &str) -> Self {
        Self {
            section: section.to_string(),
            option: self.option.clone(),
        }
    }
}

impl fmt::Display for SettingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.option {
            Some(option) => write!(f, "{}={option}", self.section),
            None => write!(f, "{}", self.section),
        }
    }
}

/// Strip modifier (`{M}`) and duplicate-index (`(N)`) decoration from a
/// section name. Undecorated names come back unchanged.
#[must_use]
pub fn section_base(section: &str) -> &str {
    section_re()
        .captures(section)
        .and_then(|c| c.name("base"))
        .map_or(section, |m| m.as_str())
}

/// The duplicate index of a decorated section name, if present.
#[must_use]
pub fn duplicate_index(section: &str) -> Option<usize> {
    let caps = section_re().captures(section)?;
    caps.name("index")?.as_str().parse().ok()
}

/// Rewrite a section name to address a specific duplicate instance,
/// preserving any modifier decoration.
#[must_use]
pub fn with_index(section: &str, index: usize) -> String {
    let caps = section_re().captures(section);
    let (base, modifier) = caps.map_or((section, None), |c| {
        (
            c.name("base").map_or(section, |m| m.as_str()),
            c.name("modifier").map(|m| m.as_str().to_string()),
        )
    });
    match modifier {
        Some(m) => format!("{base}{{{m}}}({index})"),
        None => format!("{base}({index})"),
    }
}
