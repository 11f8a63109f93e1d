//! The report record emitted by checkers and the trigger engine.
//!
//! An ordered sequence of [`Report`]s is the sole output contract of
//! every checker invocation: validators emit problem reports,
//! transformers emit change reports.

use serde::Serialize;

use crate::meta::SettingId;

/// One issue or change, tied to a setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    /// Section of the setting the report concerns.
    pub section: String,
    /// Option within the section, when the report concerns an option.
    pub option: Option<String>,
    /// The setting's value at report time, when it had one.
    pub value: Option<String>,
    /// Human-readable description of the issue or change.
    pub info: String,
    /// Whether this is a warning rather than a failure/change.
    pub is_warning: bool,
}

impl Report {
    /// Create a failure/change report.
    #[must_use]
    pub fn new(
        section: impl Into<String>,
        option: Option<String>,
        value: Option<String>,
        info: impl Into<String>,
    ) -> Self {
        Self {
            section: section.into(),
            option,
            value,
            info: info.into(),
            is_warning: false,
        }
    }

    /// Create a warning report.
    #[must_use]
    pub fn warning(
        section: impl Into<String>,
        option: Option<String>,
        value: Option<String>,
        info: impl Into<String>,
    ) -> Self {
        Self {
            is_warning: true,
            ..Self::new(section, option, value, info)
        }
    }

    /// Create a report for a parsed setting id.
    #[must_use]
    pub fn for_id(
        id: &SettingId,
        value: Option<String>,
        info: impl Into<String>,
    ) -> Self {
        Self::new(id.section.clone(), id.option.clone(), value, info)
    }

    /// The setting id this report concerns.
    #[must_use]
    pub fn id(&self) -> SettingId {
        SettingId::new(self.section.clone(), self.option.clone())
    }
}

impl std::fmt::Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = if self.is_warning { "warn" } else { "fail" };
        write!(f, "{kind}: {}", self.id())?;
        if let Some(value) = &self.value {
            write!(f, "={value}")?;
        }
        write!(f, ": {}", self.info)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_id_value_and_info() {
        let report = Report::new(
            "namelist:run",
            Some("switch".to_string()),
            Some(".false.".to_string()),
            "enabled -> trig-ignored",
        );
        assert_eq!(
            report.to_string(),
            "fail: namelist:run=switch=.false.: enabled -> trig-ignored"
        );
    }

    #[test]
    fn warning_sets_flag() {
        let report = Report::warning("s", None, None, "odd");
        assert!(report.is_warning);
        assert!(report.to_string().starts_with("warn:"));
    }

    #[test]
    fn serializes_to_json() {
        let report = Report::new("s", Some("o".to_string()), None, "bad");
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"section\":\"s\""));
        assert!(json.contains("\"is_warning\":false"));
    }
}
