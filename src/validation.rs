//! Validation alert panel and the acknowledgement report.

use crate::error::TransferError;
use crate::types::{Severity, ValidationIssue, ValidationSummary};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PanelState {
    Hidden,
    VisibleInfo,
    VisibleWarning,
    VisibleError,
}

impl PanelState {
    /// CSS class for the alert box; hidden panels have none.
    pub fn css_class(&self) -> Option<&'static str> {
        match self {
            PanelState::Hidden => None,
            PanelState::VisibleInfo => Some("info"),
            PanelState::VisibleWarning => Some("warning"),
            PanelState::VisibleError => Some("error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationPanel {
    pub state: PanelState,
    pub summary_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<ValidationSummary>,
}

fn plural(n: u32, word: &str) -> String {
    format!("{} {}{}", n, word, if n == 1 { "" } else { "s" })
}

impl ValidationPanel {
    pub fn hidden() -> Self {
        Self {
            state: PanelState::Hidden,
            summary_text: String::new(),
            summary: None,
        }
    }

    pub fn from_summary(summary: &ValidationSummary) -> Self {
        if summary.total_issues == 0 {
            return Self::hidden();
        }
        let state = if summary.errors > 0 {
            PanelState::VisibleError
        } else if summary.warnings > 0 {
            PanelState::VisibleWarning
        } else {
            PanelState::VisibleInfo
        };

        let mut text = format!("{} found", plural(summary.total_issues, "issue"));
        if summary.errors > 0 {
            text.push_str(&format!(" ({})", plural(summary.errors, "error")));
        }
        if summary.warnings > 0 {
            text.push_str(&format!(" ({})", plural(summary.warnings, "warning")));
        }
        if summary.info > 0 {
            text.push_str(&format!(" ({} info)", summary.info));
        }

        Self {
            state,
            summary_text: text,
            summary: Some(summary.clone()),
        }
    }

    pub fn is_visible(&self) -> bool {
        self.state != PanelState::Hidden
    }

    /// Lines of the detail report shown when the user opens the panel.
    pub fn report_lines(&self) -> Vec<String> {
        let Some(s) = &self.summary else {
            return vec!["No validation issues.".to_string()];
        };
        let mut lines = vec![
            "Validation Summary".to_string(),
            format!("Total Issues: {}", s.total_issues),
            format!("Errors: {}", s.errors),
            format!("Warnings: {}", s.warnings),
            format!("Info: {}", s.info),
            format!("Unacknowledged: {}", s.unacknowledged),
        ];
        if !s.issues_by_type.is_empty() {
            lines.push("Issues by Type".to_string());
            lines.extend(
                s.issues_by_type
                    .iter()
                    .map(|(kind, count)| format!("{}: {}", kind, count)),
            );
        }
        lines
    }
}

/// Unacknowledged warnings, in server order.
pub fn pending_warnings(issues: &[ValidationIssue]) -> Vec<&ValidationIssue> {
    issues
        .iter()
        .filter(|i| i.severity == Severity::Warning && !i.acknowledged)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedAcknowledgement {
    pub issue_id: i64,
    pub reason: String,
}

/// Outcome of acknowledging warnings one by one. Nothing is rolled back on failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AcknowledgeReport {
    pub acknowledged: Vec<i64>,
    pub failed: Vec<FailedAcknowledgement>,
}

impl AcknowledgeReport {
    pub fn record(&mut self, issue_id: i64, outcome: Result<(), TransferError>) {
        match outcome {
            Ok(()) => self.acknowledged.push(issue_id),
            Err(e) => self.failed.push(FailedAcknowledgement {
                issue_id,
                reason: e.to_string(),
            }),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn message(&self) -> String {
        if self.acknowledged.is_empty() && self.failed.is_empty() {
            return "No warnings to acknowledge.".to_string();
        }
        if self.failed.is_empty() {
            return "All warnings acknowledged successfully!".to_string();
        }
        let ids = self
            .failed
            .iter()
            .map(|f| format!("#{} ({})", f.issue_id, f.reason))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "Acknowledged {} of {} warnings. Failed: {}",
            self.acknowledged.len(),
            self.acknowledged.len() + self.failed.len(),
            ids
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(errors: u32, warnings: u32, info: u32) -> ValidationSummary {
        ValidationSummary {
            total_issues: errors + warnings + info,
            errors,
            warnings,
            info,
            unacknowledged: errors + warnings + info,
            ..Default::default()
        }
    }

    #[test]
    fn no_issues_is_hidden() {
        let panel = ValidationPanel::from_summary(&summary(0, 0, 0));
        assert_eq!(panel.state, PanelState::Hidden);
        assert!(!panel.is_visible());
    }

    #[test]
    fn errors_outrank_warnings() {
        let panel = ValidationPanel::from_summary(&summary(1, 2, 0));
        assert_eq!(panel.state, PanelState::VisibleError);
        assert_eq!(panel.summary_text, "3 issues found (1 error) (2 warnings)");
        assert_eq!(panel.state.css_class(), Some("error"));
    }

    #[test]
    fn warning_and_info_states() {
        assert_eq!(
            ValidationPanel::from_summary(&summary(0, 1, 3)).state,
            PanelState::VisibleWarning
        );
        let info = ValidationPanel::from_summary(&summary(0, 0, 1));
        assert_eq!(info.state, PanelState::VisibleInfo);
        assert_eq!(info.summary_text, "1 issue found (1 info)");
    }

    #[test]
    fn report_lists_issue_types() {
        let mut s = summary(1, 1, 0);
        s.issues_by_type.insert("MATH_ERROR".into(), 2);
        let lines = ValidationPanel::from_summary(&s).report_lines();
        assert!(lines.contains(&"Unacknowledged: 2".to_string()));
        assert_eq!(lines.last().unwrap(), "MATH_ERROR: 2");
    }

    #[test]
    fn report_message_lists_failures() {
        let mut report = AcknowledgeReport::default();
        report.record(1, Ok(()));
        report.record(
            2,
            Err(TransferError::Http {
                status: 500,
                message: "Internal Server Error".into(),
            }),
        );
        assert!(!report.is_complete());
        assert_eq!(
            report.message(),
            "Acknowledged 1 of 2 warnings. Failed: #2 (Internal Server Error)"
        );
    }
}
