//! Violation records and the consolidated report raised as a test failure.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a violation, axe-flavoured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Minor,
    Moderate,
    Serious,
    Critical,
}

impl fmt::Display for Impact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Impact::Minor => "minor",
            Impact::Moderate => "moderate",
            Impact::Serious => "serious",
            Impact::Critical => "critical",
        };
        f.write_str(label)
    }
}

/// One reported accessibility rule failure for one DOM node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Rule identifier, e.g. "image-alt"
    pub rule: String,
    /// Human-readable description of the failure
    pub description: String,
    pub impact: Impact,
    /// Selector hint for the affected node
    pub selector: String,
}

/// One line of a consolidated report; `occurrences` counts merged duplicates
#[derive(Debug, Clone, Serialize)]
pub struct ReportEntry {
    #[serde(flatten)]
    pub violation: Violation,
    pub occurrences: usize,
}

/// All violations from one check cycle, raised as a single error
#[derive(Debug, Clone, Serialize)]
pub struct ViolationReport {
    pub entries: Vec<ReportEntry>,
}

impl ViolationReport {
    /// Total findings including merged duplicates
    pub fn total(&self) -> usize {
        self.entries.iter().map(|e| e.occurrences).sum()
    }

    /// JSON view of the report for tooling
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "[]".to_string())
    }
}

impl fmt::Display for ViolationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} accessibility violation(s) detected:",
            self.total()
        )?;
        for entry in &self.entries {
            write!(
                f,
                "  [{}] {} on {}: {}",
                entry.violation.impact,
                entry.violation.rule,
                entry.violation.selector,
                entry.violation.description
            )?;
            if entry.occurrences > 1 {
                write!(f, " (x{})", entry.occurrences)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Merge violations sharing rule and selector into one entry each
pub fn consolidate(violations: Vec<Violation>) -> Vec<ReportEntry> {
    let mut entries: Vec<ReportEntry> = Vec::new();
    for violation in violations {
        match entries.iter_mut().find(|e| {
            e.violation.rule == violation.rule && e.violation.selector == violation.selector
        }) {
            Some(entry) => entry.occurrences += 1,
            None => entries.push(ReportEntry {
                violation,
                occurrences: 1,
            }),
        }
    }
    entries
}

/// Raise a consolidated error if the list is non-empty
///
/// With `consolidate` set, duplicates (same rule + selector) merge into one
/// entry; otherwise every violation gets its own line.
pub fn check_and_raise(violations: Vec<Violation>, consolidate_results: bool) -> Result<()> {
    if violations.is_empty() {
        return Ok(());
    }
    let entries = if consolidate_results {
        consolidate(violations)
    } else {
        violations
            .into_iter()
            .map(|violation| ReportEntry {
                violation,
                occurrences: 1,
            })
            .collect()
    };
    Err(Error::Violations(ViolationReport { entries }))
}

/// Environment variable naming selector keywords to drop from reports
pub const SELECTOR_FILTER_ENV: &str = "SELECTOR_FILTER_KEYWORDS";

/// Keywords from `SELECTOR_FILTER_KEYWORDS`, comma-separated
pub fn selector_filter_from_env() -> Vec<String> {
    match std::env::var(SELECTOR_FILTER_ENV) {
        Ok(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Err(_) => Vec::new(),
    }
}

/// Drop violations whose selector contains any keyword (case-sensitive)
pub fn apply_selector_filter(violations: Vec<Violation>, keywords: &[String]) -> Vec<Violation> {
    if keywords.is_empty() {
        return violations;
    }
    violations
        .into_iter()
        .filter(|v| !keywords.iter().any(|k| v.selector.contains(k)))
        .collect()
}
