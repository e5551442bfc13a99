//! Outcome reporting for best-effort teardown

use serde::Serialize;
use std::fmt;

/// Result of removing a single external resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Removed,
    /// Nothing to remove; counts as success
    AlreadyAbsent,
}

/// What happened to one cleanup step during delete
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "error")]
pub enum StepOutcome {
    Done,
    AlreadyAbsent,
    /// Step does not apply to this project kind
    Skipped,
    Failed(String),
}

impl StepOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, StepOutcome::Failed(_))
    }
}

impl From<Removal> for StepOutcome {
    fn from(removal: Removal) -> Self {
        match removal {
            Removal::Removed => StepOutcome::Done,
            Removal::AlreadyAbsent => StepOutcome::AlreadyAbsent,
        }
    }
}

impl<E: fmt::Display> From<Result<Removal, E>> for StepOutcome {
    fn from(result: Result<Removal, E>) -> Self {
        match result {
            Ok(removal) => removal.into(),
            Err(e) => StepOutcome::Failed(e.to_string()),
        }
    }
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepOutcome::Done => write!(f, "removed"),
            StepOutcome::AlreadyAbsent => write!(f, "already absent"),
            StepOutcome::Skipped => write!(f, "skipped"),
            StepOutcome::Failed(e) => write!(f, "failed: {}", e),
        }
    }
}

/// Per-step outcome of deleting a project. The record is deleted regardless.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub instance: StepOutcome,
    pub routing: StepOutcome,
    pub workdir: StepOutcome,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failures().is_empty()
    }

    pub fn failures(&self) -> Vec<(&'static str, &str)> {
        let mut failures = Vec::new();
        for (step, outcome) in self.steps() {
            if let StepOutcome::Failed(e) = outcome {
                failures.push((step, e.as_str()));
            }
        }
        failures
    }

    pub fn steps(&self) -> [(&'static str, &StepOutcome); 3] {
        [
            ("instance", &self.instance),
            ("routing", &self.routing),
            ("workdir", &self.workdir),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_resources_are_clean() {
        let report = CleanupReport {
            instance: Removal::AlreadyAbsent.into(),
            routing: StepOutcome::AlreadyAbsent,
            workdir: StepOutcome::Skipped,
        };
        assert!(report.is_clean());
    }

    #[test]
    fn test_failures_are_listed_by_step() {
        let report = CleanupReport {
            instance: Err::<Removal, _>("daemon unreachable").into(),
            routing: StepOutcome::Done,
            workdir: StepOutcome::Failed("permission denied".into()),
        };
        assert!(!report.is_clean());
        assert_eq!(
            report.failures(),
            vec![
                ("instance", "daemon unreachable"),
                ("workdir", "permission denied")
            ]
        );
    }

    #[test]
    fn test_serializes_outcomes() {
        let json = serde_json::to_value(StepOutcome::Failed("boom".into())).unwrap();
        assert_eq!(json["outcome"], "failed");
        assert_eq!(json["error"], "boom");
        let json = serde_json::to_value(StepOutcome::Done).unwrap();
        assert_eq!(json["outcome"], "done");
    }
}
