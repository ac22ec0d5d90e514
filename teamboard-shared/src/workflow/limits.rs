/// Per-resource creation limits
///
/// Limits are checked only when a resource is created, never on later edits.
/// Concurrent creations racing against a limit are not serialized beyond what
/// the store provides.
///
/// | Limit | Value |
/// |-------|-------|
/// | Active issues per project | 200 |
/// | Subtasks per issue | 20 |
/// | Labels per issue (at creation) | 5 |
/// | Active projects per team | 15 |
///
/// # Example
///
/// ```
/// use teamboard_shared::workflow::limits::{LimitCheck, LimitType};
///
/// let check = LimitCheck::evaluate(LimitType::IssuesPerProject, 199);
/// assert!(check.allowed);
/// assert_eq!(check.remaining, 1);
///
/// assert!(LimitType::IssuesPerProject.ensure_below(200).is_err());
/// ```

use crate::error::{CoreError, CoreResult};

pub const MAX_ISSUES_PER_PROJECT: u32 = 200;
pub const MAX_SUBTASKS_PER_ISSUE: u32 = 20;
pub const MAX_LABELS_PER_ISSUE: u32 = 5;
pub const MAX_PROJECTS_PER_TEAM: u32 = 15;

/// Kind of limited resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitType {
    IssuesPerProject,
    SubtasksPerIssue,
    LabelsPerIssue,
    ProjectsPerTeam,
}

impl LimitType {
    /// Human-readable name
    pub fn as_str(&self) -> &'static str {
        match self {
            LimitType::IssuesPerProject => "Issues per project",
            LimitType::SubtasksPerIssue => "Subtasks per issue",
            LimitType::LabelsPerIssue => "Labels per issue",
            LimitType::ProjectsPerTeam => "Projects per team",
        }
    }

    pub fn max(&self) -> u32 {
        match self {
            LimitType::IssuesPerProject => MAX_ISSUES_PER_PROJECT,
            LimitType::SubtasksPerIssue => MAX_SUBTASKS_PER_ISSUE,
            LimitType::LabelsPerIssue => MAX_LABELS_PER_ISSUE,
            LimitType::ProjectsPerTeam => MAX_PROJECTS_PER_TEAM,
        }
    }

    /// Fails with `Validation` unless one more item fits next to `current`
    pub fn ensure_below(&self, current: u32) -> CoreResult<()> {
        let check = LimitCheck::evaluate(*self, current);
        if check.allowed {
            Ok(())
        } else {
            Err(CoreError::validation(format!(
                "{} limit reached ({}/{})",
                self.as_str(),
                check.current,
                check.limit
            )))
        }
    }

    /// Fails with `Validation` when `count` items exceed the limit outright
    pub fn ensure_at_most(&self, count: u32) -> CoreResult<()> {
        if count > self.max() {
            Err(CoreError::validation(format!(
                "{} limit exceeded ({}/{})",
                self.as_str(),
                count,
                self.max()
            )))
        } else {
            Ok(())
        }
    }
}

/// Result of a limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitCheck {
    /// Whether one more item may be created
    pub allowed: bool,

    pub current: u32,

    pub limit: u32,

    pub remaining: u32,
}

impl LimitCheck {
    pub fn evaluate(limit_type: LimitType, current: u32) -> Self {
        let limit = limit_type.max();
        LimitCheck {
            allowed: current < limit,
            current,
            limit,
            remaining: limit.saturating_sub(current),
        }
    }
}

/// Clamps a store count into the `u32` range used by limit checks
pub(crate) fn count_to_u32(count: i64) -> u32 {
    u32::try_from(count.max(0)).unwrap_or(u32::MAX)
}
