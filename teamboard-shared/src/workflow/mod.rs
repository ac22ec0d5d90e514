/// Workflow: every mutation of teams, projects, issues and comments
///
/// - [`engine`]: issues, subtasks and the audit trail
/// - [`teams`]: teams, invites and memberships
/// - [`projects`]: projects, status columns and labels
/// - [`comments`]: issue comments
/// - [`history`]: field-level change detection
/// - [`limits`]: creation limits
///
/// Each service resolves access first, then validates, then writes.

pub mod comments;
pub mod engine;
pub mod history;
pub mod limits;
pub mod projects;
pub mod teams;

pub use comments::CommentService;
pub use engine::WorkflowEngine;
pub use projects::ProjectService;
pub use teams::{IssuedInvite, TeamService};
