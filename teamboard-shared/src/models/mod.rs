/// Domain models for Teamboard
///
/// Plain data types shared by the persistence layer and the core services.
/// Soft-deletable records carry a [`lifecycle::Lifecycle`] tag instead of a
/// nullable deletion column.
///
/// # Models
///
/// - `user`: user accounts
/// - `team`: teams and invites
/// - `membership`: `(team, user, role)` records and the role hierarchy
/// - `project`: projects, board statuses and labels
/// - `issue`: issues, subtasks and the issue read model
/// - `history`: append-only issue audit rows
/// - `comment`: issue comments
/// - `notification`: user notifications

pub mod comment;
pub mod history;
pub mod issue;
pub mod lifecycle;
pub mod membership;
pub mod notification;
pub mod project;
pub mod team;
pub mod user;
