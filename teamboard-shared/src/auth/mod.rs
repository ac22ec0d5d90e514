/// Access control and invite-token utilities
///
/// # Modules
///
/// - [`authorization`]: the team → project → issue access resolver
/// - [`invite_token`]: random invite tokens with SHA-256 storage hashes
///
/// Password hashing and token verification happen upstream of this crate; every
/// operation here receives an already authenticated user id.

pub mod authorization;
pub mod invite_token;

pub use authorization::{AccessResolver, IssueAccess, ProjectAccess};
