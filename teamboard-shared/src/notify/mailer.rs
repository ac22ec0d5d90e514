/// Outbound email collaborator
///
/// Transport (SMTP or otherwise) lives outside this crate. Callers log and
/// ignore mail failures.

use async_trait::async_trait;

/// Error returned by a [`Mailer`]
#[derive(Debug, thiserror::Error)]
#[error("Mail delivery failed: {0}")]
pub struct MailError(pub String);

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Sends a team invitation carrying the plaintext invite token
    async fn send_invite(
        &self,
        to: &str,
        team_name: &str,
        inviter_name: &str,
        token: &str,
    ) -> Result<(), MailError>;
}
