/// Log-only mailer
///
/// SMTP delivery is not part of this deployment. Invites are written to the log
/// instead, without the token.

use async_trait::async_trait;
use teamboard_shared::notify::{MailError, Mailer};

#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_invite(
        &self,
        to: &str,
        team_name: &str,
        inviter_name: &str,
        _token: &str,
    ) -> Result<(), MailError> {
        tracing::info!(
            to = %to,
            team = %team_name,
            inviter = %inviter_name,
            "Invite email suppressed (no mail transport configured)"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_mailer_never_fails() {
        let mailer = LogMailer;
        assert!(mailer
            .send_invite("bob@example.com", "Platform", "Alice", "tbinv_x")
            .await
            .is_ok());
    }
}
