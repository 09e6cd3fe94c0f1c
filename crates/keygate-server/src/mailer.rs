//! Outbound mail at the collaborator boundary.
//!
//! The core only needs the [`MailSender`] contract; the actual relay is
//! deployment-specific. This implementation records the delivery in the
//! log stream without the code itself, so a misconfigured environment
//! never leaks live challenges into log storage.

use keygate_core::repository::MailSender;
use tracing::info;

/// Log-only mail sender.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

impl MailSender for LogMailer {
    async fn send_activation_code(
        &self,
        recipient: &str,
        code: &str,
    ) -> keygate_core::Result<()> {
        info!(
            recipient,
            code_len = code.len(),
            "activation code dispatched"
        );
        Ok(())
    }
}
