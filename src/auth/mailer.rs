// Recovery e-mail delivery

use thiserror::Error;
use tracing::{debug, info};
use url::Url;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid recovery link base '{0}'")]
    InvalidLink(String),
    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// A password-recovery message addressed to one user
#[derive(Debug, Clone)]
pub struct RecoveryEmail {
    pub to_email: String,
    pub to_name: String,
    pub link: Url,
    pub valid_for_minutes: i64,
}

impl RecoveryEmail {
    /// Build the message, linking to `{frontend_url}/redefinir-senha?token=..&email=..`
    pub fn new(
        frontend_url: &str,
        to_email: &str,
        to_name: &str,
        token: &str,
        valid_for_minutes: i64,
    ) -> Result<Self, MailError> {
        let base = format!("{}/redefinir-senha", frontend_url.trim_end_matches('/'));
        let mut link =
            Url::parse(&base).map_err(|_| MailError::InvalidLink(frontend_url.to_string()))?;
        link.query_pairs_mut()
            .append_pair("token", token)
            .append_pair("email", to_email);

        Ok(Self {
            to_email: to_email.to_string(),
            to_name: to_name.to_string(),
            link,
            valid_for_minutes,
        })
    }

    pub fn subject(&self) -> &'static str {
        "Recuperação de Senha"
    }

    pub fn body(&self) -> String {
        format!(
            "Olá {},\n\n\
             Você solicitou a recuperação de senha para sua conta.\n\n\
             Clique no link abaixo para redefinir sua senha:\n{}\n\n\
             Este link expira em {} minutos.\n\n\
             Se você não solicitou esta recuperação, ignore este e-mail.\n",
            self.to_name, self.link, self.valid_for_minutes
        )
    }
}

/// Recovery e-mail delivery abstraction
pub trait RecoveryMailer: Send + Sync {
    /// Deliver a message or report why it could not be sent
    fn send(&self, message: &RecoveryEmail) -> Result<(), MailError>;
}

/// Development mailer that writes deliveries to the log instead of sending them.
/// The link carries the raw token, so it only appears at debug level.
#[derive(Clone, Debug, Default)]
pub struct LogMailer;

impl RecoveryMailer for LogMailer {
    fn send(&self, message: &RecoveryEmail) -> Result<(), MailError> {
        info!(to_email = %message.to_email, subject = message.subject(), "recovery email queued");
        debug!(link = %message.link, "recovery email link");
        Ok(())
    }
}
