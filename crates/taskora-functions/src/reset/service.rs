use super::{
    generate_token, hash_token, AccountDirectory, ResetError, ResetTokenRecord, ResetTokenStore,
};
use crate::email::{EmailMessage, Mailer};
use chrono::Utc;
use std::sync::Arc;
use taskora_config::PasswordResetConfig;
use tracing::{error, info, warn};

const RESET_SUBJECT: &str = "Reset your Taskora password";

pub struct PasswordResetService {
    tokens: Arc<dyn ResetTokenStore>,
    accounts: Arc<dyn AccountDirectory>,
    mailer: Arc<dyn Mailer>,
    config: PasswordResetConfig,
}

impl PasswordResetService {
    pub fn new(
        tokens: Arc<dyn ResetTokenStore>,
        accounts: Arc<dyn AccountDirectory>,
        mailer: Arc<dyn Mailer>,
        config: PasswordResetConfig,
    ) -> Self {
        Self {
            tokens,
            accounts,
            mailer,
            config,
        }
    }

    /// Issue a token for `email` and send the reset link
    ///
    /// Succeeds whether or not the account exists; lookup and delivery
    /// failures are logged, never reported to the caller.
    pub async fn request(&self, email: &str) -> Result<(), ResetError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(ResetError::MissingField("email"));
        }

        let user_id = match self.accounts.find_user_id(email).await {
            Ok(Some(user_id)) => user_id,
            Ok(None) => {
                info!("Password reset requested for unknown account");
                return Ok(());
            }
            Err(e) => {
                error!(error = %e, "Account lookup failed during password reset");
                return Ok(());
            }
        };

        let token = generate_token();
        let ttl = chrono::Duration::from_std(self.config.token_ttl())
            .map_err(|e| ResetError::Store(e.to_string()))?;
        let record = ResetTokenRecord {
            token_hash: hash_token(&token),
            user_id: user_id.clone(),
            expires_at: Utc::now() + ttl,
            used: false,
        };
        if let Err(e) = self.tokens.insert(record).await {
            error!(user_id, error = %e, "Failed to store reset token");
            return Ok(());
        }

        let link = self.config.reset_link(&token);
        let message = reset_email(email, &link, self.config.token_ttl_minutes);
        match self.mailer.send(&message).await {
            Ok(message_id) => info!(user_id, message_id, "Password reset email sent"),
            Err(e) => warn!(user_id, error = %e, "Password reset email not delivered"),
        }
        Ok(())
    }

    /// Replace the password of the token's owner
    pub async fn confirm(&self, token: &str, password: &str) -> Result<(), ResetError> {
        if token.trim().is_empty() {
            return Err(ResetError::MissingField("token"));
        }
        if password.is_empty() {
            return Err(ResetError::MissingField("password"));
        }

        let token_hash = hash_token(token.trim());
        let record = self
            .tokens
            .find(&token_hash)
            .await?
            .ok_or(ResetError::Invalid)?;

        if record.used {
            return Err(ResetError::AlreadyUsed);
        }
        if record.is_expired(Utc::now()) {
            return Err(ResetError::Expired);
        }
        if !self.tokens.consume(&token_hash).await? {
            return Err(ResetError::AlreadyUsed);
        }

        self.accounts
            .set_password(&record.user_id, password)
            .await?;
        info!(user_id = %record.user_id, "Password reset completed");
        Ok(())
    }
}

fn reset_email(to: &str, link: &str, ttl_minutes: u64) -> EmailMessage {
    let html = format!(
        "<p>We received a request to reset your Taskora password.</p>\
         <p><a href=\"{link}\">Choose a new password</a></p>\
         <p>This link expires in {ttl_minutes} minutes. If you did not ask for a reset, \
         you can ignore this email.</p>"
    );
    let text = format!(
        "Reset your Taskora password: {link}\nThis link expires in {ttl_minutes} minutes."
    );
    EmailMessage::new(to, RESET_SUBJECT, html).with_text(text)
}
