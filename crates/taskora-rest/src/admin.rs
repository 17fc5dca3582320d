//! Admin auth calls
//!
//! Only available to a transport built with the service key.

use crate::client::RestBackend;
use reqwest::Method;
use serde_json::json;
use taskora_core::BackendResult;
use tracing::info;

impl RestBackend {
    /// Replace a user's password through `PUT /auth/v1/admin/users/<id>`
    pub async fn update_user_password(&self, user_id: &str, password: &str) -> BackendResult<()> {
        let url = format!(
            "{}/auth/v1/admin/users/{}",
            self.base_url(),
            urlencoding::encode(user_id)
        );

        self.send(
            self.request(Method::PUT, &url)
                .json(&json!({ "password": password })),
        )
        .await?;

        info!(user_id, "Updated user password");
        Ok(())
    }
}
