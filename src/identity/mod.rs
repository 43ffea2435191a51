//! External identity provider client.
//!
//! The API never inspects or validates token cryptography itself; it hands
//! the bearer credential to the provider's verification endpoint and
//! consumes the verified claim. One outbound call per verification, no
//! retries - retrying is the caller's decision.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::config;

/// Verified assertion about who a credential belongs to
#[derive(Debug, Clone)]
pub struct VerifiedClaim {
    /// Stable external subject identifier
    pub subject_id: String,
    pub display_name: String,
}

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("The credential could not be verified: {0}")]
    Rejected(String),

    #[error("The identity provider could not be reached: {0}")]
    Unreachable(String),

    #[error("The identity provider returned an unexpected response: {0}")]
    MalformedResponse(String),
}

/// Seam for credential verification so the access gate can be exercised
/// without network access.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify(&self, token: &str) -> Result<VerifiedClaim, IdentityError>;
}

/// Wire shape of the provider's verification endpoint
#[derive(Debug, Deserialize)]
struct VerifyResponse {
    uid: String,
    name: Option<String>,
}

pub struct HttpIdentityProvider {
    client: reqwest::Client,
    verify_url: String,
}

impl HttpIdentityProvider {
    pub fn new(verify_url: impl Into<String>, timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_else(|e| panic!("failed to build identity provider client: {}", e));

        Self {
            client,
            verify_url: verify_url.into(),
        }
    }

    pub fn from_config() -> Self {
        let identity = &config::config().identity;
        Self::new(&identity.verify_url, identity.timeout_secs)
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn verify(&self, token: &str) -> Result<VerifiedClaim, IdentityError> {
        let response = self
            .client
            .post(&self.verify_url)
            .json(&serde_json::json!({ "token": token }))
            .send()
            .await
            .map_err(|e| IdentityError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .text()
                .await
                .unwrap_or_else(|_| status.to_string());
            tracing::debug!("identity provider rejected credential: {}", detail);
            return Err(IdentityError::Rejected(format!(
                "the identity provider rejected the credential ({})",
                status
            )));
        }

        let claim: VerifyResponse = response
            .json()
            .await
            .map_err(|e| IdentityError::MalformedResponse(e.to_string()))?;

        Ok(VerifiedClaim {
            subject_id: claim.uid,
            display_name: claim.name.unwrap_or_else(|| "anonymous".to_string()),
        })
    }
}
