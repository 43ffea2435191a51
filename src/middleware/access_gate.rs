//! Authenticated-request entry point.
//!
//! Every protected route passes through here first: extract the bearer
//! credential, have the identity provider verify it, resolve the verified
//! subject to a local account, and attach the authorization context to the
//! request. Verification must complete and succeed before any store lookup
//! so no query is ever keyed by unverified input. Handlers downstream may
//! trust the attached context and must never re-derive identity from
//! client-supplied identifiers.

use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::identity::IdentityProvider;
use crate::routes::AppState;
use crate::store::{StoreError, UserRecord};

/// Request-scoped authorization context. Carries only what handlers need
/// for access decisions - never credential material - and lives exactly as
/// long as the request.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub id: Uuid,
    pub username: String,
    pub subject_id: String,
    pub is_admin: bool,
    pub is_active: bool,
    pub is_anonymous: bool,
}

impl From<UserRecord> for CurrentUser {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            username: record.username,
            subject_id: record.subject_id,
            is_admin: record.is_admin,
            is_active: record.is_active,
            is_anonymous: record.is_anonymous,
        }
    }
}

/// Seam for resolving a verified subject to a local account
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    async fn find_by_subject(&self, subject_id: &str) -> Result<Option<UserRecord>, StoreError>;
}

/// Resolve a request to an authorization context, or reject it.
///
/// Both "the credential did not verify" and "the credential verified but no
/// local account matches" answer with code 400 so responses do not reveal
/// whether an account exists; the messages stay distinguishable so clients
/// can trigger an account-creation flow on the latter.
pub async fn authenticate(
    headers: &HeaderMap,
    provider: &dyn IdentityProvider,
    accounts: &dyn AccountDirectory,
) -> Result<CurrentUser, ApiError> {
    let token = extract_bearer(headers)?;

    let claim = provider.verify(&token).await?;

    let record = accounts.find_by_subject(&claim.subject_id).await?;
    let record = record.ok_or_else(|| {
        tracing::warn!(
            "verified subject '{}' has no local account",
            claim.subject_id
        );
        ApiError::bad_request("The account does not exist.")
    })?;

    Ok(CurrentUser::from(record))
}

/// Thin axum wrapper around [`authenticate`] that attaches the context as a
/// request extension.
pub async fn access_gate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let current_user = authenticate(
        request.headers(),
        state.identity.as_ref(),
        state.accounts.as_ref(),
    )
    .await?;

    request.extensions_mut().insert(current_user);
    Ok(next.run(request).await)
}

/// Reject unless the acting account is an administrator
pub fn require_admin(user: &CurrentUser) -> Result<(), ApiError> {
    if user.is_admin {
        Ok(())
    } else {
        Err(ApiError::forbidden("Administrator privileges are required."))
    }
}

/// Reject unless the acting account owns the target resource or is an
/// administrator
pub fn require_self_or_admin(user: &CurrentUser, target: Uuid) -> Result<(), ApiError> {
    if user.is_admin || user.id == target {
        Ok(())
    } else {
        Err(ApiError::forbidden("Not allowed to act on this resource."))
    }
}

fn extract_bearer(headers: &HeaderMap) -> Result<String, ApiError> {
    let header = headers
        .get("authorization")
        .ok_or_else(|| ApiError::bad_request("Missing Authorization header."))?;

    let value = header
        .to_str()
        .map_err(|_| ApiError::bad_request("Invalid Authorization header."))?;

    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::bad_request("Authorization header must use the Bearer scheme."))?;

    if token.trim().is_empty() {
        return Err(ApiError::bad_request("Empty bearer credential."));
    }

    Ok(token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{IdentityError, VerifiedClaim};
    use axum::http::HeaderValue;
    use chrono::Utc;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct StubProvider {
        result: Result<VerifiedClaim, IdentityError>,
        called: AtomicBool,
    }

    impl StubProvider {
        fn ok(subject_id: &str) -> Self {
            Self {
                result: Ok(VerifiedClaim {
                    subject_id: subject_id.to_string(),
                    display_name: "stub".to_string(),
                }),
                called: AtomicBool::new(false),
            }
        }

        fn rejecting(message: &str) -> Self {
            Self {
                result: Err(IdentityError::Rejected(message.to_string())),
                called: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl IdentityProvider for StubProvider {
        async fn verify(&self, _token: &str) -> Result<VerifiedClaim, IdentityError> {
            self.called.store(true, Ordering::SeqCst);
            match &self.result {
                Ok(claim) => Ok(claim.clone()),
                Err(IdentityError::Rejected(m)) => Err(IdentityError::Rejected(m.clone())),
                Err(IdentityError::Unreachable(m)) => Err(IdentityError::Unreachable(m.clone())),
                Err(IdentityError::MalformedResponse(m)) => {
                    Err(IdentityError::MalformedResponse(m.clone()))
                }
            }
        }
    }

    struct StubDirectory {
        record: Option<UserRecord>,
        called: AtomicBool,
    }

    impl StubDirectory {
        fn with(record: Option<UserRecord>) -> Self {
            Self {
                record,
                called: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl AccountDirectory for StubDirectory {
        async fn find_by_subject(
            &self,
            _subject_id: &str,
        ) -> Result<Option<UserRecord>, StoreError> {
            self.called.store(true, Ordering::SeqCst);
            Ok(self.record.clone())
        }
    }

    fn account(subject_id: &str) -> UserRecord {
        UserRecord {
            id: Uuid::new_v4(),
            subject_id: subject_id.to_string(),
            username: "taro".to_string(),
            password_digest: Some("secret-digest".to_string()),
            is_admin: true,
            is_active: true,
            is_anonymous: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        headers
    }

    #[tokio::test]
    async fn missing_header_rejects_before_any_call() {
        let provider = StubProvider::ok("subject-1");
        let directory = StubDirectory::with(None);

        let err = authenticate(&HeaderMap::new(), &provider, &directory)
            .await
            .unwrap_err();

        assert_eq!(err.code(), 400);
        assert!(!provider.called.load(Ordering::SeqCst));
        assert!(!directory.called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn malformed_scheme_rejects_before_any_call() {
        let provider = StubProvider::ok("subject-1");
        let directory = StubDirectory::with(None);

        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Basic abc"));

        let err = authenticate(&headers, &provider, &directory)
            .await
            .unwrap_err();

        assert_eq!(err.code(), 400);
        assert!(!provider.called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn verification_failure_propagates_and_skips_store() {
        let provider = StubProvider::rejecting("token expired");
        let directory = StubDirectory::with(Some(account("subject-1")));

        let err = authenticate(&bearer("bad-token"), &provider, &directory)
            .await
            .unwrap_err();

        assert_eq!(err.code(), 400);
        assert!(err.message().contains("could not be verified"));
        assert!(!directory.called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn unknown_subject_rejects_with_distinct_message() {
        let provider = StubProvider::ok("never-seen");
        let directory = StubDirectory::with(None);

        let err = authenticate(&bearer("good-token"), &provider, &directory)
            .await
            .unwrap_err();

        assert_eq!(err.code(), 400);
        assert_eq!(err.message(), "The account does not exist.");
        assert!(!err.message().contains("verified"));
    }

    #[tokio::test]
    async fn resolved_account_yields_context_without_credentials() {
        let record = account("subject-1");
        let provider = StubProvider::ok("subject-1");
        let directory = StubDirectory::with(Some(record.clone()));

        let user = authenticate(&bearer("good-token"), &provider, &directory)
            .await
            .unwrap();

        assert_eq!(user.id, record.id);
        assert_eq!(user.username, "taro");
        assert!(user.is_admin);
        assert!(user.is_active);
        assert!(!user.is_anonymous);

        let rendered = serde_json::to_value(&user).unwrap();
        let keys: Vec<&str> = rendered.as_object().unwrap().keys().map(String::as_str).collect();
        assert!(keys.contains(&"isAdmin"));
        assert!(!rendered.to_string().contains("secret-digest"));
        assert!(rendered.get("passwordDigest").is_none());
    }

    #[test]
    fn admin_policy() {
        let mut user = CurrentUser {
            id: Uuid::new_v4(),
            username: "taro".to_string(),
            subject_id: "s".to_string(),
            is_admin: false,
            is_active: true,
            is_anonymous: false,
        };

        assert_eq!(require_admin(&user).unwrap_err().code(), 403);
        user.is_admin = true;
        assert!(require_admin(&user).is_ok());
    }

    #[test]
    fn self_or_admin_policy() {
        let user = CurrentUser {
            id: Uuid::new_v4(),
            username: "taro".to_string(),
            subject_id: "s".to_string(),
            is_admin: false,
            is_active: true,
            is_anonymous: false,
        };

        assert!(require_self_or_admin(&user, user.id).is_ok());
        assert_eq!(
            require_self_or_admin(&user, Uuid::new_v4()).unwrap_err().code(),
            403
        );
    }
}
