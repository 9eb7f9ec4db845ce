//! Publishing status messages.
//!
//! [`Notifier`] is the seam the orchestrator posts through. The production
//! implementation posts to the X API v2 on behalf of one account.

pub mod oauth;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, TrackerError};
use oauth::{OAuthNonce, SigningKeys};

/// Environment variables holding the four posting credentials.
pub const ENV_CONSUMER_KEY: &str = "TWITTER_CONSUMER_KEY";
pub const ENV_CONSUMER_SECRET: &str = "TWITTER_CONSUMER_SECRET";
pub const ENV_ACCESS_TOKEN: &str = "TWITTER_ACCESS_TOKEN";
pub const ENV_ACCESS_SECRET: &str = "TWITTER_ACCESS_SECRET";

/// Default API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.twitter.com";

const CREATE_POST_PATH: &str = "/2/tweets";

/// What the provider returned for a successful post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostReceipt {
    pub id: Option<String>,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Publish `message` as a single post.
    async fn publish(&self, message: &str) -> Result<PostReceipt>;
}

#[async_trait]
impl<T: Notifier + ?Sized> Notifier for Box<T> {
    async fn publish(&self, message: &str) -> Result<PostReceipt> {
        (**self).publish(message).await
    }
}

/// Writes the message to the log instead of posting it. Used for dry runs,
/// where no credentials are required.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogOnlyNotifier;

#[async_trait]
impl Notifier for LogOnlyNotifier {
    async fn publish(&self, message: &str) -> Result<PostReceipt> {
        tracing::info!(%message, "Post skipped");
        Ok(PostReceipt { id: None })
    }
}

/// User-context credentials for the posting account.
#[derive(Clone)]
pub struct TwitterCredentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_secret: String,
}

impl std::fmt::Debug for TwitterCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwitterCredentials")
            .field("consumer_key", &"<redacted>")
            .field("consumer_secret", &"<redacted>")
            .field("access_token", &"<redacted>")
            .field("access_secret", &"<redacted>")
            .finish()
    }
}

impl TwitterCredentials {
    /// Read all four credentials from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read credentials through `lookup`. A missing or blank value is a
    /// config error naming the variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |name: &str| -> Result<String> {
            match lookup(name) {
                Some(value) if !value.trim().is_empty() => Ok(value),
                _ => Err(TrackerError::config(format!(
                    "missing posting credential {name}"
                ))),
            }
        };

        Ok(Self {
            consumer_key: require(ENV_CONSUMER_KEY)?,
            consumer_secret: require(ENV_CONSUMER_SECRET)?,
            access_token: require(ENV_ACCESS_TOKEN)?,
            access_secret: require(ENV_ACCESS_SECRET)?,
        })
    }

    fn signing_keys(&self) -> SigningKeys<'_> {
        SigningKeys {
            consumer_key: &self.consumer_key,
            consumer_secret: &self.consumer_secret,
            token: &self.access_token,
            token_secret: &self.access_secret,
        }
    }
}

#[derive(Debug, Serialize)]
struct CreatePostRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreatePostResponse {
    data: Option<CreatedPost>,
}

#[derive(Debug, Deserialize)]
struct CreatedPost {
    id: String,
}

/// Posts through `POST /2/tweets`.
pub struct TwitterNotifier {
    client: reqwest::Client,
    credentials: TwitterCredentials,
    api_base: String,
}

impl TwitterNotifier {
    pub fn new(credentials: TwitterCredentials) -> Self {
        Self::with_api_base(credentials, DEFAULT_API_BASE)
    }

    /// Point at a different API host (tests use a local mock server).
    pub fn with_api_base(credentials: TwitterCredentials, api_base: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            credentials,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    fn endpoint_url(&self) -> String {
        format!("{}{}", self.api_base, CREATE_POST_PATH)
    }
}

#[async_trait]
impl Notifier for TwitterNotifier {
    async fn publish(&self, message: &str) -> Result<PostReceipt> {
        let url = self.endpoint_url();
        let nonce = OAuthNonce::generate(chrono::Utc::now());
        let authorization = oauth::authorization_header(
            "POST",
            &url,
            &self.credentials.signing_keys(),
            &nonce,
            &[],
        )?;

        let response = self
            .client
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, authorization)
            .json(&CreatePostRequest { text: message })
            .send()
            .await
            .map_err(|e| TrackerError::notify_with_source("post request failed", e))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            let reason = match status.as_u16() {
                401 | 403 => "credentials rejected",
                429 => "rate limited",
                _ => "post rejected",
            };
            return Err(TrackerError::notify(format!("{reason}: HTTP {status}: {body}")));
        }

        let id = serde_json::from_str::<CreatePostResponse>(&body)
            .ok()
            .and_then(|parsed| parsed.data)
            .map(|post| post.id);
        tracing::info!(post_id = id.as_deref().unwrap_or("unknown"), "Status posted");

        Ok(PostReceipt { id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use wiremock::matchers::{body_json, header_regex, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials() -> TwitterCredentials {
        TwitterCredentials {
            consumer_key: "ck".to_string(),
            consumer_secret: "cs".to_string(),
            access_token: "at".to_string(),
            access_secret: "as".to_string(),
        }
    }

    fn env_with(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn all_four_credentials_are_required() {
        let env = env_with(&[
            (ENV_CONSUMER_KEY, "ck"),
            (ENV_CONSUMER_SECRET, "cs"),
            (ENV_ACCESS_TOKEN, "at"),
        ]);
        let err = TwitterCredentials::from_lookup(|k| env.get(k).cloned()).expect_err("missing");
        assert_eq!(
            err.to_string(),
            "config error: missing posting credential TWITTER_ACCESS_SECRET"
        );
    }

    #[test]
    fn blank_credentials_count_as_missing() {
        let env = env_with(&[
            (ENV_CONSUMER_KEY, "  "),
            (ENV_CONSUMER_SECRET, "cs"),
            (ENV_ACCESS_TOKEN, "at"),
            (ENV_ACCESS_SECRET, "as"),
        ]);
        let err = TwitterCredentials::from_lookup(|k| env.get(k).cloned()).expect_err("blank");
        assert!(err.to_string().contains(ENV_CONSUMER_KEY));
    }

    #[test]
    fn debug_output_hides_secrets() {
        let mut creds = credentials();
        creds.consumer_secret = "super-secret-value".to_string();
        let rendered = format!("{creds:?}");
        assert!(!rendered.contains("super-secret-value"));
        assert!(rendered.contains("redacted"));
    }

    #[tokio::test]
    async fn boxed_log_only_notifier_returns_no_id() {
        let notifier: Box<dyn Notifier> = Box::new(LogOnlyNotifier);
        let receipt = notifier.publish("hello").await.expect("publish");
        assert_eq!(receipt, PostReceipt { id: None });
    }

    #[tokio::test]
    async fn publish_posts_signed_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2/tweets"))
            .and(header_regex("authorization", r#"^OAuth oauth_consumer_key="ck", "#))
            .and(header_regex("authorization", r#"oauth_signature_method="HMAC-SHA1""#))
            .and(body_json(serde_json::json!({ "text": "👻 Phantom App Rank" })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "data": { "id": "1790000000000000000", "text": "👻 Phantom App Rank" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = TwitterNotifier::with_api_base(credentials(), server.uri());
        let receipt = notifier
            .publish("👻 Phantom App Rank")
            .await
            .expect("publish");
        assert_eq!(receipt.id.as_deref(), Some("1790000000000000000"));
    }

    #[tokio::test]
    async fn rejected_credentials_become_notify_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2/tweets"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = TwitterNotifier::with_api_base(credentials(), server.uri());
        let err = notifier.publish("hello").await.expect_err("401");
        assert_eq!(err.category(), crate::ErrorCategory::NotifyError);
        assert!(err.to_string().contains("credentials rejected"));
    }

    #[tokio::test]
    async fn rate_limit_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2/tweets"))
            .respond_with(ResponseTemplate::new(429))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = TwitterNotifier::with_api_base(credentials(), server.uri());
        let err = notifier.publish("hello").await.expect_err("429");
        assert!(err.to_string().contains("rate limited"));
    }
}
