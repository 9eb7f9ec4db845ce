//! OAuth 1.0a request signing (HMAC-SHA1), as required for user-context
//! posts on the X API.

use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::errors::{Result, TrackerError};

type HmacSha1 = Hmac<Sha1>;

/// RFC 3986 percent-encoding: only unreserved characters pass through.
pub fn percent_encode(input: &str) -> String {
    urlencoding::encode(input).into_owned()
}

/// `METHOD&encoded-url&encoded-sorted-params`
pub fn signature_base_string(method: &str, url: &str, params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .collect();
    encoded.sort();
    let param_string = encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        percent_encode(url),
        percent_encode(&param_string)
    )
}

/// Base64 HMAC-SHA1 of the base string keyed by both secrets.
pub fn sign(base_string: &str, consumer_secret: &str, token_secret: &str) -> Result<String> {
    let key = format!(
        "{}&{}",
        percent_encode(consumer_secret),
        percent_encode(token_secret)
    );
    let mut mac = HmacSha1::new_from_slice(key.as_bytes())
        .map_err(|e| TrackerError::notify(format!("invalid signing key: {e}")))?;
    mac.update(base_string.as_bytes());
    Ok(base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
}

/// Per-request values that vary between calls.
#[derive(Debug, Clone)]
pub struct OAuthNonce {
    pub nonce: String,
    pub timestamp: i64,
}

impl OAuthNonce {
    pub fn generate(now: chrono::DateTime<chrono::Utc>) -> Self {
        use rand::Rng as _;
        let mut rng = rand::rng();
        let nonce: String = (0..32)
            .map(|_| char::from(rng.sample(rand::distr::Alphanumeric)))
            .collect();
        Self {
            nonce,
            timestamp: now.timestamp(),
        }
    }
}

/// Keys and secrets used to sign a request.
#[derive(Clone)]
pub struct SigningKeys<'a> {
    pub consumer_key: &'a str,
    pub consumer_secret: &'a str,
    pub token: &'a str,
    pub token_secret: &'a str,
}

/// Build the `Authorization: OAuth ...` header value. `extra_params` are
/// the query/form parameters that take part in the signature; JSON bodies
/// do not.
pub fn authorization_header(
    method: &str,
    url: &str,
    keys: &SigningKeys<'_>,
    nonce: &OAuthNonce,
    extra_params: &[(String, String)],
) -> Result<String> {
    let mut oauth_params = vec![
        ("oauth_consumer_key".to_string(), keys.consumer_key.to_string()),
        ("oauth_nonce".to_string(), nonce.nonce.clone()),
        ("oauth_signature_method".to_string(), "HMAC-SHA1".to_string()),
        ("oauth_timestamp".to_string(), nonce.timestamp.to_string()),
        ("oauth_token".to_string(), keys.token.to_string()),
        ("oauth_version".to_string(), "1.0".to_string()),
    ];

    let mut all_params = oauth_params.clone();
    all_params.extend_from_slice(extra_params);
    let base = signature_base_string(method, url, &all_params);
    let signature = sign(&base, keys.consumer_secret, keys.token_secret)?;
    oauth_params.push(("oauth_signature".to_string(), signature));
    oauth_params.sort();

    let fields = oauth_params
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join(", ");
    Ok(format!("OAuth {fields}"))
}
