//! OAuth 1.0a request signing (HMAC-SHA1)
//!
//! The access token pair is obtained elsewhere; this module only produces the
//! `Authorization` header for an already-authorized request.

use crate::brokers::Credentials;
use crate::error::{AppError, Result};
use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use url::Url;
use urlencoding::encode;

type HmacSha1 = Hmac<Sha1>;

const SIGNATURE_METHOD: &str = "HMAC-SHA1";
const OAUTH_VERSION: &str = "1.0";

/// Build the `Authorization` header for a request with a fresh nonce and timestamp
pub fn authorization_header(credentials: &Credentials, method: &str, url: &Url) -> Result<String> {
    let nonce = hex::encode(rand::random::<[u8; 16]>());
    let timestamp = chrono::Utc::now().timestamp();
    signed_header(credentials, method, url, &nonce, timestamp)
}

pub(crate) fn signed_header(
    credentials: &Credentials,
    method: &str,
    url: &Url,
    nonce: &str,
    timestamp: i64,
) -> Result<String> {
    let mut oauth_params = vec![
        ("oauth_consumer_key", credentials.consumer_key.clone()),
        ("oauth_nonce", nonce.to_string()),
        ("oauth_signature_method", SIGNATURE_METHOD.to_string()),
        ("oauth_timestamp", timestamp.to_string()),
        ("oauth_token", credentials.oauth_token.clone()),
        ("oauth_version", OAUTH_VERSION.to_string()),
    ];

    let base = signature_base_string(method, url, &oauth_params);
    let signing_key = format!(
        "{}&{}",
        encode(&credentials.consumer_secret),
        encode(&credentials.oauth_secret)
    );

    let mut mac = HmacSha1::new_from_slice(signing_key.as_bytes())
        .map_err(|e| AppError::Internal(format!("Invalid signing key: {}", e)))?;
    mac.update(base.as_bytes());
    let signature =
        base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes());

    oauth_params.push(("oauth_signature", signature));

    let fields: Vec<String> = oauth_params
        .iter()
        .map(|(key, value)| format!("{}=\"{}\"", key, encode(value)))
        .collect();

    Ok(format!("OAuth {}", fields.join(",")))
}

/// Signature base string: METHOD & base URL & sorted, encoded parameters
pub(crate) fn signature_base_string(
    method: &str,
    url: &Url,
    oauth_params: &[(&str, String)],
) -> String {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (encode(&k).into_owned(), encode(&v).into_owned()))
        .collect();
    params.extend(
        oauth_params
            .iter()
            .map(|(k, v)| (encode(k).into_owned(), encode(v).into_owned())),
    );
    params.sort();

    let normalized: Vec<String> = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect();

    let mut base_url = url.clone();
    base_url.set_query(None);
    base_url.set_fragment(None);

    format!(
        "{}&{}&{}",
        method.to_uppercase(),
        encode(base_url.as_str()),
        encode(&normalized.join("&"))
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> Credentials {
        Credentials {
            consumer_key: "key".into(),
            consumer_secret: "secret".into(),
            oauth_token: "tok".into(),
            oauth_secret: "toksecret".into(),
        }
    }

    #[test]
    fn test_signature_base_string() {
        let url = Url::parse("https://api.etrade.com/v1/market/optionexpiredate.json?symbol=GOOG").unwrap();
        let params = vec![
            ("oauth_consumer_key", "key".to_string()),
            ("oauth_nonce", "abc".to_string()),
            ("oauth_signature_method", "HMAC-SHA1".to_string()),
            ("oauth_timestamp", "1700000000".to_string()),
            ("oauth_token", "tok".to_string()),
            ("oauth_version", "1.0".to_string()),
        ];

        assert_eq!(
            signature_base_string("get", &url, &params),
            "GET&https%3A%2F%2Fapi.etrade.com%2Fv1%2Fmarket%2Foptionexpiredate.json&\
             oauth_consumer_key%3Dkey%26oauth_nonce%3Dabc%26oauth_signature_method%3DHMAC-SHA1%26\
             oauth_timestamp%3D1700000000%26oauth_token%3Dtok%26oauth_version%3D1.0%26symbol%3DGOOG"
        );
    }

    #[test]
    fn test_hmac_sha1_signature() {
        let url = Url::parse("https://api.etrade.com/v1/market/optionexpiredate.json?symbol=GOOG").unwrap();
        let header = signed_header(&credentials(), "GET", &url, "abc", 1_700_000_000).unwrap();

        assert!(header.starts_with("OAuth oauth_consumer_key=\"key\","));
        assert!(header.contains("oauth_signature_method=\"HMAC-SHA1\""));
        assert!(header.contains("oauth_signature=\"0GoiseV0PjtO%2F26kiJi8YaG%2Fraw%3D\""));
        assert!(!header.contains("symbol"));
    }

    #[test]
    fn test_fresh_nonce_per_request() {
        let url = Url::parse("https://api.etrade.com/v1/market/quote/GOOG.json").unwrap();
        let first = authorization_header(&credentials(), "GET", &url).unwrap();
        let second = authorization_header(&credentials(), "GET", &url).unwrap();
        assert_ne!(first, second);
    }
}
