//! Request signing
//!
//! Three independent signatures:
//! - feed tokens: HMAC-SHA1 keyed by SHA1(secret), URL-safe base64
//! - HTTP Signatures (hmac-sha256 over the `date` header) for
//!   application-authenticated endpoints
//! - scoped JWTs (HS256) for feed-authenticated endpoints

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use hmac::{Hmac, Mac};
use reqwest::header::{AUTHORIZATION, DATE, HeaderValue};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use sha2::Sha256;

use super::scope::{ScopeAction, ScopeContext};
use crate::error::{FeedError, Result};

/// Header marking the `Authorization` value as a JWT (`Stream-Auth-Type`)
pub const AUTH_TYPE_HEADER: &str = "stream-auth-type";

/// HTTP Signatures algorithm used for application authentication
pub const HTTP_SIGNATURE_ALGORITHM: &str = "hmac-sha256";

/// Format of the `Date` header (RFC 1123, always GMT)
pub const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Claims carried by a scoped token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeClaims {
    /// Resource context; omitted for `ScopeContext::NoContext`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub resource: String,
    pub action: String,
    pub feed_id: String,
}

/// Produces tokens and signatures from an API key and secret
///
/// Holds no mutable state; one signer is shared by every request of a client.
#[derive(Clone)]
pub struct Signer {
    key: String,
    secret: String,
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl Signer {
    /// Create a signer
    ///
    /// `secret` is either the API secret or a pre-issued token standing in
    /// for it.
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            secret: secret.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Token for a feed, signed over its unseparated id (`slug` + `user_id`)
    pub fn sign_feed(&self, feed_id_without_colon: &str) -> Result<String> {
        self.generate_token(feed_id_without_colon)
    }

    /// Deterministic URL-safe token for `message`
    ///
    /// # Steps
    /// 1. key = SHA1(secret)
    /// 2. mac = HMAC-SHA1(key, message)
    /// 3. base64, then `url_safe`
    pub fn generate_token(&self, message: &str) -> Result<String> {
        let key = Sha1::digest(self.secret.as_bytes());

        type HmacSha1 = Hmac<Sha1>;
        let mut mac = HmacSha1::new_from_slice(&key)
            .map_err(|e| FeedError::Signing(e.to_string()))?;
        mac.update(message.as_bytes());
        let digest = BASE64.encode(mac.finalize().into_bytes());

        Ok(url_safe(&digest))
    }

    /// Sign a whole request with HTTP Signatures
    ///
    /// Signs the `Date` header (added if the request has none) and stores
    /// the result in `Authorization`.
    pub fn sign_http(&self, request: &mut reqwest::Request) -> Result<()> {
        let date = match request.headers().get(DATE) {
            Some(value) => value
                .to_str()
                .map_err(|_| FeedError::Signing("Invalid Date header".to_string()))?
                .to_string(),
            None => {
                let date = http_date_now();
                request.headers_mut().insert(DATE, header_value(&date)?);
                date
            }
        };

        let authorization = self.http_signature(&date)?;
        request
            .headers_mut()
            .insert(AUTHORIZATION, header_value(&authorization)?);
        Ok(())
    }

    /// `Authorization` value for a request carrying `Date: <date>`
    ///
    /// # Format
    /// ```text
    /// Signature keyId="...",algorithm="hmac-sha256",headers="date",signature="..."
    /// ```
    pub fn http_signature(&self, date: &str) -> Result<String> {
        let signing_string = format!("date: {}", date);

        type HmacSha256 = Hmac<Sha256>;
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| FeedError::Signing(e.to_string()))?;
        mac.update(signing_string.as_bytes());
        let signature = BASE64.encode(mac.finalize().into_bytes());

        Ok(format!(
            "Signature keyId=\"{}\",algorithm=\"{}\",headers=\"date\",signature=\"{}\"",
            self.key, HTTP_SIGNATURE_ALGORITHM, signature
        ))
    }

    /// Attach a scoped JWT to the request
    ///
    /// Sets `Stream-Auth-Type: jwt` and `Authorization: <token>`.
    pub fn sign_scoped_token(
        &self,
        request: &mut reqwest::Request,
        context: ScopeContext,
        action: ScopeAction,
        feed_id: &str,
    ) -> Result<()> {
        let token = self.generate_scoped_token(context, action, feed_id)?;

        let headers = request.headers_mut();
        headers.insert(AUTH_TYPE_HEADER, HeaderValue::from_static("jwt"));
        headers.insert(AUTHORIZATION, header_value(&token)?);
        Ok(())
    }

    /// HS256 JWT granting `action` on `context` for `feed_id`
    ///
    /// An empty `feed_id` becomes `"*"`, which the service reads as every
    /// feed of the application.
    pub fn generate_scoped_token(
        &self,
        context: ScopeContext,
        action: ScopeAction,
        feed_id: &str,
    ) -> Result<String> {
        use jsonwebtoken::{EncodingKey, Header, encode};

        let feed_id = if feed_id.is_empty() { "*" } else { feed_id };

        let claims = ScopeClaims {
            resource: context.as_str().to_string(),
            action: action.as_str().to_string(),
            feed_id: feed_id.to_string(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| FeedError::Signing(e.to_string()))
    }
}

/// Make standard base64 URL-safe
///
/// `+` becomes `-`, `/` becomes `_`, and `=` is trimmed from both ends.
pub fn url_safe(src: &str) -> String {
    src.replace('+', "-")
        .replace('/', "_")
        .trim_matches('=')
        .to_string()
}

/// Current time in `Date` header format
pub fn http_date_now() -> String {
    chrono::Utc::now().format(HTTP_DATE_FORMAT).to_string()
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| FeedError::Signing(format!("Invalid header value: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

    fn decode_claims(token: &str, secret: &str) -> ScopeClaims {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;

        decode::<ScopeClaims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        )
        .expect("token should verify")
        .claims
    }

    fn test_request(method: reqwest::Method) -> reqwest::Request {
        reqwest::Request::new(
            method,
            url::Url::parse("https://api.example.com/api/v1.0/follow_many/").unwrap(),
        )
    }

    #[test]
    fn generate_token_matches_known_vector() {
        let signer = Signer::new("", "test_secret");
        let token = signer.generate_token("some message").unwrap();
        assert_eq!(token, "8SZVOYgCH6gy-ZjBTq_9vydr7TQ");
    }

    #[test]
    fn generate_token_is_deterministic_and_url_safe() {
        let signer = Signer::new("key", "tfq2sdqpj9g446sbv653x3aqmgn33hsn8uzdc9jpskaw8mj6vsnhzswuwptuj9su");

        for message in ["flatbob", "user1", "aggregated-feed", "", "notification42"] {
            let first = signer.generate_token(message).unwrap();
            let second = signer.generate_token(message).unwrap();
            assert_eq!(first, second);
            assert!(!first.contains('+'), "{first}");
            assert!(!first.contains('/'), "{first}");
            assert!(!first.ends_with('='), "{first}");
        }
    }

    #[test]
    fn url_safe_replaces_and_trims() {
        assert_eq!(url_safe("some+test/string=foo="), "some-test_string=foo");
        assert_eq!(url_safe("==abc=="), "abc");
    }

    #[test]
    fn scoped_token_carries_claims() {
        let secret = "tfq2sdqpj9g446sbv653x3aqmgn33hsn8uzdc9jpskaw8mj6vsnhzswuwptuj9su";
        let signer = Signer::new("a_key", secret);

        let cases = [
            (ScopeContext::Feed, ScopeAction::Read, "feed", "read"),
            (ScopeContext::Activities, ScopeAction::Write, "activities", "write"),
            (ScopeContext::Follower, ScopeAction::Delete, "follower", "delete"),
            (ScopeContext::All, ScopeAction::All, "*", "*"),
        ];

        for (context, action, resource, action_name) in cases {
            let token = signer
                .generate_scoped_token(context, action, "flatbob")
                .unwrap();
            let claims = decode_claims(&token, secret);
            assert_eq!(claims.resource, resource);
            assert_eq!(claims.action, action_name);
            assert_eq!(claims.feed_id, "flatbob");
        }
    }

    #[test]
    fn scoped_token_with_empty_feed_id_is_wildcard() {
        let signer = Signer::new("a_key", "secret");
        let token = signer
            .generate_scoped_token(ScopeContext::Feed, ScopeAction::Read, "")
            .unwrap();
        assert_eq!(decode_claims(&token, "secret").feed_id, "*");
    }

    #[test]
    fn scoped_token_omits_empty_resource() {
        let signer = Signer::new("a_key", "secret");
        let token = signer
            .generate_scoped_token(ScopeContext::NoContext, ScopeAction::Write, "flatbob")
            .unwrap();

        let payload = token.split('.').nth(1).expect("payload segment");
        let payload = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(payload)
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&payload).unwrap();
        assert!(json.get("resource").is_none());
        assert_eq!(json["action"], "write");
    }

    #[test]
    fn sign_scoped_token_sets_headers() {
        let signer = Signer::new("a_key", "secret");
        let mut request = test_request(reqwest::Method::GET);

        signer
            .sign_scoped_token(&mut request, ScopeContext::Feed, ScopeAction::Read, "flatbob")
            .unwrap();

        assert_eq!(request.headers()[AUTH_TYPE_HEADER], "jwt");
        let token = request.headers()[AUTHORIZATION].to_str().unwrap();
        assert_eq!(decode_claims(token, "secret").feed_id, "flatbob");
    }

    #[test]
    fn sign_http_signs_existing_date() {
        let signer = Signer::new("my_key", "my_secret");
        let mut request = test_request(reqwest::Method::POST);
        let date = "Tue, 07 Jun 2014 20:51:35 GMT";
        request
            .headers_mut()
            .insert(DATE, HeaderValue::from_static("Tue, 07 Jun 2014 20:51:35 GMT"));

        signer.sign_http(&mut request).unwrap();

        let authorization = request.headers()[AUTHORIZATION].to_str().unwrap();
        assert_eq!(authorization, signer.http_signature(date).unwrap());
        assert!(authorization.starts_with("Signature keyId=\"my_key\",algorithm=\"hmac-sha256\",headers=\"date\",signature=\""));
        assert!(request.headers().get(AUTH_TYPE_HEADER).is_none());

        let mut mac = Hmac::<Sha256>::new_from_slice(b"my_secret").unwrap();
        mac.update(format!("date: {date}").as_bytes());
        let expected = BASE64.encode(mac.finalize().into_bytes());
        assert!(authorization.ends_with(&format!("signature=\"{expected}\"")));
    }

    #[test]
    fn sign_http_adds_missing_date() {
        let signer = Signer::new("my_key", "my_secret");
        let mut request = test_request(reqwest::Method::POST);

        signer.sign_http(&mut request).unwrap();

        let date = request.headers()[DATE].to_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc2822(date).is_ok(), "{date}");
        assert!(request.headers().contains_key(AUTHORIZATION));
    }

    #[test]
    fn debug_redacts_secret() {
        let signer = Signer::new("my_key", "my_secret");
        let debug = format!("{signer:?}");
        assert!(debug.contains("my_key"));
        assert!(!debug.contains("my_secret"));
    }
}
