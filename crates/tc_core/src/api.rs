//! X API v2 client.
//!
//! Auth matrix follows the platform: writes and `/users/me` use OAuth 1.0a
//! user context (HMAC-SHA1 request signatures built from the session's
//! consumer and access tokens); conversation search and post lookup use the
//! app bearer token.
//!
//! This client performs no retry or backoff; every failure is mapped onto
//! `PlatformError` and surfaced to the tracker as-is.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use rand::RngCore;
use reqwest::StatusCode;
use serde_json::Value;
use sha1::Sha1;

use crate::{
    credentials::CredentialBundle,
    platform::{PlatformClient, PlatformError, Post, PostId, Profile},
};

const DEFAULT_BASE_URL: &str = "https://api.twitter.com";
const MAX_REPLIES_TO_FETCH: u32 = 100;

#[derive(Clone)]
pub struct XApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl XApiClient {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent("threadcraft/0.1")
            .build()
            .expect("reqwest client");
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the client at a different host (tests, proxies).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let mut client = Self::new();
        client.base_url = base_url.into();
        client
    }

    fn user_auth_header(
        &self,
        creds: &CredentialBundle,
        method: &str,
        url: &str,
        query: &[(String, String)],
    ) -> String {
        let mut nonce_bytes = [0u8; 16];
        rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = hex::encode(nonce_bytes);
        let timestamp = chrono::Utc::now().timestamp().to_string();
        build_oauth1_header(creds, method, url, query, &nonce, &timestamp)
    }
}

impl Default for XApiClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlatformClient for XApiClient {
    async fn post(
        &self,
        creds: &CredentialBundle,
        text: &str,
        in_reply_to: Option<&str>,
    ) -> Result<PostId, PlatformError> {
        let url = format!("{}/2/tweets", self.base_url);
        let mut body = serde_json::json!({ "text": text });
        if let Some(id) = in_reply_to {
            body["reply"] = serde_json::json!({ "in_reply_to_tweet_id": id });
        }
        // A JSON body contributes no parameters to the OAuth signature.
        let auth = self.user_auth_header(creds, "POST", &url, &[]);
        let res = self
            .client
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, auth)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;
        let body = read_success(res).await?;
        let id = body["data"]["id"]
            .as_str()
            .ok_or_else(|| PlatformError::Api("post response missing data.id".into()))?;
        Ok(PostId(id.to_string()))
    }

    async fn get_post(&self, creds: &CredentialBundle, id: &str) -> Result<Post, PlatformError> {
        let url = format!("{}/2/tweets/{}", self.base_url, id);
        let res = self
            .client
            .get(&url)
            .query(&[("tweet.fields", "author_id,text")])
            .bearer_auth(&creds.bearer_token)
            .send()
            .await
            .map_err(transport_error)?;
        let body = read_success(res).await?;
        let data = &body["data"];
        if data.is_null() {
            return Err(PlatformError::NotFound);
        }
        Ok(Post {
            id: json_str(data, "id"),
            author_id: json_str(data, "author_id"),
            text: json_str(data, "text"),
        })
    }

    async fn list_replies(
        &self,
        creds: &CredentialBundle,
        thread_id: &str,
    ) -> Result<Vec<Post>, PlatformError> {
        let url = format!("{}/2/tweets/search/recent", self.base_url);
        let res = self
            .client
            .get(&url)
            .query(&[
                ("query", format!("conversation_id:{thread_id}")),
                ("max_results", MAX_REPLIES_TO_FETCH.to_string()),
                ("tweet.fields", "author_id,text".to_string()),
            ])
            .bearer_auth(&creds.bearer_token)
            .send()
            .await
            .map_err(transport_error)?;
        let body = read_success(res).await?;
        let posts = body["data"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .map(|item| Post {
                        id: json_str(item, "id"),
                        author_id: json_str(item, "author_id"),
                        text: json_str(item, "text"),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(posts)
    }

    async fn get_profile(&self, creds: &CredentialBundle) -> Result<Profile, PlatformError> {
        let url = format!("{}/2/users/me", self.base_url);
        let query = [("user.fields".to_string(), "name,username".to_string())];
        let auth = self.user_auth_header(creds, "GET", &url, &query);
        let res = self
            .client
            .get(&url)
            .query(&[("user.fields", "name,username")])
            .header(reqwest::header::AUTHORIZATION, auth)
            .send()
            .await
            .map_err(transport_error)?;
        let body = read_success(res).await?;
        let data = &body["data"];
        if data.is_null() {
            return Err(PlatformError::Api("profile response missing data".into()));
        }
        Ok(Profile {
            id: json_str(data, "id"),
            username: json_str(data, "username"),
            name: json_str(data, "name"),
        })
    }
}

fn json_str(value: &Value, key: &str) -> String {
    value[key].as_str().unwrap_or_default().to_string()
}

fn transport_error(err: reqwest::Error) -> PlatformError {
    PlatformError::Unavailable(err.to_string())
}

/// Map the response status, returning the parsed body on success.
async fn read_success(res: reqwest::Response) -> Result<Value, PlatformError> {
    let status = res.status();
    if status.is_success() {
        return res
            .json::<Value>()
            .await
            .map_err(|e| PlatformError::Api(format!("invalid response body: {e}")));
    }
    let detail = res.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PlatformError::AuthInvalid,
        StatusCode::NOT_FOUND => PlatformError::NotFound,
        StatusCode::TOO_MANY_REQUESTS => PlatformError::RateLimited,
        s if s.is_server_error() => PlatformError::Unavailable(format!("{s}: {detail}")),
        s => PlatformError::Api(format!("{s}: {detail}")),
    })
}

// ── OAuth 1.0a (RFC 5849) ────────────────────────────────────────────────────

fn build_oauth1_header(
    creds: &CredentialBundle,
    method: &str,
    url: &str,
    query: &[(String, String)],
    nonce: &str,
    timestamp: &str,
) -> String {
    let oauth_params = [
        ("oauth_consumer_key", creds.api_key.as_str()),
        ("oauth_nonce", nonce),
        ("oauth_signature_method", "HMAC-SHA1"),
        ("oauth_timestamp", timestamp),
        ("oauth_token", creds.access_token.as_str()),
        ("oauth_version", "1.0"),
    ];

    let mut all: Vec<(String, String)> = oauth_params
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    all.extend(query.iter().cloned());

    let signature = oauth1_signature(
        method,
        url,
        &all,
        &creds.api_secret,
        &creds.access_token_secret,
    );

    let mut header = String::from("OAuth ");
    for (i, (k, v)) in oauth_params.iter().enumerate() {
        if i > 0 {
            header.push_str(", ");
        }
        header.push_str(&format!("{}=\"{}\"", k, enc(v)));
    }
    header.push_str(&format!(", oauth_signature=\"{}\"", enc(&signature)));
    header
}

/// Signature base string + HMAC-SHA1, per RFC 5849 §3.4.
fn oauth1_signature(
    method: &str,
    url: &str,
    params: &[(String, String)],
    consumer_secret: &str,
    token_secret: &str,
) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (enc(k), enc(v)))
        .collect();
    encoded.sort();
    let param_string = encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let base = format!(
        "{}&{}&{}",
        method.to_uppercase(),
        enc(url),
        enc(&param_string)
    );
    let signing_key = format!("{}&{}", enc(consumer_secret), enc(token_secret));

    let mut mac = Hmac::<Sha1>::new_from_slice(signing_key.as_bytes())
        .expect("HMAC-SHA1 accepts keys of any length");
    mac.update(base.as_bytes());
    STANDARD.encode(mac.finalize().into_bytes())
}

fn enc(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds() -> CredentialBundle {
        CredentialBundle {
            api_key: "ck".into(),
            api_secret: "cs".into(),
            access_token: "at".into(),
            access_token_secret: "ats".into(),
            bearer_token: "bt".into(),
        }
    }

    #[test]
    fn signature_matches_platform_documentation_example() {
        // The worked example from the platform's "creating a signature"
        // guide, reproduced verbatim.
        let params: Vec<(String, String)> = vec![
            (
                "status".into(),
                "Hello Ladies + Gentlemen, a signed OAuth request!".into(),
            ),
            ("include_entities".into(), "true".into()),
            ("oauth_consumer_key".into(), "xvz1evFS4wEEPTGEFPHBog".into()),
            (
                "oauth_nonce".into(),
                "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg".into(),
            ),
            ("oauth_signature_method".into(), "HMAC-SHA1".into()),
            ("oauth_timestamp".into(), "1318622958".into()),
            (
                "oauth_token".into(),
                "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb".into(),
            ),
            ("oauth_version".into(), "1.0".into()),
        ];
        let sig = oauth1_signature(
            "POST",
            "https://api.twitter.com/1.1/statuses/update.json",
            &params,
            "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw",
            "LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE",
        );
        assert_eq!(sig, "hCtSmYh+iHYCEqBWrE7C7hYmtUk=");
    }

    #[test]
    fn signature_is_deterministic_for_fixed_inputs() {
        let params: Vec<(String, String)> = vec![
            ("oauth_consumer_key".into(), "ck".into()),
            ("oauth_nonce".into(), "abc".into()),
            ("oauth_signature_method".into(), "HMAC-SHA1".into()),
            ("oauth_timestamp".into(), "1700000000".into()),
            ("oauth_token".into(), "at".into()),
            ("oauth_version".into(), "1.0".into()),
        ];
        let sig = oauth1_signature(
            "POST",
            "https://api.twitter.com/2/tweets",
            &params,
            "cs",
            "ats",
        );
        assert_eq!(sig, "J+89eNIepFa4iblS2uGwe8oaQ/c=");
    }

    #[test]
    fn query_parameters_are_folded_into_the_signature() {
        let params: Vec<(String, String)> = vec![
            ("oauth_consumer_key".into(), "ck".into()),
            ("oauth_nonce".into(), "abc".into()),
            ("oauth_signature_method".into(), "HMAC-SHA1".into()),
            ("oauth_timestamp".into(), "1700000000".into()),
            ("oauth_token".into(), "at".into()),
            ("oauth_version".into(), "1.0".into()),
            ("user.fields".into(), "name,username".into()),
        ];
        let sig = oauth1_signature(
            "GET",
            "https://api.twitter.com/2/users/me",
            &params,
            "cs",
            "ats",
        );
        assert_eq!(sig, "a2KjEursO7Sz2Q/P3nHoEc05jKs=");
    }

    #[test]
    fn header_carries_all_oauth_fields() {
        let header = build_oauth1_header(
            &creds(),
            "POST",
            "https://api.twitter.com/2/tweets",
            &[],
            "abc",
            "1700000000",
        );
        assert!(header.starts_with("OAuth "));
        for field in [
            "oauth_consumer_key=\"ck\"",
            "oauth_nonce=\"abc\"",
            "oauth_signature_method=\"HMAC-SHA1\"",
            "oauth_timestamp=\"1700000000\"",
            "oauth_token=\"at\"",
            "oauth_version=\"1.0\"",
            "oauth_signature=\"J%2B89eNIepFa4iblS2uGwe8oaQ%2Fc%3D\"",
        ] {
            assert!(header.contains(field), "missing {field} in {header}");
        }
    }

    #[test]
    fn percent_encoding_is_rfc3986() {
        assert_eq!(enc("Hello World!"), "Hello%20World%21");
        assert_eq!(enc("a+b"), "a%2Bb");
        assert_eq!(enc("keep-_.~"), "keep-_.~");
    }
}
