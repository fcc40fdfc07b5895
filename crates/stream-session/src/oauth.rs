//! OAuth 1.0a request signing.
//!
//! Every stream request carries an `Authorization: OAuth ...` header signed
//! with HMAC-SHA1 over the method, URL, and all request parameters.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use credential_store::CredentialSet;
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use rand::RngCore;
use reconnect_policy::TransportError;
use sha1::Sha1;
use std::time::{SystemTime, UNIX_EPOCH};

/// Everything outside the RFC 3986 unreserved set (ALPHA / DIGIT / "-" / "." / "_" / "~").
const OAUTH_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'!')
    .add(b'"')
    .add(b'#')
    .add(b'$')
    .add(b'%')
    .add(b'&')
    .add(b'\'')
    .add(b'(')
    .add(b')')
    .add(b'*')
    .add(b'+')
    .add(b',')
    .add(b'/')
    .add(b':')
    .add(b';')
    .add(b'<')
    .add(b'=')
    .add(b'>')
    .add(b'?')
    .add(b'@')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Signs requests with a fixed credential set.
pub struct OAuthSigner<'a> {
    credentials: &'a CredentialSet,
}

impl<'a> OAuthSigner<'a> {
    pub fn new(credentials: &'a CredentialSet) -> Self {
        Self { credentials }
    }

    /// Build the `Authorization` header value for one request.
    ///
    /// `params` are the query and form-body parameters, unencoded.
    pub fn authorization(
        &self,
        method: &str,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<String, TransportError> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
            .to_string();
        self.authorization_with(method, url, params, &timestamp, &generate_nonce())
    }

    /// As [`authorization`](Self::authorization) with a fixed timestamp and nonce.
    pub fn authorization_with(
        &self,
        method: &str,
        url: &str,
        params: &[(&str, &str)],
        timestamp: &str,
        nonce: &str,
    ) -> Result<String, TransportError> {
        let mut oauth_params = vec![
            ("oauth_consumer_key", self.credentials.consumer_key().to_string()),
            ("oauth_nonce", nonce.to_string()),
            ("oauth_signature_method", "HMAC-SHA1".to_string()),
            ("oauth_timestamp", timestamp.to_string()),
            ("oauth_token", self.credentials.access_token().to_string()),
            ("oauth_version", "1.0".to_string()),
        ];

        let signature = self.signature(method, url, &oauth_params, params)?;
        oauth_params.push(("oauth_signature", signature));

        let header = oauth_params
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
            .collect::<Vec<_>>()
            .join(", ");
        Ok(format!("OAuth {header}"))
    }

    fn signature(
        &self,
        method: &str,
        url: &str,
        oauth_params: &[(&str, String)],
        params: &[(&str, &str)],
    ) -> Result<String, TransportError> {
        // Sort on encoded pairs so keys differing only in reserved characters order correctly.
        let mut encoded: Vec<(String, String)> = oauth_params
            .iter()
            .map(|(k, v)| (percent_encode(k), percent_encode(v)))
            .chain(params.iter().map(|(k, v)| (percent_encode(k), percent_encode(v))))
            .collect();
        encoded.sort();

        let param_string = encoded
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");

        let base_string = format!(
            "{}&{}&{}",
            method.to_uppercase(),
            percent_encode(url),
            percent_encode(&param_string)
        );
        let signing_key = format!(
            "{}&{}",
            percent_encode(self.credentials.consumer_secret()),
            percent_encode(self.credentials.access_token_secret())
        );

        hmac_sha1(&signing_key, &base_string)
    }
}

/// Percent-encode per RFC 3986 as OAuth requires.
pub fn percent_encode(s: &str) -> String {
    utf8_percent_encode(s, OAUTH_ENCODE_SET).to_string()
}

fn generate_nonce() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn hmac_sha1(key: &str, data: &str) -> Result<String, TransportError> {
    let mut mac = <Hmac<Sha1> as Mac>::new_from_slice(key.as_bytes())
        .map_err(|e| TransportError::Unknown(format!("invalid signing key: {e}")))?;
    mac.update(data.as_bytes());
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}
