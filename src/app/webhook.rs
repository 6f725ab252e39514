use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use time::OffsetDateTime;

use crate::app::error::{ServiceError, ServiceResult};
use crate::domain::user::NewUser;

type HmacSha256 = Hmac<Sha256>;

const SECRET_PREFIX: &str = "whsec_";
const TOLERANCE_SECONDS: u64 = 5 * 60;
const FALLBACK_USERNAME: &str = "no_username";

/// The three `svix-*` headers that accompany every delivery.
#[derive(Debug, Clone)]
pub struct WebhookHeaders<'a> {
    pub id: &'a str,
    pub timestamp: &'a str,
    pub signature: &'a str,
}

/// Verifies Svix-style signed deliveries from the identity provider.
pub struct WebhookVerifier {
    key: Vec<u8>,
}

impl WebhookVerifier {
    pub fn new(secret: &str) -> ServiceResult<Self> {
        let encoded = secret.strip_prefix(SECRET_PREFIX).unwrap_or(secret);
        let key = STANDARD
            .decode(encoded.trim())
            .map_err(|_| ServiceError::Signature("malformed webhook secret".into()))?;
        Ok(Self { key })
    }

    pub fn verify(&self, headers: &WebhookHeaders<'_>, body: &[u8]) -> ServiceResult<()> {
        self.verify_at(headers, body, OffsetDateTime::now_utc())
    }

    fn verify_at(
        &self,
        headers: &WebhookHeaders<'_>,
        body: &[u8],
        now: OffsetDateTime,
    ) -> ServiceResult<()> {
        let timestamp: i64 = headers
            .timestamp
            .trim()
            .parse()
            .map_err(|_| ServiceError::Signature("invalid timestamp header".into()))?;
        if now.unix_timestamp().abs_diff(timestamp) > TOLERANCE_SECONDS {
            return Err(ServiceError::Signature("timestamp outside tolerance".into()));
        }

        let expected = self.sign(headers.id, headers.timestamp.trim(), body)?;

        let matched = headers
            .signature
            .split_whitespace()
            .filter_map(|entry| entry.split_once(','))
            .filter(|(version, _)| *version == "v1")
            .any(|(_, signature)| bool::from(signature.as_bytes().ct_eq(expected.as_bytes())));

        if matched {
            Ok(())
        } else {
            Err(ServiceError::Signature("no matching signature".into()))
        }
    }

    /// Base64 HMAC-SHA256 over `"{id}.{timestamp}.{body}"`.
    pub fn sign(&self, id: &str, timestamp: &str, body: &[u8]) -> ServiceResult<String> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|_| ServiceError::Signature("unusable webhook secret".into()))?;
        mac.update(id.as_bytes());
        mac.update(b".");
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(body);
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }
}

#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct UserCreatedData {
    id: String,
    #[serde(default)]
    email_addresses: Vec<EmailAddress>,
    first_name: Option<String>,
    last_name: Option<String>,
    image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmailAddress {
    email_address: String,
}

/// The user record a `user.created` event asks for, or `None` for any other event.
pub fn user_from_event(event: &WebhookEvent) -> ServiceResult<Option<NewUser>> {
    if event.event_type != "user.created" {
        return Ok(None);
    }

    let data: UserCreatedData = serde_json::from_value(event.data.clone())
        .map_err(|err| ServiceError::validation(format!("invalid user.created payload: {err}")))?;

    let email = data
        .email_addresses
        .into_iter()
        .next()
        .map(|address| address.email_address);
    let username = email
        .as_deref()
        .and_then(username_from_email)
        .unwrap_or(FALLBACK_USERNAME)
        .to_string();
    let fullname = format!(
        "{} {}",
        data.first_name.unwrap_or_default(),
        data.last_name.unwrap_or_default()
    )
    .trim()
    .to_string();

    Ok(Some(NewUser {
        external_id: data.id,
        username,
        fullname,
        email,
        image: data.image_url,
    }))
}

fn username_from_email(email: &str) -> Option<&str> {
    email.split('@').next().filter(|local| !local.is_empty())
}
