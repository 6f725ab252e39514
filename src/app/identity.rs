use pasetors::claims::{Claims, ClaimsValidationRules};
use pasetors::keys::AsymmetricPublicKey;
use pasetors::token::UntrustedToken;
use pasetors::{public, version4::V4, Public};

use crate::app::error::{ServiceError, ServiceResult};

/// Verified caller identity, as asserted by the identity provider.
#[derive(Debug, Clone)]
pub struct Identity {
    pub external_id: String,
}

/// Checks session tokens minted by the identity provider (PASETO v4.public).
#[derive(Clone)]
pub struct IdentityVerifier {
    public_key: [u8; 32],
    issuer: String,
}

impl IdentityVerifier {
    pub fn new(public_key: [u8; 32], issuer: impl Into<String>) -> Self {
        Self {
            public_key,
            issuer: issuer.into(),
        }
    }

    pub fn verify(&self, token: &str) -> ServiceResult<Identity> {
        let claims = self
            .verify_claims(token)
            .ok_or_else(|| ServiceError::Authentication("invalid token".into()))?;

        let external_id = claims
            .get_claim("sub")
            .and_then(|value| value.as_str())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ServiceError::Authentication("token has no subject".into()))?;

        Ok(Identity {
            external_id: external_id.to_string(),
        })
    }

    fn verify_claims(&self, token: &str) -> Option<Claims> {
        let key = AsymmetricPublicKey::<V4>::from(&self.public_key).ok()?;
        let mut rules = ClaimsValidationRules::new();
        rules.validate_issuer_with(&self.issuer);

        let untrusted = UntrustedToken::<Public, V4>::try_from(token).ok()?;
        let trusted = public::verify(&key, &untrusted, &rules, None, None).ok()?;
        trusted.payload_claims().cloned()
    }
}
