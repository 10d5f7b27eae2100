use std::collections::{BTreeSet, HashMap};

use actix_web::http::StatusCode;
use chrono::{DateTime, TimeZone, Utc};
use err_derive::Error;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Header, Validation};
use log::*;
use serde::Deserialize;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error(display = "authorization header is expected")]
    MissingHeader,
    #[error(display = "authorization header must start with \"Bearer\"")]
    NotBearer,
    #[error(display = "token not found")]
    MissingToken,
    #[error(display = "authorization header must be bearer token")]
    Malformed,
    #[error(display = "unable to parse authentication token")]
    Unparseable(#[error(source, no_from)] jsonwebtoken::errors::Error),
    #[error(display = "unable to find the appropriate key")]
    UnknownKey,
    #[error(display = "token algorithm {:?} is not accepted", _0)]
    Algorithm(Algorithm),
    #[error(display = "token expired")]
    Expired,
    #[error(display = "incorrect claims, please check the audience and issuer")]
    InvalidClaims(#[error(source, no_from)] jsonwebtoken::errors::Error),
    #[error(display = "invalid token")]
    Invalid(#[error(source, no_from)] jsonwebtoken::errors::Error),
    #[error(display = "permission not found")]
    MissingScope(String),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Malformed
            | AuthError::Unparseable(_)
            | AuthError::UnknownKey
            | AuthError::Algorithm(_) => StatusCode::BAD_REQUEST,
            AuthError::MissingScope(_) => StatusCode::FORBIDDEN,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

/// Keys trusted to sign bearer tokens.
#[derive(Clone)]
pub enum SigningKeys {
    /// Published keys, looked up by the token's `kid`.
    ById(HashMap<String, DecodingKey>),
    Shared(DecodingKey),
}

impl SigningKeys {
    pub fn from_jwks(jwks: &JwkSet) -> Result<Self, jsonwebtoken::errors::Error> {
        let mut keys = HashMap::new();
        for jwk in jwks.keys.iter() {
            match &jwk.common.key_id {
                Some(kid) => {
                    keys.insert(kid.clone(), DecodingKey::from_jwk(jwk)?);
                }
                None => warn!("Ignoring signing key without a key id"),
            }
        }
        debug!("Loaded {} signing keys", keys.len());
        Ok(SigningKeys::ById(keys))
    }

    pub fn shared_secret(secret: &[u8]) -> Self {
        SigningKeys::Shared(DecodingKey::from_secret(secret))
    }

    fn default_algorithms(&self) -> Vec<Algorithm> {
        match self {
            SigningKeys::ById(_) => vec![Algorithm::RS256],
            SigningKeys::Shared(_) => vec![Algorithm::HS256],
        }
    }

    fn key_for(&self, header: &Header) -> Result<&DecodingKey, AuthError> {
        match self {
            SigningKeys::Shared(key) => Ok(key),
            SigningKeys::ById(keys) => header
                .kid
                .as_ref()
                .and_then(|kid| keys.get(kid))
                .ok_or(AuthError::UnknownKey),
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
enum Audience {
    One(String),
    Many(Vec<String>),
}

#[derive(Deserialize, Debug)]
struct RawClaims {
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    permissions: Vec<String>,
    #[serde(default)]
    exp: Option<i64>,
    #[serde(default)]
    iss: Option<String>,
    #[serde(default)]
    aud: Option<Audience>,
}

/// The verified claims of one request's bearer token.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthToken {
    pub subject: String,
    pub scopes: BTreeSet<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub issuer: Option<String>,
    pub audience: Vec<String>,
}

impl AuthToken {
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.contains(scope)
    }
}

impl From<RawClaims> for AuthToken {
    fn from(raw: RawClaims) -> Self {
        // Auth0 puts RBAC grants in `permissions`; OAuth scopes arrive
        // space-delimited in `scope`. Either one grants access.
        let scopes = raw
            .scope
            .iter()
            .flat_map(|s| s.split_whitespace())
            .map(str::to_string)
            .chain(raw.permissions)
            .collect();
        let audience = match raw.aud {
            None => Vec::new(),
            Some(Audience::One(aud)) => vec![aud],
            Some(Audience::Many(auds)) => auds,
        };
        AuthToken {
            subject: raw.sub.unwrap_or_default(),
            scopes,
            expires_at: raw.exp.and_then(|exp| Utc.timestamp_opt(exp, 0).single()),
            issuer: raw.iss,
            audience,
        }
    }
}

#[derive(Clone)]
pub struct TokenVerifier {
    keys: SigningKeys,
    algorithms: Vec<Algorithm>,
    issuer: Option<String>,
    audience: Option<String>,
}

impl TokenVerifier {
    pub fn new(keys: SigningKeys) -> Self {
        let algorithms = keys.default_algorithms();
        TokenVerifier {
            keys,
            algorithms,
            issuer: None,
            audience: None,
        }
    }

    pub fn with_issuer<S: Into<String>>(mut self, issuer: S) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn with_audience<S: Into<String>>(mut self, audience: S) -> Self {
        self.audience = Some(audience.into());
        self
    }

    pub fn with_algorithms(mut self, algorithms: Vec<Algorithm>) -> Self {
        if !algorithms.is_empty() {
            self.algorithms = algorithms;
        }
        self
    }

    /// Checks a raw `Authorization` header value and returns its claims.
    pub fn verify(&self, header: Option<&str>) -> Result<AuthToken, AuthError> {
        let token = bearer_token(header)?;
        self.decode(token)
    }

    pub fn decode(&self, token: &str) -> Result<AuthToken, AuthError> {
        let header = decode_header(token).map_err(AuthError::Unparseable)?;
        if !self.algorithms.contains(&header.alg) {
            return Err(AuthError::Algorithm(header.alg));
        }
        let key = self.keys.key_for(&header)?;

        let mut validation = Validation::new(header.alg);
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }
        match &self.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        let data = decode::<RawClaims>(token, key, &validation).map_err(classify)?;
        Ok(data.claims.into())
    }
}

/// Pulls the token out of a `Bearer <token>` header value.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header.ok_or(AuthError::MissingHeader)?;
    let parts = header.split_whitespace().collect::<Vec<_>>();
    match parts.as_slice() {
        [scheme, ..] if !scheme.eq_ignore_ascii_case("bearer") => Err(AuthError::NotBearer),
        [] => Err(AuthError::NotBearer),
        [_] => Err(AuthError::MissingToken),
        [_, token] => Ok(*token),
        _ => Err(AuthError::Malformed),
    }
}

fn classify(err: jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::Expired,
        ErrorKind::InvalidIssuer
        | ErrorKind::InvalidAudience
        | ErrorKind::InvalidSubject
        | ErrorKind::ImmatureSignature
        | ErrorKind::MissingRequiredClaim(_) => AuthError::InvalidClaims(err),
        ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) => {
            AuthError::Unparseable(err)
        }
        _ => AuthError::Invalid(err),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey};
    use maplit::btreeset;
    use serde_json::{json, Value};

    const SECRET: &[u8] = b"a-secret-only-the-tests-know";
    // base64url of SECRET
    const SECRET_B64: &str = "YS1zZWNyZXQtb25seS10aGUtdGVzdHMta25vdw";
    const ISSUER: &str = "https://coffee.example.com/";
    const AUDIENCE: &str = "drinks";

    fn verifier() -> TokenVerifier {
        TokenVerifier::new(SigningKeys::shared_secret(SECRET))
            .with_issuer(ISSUER)
            .with_audience(AUDIENCE)
    }

    fn claims(exp_offset: i64) -> Value {
        json!({
            "sub": "auth0|manager",
            "scope": "get:drinks-detail post:drinks",
            "permissions": ["delete:drinks"],
            "iss": ISSUER,
            "aud": AUDIENCE,
            "exp": Utc::now().timestamp() + exp_offset,
        })
    }

    fn sign(claims: &Value, header: &Header, secret: &[u8]) -> String {
        encode(header, claims, &EncodingKey::from_secret(secret)).expect("encode")
    }

    fn hs256() -> Header {
        Header::new(Algorithm::HS256)
    }

    #[test]
    fn accepts_a_well_formed_token() {
        let token = sign(&claims(3600), &hs256(), SECRET);

        let decoded = verifier()
            .verify(Some(&format!("Bearer {}", token)))
            .expect("verify");

        assert_eq!(decoded.subject, "auth0|manager");
        assert_eq!(
            decoded.scopes,
            btreeset! {
                "get:drinks-detail".to_string(),
                "post:drinks".to_string(),
                "delete:drinks".to_string(),
            }
        );
        assert_eq!(decoded.issuer.as_deref(), Some(ISSUER));
        assert_eq!(decoded.audience, vec![AUDIENCE.to_string()]);
        assert!(decoded.expires_at.expect("expiry") > Utc::now());
    }

    #[test]
    fn scheme_is_case_insensitive() {
        let token = sign(&claims(3600), &hs256(), SECRET);

        let decoded = verifier().verify(Some(&format!("bearer {}", token)));

        assert!(decoded.is_ok(), "got {:?}", decoded);
    }

    #[test]
    fn header_shape_is_checked_before_the_token() {
        let cases: Vec<(Option<&str>, u16)> = vec![
            (None, 401),
            (Some(""), 401),
            (Some("Basic dXNlcjpwYXNz"), 401),
            (Some("Bearer"), 401),
            (Some("Bearer a b"), 400),
        ];
        for (header, status) in cases {
            let err = bearer_token(header).expect_err("should reject");
            assert_eq!(err.status().as_u16(), status, "header {:?}: {}", header, err);
        }
    }

    #[test]
    fn rejects_garbage_tokens() {
        let err = verifier().decode("not.a.jwt").expect_err("garbage");

        assert_eq!(err.status(), StatusCode::BAD_REQUEST, "{:?}", err);
    }

    #[test]
    fn rejects_expired_tokens() {
        let token = sign(&claims(-3600), &hs256(), SECRET);

        let err = verifier().decode(&token).expect_err("expired");

        assert!(matches!(err, AuthError::Expired), "{:?}", err);
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn rejects_tokens_signed_with_another_key() {
        let token = sign(&claims(3600), &hs256(), b"somebody-elses-secret");

        let err = verifier().decode(&token).expect_err("forged");

        assert_eq!(err.status(), StatusCode::UNAUTHORIZED, "{:?}", err);
    }

    #[test]
    fn rejects_the_wrong_audience() {
        let mut claims = claims(3600);
        claims["aud"] = json!("some-other-api");
        let token = sign(&claims, &hs256(), SECRET);

        let err = verifier().decode(&token).expect_err("audience");

        assert!(matches!(err, AuthError::InvalidClaims(_)), "{:?}", err);
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn rejects_the_wrong_issuer() {
        let mut claims = claims(3600);
        claims["iss"] = json!("https://evil.example.com/");
        let token = sign(&claims, &hs256(), SECRET);

        let err = verifier().decode(&token).expect_err("issuer");

        assert!(matches!(err, AuthError::InvalidClaims(_)), "{:?}", err);
    }

    #[test]
    fn rejects_algorithms_outside_the_allow_list() {
        let token = sign(&claims(3600), &Header::new(Algorithm::HS512), SECRET);

        let err = verifier().decode(&token).expect_err("algorithm");

        assert!(matches!(err, AuthError::Algorithm(Algorithm::HS512)), "{:?}", err);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    fn jwks_verifier() -> TokenVerifier {
        let jwks: JwkSet = serde_json::from_value(json!({
            "keys": [{"kty": "oct", "kid": "barista-key", "alg": "HS256", "k": SECRET_B64}]
        }))
        .expect("jwks");
        TokenVerifier::new(SigningKeys::from_jwks(&jwks).expect("keys"))
            .with_algorithms(vec![Algorithm::HS256])
            .with_audience(AUDIENCE)
    }

    #[test]
    fn looks_up_published_keys_by_id() {
        let mut header = hs256();
        header.kid = Some("barista-key".into());
        let token = sign(&claims(3600), &header, SECRET);

        let decoded = jwks_verifier().decode(&token).expect("verify");

        assert_eq!(decoded.subject, "auth0|manager");
    }

    #[test]
    fn unknown_key_ids_are_bad_requests() {
        let mut header = hs256();
        header.kid = Some("rotated-away".into());
        let token = sign(&claims(3600), &header, SECRET);

        let err = jwks_verifier().decode(&token).expect_err("unknown kid");

        assert!(matches!(err, AuthError::UnknownKey), "{:?}", err);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn missing_audience_is_fine_when_none_is_configured() {
        let mut claims = claims(3600);
        claims.as_object_mut().expect("object").remove("aud");
        let token = sign(&claims, &hs256(), SECRET);

        let verifier = TokenVerifier::new(SigningKeys::shared_secret(SECRET));
        let decoded = verifier.decode(&token).expect("verify");

        assert!(decoded.audience.is_empty());
    }
}
