//! Token issuing and request authentication.
//!
//! The admin console authenticates with an HTTP-only session cookie holding
//! the JWT; API clients send the same token as `Authorization: Bearer`.

use std::future::{ready, Ready};

use actix_web::{
    cookie::{time::Duration as CookieDuration, Cookie, SameSite},
    dev::Payload,
    http::header,
    web, FromRequest, HttpRequest,
};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::{debug, warn};
use mongodb::bson::oid::ObjectId;

use crate::{
    config::{AuthConfig, Config},
    error::ApiError,
    models::{Claims, Owned, UserRole},
};

pub fn hash_password(password: &str, auth: &AuthConfig) -> Result<String, ApiError> {
    Ok(bcrypt::hash(password, auth.bcrypt_cost)?)
}

/// Accounts without a password hash never match.
pub fn verify_password(password: &str, hash: &str) -> bool {
    if hash.is_empty() {
        return false;
    }
    bcrypt::verify(password, hash).unwrap_or_else(|e| {
        warn!("Bcrypt verification error: {}", e);
        false
    })
}

pub fn issue_token(user_id: ObjectId, role: UserRole, auth: &AuthConfig) -> Result<String, ApiError> {
    let now = chrono::Utc::now();
    let expiration = now + chrono::Duration::hours(auth.token_ttl_hours);
    let claims = Claims {
        sub: user_id.to_hex(),
        role,
        iat: now.timestamp() as usize,
        exp: expiration.timestamp() as usize,
    };

    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(auth.jwt_secret.as_ref()),
    )?)
}

pub fn decode_token(token: &str, auth: &AuthConfig) -> Result<Claims, jsonwebtoken::errors::Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(auth.jwt_secret.as_ref()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
}

pub fn session_cookie(token: String, auth: &AuthConfig) -> Cookie<'static> {
    Cookie::build(auth.cookie_name.clone(), token)
        .path("/")
        .http_only(true)
        .secure(auth.cookie_secure)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::hours(auth.token_ttl_hours))
        .finish()
}

pub fn expired_session_cookie(auth: &AuthConfig) -> Cookie<'static> {
    let mut cookie = Cookie::build(auth.cookie_name.clone(), "")
        .path("/")
        .http_only(true)
        .secure(auth.cookie_secure)
        .same_site(SameSite::Lax)
        .finish();
    cookie.make_removal();
    cookie
}

/// Bearer header first, then the session cookie.
fn token_from_request(req: &HttpRequest, cookie_name: &str) -> Option<String> {
    if let Some(value) = req.headers().get(header::AUTHORIZATION) {
        let Ok(value) = value.to_str() else {
            debug!("Authorization header is not valid ASCII");
            return None;
        };
        return match value.strip_prefix("Bearer ") {
            Some(token) => Some(token.trim().to_string()),
            None => {
                debug!("Invalid Authorization header format");
                None
            }
        };
    }

    req.cookie(cookie_name).map(|c| c.value().to_string())
}

/// The caller, as established by a valid token.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub id: ObjectId,
    pub role: UserRole,
}

impl AuthUser {
    /// Admins may act on any record; everyone else only on their own.
    pub fn can_access<E: Owned>(&self, record: &E) -> bool {
        self.role.is_admin() || record.owner_id() == self.id
    }

    fn from_http_request(req: &HttpRequest) -> Result<Self, ApiError> {
        let config = req
            .app_data::<web::Data<Config>>()
            .ok_or_else(|| ApiError::Internal("Config is not registered as app data".into()))?;

        let token = token_from_request(req, &config.auth.cookie_name)
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".into()))?;

        let claims = decode_token(&token, &config.auth).map_err(|e| {
            debug!("Token decoding failed: {:?}", e);
            ApiError::Unauthorized("Invalid or expired token".into())
        })?;

        let id = ObjectId::parse_str(&claims.sub).map_err(|_| {
            warn!("Token carries a malformed subject: {}", claims.sub);
            ApiError::Unauthorized("Invalid or expired token".into())
        })?;

        Ok(AuthUser {
            id,
            role: claims.role,
        })
    }
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(AuthUser::from_http_request(req))
    }
}

/// An authenticated user allowed into the admin console.
#[derive(Debug, Clone, Copy)]
pub struct OperatorUser(pub AuthUser);

impl FromRequest for OperatorUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(AuthUser::from_http_request(req).and_then(|user| {
            if user.role.can_use_console() {
                Ok(OperatorUser(user))
            } else {
                Err(ApiError::Forbidden(
                    "The admin console is only available to operator accounts".into(),
                ))
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use actix_web::test::TestRequest;

    use super::*;

    fn config() -> Config {
        let mut config = Config::default();
        config.auth.jwt_secret = "test-secret".to_string();
        config.auth.bcrypt_cost = 4;
        config
    }

    #[test]
    fn issued_tokens_decode_with_the_same_secret_only() {
        let config = config();
        let id = ObjectId::new();
        let token = issue_token(id, UserRole::Operator, &config.auth).unwrap();

        let claims = decode_token(&token, &config.auth).unwrap();
        assert_eq!(claims.sub, id.to_hex());
        assert_eq!(claims.role, UserRole::Operator);
        assert!(claims.exp > claims.iat);

        let mut other = config.auth.clone();
        other.jwt_secret = "another-secret".to_string();
        assert!(decode_token(&token, &other).is_err());
    }

    #[test]
    fn passwords_verify_against_their_hash() {
        let config = config();
        let hash = hash_password("correct horse", &config.auth).unwrap();
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("battery staple", &hash));
        assert!(!verify_password("anything", ""));
    }

    #[actix_web::test]
    async fn extractor_reads_bearer_header_and_cookie() {
        let config = config();
        let id = ObjectId::new();
        let token = issue_token(id, UserRole::Customer, &config.auth).unwrap();
        let data = web::Data::new(config.clone());

        let req = TestRequest::default()
            .app_data(data.clone())
            .insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
            .to_http_request();
        let user = AuthUser::from_http_request(&req).unwrap();
        assert_eq!(user.id, id);

        let req = TestRequest::default()
            .app_data(data.clone())
            .cookie(session_cookie(token.clone(), &config.auth))
            .to_http_request();
        assert_eq!(AuthUser::from_http_request(&req).unwrap().id, id);

        let req = TestRequest::default()
            .app_data(data.clone())
            .cookie(session_cookie(token, &config.auth))
            .to_http_request();
        let operator = OperatorUser::from_request(&req, &mut Payload::None).await;
        assert!(matches!(operator, Err(ApiError::Forbidden(_))));

        let req = TestRequest::default().app_data(data).to_http_request();
        assert!(matches!(
            AuthUser::from_http_request(&req),
            Err(ApiError::Unauthorized(_))
        ));
    }
}
