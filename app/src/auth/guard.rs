use std::future::{ready, Ready};
use std::marker::PhantomData;
use std::ops::Deref;

use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, FromRequest, HttpRequest};
use log::*;

use super::verifier::{AuthError, AuthToken, TokenVerifier};
use crate::errors::ApiError;

/// A scope a caller's token must carry.
pub trait Permission {
    const SCOPE: &'static str;
}

#[derive(Debug, Clone, Copy)]
pub struct GetDrinksDetail;
#[derive(Debug, Clone, Copy)]
pub struct PostDrinks;
#[derive(Debug, Clone, Copy)]
pub struct PatchDrinks;
#[derive(Debug, Clone, Copy)]
pub struct DeleteDrinks;

impl Permission for GetDrinksDetail {
    const SCOPE: &'static str = "get:drinks-detail";
}
impl Permission for PostDrinks {
    const SCOPE: &'static str = "post:drinks";
}
impl Permission for PatchDrinks {
    const SCOPE: &'static str = "patch:drinks";
}
impl Permission for DeleteDrinks {
    const SCOPE: &'static str = "delete:drinks";
}

/// A caller whose token has been verified and carries `P`'s scope.
#[derive(Debug)]
pub struct Authorized<P> {
    token: AuthToken,
    phantom: PhantomData<P>,
}

impl<P> Deref for Authorized<P> {
    type Target = AuthToken;
    fn deref(&self) -> &AuthToken {
        &self.token
    }
}

pub fn authorize(
    verifier: &TokenVerifier,
    header: Option<&str>,
    scope: &str,
) -> Result<AuthToken, AuthError> {
    let token = verifier.verify(header)?;
    if !token.has_scope(scope) {
        warn!("{:?} lacks scope {}", token.subject, scope);
        return Err(AuthError::MissingScope(scope.to_string()));
    }
    Ok(token)
}

impl<P: Permission> Authorized<P> {
    fn from_req(req: &HttpRequest) -> Result<Self, ApiError> {
        let verifier = req.app_data::<web::Data<TokenVerifier>>().ok_or_else(|| {
            ApiError::Internal("no token verifier registered with the app".into())
        })?;
        let header = match req.headers().get(AUTHORIZATION) {
            Some(value) => Some(value.to_str().map_err(|_| AuthError::NotBearer)?),
            None => None,
        };
        let token = authorize(verifier, header, P::SCOPE)?;
        debug!("Authorized {:?} for {}", token.subject, P::SCOPE);
        Ok(Authorized {
            token,
            phantom: PhantomData,
        })
    }
}

impl<P: Permission> FromRequest for Authorized<P> {
    type Error = ApiError;
    type Future = Ready<Result<Self, ApiError>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Self::from_req(req))
    }
}
