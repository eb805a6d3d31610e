//! Cookie-session extractors for handlers.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;

use crate::application::error::HttpError;
use crate::domain::entities::UserRecord;

use super::{HttpState, redirect_found};

pub const SESSION_COOKIE: &str = "pero_session";

/// The signed-in viewer, when the request carries a valid session cookie.
/// Anonymous requests extract as `MaybeUser(None)`.
pub struct MaybeUser(pub Option<UserRecord>);

/// A signed-in viewer, or a redirect to the login page carrying the
/// originally requested path.
pub struct RequireUser(pub UserRecord);

pub enum AuthRejection {
    LoginRedirect { next: String },
    Failure(HttpError),
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::LoginRedirect { next } => {
                // The destination may carry its own query string.
                let next = urlencoding::encode(&next);
                redirect_found(&format!("/auth/login/?next={next}"))
            }
            Self::Failure(err) => err.into_response(),
        }
    }
}

async fn resolve_session<S>(parts: &Parts, state: &S) -> Result<Option<UserRecord>, HttpError>
where
    HttpState: FromRef<S>,
{
    let state = HttpState::from_ref(state);
    let jar = CookieJar::from_headers(&parts.headers);
    let Some(cookie) = jar.get(SESSION_COOKIE) else {
        return Ok(None);
    };

    state.auth.authenticate(cookie.value()).await.map_err(|err| {
        HttpError::from_error(
            "infra::http::extract::resolve_session",
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to resolve session",
            &err,
        )
    })
}

impl<S> FromRequestParts<S> for MaybeUser
where
    HttpState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = HttpError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(resolve_session(parts, state).await?))
    }
}

impl<S> FromRequestParts<S> for RequireUser
where
    HttpState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match resolve_session(parts, state).await {
            Ok(Some(user)) => Ok(Self(user)),
            Ok(None) => {
                let next = match parts.uri.query() {
                    Some(query) => format!("{}?{}", parts.uri.path(), query),
                    None => parts.uri.path().to_string(),
                };
                Err(AuthRejection::LoginRedirect { next })
            }
            Err(err) => Err(AuthRejection::Failure(err)),
        }
    }
}
