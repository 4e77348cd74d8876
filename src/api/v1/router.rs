use super::error::*;
use super::handler::{self, RefreshRequest};
use crate::application_port::{AuthError, SessionManager};
use crate::domain_model::UserId;
use std::convert::Infallible;
use std::sync::Arc;
use warp::hyper::body::Bytes;
use warp::{Filter, reject};

const MAX_BODY_BYTES: u64 = 16 * 1024;

pub fn routes(
    session_manager: Arc<dyn SessionManager>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let refresh = warp::post()
        .and(warp::path!("auth" / "refresh"))
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(with(session_manager.clone()))
        .and_then(handler::refresh);

    // Logout takes the raw bearer token: a token that is already revoked can
    // still end its session.
    let logout = warp::post()
        .and(warp::path!("auth" / "logout"))
        .and(bearer())
        .and(optional_refresh_body())
        .and(with(session_manager.clone()))
        .and_then(handler::logout);

    let me = warp::get()
        .and(warp::path!("auth" / "me"))
        .and(with_verification(session_manager.clone()))
        .and_then(handler::me);

    refresh.or(logout).or(me)
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

fn bearer() -> impl Filter<Extract = (String,), Error = warp::Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(
        |header: Option<String>| async move {
            match header.as_deref().and_then(|h| h.strip_prefix("Bearer ")) {
                Some(token) if !token.is_empty() => Ok(token.to_string()),
                _ => Err(reject::custom(ApiErrorCode::from(AuthError::TokenNotFound))),
            }
        },
    )
}

/// Logout may carry the refresh token in a JSON body. Without a
/// Content-Length the body is not read at all.
fn optional_refresh_body() -> impl Filter<Extract = (RefreshRequest,), Error = warp::Rejection> + Clone
{
    let absent = warp::header::optional::<u64>("content-length").and_then(
        |length: Option<u64>| async move {
            match length {
                None | Some(0) => Ok(RefreshRequest::default()),
                Some(_) => Err(reject::not_found()),
            }
        },
    );
    let present = warp::body::content_length_limit(MAX_BODY_BYTES)
        .and(warp::body::bytes())
        .and_then(|body: Bytes| async move {
            serde_json::from_slice::<RefreshRequest>(&body)
                .map_err(|_| reject::custom(ApiErrorCode::BadRequest))
        });
    absent.or(present).unify()
}

fn with_verification(
    session_manager: Arc<dyn SessionManager>,
) -> impl Filter<Extract = (UserId,), Error = warp::Rejection> + Clone {
    bearer().and_then(move |token: String| {
        let session_manager = session_manager.clone();
        async move {
            let user_id = session_manager
                .validate_access_token(&token)
                .await
                .map_err(ApiErrorCode::from)
                .map_err(reject::custom)?;
            Ok::<_, warp::Rejection>(user_id)
        }
    })
}
