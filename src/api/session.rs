use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::FromRequestParts,
    http::{HeaderValue, header::COOKIE, header::SET_COOKIE, request::Parts},
    response::Response,
};

use crate::{server::AppState, types::Session};

/// The caller's session, resolved from the signed cookie.
///
/// `id` is `None` when the request carried no valid cookie or the id is
/// unknown to the store (e.g. after a restart); `session` is then empty.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    pub id: Option<String>,
    pub session: Session,
}

impl<S> FromRequestParts<S> for SessionContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(state) = parts.extensions.get::<Arc<AppState>>().cloned() else {
            return Ok(SessionContext::default());
        };

        let id = parts
            .headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|header| state.sessions.session_id_from_cookie(header));

        let Some(id) = id else {
            return Ok(SessionContext::default());
        };

        match state.sessions.get(&id).await {
            Some(session) => Ok(SessionContext {
                id: Some(id),
                session,
            }),
            None => Ok(SessionContext::default()),
        }
    }
}

impl SessionContext {
    /// Writes `session` back to the store.
    ///
    /// Returns the `Set-Cookie` value when a new session had to be created.
    pub async fn save(&mut self, state: &AppState, session: Session) -> Option<String> {
        self.session = session.clone();
        match &self.id {
            Some(id) => {
                state.sessions.put(id, session).await;
                None
            }
            None => {
                let id = state.sessions.create(session).await;
                let cookie = state.sessions.set_cookie_header(&id);
                self.id = Some(id);
                Some(cookie)
            }
        }
    }
}

pub fn with_cookie(mut response: Response, cookie: Option<String>) -> Response {
    if let Some(value) = cookie.and_then(|c| HeaderValue::from_str(&c).ok()) {
        response.headers_mut().append(SET_COOKIE, value);
    }
    response
}
