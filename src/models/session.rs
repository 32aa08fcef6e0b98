use actix_service::{self, Transform};
use actix_web::{
    dev::{Service, ServiceRequest, ServiceResponse},
    Error, HttpMessage,
};
use chrono::Utc;
use futures::{
    future::{ready, LocalBoxFuture, Ready},
    FutureExt,
};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::rc::Rc;

use crate::{config::SessionConfig, error::AppResult};

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    sub: String,
    name: String,
    role: String,
    iss: String,
    exp: i64,
}

/// Identity attached to each request once its bearer token checks out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub username: String,
    pub role: String,
}

#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    ttl_seconds: i64,
}

pub struct SessionMiddleware<S> {
    service: Rc<S>,
    keys: SessionKeys,
}
pub struct SessionMiddlewareFactory {
    keys: SessionKeys,
}

impl SessionKeys {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            issuer: config.issuer.clone(),
            ttl_seconds: config.ttl_seconds,
        }
    }
    pub fn issue(&self, session: &Session) -> AppResult<String> {
        let claims = SessionClaims {
            sub: session.user_id.clone(),
            name: session.username.clone(),
            role: session.role.clone(),
            iss: self.issuer.clone(),
            exp: Utc::now().timestamp() + self.ttl_seconds,
        };

        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }
    pub fn verify(&self, token: &str) -> AppResult<Session> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.issuer.as_str()]);

        let data = decode::<SessionClaims>(token, &self.decoding, &validation)?;
        Ok(Session {
            user_id: data.claims.sub,
            username: data.claims.name,
            role: data.claims.role,
        })
    }
}

impl SessionMiddlewareFactory {
    pub fn new(keys: SessionKeys) -> Self {
        Self { keys }
    }
}

impl<S, B> Service<ServiceRequest> for SessionMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    actix_service::forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv: Rc<S> = self.service.clone();

        let token = req
            .headers()
            .get("Authorization")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::to_owned);
        if let Some(token) = token {
            match self.keys.verify(&token) {
                Ok(session) => {
                    req.extensions_mut().insert::<Session>(session);
                }
                Err(error) => tracing::debug!(%error, "ignoring invalid session token"),
            }
        }

        async move {
            let res: ServiceResponse<B> = srv.call(req).await?;
            Ok(res)
        }
        .boxed_local()
    }
}
impl<S, B> Transform<S, ServiceRequest> for SessionMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = SessionMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SessionMiddleware {
            service: Rc::new(service),
            keys: self.keys.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(secret: &str) -> SessionKeys {
        SessionKeys::new(&SessionConfig {
            secret: secret.to_string(),
            ..SessionConfig::default()
        })
    }

    #[test]
    fn issued_token_verifies_to_the_same_session() {
        let keys = keys("secret");
        let session = Session {
            user_id: "65a1".to_string(),
            username: "somchai".to_string(),
            role: "Worker".to_string(),
        };

        let token = keys.issue(&session).unwrap();
        assert_eq!(keys.verify(&token).unwrap(), session);
    }

    #[test]
    fn token_from_another_secret_is_rejected() {
        let session = Session {
            user_id: "65a1".to_string(),
            username: "somchai".to_string(),
            role: "Worker".to_string(),
        };
        let token = keys("one").issue(&session).unwrap();
        assert!(keys("two").verify(&token).is_err());
    }
}
