use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderMap, AUTHORIZATION},
    web, Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::rc::Rc;

use crate::{
    models::Role,
    services::auth_service,
    state::AppState,
    utils::AppError,
};

pub use crate::services::auth_service::Claims;

/// `Authorization: Bearer <token>` -> `<token>`
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Verifies the bearer JWT and stores its `Claims` in the request
/// extensions (read by handlers through `web::ReqData<Claims>`).
pub struct AuthMiddleware {
    required_role: Option<Role>,
}

impl AuthMiddleware {
    /// Any approved account
    pub fn authenticated() -> Self {
        Self { required_role: None }
    }

    pub fn admin() -> Self {
        Self {
            required_role: Some(Role::Admin),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
            required_role: self.required_role,
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
    required_role: Option<Role>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let required_role = self.required_role;

        Box::pin(async move {
            let token = bearer_token(req.headers())
                .map(str::to_string)
                .ok_or_else(|| AppError::Unauthorized("Missing authorization token".to_string()))?;

            let state = req
                .app_data::<web::Data<AppState>>()
                .cloned()
                .ok_or_else(|| AppError::Internal("Application state not configured".to_string()))?;

            let claims = auth_service::authorize(&state.store, &state.config, &token).await?;

            if let Some(role) = required_role {
                if claims.role != role {
                    log::warn!("🚫 {} ({}) denied access to {}", claims.email, claims.role, req.path());
                    return Err(AppError::Forbidden("Administrator access required".to_string()).into());
                }
            }

            req.extensions_mut().insert(claims);
            service.call(req).await
        })
    }
}
