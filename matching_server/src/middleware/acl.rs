//! Access control list middleware.
//!
//! Place it on any route or scope. It reads the caller's identity from the gateway headers and only lets the request
//! through if the caller holds one of the allowed roles. Otherwise a 401 (no usable identity) or 403 (wrong role)
//! response is returned.
use std::{future::Future, pin::Pin, rc::Rc};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures::future::{ok, Ready};
use log::*;
use matching_engine::db_types::ActorRole;

use crate::{errors::ServerError, identity::claims_from_request};

pub struct AclMiddlewareFactory {
    allowed_roles: Vec<ActorRole>,
}

impl AclMiddlewareFactory {
    pub fn new(allowed_roles: &[ActorRole]) -> Self {
        AclMiddlewareFactory { allowed_roles: allowed_roles.to_vec() }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AclMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AclMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AclMiddlewareService { allowed_roles: self.allowed_roles.clone(), service: Rc::new(service) })
    }
}

pub struct AclMiddlewareService<S> {
    allowed_roles: Vec<ActorRole>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AclMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let allowed_roles = self.allowed_roles.clone();
        Box::pin(async move {
            let claims = claims_from_request(req.request())?;
            if allowed_roles.contains(&claims.role()) {
                service.call(req).await
            } else {
                debug!("💻️ {} denied access to {}", claims.actor, req.path());
                Err(ServerError::InsufficientPermissions(format!("{} may not access this route", claims.role())).into())
            }
        })
    }
}
