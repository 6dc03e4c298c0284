//! Caller identity
//!
//! Authentication happens upstream. The identity gateway injects the caller's id and role into every request it
//! forwards, in the `mkt_actor_id` and `mkt_actor_role` headers. If a gateway secret is configured, the gateway must
//! also supply it in `mkt_gateway_token`, so that requests that bypass the gateway are rejected.
use std::future::{ready, Ready};

use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use log::*;
use matching_engine::db_types::{Actor, ActorId, ActorRole};
use mkt_common::Secret;

use crate::errors::ServerError;

pub const ACTOR_ID_HEADER: &str = "mkt_actor_id";
pub const ACTOR_ROLE_HEADER: &str = "mkt_actor_role";
pub const GATEWAY_TOKEN_HEADER: &str = "mkt_gateway_token";

/// The shared secret the gateway must present. An empty secret disables the check.
#[derive(Clone, Debug, Default)]
pub struct GatewaySecret(pub Secret<String>);

/// The authenticated caller, as asserted by the identity gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActorClaims {
    pub actor: Actor,
}

impl ActorClaims {
    pub fn id(&self) -> ActorId {
        self.actor.id
    }

    pub fn role(&self) -> ActorRole {
        self.actor.role
    }

    pub fn is_admin(&self) -> bool {
        self.actor.role == ActorRole::Admin
    }

    pub fn require_role(&self, role: ActorRole) -> Result<(), ServerError> {
        if self.actor.role == role {
            Ok(())
        } else {
            Err(ServerError::InsufficientPermissions(format!("This action requires the {role} role")))
        }
    }
}

impl FromRequest for ActorClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(claims_from_request(req))
    }
}

pub fn claims_from_request(req: &HttpRequest) -> Result<ActorClaims, ServerError> {
    if let Some(secret) = req.app_data::<web::Data<GatewaySecret>>() {
        check_gateway_token(req, &secret.0)?;
    }
    let id = header_value(req, ACTOR_ID_HEADER)?
        .parse::<i64>()
        .map_err(|e| ServerError::Unauthenticated(format!("{ACTOR_ID_HEADER} is not a valid actor id. {e}")))?;
    let role = header_value(req, ACTOR_ROLE_HEADER)?
        .parse::<ActorRole>()
        .map_err(|e| ServerError::Unauthenticated(e.to_string()))?;
    let actor = Actor::new(id, role);
    trace!("💻️ Request made by {actor}");
    Ok(ActorClaims { actor })
}

fn check_gateway_token(req: &HttpRequest, secret: &Secret<String>) -> Result<(), ServerError> {
    if secret.is_empty() {
        return Ok(());
    }
    let token = header_value(req, GATEWAY_TOKEN_HEADER)?;
    if secret.matches(token) {
        Ok(())
    } else {
        warn!("💻️ Request to {} carried an invalid gateway token", req.path());
        Err(ServerError::Unauthenticated("The gateway token is invalid".into()))
    }
}

fn header_value<'a>(req: &'a HttpRequest, name: &str) -> Result<&'a str, ServerError> {
    req.headers()
        .get(name)
        .ok_or_else(|| ServerError::Unauthenticated(format!("{name} header is missing")))?
        .to_str()
        .map(str::trim)
        .map_err(|e| ServerError::Unauthenticated(format!("{name} header is not readable. {e}")))
}
