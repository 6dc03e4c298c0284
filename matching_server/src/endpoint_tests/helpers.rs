use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web::ServiceConfig, App};
use log::debug;
use matching_engine::db_types::Actor;

use crate::identity::{ACTOR_ID_HEADER, ACTOR_ROLE_HEADER};

/// Adds the identity headers the gateway would have set for `actor`. `None` sends an anonymous request.
pub fn with_identity(req: TestRequest, actor: Option<&Actor>) -> TestRequest {
    match actor {
        Some(actor) => req
            .insert_header((ACTOR_ID_HEADER, actor.id.0.to_string()))
            .insert_header((ACTOR_ROLE_HEADER, actor.role.to_string())),
        None => req,
    }
}

pub async fn get_request(
    actor: Option<&Actor>,
    path: &str,
    configure: impl FnOnce(&mut ServiceConfig),
) -> (StatusCode, String) {
    let req = with_identity(TestRequest::get().uri(path), actor);
    send(req, configure).await
}

pub async fn post_request<T: serde::Serialize>(
    actor: Option<&Actor>,
    path: &str,
    body: &T,
    configure: impl FnOnce(&mut ServiceConfig),
) -> (StatusCode, String) {
    let req = with_identity(TestRequest::post().uri(path).set_json(body), actor);
    send(req, configure).await
}

/// Middleware errors come back as `Err` rather than as a response, so both are folded into a status and body here.
async fn send(req: TestRequest, configure: impl FnOnce(&mut ServiceConfig)) -> (StatusCode, String) {
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => {
            let status = res.status();
            let body = res.into_body().try_into_bytes().unwrap();
            (status, String::from_utf8_lossy(&body).into_owned())
        },
        Err(e) => {
            let res = e.error_response();
            let status = res.status();
            let body = res.into_body().try_into_bytes().unwrap();
            (status, String::from_utf8_lossy(&body).into_owned())
        },
    }
}
