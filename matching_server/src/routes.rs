//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Every handler here awaits the engine's async API, so workers stay
//! free to serve other requests while the database does its work.
use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use matching_engine::{
    db_types::{ActorId, ActorRole, NewCandidateResponse, NewMessage, NewSolicitation, SolicitationId},
    traits::{ConversationStore, RatingStore, SolicitationStore, SupplierDirectory},
    AllocatorApi,
    ConversationApi,
    MatchingApi,
    RatingApi,
    SupplierApi,
};

use crate::{
    data_objects::{
        CandidateParams,
        ExtendDeadlineParams,
        FeaturedParams,
        NewSupplierParams,
        OpenConversationParams,
        PageParams,
        RatingParams,
        SolicitationSearchParams,
        SupplierStatusParams,
        SweepSummary,
    },
    errors::ServerError,
    identity::ActorClaims,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:path),+ where requires [$($roles:expr),+]) => {
        paste::paste! { pub struct [<$name:camel Route>]<B>(core::marker::PhantomData<fn() -> B>);}
        paste::paste! { impl<B> [<$name:camel Route>]<B> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> B>)
            }
        }}
        paste::paste! { impl<B> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<B>
        where
            $(B: $bounds,)+
            B: 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<B>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:path),+) => {
        paste::paste! { pub struct [<$name:camel Route>]<B>(core::marker::PhantomData<fn() -> B>);}
        paste::paste! { impl<B> [<$name:camel Route>]<B> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> B>)
            }
        }}
        paste::paste! { impl<B> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<B>
        where
            $(B: $bounds,)+
            B: 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<B>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Solicitations  ----------------------------------------------------
route!(create_solicitation => Post "/solicitations" impl SolicitationStore);
/// Posts a new request (producers) or project (consumers). The kind is given in the body.
pub async fn create_solicitation<B: SolicitationStore>(
    claims: ActorClaims,
    api: web::Data<MatchingApi<B>>,
    body: web::Json<NewSolicitation>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ {} is posting a new {}", claims.actor, body.kind);
    let solicitation = api.create_solicitation(&claims.actor, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(solicitation))
}

route!(search_solicitations => Get "/solicitations" impl SolicitationStore);
pub async fn search_solicitations<B: SolicitationStore>(
    claims: ActorClaims,
    api: web::Data<MatchingApi<B>>,
    params: web::Query<SolicitationSearchParams>,
) -> Result<HttpResponse, ServerError> {
    let query = params.into_inner().into_query()?;
    trace!("💻️ {} is searching solicitations. {}", claims.actor, query.filter);
    let solicitations = api.search_solicitations(query).await?;
    Ok(HttpResponse::Ok().json(solicitations))
}

route!(solicitation_by_id => Get "/solicitations/{id}" impl SolicitationStore);
pub async fn solicitation_by_id<B: SolicitationStore>(
    claims: ActorClaims,
    api: web::Data<MatchingApi<B>>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ServerError> {
    let id = SolicitationId(path.into_inner());
    trace!("💻️ {} requested solicitation {id}", claims.actor);
    let solicitation = api.fetch_solicitation(id).await?;
    Ok(HttpResponse::Ok().json(solicitation))
}

route!(cancel_solicitation => Post "/solicitations/{id}/cancel" impl SolicitationStore);
pub async fn cancel_solicitation<B: SolicitationStore>(
    claims: ActorClaims,
    api: web::Data<MatchingApi<B>>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ServerError> {
    let solicitation = api.cancel_solicitation(SolicitationId(path.into_inner()), &claims.actor).await?;
    Ok(HttpResponse::Ok().json(solicitation))
}

route!(extend_deadline => Post "/solicitations/{id}/extend" impl SolicitationStore);
pub async fn extend_deadline<B: SolicitationStore>(
    claims: ActorClaims,
    api: web::Data<MatchingApi<B>>,
    path: web::Path<i64>,
    body: web::Json<ExtendDeadlineParams>,
) -> Result<HttpResponse, ServerError> {
    let id = SolicitationId(path.into_inner());
    let solicitation = api.extend_deadline(id, &claims.actor, body.deadline).await?;
    Ok(HttpResponse::Ok().json(solicitation))
}

route!(close_solicitation => Post "/solicitations/{id}/close" impl SolicitationStore);
pub async fn close_solicitation<B: SolicitationStore>(
    claims: ActorClaims,
    api: web::Data<MatchingApi<B>>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ServerError> {
    let solicitation = api.close_solicitation(SolicitationId(path.into_inner()), &claims.actor).await?;
    Ok(HttpResponse::Ok().json(solicitation))
}

route!(delete_solicitation => Post "/solicitations/{id}/delete" impl SolicitationStore);
pub async fn delete_solicitation<B: SolicitationStore>(
    claims: ActorClaims,
    api: web::Data<MatchingApi<B>>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ServerError> {
    let solicitation = api.delete_solicitation(SolicitationId(path.into_inner()), &claims.actor).await?;
    Ok(HttpResponse::Ok().json(solicitation))
}

//----------------------------------------------   Responses  ----------------------------------------------------
route!(submit_response => Post "/solicitations/{id}/responses" impl SolicitationStore);
/// Records a candidate response. For a request, the first `accepted` response wins and the body's `outcome` says so.
pub async fn submit_response<B: SolicitationStore>(
    claims: ActorClaims,
    api: web::Data<MatchingApi<B>>,
    path: web::Path<i64>,
    body: web::Json<NewCandidateResponse>,
) -> Result<HttpResponse, ServerError> {
    let id = SolicitationId(path.into_inner());
    let recorded = api.submit_response(id, &claims.actor, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(recorded))
}

route!(list_responses => Get "/solicitations/{id}/responses" impl SolicitationStore);
pub async fn list_responses<B: SolicitationStore>(
    claims: ActorClaims,
    api: web::Data<MatchingApi<B>>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ServerError> {
    let responses = api.list_responses(SolicitationId(path.into_inner()), &claims.actor).await?;
    Ok(HttpResponse::Ok().json(responses))
}

route!(accept_proposal => Post "/solicitations/{id}/accept/{response_id}" impl SolicitationStore, ConversationStore);
/// The consumer picks a producer's proposal. Returns the accepted project, the proposal and the conversation.
pub async fn accept_proposal<B>(
    claims: ActorClaims,
    api: web::Data<MatchingApi<B>>,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse, ServerError>
where
    B: SolicitationStore + ConversationStore,
{
    let (id, response_id) = path.into_inner();
    let accepted = api.accept_proposal(SolicitationId(id), &claims.actor, response_id).await?;
    Ok(HttpResponse::Ok().json(accepted))
}

//----------------------------------------------   Ratings  ----------------------------------------------------
route!(submit_rating => Post "/solicitations/{id}/ratings" impl RatingStore, SolicitationStore);
pub async fn submit_rating<B>(
    claims: ActorClaims,
    api: web::Data<RatingApi<B>>,
    path: web::Path<i64>,
    body: web::Json<RatingParams>,
) -> Result<HttpResponse, ServerError>
where
    B: RatingStore + SolicitationStore,
{
    let RatingParams { rated, score, comment } = body.into_inner();
    let id = SolicitationId(path.into_inner());
    let rating = api.submit_rating(id, &claims.actor, &rated, score, comment).await?;
    Ok(HttpResponse::Created().json(rating))
}

route!(actor_rating => Get "/ratings/{actor_id}" impl RatingStore);
pub async fn actor_rating<B: RatingStore>(
    _claims: ActorClaims,
    api: web::Data<RatingApi<B>>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ServerError> {
    let summary = api.average_rating(ActorId(path.into_inner())).await?;
    Ok(HttpResponse::Ok().json(summary))
}

//----------------------------------------------   Allocator  ----------------------------------------------------
route!(candidates => Get "/candidates" impl SupplierDirectory, RatingStore);
pub async fn candidates<B>(
    claims: ActorClaims,
    api: web::Data<AllocatorApi<B>>,
    params: web::Query<CandidateParams>,
) -> Result<HttpResponse, ServerError>
where
    B: SupplierDirectory + RatingStore,
{
    trace!("💻️ {} requested candidate producers", claims.actor);
    let candidates = api.rank_candidates(params.into_inner().into_query()).await?;
    Ok(HttpResponse::Ok().json(candidates))
}

//----------------------------------------------   Conversations  ----------------------------------------------------
route!(open_conversation => Post "/conversations" impl ConversationStore, SolicitationStore);
pub async fn open_conversation<B>(
    claims: ActorClaims,
    api: web::Data<ConversationApi<B>>,
    body: web::Json<OpenConversationParams>,
) -> Result<HttpResponse, ServerError>
where
    B: ConversationStore + SolicitationStore,
{
    let OpenConversationParams { project_id, producer_id } = body.into_inner();
    let conversation =
        api.get_or_create_conversation(SolicitationId(project_id), &claims.actor, ActorId(producer_id)).await?;
    Ok(HttpResponse::Ok().json(conversation))
}

route!(my_conversations => Get "/conversations" impl ConversationStore, SolicitationStore);
pub async fn my_conversations<B>(
    claims: ActorClaims,
    api: web::Data<ConversationApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: ConversationStore + SolicitationStore,
{
    let conversations = api.conversations_for(&claims.actor).await?;
    Ok(HttpResponse::Ok().json(conversations))
}

route!(post_message => Post "/conversations/{id}/messages" impl ConversationStore, SolicitationStore);
pub async fn post_message<B>(
    claims: ActorClaims,
    api: web::Data<ConversationApi<B>>,
    path: web::Path<i64>,
    body: web::Json<NewMessage>,
) -> Result<HttpResponse, ServerError>
where
    B: ConversationStore + SolicitationStore,
{
    let message = api.post_message(path.into_inner(), &claims.actor, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(message))
}

route!(messages => Get "/conversations/{id}/messages" impl ConversationStore, SolicitationStore);
pub async fn messages<B>(
    claims: ActorClaims,
    api: web::Data<ConversationApi<B>>,
    path: web::Path<i64>,
    params: web::Query<PageParams>,
) -> Result<HttpResponse, ServerError>
where
    B: ConversationStore + SolicitationStore,
{
    let PageParams { page, page_size } = params.into_inner();
    let messages = api.list_messages(path.into_inner(), &claims.actor, page, page_size).await?;
    Ok(HttpResponse::Ok().json(messages))
}

//----------------------------------------------   Admin  ----------------------------------------------------
route!(sweep => Post "/admin/sweep" impl SolicitationStore where requires [ActorRole::Admin]);
/// Runs the expiry sweep immediately, rather than waiting for the worker.
pub async fn sweep<B: SolicitationStore>(api: web::Data<MatchingApi<B>>) -> Result<HttpResponse, ServerError> {
    let result = api.sweep_expired(chrono::Utc::now()).await;
    info!("💻️ Manual sweep expired {} solicitations", result.total_expired());
    let summary = SweepSummary {
        requests_expired: result.requests.len(),
        projects_expired: result.projects.len(),
        failed_passes: result.failed_passes,
    };
    Ok(HttpResponse::Ok().json(summary))
}

route!(activate_solicitation => Post "/admin/solicitations/{id}/activate"
    impl SolicitationStore where requires [ActorRole::Admin]);
pub async fn activate_solicitation<B: SolicitationStore>(
    api: web::Data<MatchingApi<B>>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ServerError> {
    let solicitation = api.activate_solicitation(SolicitationId(path.into_inner())).await?;
    Ok(HttpResponse::Ok().json(solicitation))
}

route!(register_supplier => Post "/admin/suppliers" impl SupplierDirectory where requires [ActorRole::Admin]);
pub async fn register_supplier<B: SupplierDirectory>(
    api: web::Data<SupplierApi<B>>,
    body: web::Json<NewSupplierParams>,
) -> Result<HttpResponse, ServerError> {
    let NewSupplierParams { actor_id, name } = body.into_inner();
    let supplier = api.register_supplier(ActorId(actor_id), &name).await?;
    Ok(HttpResponse::Created().json(supplier))
}

route!(supplier_status => Post "/admin/suppliers/{actor_id}/status"
    impl SupplierDirectory where requires [ActorRole::Admin]);
pub async fn supplier_status<B: SupplierDirectory>(
    api: web::Data<SupplierApi<B>>,
    path: web::Path<i64>,
    body: web::Json<SupplierStatusParams>,
) -> Result<HttpResponse, ServerError> {
    let supplier = api.set_supplier_status(ActorId(path.into_inner()), body.status).await?;
    Ok(HttpResponse::Ok().json(supplier))
}

route!(supplier_featured => Post "/admin/suppliers/{actor_id}/featured"
    impl SupplierDirectory where requires [ActorRole::Admin]);
pub async fn supplier_featured<B: SupplierDirectory>(
    api: web::Data<SupplierApi<B>>,
    path: web::Path<i64>,
    body: web::Json<FeaturedParams>,
) -> Result<HttpResponse, ServerError> {
    let supplier = api.set_supplier_featured(ActorId(path.into_inner()), body.featured).await?;
    Ok(HttpResponse::Ok().json(supplier))
}
