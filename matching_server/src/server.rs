use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use matching_engine::{
    create_database_if_missing,
    events::{EventHandlers, EventProducers},
    AllocatorApi,
    ConversationApi,
    MatchingApi,
    NotificationApi,
    RatingApi,
    SqliteDatabase,
    SupplierApi,
};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    expiry_worker::start_expiry_worker,
    identity::GatewaySecret,
    notifications::{notification_hooks, ServerDispatcher},
    routes::{
        health,
        AcceptProposalRoute,
        ActivateSolicitationRoute,
        ActorRatingRoute,
        CancelSolicitationRoute,
        CandidatesRoute,
        CloseSolicitationRoute,
        CreateSolicitationRoute,
        DeleteSolicitationRoute,
        ExtendDeadlineRoute,
        ListResponsesRoute,
        MessagesRoute,
        MyConversationsRoute,
        OpenConversationRoute,
        PostMessageRoute,
        RegisterSupplierRoute,
        SearchSolicitationsRoute,
        SolicitationByIdRoute,
        SubmitRatingRoute,
        SubmitResponseRoute,
        SupplierFeaturedRoute,
        SupplierStatusRoute,
        SweepRoute,
    },
};

const EVENT_BUFFER_SIZE: usize = 128;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    create_database_if_missing(&config.database_url)
        .await
        .map_err(|e| ServerError::InitializeError(format!("Could not create the database. {e}")))?;
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.run_migrations().await.map_err(|e| ServerError::InitializeError(format!("Migrations failed. {e}")))?;
    info!("🗃️ Database is ready at {}", config.database_url);

    let notifications = NotificationApi::new(db.clone(), ServerDispatcher::from_config(&config)?);
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, notification_hooks(notifications));
    let producers = handlers.producers();
    handlers.start_handlers().await;

    if config.disable_sweep {
        warn!("🕰️ The expiry worker is disabled. Solicitations will only expire when a sweep is requested");
    } else {
        let _handle = start_expiry_worker(db.clone(), producers.clone(), config.sweep_interval);
    }
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let ServerConfig { host, port, gateway_secret, default_capacity, .. } = config;
    let srv = HttpServer::new(move || {
        let matching_api = MatchingApi::new(db.clone(), producers.clone());
        let allocator_api = AllocatorApi::new(db.clone()).with_default_capacity(default_capacity);
        let rating_api = RatingApi::new(db.clone());
        let conversation_api = ConversationApi::new(db.clone());
        let supplier_api = SupplierApi::new(db.clone());
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("mkt::access_log"))
            .app_data(web::Data::new(GatewaySecret(gateway_secret.clone())))
            .app_data(web::Data::new(matching_api))
            .app_data(web::Data::new(allocator_api))
            .app_data(web::Data::new(rating_api))
            .app_data(web::Data::new(conversation_api))
            .app_data(web::Data::new(supplier_api));
        let api_scope = web::scope("/api")
            .service(CreateSolicitationRoute::<SqliteDatabase>::new())
            .service(SearchSolicitationsRoute::<SqliteDatabase>::new())
            .service(SolicitationByIdRoute::<SqliteDatabase>::new())
            .service(CancelSolicitationRoute::<SqliteDatabase>::new())
            .service(ExtendDeadlineRoute::<SqliteDatabase>::new())
            .service(CloseSolicitationRoute::<SqliteDatabase>::new())
            .service(DeleteSolicitationRoute::<SqliteDatabase>::new())
            .service(SubmitResponseRoute::<SqliteDatabase>::new())
            .service(ListResponsesRoute::<SqliteDatabase>::new())
            .service(AcceptProposalRoute::<SqliteDatabase>::new())
            .service(SubmitRatingRoute::<SqliteDatabase>::new())
            .service(ActorRatingRoute::<SqliteDatabase>::new())
            .service(CandidatesRoute::<SqliteDatabase>::new())
            .service(OpenConversationRoute::<SqliteDatabase>::new())
            .service(MyConversationsRoute::<SqliteDatabase>::new())
            .service(PostMessageRoute::<SqliteDatabase>::new())
            .service(MessagesRoute::<SqliteDatabase>::new())
            .service(SweepRoute::<SqliteDatabase>::new())
            .service(ActivateSolicitationRoute::<SqliteDatabase>::new())
            .service(RegisterSupplierRoute::<SqliteDatabase>::new())
            .service(SupplierStatusRoute::<SqliteDatabase>::new())
            .service(SupplierFeaturedRoute::<SqliteDatabase>::new());
        app.service(health).service(api_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
