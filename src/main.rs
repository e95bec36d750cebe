use std::io::Error;
use std::sync::Arc;

use poem::{Route, Server, listener::TcpListener};
use poem_openapi::OpenApiService;
use sqlx::postgres::PgPoolOptions;
use tokio::main;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use dispatch_engine::{
    application::{
        handlers::{
            dispatcher::Dispatcher, followup_scheduler::FollowupScheduler,
            phone_validator::PhoneValidator,
        },
        services::message_mutator::MessageMutator,
    },
    config::Config,
    infrastructure::{
        gateway::HttpGatewayClient,
        repositories::postgres::{
            PostgresAuditLogRepository, PostgresBroadcastListRepository,
            PostgresConversationRepository, PostgresFollowupTemplateRepository,
            PostgresInstanceRepository, PostgresQueueRepository,
        },
    },
    presentation::http::endpoints::{
        dispatch::DispatchEndpoints,
        followups::FollowupEndpoints,
        root::{ApiState, Endpoints},
        validation::ValidationEndpoints,
    },
};

#[main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::try_parse().map_err(Error::other)?;
    let hours = config.business_hours().map_err(Error::other)?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .map_err(Error::other)?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(Error::other)?;

    let queue_repo = PostgresQueueRepository::new(pool.clone());
    let broadcast_repo = PostgresBroadcastListRepository::new(pool.clone());
    let instance_repo = PostgresInstanceRepository::new(pool.clone());
    let template_repo = PostgresFollowupTemplateRepository::new(pool.clone());
    let conversation_repo = PostgresConversationRepository::new(pool.clone());
    let audit_repo = PostgresAuditLogRepository::new(pool);

    let gateway =
        Arc::new(HttpGatewayClient::new(config.gateway_timeout()).map_err(Error::other)?);
    let mutator = MessageMutator::new();
    let pacer = config.pacer();

    let dispatcher = Arc::new(Dispatcher::new(
        queue_repo.clone(),
        broadcast_repo.clone(),
        instance_repo.clone(),
        audit_repo.clone(),
        gateway.clone(),
        mutator,
        hours.clone(),
        pacer,
        config.max_batch_size,
        config.max_attempts,
    ));
    let followup_scheduler = Arc::new(FollowupScheduler::new(
        conversation_repo,
        template_repo,
        instance_repo.clone(),
        audit_repo,
        gateway.clone(),
        mutator,
        hours,
        pacer,
        config.followup_selection,
        config.followup_batch_size,
        config.followup_max_count,
    ));
    let phone_validator = Arc::new(PhoneValidator::new(
        broadcast_repo,
        instance_repo,
        gateway,
        pacer,
        config.validation_batch_size,
    ));

    let state = Arc::new(ApiState {
        dispatcher,
        followup_scheduler,
        phone_validator,
        shutdown: CancellationToken::new(),
    });

    let server_url = format!("{}://{}:{}", config.scheme, config.host, config.port);
    tracing::info!(url = %server_url, "starting dispatch engine");

    let api_service = OpenApiService::new(
        (
            Endpoints,
            DispatchEndpoints::new(state.clone()),
            FollowupEndpoints::new(state.clone()),
            ValidationEndpoints::new(state.clone()),
        ),
        "Dispatch Engine API",
        "0.1.0",
    )
    .server(format!("{server_url}/api"));
    let ui = api_service.swagger_ui();
    let app = Route::new().nest("/api", api_service).nest("/", ui);

    let shutdown = state.shutdown.clone();
    Server::new(TcpListener::bind(format!("{}:{}", config.host, config.port)))
        .run_with_graceful_shutdown(
            app,
            async move {
                let _ = tokio::signal::ctrl_c().await;
                shutdown.cancel();
            },
            None,
        )
        .await
}
