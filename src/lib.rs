use actix_web::body::MessageBody;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::web::{self, Data, JsonConfig, PathConfig};
use actix_web::{App, HttpServer, ResponseError};
use tracing::info;
use tracing_actix_web::TracingLogger;

pub mod campaign;
pub mod config;
pub mod database;
pub mod error;
pub mod seed;
pub mod typedid;

use crate::config::Config;
use crate::database::{Database, SqliteDatabase};
use crate::error::Error;

/// Builds the application around an already initialized database.
pub fn app(
    db: Data<Box<dyn Database>>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(JsonConfig::default().error_handler(|err, _req| {
            // malformed bodies are a 422, not a 400
            Error::InvalidJson(err).into()
        }))
        .app_data(PathConfig::default().error_handler(|err, _req| Error::InvalidPath(err).into()))
        .app_data(db)
        .wrap(TracingLogger::default())
        .service(
            web::scope("/api/v1")
                .service(campaign::endpoints::root)
                .service(campaign::endpoints::create_campaign)
                .service(campaign::endpoints::get_campaigns)
                .service(campaign::endpoints::get_campaign_by_id)
                .service(campaign::endpoints::update_campaign)
                .service(campaign::endpoints::delete_campaign)
                // reached only when no method above matched a known path
                .service(
                    web::resource(vec!["/", "/campaigns", "/campaigns/{campaign_id}"])
                        .to(|| async { Error::MethodNotAllowed.error_response() }),
                ),
        )
        .default_service(web::to(|| async { Error::PathNotFound.error_response() }))
}

/// Prepares storage, seeds it if empty, and serves until shutdown.
pub async fn run(config: Config) -> Result<(), Error> {
    info!(path = %config.database.path, "opening database");
    let db = SqliteDatabase::initialize(&config.database).await?;

    seed::seed(&db).await?;

    let db: Data<Box<dyn Database>> = Data::new(Box::new(db));
    let addr = (config.server.host, config.server.port);

    info!("listening on {}:{}", addr.0, addr.1);
    HttpServer::new(move || app(db.clone()))
        .bind(addr)?
        .run()
        .await?;

    Ok(())
}
