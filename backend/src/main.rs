use actix_cors::Cors;
use actix_web::middleware::{DefaultHeaders, Logger};
use actix_web::{web, App, HttpServer};
use clap::Parser;
use log::info;

use mindcare_backend::{handlers, AppState, Config};

fn cors(allowed_origins: &[String]) -> Cors {
    let cors = if allowed_origins.is_empty() {
        Cors::default().allow_any_origin()
    } else {
        allowed_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
    };
    cors.allowed_methods(vec!["GET", "POST"])
        .allowed_headers(vec![actix_web::http::header::CONTENT_TYPE])
        .max_age(3600)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .format_module_path(false)
        .init();

    let config = Config::parse();
    info!("Starting MindCare inference backend");

    let state = web::Data::new(AppState::load(&config));
    for (model, loaded) in state.loaded_models() {
        info!("   {model:<8} {}", if loaded { "ready" } else { "unavailable" });
    }

    let bind_address = config.bind_address();
    let workers = config.workers();
    info!("Listening on http://{bind_address} with {workers} workers");
    info!("Endpoints:");
    info!("   POST /predict          - disorder risk from questionnaire answers");
    info!("   POST /detect_emotion   - emotion of a text");
    info!("   POST /analyze-journal  - transcript and expressions of a video journal");
    info!("   GET  /health           - service and model status");
    info!("   GET  /model-info       - feature and disorder layout");
    info!("   GET  /stats            - request counters");

    let body_limit = config.body_limit;
    let allowed_origins = config.allowed_origins.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(DefaultHeaders::new().add(("X-Content-Type-Options", "nosniff")))
            .wrap(cors(&allowed_origins))
            .app_data(state.clone())
            .app_data(web::PayloadConfig::new(body_limit))
            .configure(handlers::configure)
            .default_service(web::route().to(handlers::not_found))
    })
    .workers(workers)
    .bind(&bind_address)?
    .run()
    .await
}
