use std::io;

use actix_cors::Cors;
use actix_web::{http::header, middleware::Logger, web, App, HttpServer};
use log::{error, info};

use bus_ticketing::{
    config::Config,
    db::{seed::seed_demo_data, MemoryStore, MongoDB, Store},
    handlers,
};

async fn run<S: Store>(store: S, config: Config) -> io::Result<()> {
    if config.seed_demo_data {
        if let Err(e) = seed_demo_data(&store, &config).await {
            error!("Seeding demo data failed: {}", e);
        }
    }

    let address = config.bind_address();
    info!("Listening on {}:{}", address.0, address.1);

    let store = web::Data::new(store);
    let config = web::Data::new(config);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&config.cors_origin)
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![header::AUTHORIZATION, header::ACCEPT, header::CONTENT_TYPE])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(store.clone())
            .app_data(config.clone())
            .configure(handlers::configure::<S>)
    })
    .bind(address)?
    .run()
    .await
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    if config.uses_memory_store() {
        info!("Using the in-memory store; data is lost on restart");
        return run(MemoryStore::new(), config).await;
    }

    let store = MongoDB::new(&config.mongodb_uri, &config.database_name)
        .await
        .map_err(|e| {
            error!("Failed to connect to MongoDB: {}", e);
            io::Error::new(io::ErrorKind::ConnectionRefused, e)
        })?;
    run(store, config).await
}
