use actix_web::middleware::Logger;
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use env_logger::Env;
use murajaat::db::{get_db_pool, init_db};
use murajaat::middleware::ClientCtx;
use murajaat::notifier::{Notifier, TelegramNotifier};
use murajaat::storage::local::LocalStorage;
use murajaat::storage::StorageBackend;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    init_lib_mods();
    init_our_mods();
    init_db(std::env::var("DATABASE_URL").expect("DATABASE_URL must be set.")).await;

    let notifier: Arc<dyn Notifier> = Arc::new(TelegramNotifier::from_config());
    let storage: Arc<dyn StorageBackend> =
        Arc::new(LocalStorage::from_config().expect("Failed to initialize file storage."));

    let storage_config = murajaat::app_config::storage();
    let bind_address = murajaat::app_config::site().bind_address;

    log::info!("Listening on {}", bind_address);

    HttpServer::new(move || {
        // Order of middleware IS IMPORTANT and is in REVERSE EXECUTION ORDER.
        App::new()
            .app_data(Data::new(get_db_pool()))
            .app_data(Data::from(notifier.clone()))
            .app_data(Data::from(storage.clone()))
            .wrap(ClientCtx::default())
            .wrap(Logger::new("%a %r %s"))
            .configure(murajaat::web::configure)
            .service(actix_files::Files::new(
                &storage_config.public_route,
                &storage_config.local_path,
            ))
    })
    .bind(bind_address)?
    .run()
    .await
}

/// Initialize third party crates we rely on but don't have control over.
fn init_lib_mods() {
    // This should be calls to crates without any transformative work applied.
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
}

/// Initialize all local mods.
/// Panics
fn init_our_mods() {
    // This should be a list of simple function calls.
    // Each module should work mostly independent of others.
    // This way, we can unit test individual modules without loading the entire application.
    murajaat::app_config::init();
    murajaat::session::init();
}
