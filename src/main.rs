mod config;
mod db;
mod errors;
mod handlers;
mod models;
mod services;
mod utils;

use std::io;
use std::sync::Arc;

use actix_web::{middleware, web, App, HttpServer};
use dotenv::dotenv;
use log::info;

use config::Settings;
use db::{AdminDirectory, PgDirectory, StaffDirectory};
use handlers::upload::UploadLimit;
use utils::session::SessionKeys;

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let settings = Settings::from_env()
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;

    let pool = db::create_pool(&settings)
        .await
        .map_err(|err| {
            io::Error::new(
                io::ErrorKind::Other,
                format!("Failed to connect to the database: {}", err),
            )
        })?;

    let directory = Arc::new(PgDirectory::new(pool));
    let staff = web::Data::from(directory.clone() as Arc<dyn StaffDirectory>);
    let admins = web::Data::from(directory as Arc<dyn AdminDirectory>);
    let keys = web::Data::new(SessionKeys::new(
        settings.session_secret.as_bytes(),
        settings.secure_cookies,
    ));
    let upload_limit = web::Data::new(UploadLimit(settings.max_upload_bytes));

    info!("Starting server at {}", settings.bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(staff.clone())
            .app_data(admins.clone())
            .app_data(keys.clone())
            .app_data(upload_limit.clone())
            .configure(handlers::configure)
    })
    .bind(&settings.bind_address)?
    .run()
    .await
}
