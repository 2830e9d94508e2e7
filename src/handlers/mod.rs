use actix_web::web;

pub mod auth;
pub mod portal;
pub mod records;
pub mod upload;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/api/auth/login")
            .route(web::post().to(auth::login)),
    )
    .service(
        web::resource("/api/auth/logout")
            .route(web::post().to(auth::logout)),
    )
    .service(
        web::resource("/api/auth/session")
            .route(web::get().to(auth::session)),
    )
    .service(
        web::resource("/api/admin/records/export")
            .route(web::get().to(records::export_records)),
    )
    .service(
        web::resource("/api/admin/records/stats")
            .route(web::get().to(records::record_stats)),
    )
    .service(
        web::resource("/api/admin/records")
            .route(web::get().to(records::get_records))
            .route(web::post().to(records::create_record))
            .route(web::put().to(records::update_record))
            .route(web::patch().to(records::review_record))
            .route(web::delete().to(records::delete_record)),
    )
    .service(
        web::resource("/api/admin/upload-staff")
            .route(web::post().to(upload::upload_staff)),
    )
    .service(
        web::resource("/api/portal/staff/{staff_id}")
            .route(web::get().to(portal::lookup_staff))
            .route(web::post().to(portal::submit_tax_ids)),
    );
}
