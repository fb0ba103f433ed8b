use actix_files as fs;
use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::SessionService;
use crate::configuration::{AuthSettings, Platform};
use crate::logger::LoggerMiddleware;
use crate::metrics::HitCounter;
use crate::middleware::{BearerAuth, CountHits};
use crate::routes::{health_check, login, metrics, refresh, reset, revoke, signup, whoami};
use crate::store::AuthStore;

pub fn run(
    listener: TcpListener,
    store: Arc<dyn AuthStore>,
    auth: &AuthSettings,
    platform: Platform,
) -> Result<Server, std::io::Error> {
    let sessions = web::Data::new(SessionService::new(store.clone(), auth));
    let store: web::Data<dyn AuthStore> = web::Data::from(store);
    let hits = web::Data::new(HitCounter::new());
    let platform = web::Data::new(platform);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(LoggerMiddleware)
            .app_data(sessions.clone())
            .app_data(store.clone())
            .app_data(hits.clone())
            .app_data(platform.clone())
            .service(
                web::scope("/app")
                    .wrap(CountHits::new(hits.clone()))
                    .service(fs::Files::new("/", "./public").index_file("index.html")),
            )
            .service(
                web::scope("/admin")
                    .route("/metrics", web::get().to(metrics))
                    .route("/reset", web::post().to(reset)),
            )
            .service(
                web::scope("/api")
                    .route("/healthz", web::get().to(health_check))
                    .route("/users", web::post().to(signup))
                    .route("/login", web::post().to(login))
                    .route("/refresh", web::post().to(refresh))
                    .route("/revoke", web::post().to(revoke))
                    .service(
                        web::scope("/whoami")
                            .wrap(BearerAuth::new(sessions.clone()))
                            .route("", web::get().to(whoami)),
                    ),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
