use std::sync::Arc;

use actix_web::{guard, web, App, HttpServer};
use sqlx::PgPool;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod authmiddleware;
mod config;
mod db;
mod error;
mod mailer;
mod models;
mod routes;

use authmiddleware::AdminAuth;
use config::Config;
use db::{OrderRepo, ProductRepo};
use mailer::Mailer;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,sazo_backend=debug")),
        )
        .init();

    let cfg = Config::from_env()?;

    let pool = PgPool::connect(&cfg.database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    // one-time catalog bootstrap, before the server accepts traffic
    ProductRepo::new(pool.clone()).seed_if_empty().await?;

    let mailer: Option<Arc<Mailer>> = match &cfg.mail {
        Some(mail_cfg) => Some(Arc::new(Mailer::new(mail_cfg)?)),
        None => {
            tracing::warn!("GMAIL_USER/GMAIL_PASS not set, order notifications disabled");
            None
        }
    };

    let order_repo = web::Data::new(OrderRepo::new(pool.clone()));
    let mailer_data = web::Data::new(mailer);
    let admin = AdminAuth::new(cfg.jwt_secret.clone());

    let addr = cfg.bind_addr();
    tracing::info!("SAZO order backend running at http://{}", addr);

    HttpServer::new(move || {
        App::new()
            .app_data(order_repo.clone())
            .app_data(mailer_data.clone())
            .service(
                web::scope("/api/orders")
                    .service(
                        web::resource("/stats")
                            .route(web::get().to(routes::get_stats))
                            .wrap(admin.clone()),
                    )
                    .service(
                        web::resource("")
                            .guard(guard::Get())
                            .route(web::get().to(routes::list_orders))
                            .wrap(admin.clone()),
                    )
                    .service(
                        web::resource("")
                            .guard(guard::Post())
                            .route(web::post().to(routes::create_order)),
                    )
                    .service(
                        web::resource("/{id}/status")
                            .route(web::put().to(routes::update_status))
                            .wrap(admin.clone()),
                    )
                    .service(
                        web::resource("/{id}")
                            .guard(guard::Delete())
                            .route(web::delete().to(routes::delete_order))
                            .wrap(admin.clone()),
                    )
                    .service(
                        web::resource("/{id}")
                            .guard(guard::Get())
                            .route(web::get().to(routes::get_order)),
                    ),
            )
    })
    .bind(addr)?
    .run()
    .await?;

    Ok(())
}
