use tracing::info;

use actix_web::{middleware::Logger, App, HttpServer};

use actix_web::web::{self};

use licenserv::db;
use licenserv::handlers;

pub fn configure_routes() -> impl actix_web::dev::HttpServiceFactory {
    web::scope("").service(
        web::scope("/api")
            .route("/products", web::get().to(handlers::list_products))
            .route("/products", web::post().to(handlers::create_product))
            .route("/license-types", web::get().to(handlers::list_license_types))
            .route("/license-types", web::post().to(handlers::create_license_type))
            .route("/roles", web::get().to(handlers::list_roles))
            .route("/roles", web::post().to(handlers::create_role))
            .route("/devices", web::get().to(handlers::list_devices))
            .route("/devices", web::post().to(handlers::create_device))
            .route("/licenses", web::get().to(handlers::list_licenses))
            .route("/licenses", web::post().to(handlers::create_license))
            .route("/users", web::get().to(handlers::list_users))
            .route("/users", web::post().to(handlers::create_user))
            .route("/users/{user_id}/profile", web::post().to(handlers::update_profile))
            .route("/users/{user_id}/roles", web::post().to(handlers::add_role))
            .route("/login", web::post().to(handlers::login))
            .route("/assignments", web::get().to(handlers::list_assignments))
            .route("/assignments", web::post().to(handlers::create_assignment))
            .route(
                "/assignments/{assignment_id}/terminate",
                web::post().to(handlers::terminate_assignment),
            )
            .route(
                "/assignments/{assignment_id}/uses",
                web::post().to(handlers::record_use),
            )
            .route("/assignment-logs", web::get().to(handlers::list_assignment_logs))
            .route("/security-events", web::get().to(handlers::list_security_events))
            .route("/security-events", web::post().to(handlers::record_security_event)),
    )
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let mut _guard = None;

    if std::env::var("SERVER_LOG").unwrap_or_default() == "true" {
        let file_appender = tracing_appender::rolling::RollingFileAppender::new(
            tracing_appender::rolling::Rotation::DAILY,
            "./logs",
            "licenserv.log",
        );
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        tracing_subscriber::fmt()
            .with_writer(tracing_subscriber::fmt::writer::MakeWriterExt::and(non_blocking, std::io::stdout))
            .with_file(true)
            .with_line_number(true)
            .with_env_filter("info,actix_server=warn,actix_http::h1::dispatcher=off")
            .with_timer(tracing_subscriber::fmt::time::ChronoLocal::new("%Y-%m-%dT%H:%M:%S".to_string()))
            .init();

        _guard = Some(guard);
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stdout)
            .with_file(true)
            .with_line_number(true)
            .with_env_filter("info,actix_server=warn,actix_http::h1::dispatcher=off")
            .with_timer(tracing_subscriber::fmt::time::ChronoLocal::new("%Y-%m-%dT%H:%M:%S".to_string()))
            .init();
    }

    // Initialize SQLite database
    let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| "licenses.db".to_string());
    let db_pool = db::init_db(&database_url)
        .expect("Failed to initialize database");

    db::run_migrations(&db_pool)
        .expect("Failed to run database migrations");

    tracing::info!("✅ Database initialized");

    let db_data = web::Data::new(db_pool);

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    info!("Server starting on http://{}/", bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(db_data.clone())
            .wrap(Logger::default())
            .service(configure_routes())
    })
    .bind(bind_addr)?
    .run()
    .await
}
