use std::sync::Arc;
use backend::{build_rocket, config::Config, postgres::PgStore};
use shuttle_runtime::CustomError;
use sqlx::PgPool;
use tracing::info;

#[shuttle_runtime::main]
async fn rocket(
    #[shuttle_shared_db::Postgres] pool: PgPool,
    #[shuttle_runtime::Secrets] secret_store: shuttle_runtime::SecretStore,
) -> shuttle_rocket::ShuttleRocket {
    info!("🚀 Starting poll server");

    let config = Config::from_secrets(&secret_store);
    info!(
        identity_header = %config.identity_header,
        allow_anonymous_share = config.allow_anonymous_share,
        "Configuration loaded"
    );

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(CustomError::new)?;

    info!("📋 Migrations complete");

    let rocket = build_rocket(&config, Arc::new(PgStore::new(pool)));
    Ok(rocket.into())
}
