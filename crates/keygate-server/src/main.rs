//! keygate server — application entry point.

use keygate_auth::config::AuthConfig;
use keygate_server::App;
use keygate_server::mailer::LogMailer;
use keygate_store::{DbConfig, DbManager};
use tracing_subscriber::EnvFilter;

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn auth_config_from_env() -> AuthConfig {
    let jwt_secret = std::env::var("KEYGATE_JWT_SECRET").unwrap_or_else(|_| {
        tracing::warn!("KEYGATE_JWT_SECRET not set; using insecure dev default");
        "dev-secret".to_string()
    });

    let mut config = AuthConfig {
        jwt_secret,
        ..Default::default()
    };
    if let Ok(secs) = env_or("KEYGATE_ACCESS_TOKEN_TTL_SECS", "").parse() {
        config.access_token_ttl_secs = secs;
    }
    if let Ok(secs) = env_or("KEYGATE_REFRESH_TOKEN_TTL_SECS", "").parse() {
        config.refresh_token_ttl_secs = secs;
    }
    if let Ok(secs) = env_or("KEYGATE_ACTIVATION_CODE_TTL_SECS", "").parse() {
        config.activation_code_ttl_secs = secs;
    }
    config
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("starting keygate server");

    let db_config = DbConfig {
        url: env_or("KEYGATE_DB_URL", "127.0.0.1:8000"),
        namespace: env_or("KEYGATE_DB_NAMESPACE", "keygate"),
        database: env_or("KEYGATE_DB_NAME", "main"),
        username: env_or("KEYGATE_DB_USER", "root"),
        password: env_or("KEYGATE_DB_PASSWORD", "root"),
    };

    let manager = DbManager::connect(&db_config)
        .await
        .expect("failed to connect to SurrealDB");

    keygate_store::run_migrations(manager.client())
        .await
        .expect("failed to run migrations");

    let _app = App::new(manager.client().clone(), auth_config_from_env(), LogMailer)
        .expect("access-control table is inconsistent with the operation registry");

    tracing::info!("keygate server ready");

    // TODO: mount the gRPC transport adapter over `App` once the proto
    // surface is settled.

    tracing::info!("keygate server stopped");
}
