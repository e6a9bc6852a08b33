use std::sync::Arc;

use chrono::Utc;

use cleanops_api::config::ApiConfig;
use cleanops_auth::{InMemoryUserDirectory, Role, TokenCodec, TokenIssuer, UserRecord};
use cleanops_core::UserId;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cleanops_observability::init();

    let config = match ApiConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };

    let codec = match TokenCodec::new(&config.token) {
        Ok(codec) => Arc::new(codec),
        Err(e) => {
            tracing::error!(error = %e, "invalid token configuration");
            std::process::exit(1);
        }
    };

    tracing::warn!("using in-memory user directory");
    let directory = Arc::new(InMemoryUserDirectory::new());

    if let Some(email) = &config.bootstrap_admin_email {
        let admin = UserRecord {
            id: UserId::generate(),
            username: "admin".to_string(),
            email: email.clone(),
            role: Role::Admin,
            is_active: true,
        };
        let admin_id = admin.id.clone();
        directory.insert(admin)?;

        let issuer = TokenIssuer::new(codec.clone(), directory.clone());
        let issued = issuer.issue_for_user(&admin_id, Utc::now()).await?;
        tracing::info!(user_id = %admin_id, expires_at = %issued.expires_at, "bootstrap admin created");
        // Printed once for the operator, never logged.
        println!("{}", issued.token);
    }

    let app = cleanops_api::app::build_app_with_codec(codec, directory)?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}
