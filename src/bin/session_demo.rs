//! Walks through issue, rotation, reuse detection and logout against the
//! in-memory backend.
//!
//! $ cargo run --bin session_demo

use sessionward::application_impl::*;
use sessionward::application_port::*;
use sessionward::infra_memory::MemorySessionRepo;
use sessionward::logger::*;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let logger = Logger::new_bootstrap();
    logger.reload_from_config(&LogConfig {
        filter: "debug".to_string(),
    })?;

    let codec = Arc::new(JwtHmacCodec::new(JwtConfig {
        algorithm: HmacAlgorithm::HS256,
        access_ttl: Duration::from_secs(15 * 60),
        signing_key: b"session-demo-signing-key-0123456789".to_vec(),
    }));
    let manager = RealSessionManager::new(
        Arc::new(MemorySessionRepo::default()),
        codec,
        SessionConfig::default(),
    );

    let first = manager.generate_tokens("u1").await?;
    info!("issued pair 1, access expires at {}", first.access_token_expires_at);

    let second = manager.refresh_token(&first.refresh_token.0).await?;
    info!(
        rotated = second.refresh_token != first.refresh_token,
        "refreshed to pair 2"
    );

    match manager.refresh_token(&first.refresh_token.0).await {
        Err(e) => info!("replaying refresh token 1: {}", e),
        Ok(_) => error!("replaying refresh token 1 unexpectedly succeeded"),
    }

    let user_id = manager
        .validate_access_token(&second.access_token.0)
        .await?;
    info!(%user_id, "access token 2 still valid after reuse detection");

    manager
        .logout(&second.access_token.0, &second.refresh_token.0)
        .await?;
    match manager.validate_access_token(&second.access_token.0).await {
        Err(e) => info!("access token 2 after logout: {}", e),
        Ok(_) => error!("access token 2 still valid after logout"),
    }

    Ok(())
}
