use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::settings::*;
use std::sync::Arc;

pub struct Server {
    pub session_manager: Arc<dyn SessionManager>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let session = &settings.session;
        let keys = SessionKeys::new(session.key_namespace.clone());

        let session_repo: Arc<dyn SessionRepo> = match session.backend.as_str() {
            "memory" => {
                warn!("memory session backend: sessions are not shared between replicas");
                Arc::new(MemorySessionRepo::new(keys))
            }
            "redis" => {
                let url = session
                    .redis_url
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("session.redis_url is required"))?;
                let store = RedisCredentialStore::connect(url).await?;
                Arc::new(RedisSessionRepo::new(store, keys))
            }
            other => return Err(anyhow::anyhow!("Unknown session backend: {}", other)),
        };

        let token_codec: Arc<dyn TokenCodec> = Arc::new(JwtHmacCodec::new(JwtConfig {
            algorithm: settings.jwt.algorithm,
            access_ttl: session.access_ttl(),
            signing_key: jwt_secret()?,
        }));

        let session_manager: Arc<dyn SessionManager> = Arc::new(RealSessionManager::new(
            session_repo,
            token_codec,
            SessionConfig {
                refresh_ttl: session.refresh_ttl(),
                op_timeout: session.op_timeout(),
            },
        ));

        info!(backend = %session.backend, "server started");

        Ok(Self { session_manager })
    }
}
