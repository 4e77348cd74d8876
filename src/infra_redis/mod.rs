mod credential_store_redis;
mod session_repo_redis;

pub use credential_store_redis::RedisCredentialStore;
pub use session_repo_redis::*;
