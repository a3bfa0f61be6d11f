//! Helpers shared by unit and integration tests.

use std::sync::Arc;

use crate::config::{AuthConfig, Config, CorsConfig, RateLimitConfig};
use crate::gateway::InferenceExecutor;
use crate::AppState;

/// Admin secret configured by [`test_config`].
pub const TEST_ADMIN_KEY: &str = "test-admin-key";

pub fn test_config() -> Config {
    Config {
        auth: AuthConfig {
            admin_key: Some(TEST_ADMIN_KEY.to_string()),
        },
        rate_limit: RateLimitConfig {
            requests_per_minute: 60,
            window_secs: 60,
        },
        cors: CorsConfig {
            origins: "*".to_string(),
        },
        ..Config::default()
    }
}

pub fn create_test_state() -> Arc<AppState> {
    Arc::new(AppState::new(test_config()))
}

pub fn create_test_state_with(config: Config, executor: Arc<dyn InferenceExecutor>) -> Arc<AppState> {
    Arc::new(AppState::with_executor(config, executor))
}

/// `Authorization` header value for `secret`.
pub fn bearer(secret: &str) -> String {
    format!("Bearer {}", secret)
}
