use nutq_attempt::SessionConfig;
use nutq_eval::AcceptancePolicy;

use crate::ApiConfig;

#[derive(Clone, Debug)]
pub struct ApiState {
    pub policy: AcceptancePolicy,
    pub session: SessionConfig,
}

impl ApiState {
    pub fn new(config: &ApiConfig) -> Self {
        Self {
            policy: config.policy(),
            session: config.session_config(),
        }
    }
}

impl Default for ApiState {
    fn default() -> Self {
        let session = SessionConfig::default();
        Self {
            policy: session.policy,
            session,
        }
    }
}
