use std::sync::Arc;

use crate::channels::viber::ViberClient;
use crate::config::AppConfig;
use crate::handoff::store::HandoffStore;
use crate::shared::utils::DbPool;

pub struct AppState {
    pub conn: DbPool,
    pub config: AppConfig,
    pub viber: Arc<ViberClient>,
    pub handoff: Arc<dyn HandoffStore>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("conn", &"DbPool")
            .field("viber", &"ViberClient")
            .field("handoff", &"Arc<dyn HandoffStore>")
            .finish()
    }
}
