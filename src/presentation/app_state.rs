// Application state for HTTP handlers
use std::sync::Arc;

use crate::application::dashboard_service::DashboardService;
use crate::application::store_repository::StoreRepository;

#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<dyn StoreRepository>,
    pub dashboard_service: DashboardService,
}
