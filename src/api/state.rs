use crate::dashboard::SharedDashboard;

#[derive(Clone)]
pub struct AppState {
    pub dashboard: SharedDashboard,
}

impl AppState {
    pub fn new(dashboard: SharedDashboard) -> Self {
        Self { dashboard }
    }
}
