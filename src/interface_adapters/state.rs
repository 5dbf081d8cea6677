use crate::interface_adapters::clients::auth::AuthClient;
use crate::use_cases::RoomRegistry;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    // Owns every live room task; shared by the ws and provisioning routes.
    pub registry: Arc<RoomRegistry>,
    // Boundary to the external auth service.
    pub auth_client: Arc<AuthClient>,
}
