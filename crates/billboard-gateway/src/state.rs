use crate::tenant::TenantDirectory;
use billboard_delivery::DeliveryService;
use billboard_redirector::RedirectService;

#[derive(Clone)]
pub struct AppState {
    pub delivery: DeliveryService,
    pub redirect: RedirectService,
    pub tenants: TenantDirectory,
}

impl AppState {
    pub fn new(delivery: DeliveryService, redirect: RedirectService, tenants: TenantDirectory) -> Self {
        Self {
            delivery,
            redirect,
            tenants,
        }
    }
}
