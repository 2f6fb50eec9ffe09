//! Shared application state for all routes.

use crate::service::Provisioner;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub provisioner: Arc<Provisioner>,
}

impl AppState {
    pub fn new(provisioner: Provisioner) -> Self {
        Self {
            provisioner: Arc::new(provisioner),
        }
    }
}
