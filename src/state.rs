//! Per-route state: the resource a route serves plus what its handlers share.

use crate::config::{Resource, ResourceRegistry};
use crate::service::PaginationSettings;
use crate::session::SessionFactory;
use std::sync::Arc;

#[derive(Clone)]
pub struct ResourceState {
    pub resource: Arc<Resource>,
    /// Used to resolve expansions.
    pub registry: Arc<ResourceRegistry>,
    pub sessions: Arc<dyn SessionFactory>,
    pub pagination: PaginationSettings,
}
