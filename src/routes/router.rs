//! Resource routes registered one by one on a router.
//!
//! Every `include_*` call validates the resource against its route kind and fails with a
//! `ConfigError` at startup rather than at request time.

use crate::config::{Resource, ResourceRegistry};
use crate::error::ConfigError;
use crate::handlers::resource::{create, delete, get_by_id, list, update};
use crate::service::PaginationSettings;
use crate::session::SessionFactory;
use crate::state::ResourceState;
use axum::{
    http::Method,
    routing::{self, MethodRouter},
    Router,
};
use std::collections::HashSet;
use std::sync::Arc;

pub struct SupineRouter {
    registry: Arc<ResourceRegistry>,
    sessions: Arc<dyn SessionFactory>,
    pagination: PaginationSettings,
    router: Router,
    registered: HashSet<(Method, String)>,
}

impl SupineRouter {
    pub fn new(registry: impl Into<Arc<ResourceRegistry>>, sessions: Arc<dyn SessionFactory>) -> Self {
        SupineRouter {
            registry: registry.into(),
            sessions,
            pagination: PaginationSettings::default(),
            router: Router::new(),
            registered: HashSet::new(),
        }
    }

    pub fn with_pagination(mut self, pagination: PaginationSettings) -> Self {
        self.pagination = pagination;
        self
    }

    pub fn registry(&self) -> &Arc<ResourceRegistry> {
        &self.registry
    }

    /// `GET /{plural}/:key`
    pub fn include_get_resource_by_id(self, plural: &str) -> Result<Self, ConfigError> {
        let state = self.state_for(plural)?;
        check_expansions(&self.registry, &state.resource)?;
        let path = item_path(&state.resource);
        self.add(Method::GET, path, routing::get(get_by_id).with_state(state))
    }

    /// `GET /{plural}`
    pub fn include_get_resource_list(self, plural: &str) -> Result<Self, ConfigError> {
        let state = self.state_for(plural)?;
        let path = collection_path(&state.resource);
        self.add(Method::GET, path, routing::get(list).with_state(state))
    }

    /// `POST /{plural}`; the resource must declare create params.
    pub fn include_create_resource(self, plural: &str) -> Result<Self, ConfigError> {
        let state = self.state_for(plural)?;
        if state.resource.create_params.is_none() {
            return Err(ConfigError::MissingParams {
                resource: state.resource.plural_name.clone(),
                route: "create",
                params: "create_params",
            });
        }
        let path = collection_path(&state.resource);
        self.add(Method::POST, path, routing::post(create).with_state(state))
    }

    /// `PATCH /{plural}/:key`; the resource must declare update params.
    pub fn include_update_resource(self, plural: &str) -> Result<Self, ConfigError> {
        let state = self.state_for(plural)?;
        if state.resource.update_params.is_none() {
            return Err(ConfigError::MissingParams {
                resource: state.resource.plural_name.clone(),
                route: "update",
                params: "update_params",
            });
        }
        let path = item_path(&state.resource);
        self.add(Method::PATCH, path, routing::patch(update).with_state(state))
    }

    /// `DELETE /{plural}/:key`
    pub fn include_delete_resource(self, plural: &str) -> Result<Self, ConfigError> {
        let state = self.state_for(plural)?;
        let path = item_path(&state.resource);
        self.add(Method::DELETE, path, routing::delete(delete).with_state(state))
    }

    /// Every route the resource supports: reads and delete always, create and update
    /// when the matching params are declared.
    pub fn include_resource(self, plural: &str) -> Result<Self, ConfigError> {
        let resource = self
            .registry
            .get(plural)
            .ok_or_else(|| ConfigError::UnknownResource(plural.to_string()))?;
        let mut this = self
            .include_get_resource_by_id(plural)?
            .include_get_resource_list(plural)?;
        if resource.create_params.is_some() {
            this = this.include_create_resource(plural)?;
        }
        if resource.update_params.is_some() {
            this = this.include_update_resource(plural)?;
        }
        this.include_delete_resource(plural)
    }

    /// `include_resource` for every registered resource.
    pub fn include_all(self) -> Result<Self, ConfigError> {
        let mut names: Vec<String> = self.registry.iter().map(|r| r.plural_name.clone()).collect();
        names.sort();
        names
            .iter()
            .try_fold(self, |this, name| this.include_resource(name))
    }

    pub fn into_router(self) -> Router {
        self.router
    }

    fn state_for(&self, plural: &str) -> Result<ResourceState, ConfigError> {
        let resource = self
            .registry
            .get(plural)
            .ok_or_else(|| ConfigError::UnknownResource(plural.to_string()))?;
        Ok(ResourceState {
            resource,
            registry: self.registry.clone(),
            sessions: self.sessions.clone(),
            pagination: self.pagination,
        })
    }

    fn add(mut self, method: Method, path: String, route: MethodRouter) -> Result<Self, ConfigError> {
        if !self.registered.insert((method.clone(), path.clone())) {
            return Err(ConfigError::Validation(format!(
                "route {} {} already registered",
                method, path
            )));
        }
        tracing::info!(%method, %path, "registered route");
        self.router = self.router.route(&path, route);
        Ok(self)
    }
}

fn collection_path(resource: &Resource) -> String {
    format!("/{}", resource.plural_name)
}

fn item_path(resource: &Resource) -> String {
    format!("/{}/:key", resource.plural_name)
}

/// Expansion targets and their join columns must exist when the route is registered.
fn check_expansions(registry: &ResourceRegistry, resource: &Resource) -> Result<(), ConfigError> {
    for exp in &resource.expansions {
        let target = registry.get(&exp.resource).ok_or_else(|| ConfigError::UnknownExpansion {
            resource: resource.plural_name.clone(),
            target: exp.resource.clone(),
        })?;
        if target.column(&exp.remote_column).is_none() {
            return Err(ConfigError::UnknownColumn {
                resource: target.plural_name.clone(),
                column: exp.remote_column.clone(),
            });
        }
    }
    Ok(())
}
