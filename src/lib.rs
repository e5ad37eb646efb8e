//! Supine: declarative REST resources over axum and sqlx.
//!
//! Declare a [`Resource`] (entity, exposed model, create/update params, query filter,
//! expansions, cache policy), put it in a [`ResourceRegistry`], and register its routes on a
//! [`SupineRouter`]. Handlers open one [`Session`] per request from a [`SessionFactory`]:
//! [`PgSessionFactory`] for PostgreSQL or [`MemorySessionFactory`] for tests and demos.

pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod migration;
pub mod response;
pub mod routes;
pub mod service;
pub mod session;
pub mod sql;
pub mod state;
pub mod store;

pub use config::{
    load_from_path, parse_resources, resolve, resolve_resource, Resource, ResourceConfig,
    ResourceRegistry, Settings,
};
pub use error::{AppError, ConfigError};
pub use migration::create_tables;
pub use response::{ApiError, ApiResponse, PaginatedResponse, PaginationData};
pub use routes::{common_routes, SupineRouter};
pub use service::{Filter, Pagination, PaginationSettings};
pub use session::{MemorySessionFactory, PgSessionFactory, Row, Session, SessionFactory};
pub use store::{connect, ensure_database_exists};
