//! Route builders.

pub mod common;
pub mod router;

pub use common::common_routes;
pub use router::SupineRouter;
