//! Request helpers shared by the resource handlers: filters, pagination, body validation.

mod filter;
mod pagination;
mod validation;
pub use filter::{compare, like_match, Filter, Predicate, RESERVED_PARAMS};
pub use pagination::{Pagination, PaginationSettings};
pub use validation::RequestValidator;
