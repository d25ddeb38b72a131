//! Multi-tenant support.
//!
//! Every library served by an Alexandria installation is a tenant, isolated
//! by PostgreSQL schema inside one shared database. This module defines the
//! [`TenantContext`] that every persistence operation requires and the
//! [`SchemaBinder`] that scopes an acquired connection to a tenant's schema.

mod context;
mod schema;

pub use context::{GLOBAL_SCHEMA, TenantContext};
pub use schema::SchemaBinder;
