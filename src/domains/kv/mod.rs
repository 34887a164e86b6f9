//! Key-value access over HTTP, backed by the shared store.
//!
//! Keys are dotted paths (`users.42.profile`) mapped onto [`KvKey`] parts.
//!
//! [`KvKey`]: crate::domain::KvKey

pub mod routes;
pub mod schemas;

use async_trait::async_trait;

use crate::app::{DomainBuilder, DomainModule, RouteModule};
use crate::domain::AssemblyError;

pub const NAME: &str = "KV Store";

#[derive(Debug, Clone, Copy, Default)]
pub struct KvDomain;

#[async_trait]
impl DomainModule for KvDomain {
    async fn create(&self) -> Result<DomainBuilder, AssemblyError> {
        Ok(DomainBuilder::new(NAME, "/kv").with_description("Read and write dotted key paths"))
    }

    fn routes(&self) -> Vec<Box<dyn RouteModule>> {
        vec![
            Box::new(routes::get::register),
            Box::new(routes::set::register),
            Box::new(routes::delete::register),
        ]
    }
}
