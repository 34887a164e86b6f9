//! Service status and metadata.

pub mod routes;

use async_trait::async_trait;

use crate::app::{DomainBuilder, DomainModule, RouteModule};
use crate::domain::AssemblyError;

pub const NAME: &str = "System";

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemDomain;

#[async_trait]
impl DomainModule for SystemDomain {
    async fn create(&self) -> Result<DomainBuilder, AssemblyError> {
        Ok(DomainBuilder::new(NAME, "").with_description("Service status and metadata"))
    }

    fn routes(&self) -> Vec<Box<dyn RouteModule>> {
        vec![
            Box::new(routes::root::register),
            Box::new(routes::health::register),
            Box::new(routes::status::register),
            Box::new(routes::version::register),
        ]
    }
}
