//! Domain modules shipped with the binary.
//!
//! Each domain has an entry module implementing [`DomainModule`] and a
//! `routes` module whose functions register one route each.
//!
//! [`DomainModule`]: crate::app::DomainModule

pub mod kv;
pub mod system;

use crate::app::ModuleRegistry;

pub use kv::KvDomain;
pub use system::SystemDomain;

/// Every domain served by the binary, in documentation order.
pub fn registry() -> ModuleRegistry {
    ModuleRegistry::new()
        .with_domain(SystemDomain)
        .with_domain(KvDomain)
}
