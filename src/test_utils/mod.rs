//! Test utilities and mock implementations.
//!
//! This module provides a configurable mock store and fixture modules for
//! driving the loader through its failure paths in unit and integration
//! tests.

pub mod mocks;

pub use mocks::{
    FailingDomainModule, FailingRouteModule, FixtureDomainModule, MockConfig, MockKvStore,
    NonEmptyDomainModule,
};
