//! Domain layer containing core types, the merge primitive, traits, and error definitions.

pub mod error;
pub mod merge;
pub mod traits;
pub mod types;

pub use error::{AppError, AssemblyError, ConfigError, StoreError, ValidationError};
pub use merge::deep_merge;
pub use traits::KvStore;
pub use types::{
    AdmissionDecision, AdmissionRejection, ErrorResponse, HttpMethod, KvKey, RateLimitRecord,
    ResponseContract, Tag, WindowHit,
};
