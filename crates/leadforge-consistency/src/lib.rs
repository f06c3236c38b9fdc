//! Configuration consistency engine (component D): canonical fingerprinting,
//! integrity verification, and corruption detection over the shared
//! persistence seam.

pub mod cache;
pub mod canonical;
pub mod engine;
pub mod fingerprint;

pub use cache::ValidationCache;
pub use canonical::{canonicalize, canonical_bytes};
pub use engine::{
    AtomicityResult, ConsistencyEngine, CorruptionKind, CorruptionReport, IntegrityResult,
    ValidationResult,
};
pub use fingerprint::{content_only_subset, fingerprint, fingerprint_content_only, is_production_fingerprint};
