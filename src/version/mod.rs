//! Version layer: fetching advertised versions and resolving constraints
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Registry   │────▶│  FetchCache │     │ Constraint  │
//! │  (fetch)    │     │  (per run)  │     │  (parse)    │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!        │                                       │
//!        ▼                                       ▼
//! ┌─────────────┐                         ┌─────────────┐
//! │ Registries  │                         │  Resolver   │
//! │ (helm, oci) │                         │ (max, stale)│
//! └─────────────┘                         └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`cache`]: In-memory, per-run de-duplication of catalog fetches
//! - [`constraint`]: Version constraint grammar and satisfaction
//! - [`registry`]: Registry trait for fetching versions from remote sources
//! - [`registries`]: Concrete registry implementations (Helm index, OCI)
//! - [`resolver`]: Latest version and staleness for one reference
//! - [`error`]: Error types for registry and resolution failures
//! - [`semver`]: Lenient semver parsing and ordering
//! - [`types`]: Common types like `PackageVersions`

pub mod cache;
pub mod constraint;
pub mod error;
pub mod registries;
pub mod registry;
pub mod resolver;
pub mod semver;
pub mod types;
