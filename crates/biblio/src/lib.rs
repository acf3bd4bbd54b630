//! Backend library for the biblio circulation service.
//!
//! The `circulation` module carries the engine itself: the copy ledger, the
//! loan store, borrow/return orchestration, grace-period fee assessment, and
//! member risk scoring. The remaining modules provide the shared service
//! plumbing (configuration, telemetry, the application error type) consumed
//! by the `biblio-api` binary.

pub mod circulation;
pub mod config;
pub mod error;
pub mod telemetry;
