//! # hooks-core
//!
//! Record model and storage adapters shared by the bakery-hooks crates.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     RecordStore (trait)                   │
//! │  ┌──────────────────┐  ┌─────────────────┐  ┌──────────┐  │
//! │  │ MemoryRecordStore│  │ PocketBaseStore │  │ Timeout  │  │
//! │  │  (dev / tests)   │  │   (REST API)    │  │  Store   │  │
//! │  └──────────────────┘  └─────────────────┘  └──────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The backend-as-a-service that owns the data is reached only through
//! [`RecordStore`], so hooks never care whether records live in memory or in a
//! remote collection.

pub mod error;
pub mod pocketbase;
pub mod record;
pub mod store;

pub use error::{Result, StoreError};
pub use pocketbase::{PocketBaseConfig, PocketBaseStore};
pub use record::Record;
pub use store::{MemoryRecordStore, RecordStore, TimeoutStore};
