//! Data layer: stamp file headers, loading, merging and export.
//!
//! Architecture:
//! ```text
//!  radclock / dag_extract / udp_probes stamp files
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  header   │  `% key: value` lines → Header
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  rows → TabularDataset, field 5 → UTC index
//!   └──────────┘
//!        │
//!        ▼
//!   ┌───────────────┐
//!   │ DataContainer │  declared type, fields, radclock accessors
//!   └───────────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  merger   │  inner join on Tf → MergedDataset
//!   └──────────┘
//! ```

pub mod container;
pub mod export;
pub mod header;
pub mod loader;
pub mod merger;
pub mod model;

pub use container::{DataContainer, Radclock};
pub use merger::{merge, merge_radclock, MergePolicy, MergedDataset};
pub use model::{Column, DeclaredType, Series, TabularDataset, Value};
