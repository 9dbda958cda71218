//! Core types for the Stratum component runtime.
//!
//! Provides the ordered [`Dictionary`] / [`Value`] configuration model that
//! drives data-driven component creation, plus the shared plumbing the rest
//! of the workspace leans on: similar-name diagnostics for failed lookups,
//! per-component journal stream settings, and the [`Tracer`] seam for phase
//! timing.
//!
//! Entry order in a [`Dictionary`] is preserved and observable. Component
//! creation passes, build order, and list-valued parameters all depend on
//! it, which is why the map type is [`indexmap::IndexMap`] rather than a
//! hash map.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod dictionary;
pub mod journal;
pub mod text;
pub mod tracer;

pub use dictionary::{Dictionary, DictionaryLoadError, Value};
pub use journal::{JournalOperation, JournalSettings, StreamSetting};
pub use text::{similar_names, string_is_numeric};
pub use tracer::{NullTracer, Tracer};
