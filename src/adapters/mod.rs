//! External system integrations.
//!
//! - [`ner`] - token-classification inference runtimes (trait-based)
//!
//! # Design Pattern
//!
//! Adapters isolate external dependencies behind traits so the detection
//! task can be exercised with mock runtimes. The real backend is selected
//! by [`ner::default_runtime`]:
//!
//! ```rust,no_run
//! use pii_ner::adapters::ner::default_runtime;
//!
//! # fn example() -> pii_ner::domain::Result<()> {
//! let runtime = default_runtime()?;
//! println!("{} {}", runtime.name(), runtime.version());
//! # Ok(())
//! # }
//! ```

pub mod ner;
