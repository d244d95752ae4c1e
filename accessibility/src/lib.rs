//! ADAPOS accessibility - adaptive point-of-sale interface
//!
//! Tracks how an operator works during each sale, classifies their skill
//! with the fuzzy engine from [`adapos_core`] when the sale closes, and
//! selects the interface variant served for the next sale.
//!
//! ```no_run
//! use adapos_accessibility::{ActionEvent, AdaptationManager, AdaptationParameters, EventOutcome};
//!
//! let parameters = AdaptationParameters::load_or_default("config.json");
//! let mut manager = AdaptationManager::new(parameters)?;
//!
//! manager.handle_event(&ActionEvent::new("add_to_cart", 2.5, true))?;
//! if let EventOutcome::SessionCompleted(report) =
//!     manager.handle_event(&ActionEvent::sale_completed(1.5, true))?
//! {
//!     println!("{} -> {}", report.classification.level(), report.interface.slug());
//! }
//! # Ok::<(), adapos_accessibility::AdaptationError>(())
//! ```
//!
//! Copyright (c) 2025 ADAPOS Contributors

pub mod cognitive;

pub use cognitive::*;
