//! Domain models.

pub mod config;
pub mod document;
pub mod draft;
pub mod expense;
pub mod interpretation;
pub mod rule;
pub mod values;

pub use config::ScanledgerConfig;
pub use document::{DocumentStatus, ImportedDocument};
pub use draft::{ExpenseDraftItem, ReviewItem};
pub use expense::{Category, Expense};
pub use interpretation::{HeuristicBaseline, InvoiceData, InvoiceInterpretation, InvoiceLineItem};
pub use rule::{VendorCategoryRule, normalize_keyword};
pub use values::{ConfidenceScore, DocumentHash};
