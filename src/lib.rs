//! Turn one spoken or typed sentence about a sale into a transaction record
//! and a one-line invoice.

pub mod assemble;
pub mod calculator;
pub mod config;
pub mod document;
pub mod error;
pub mod extract;
pub mod heuristics;
pub mod llm;
pub mod normalize;
pub mod pipeline;
pub mod record;
pub mod store;

#[cfg(test)]
mod testing;

pub use calculator::{InvoiceTotals, compute};
pub use config::Config;
pub use error::{AppError, Result, ServiceError};
pub use extract::{Extraction, Tier};
pub use pipeline::{Pipeline, PipelineOutput, Submission};
pub use record::{Field, TransactionRecord};
pub use store::TransactionStore;
