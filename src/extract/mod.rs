// src/extract/mod.rs

pub mod semantic;

use crate::assemble::assemble;
use crate::heuristics;
use crate::llm::TextGenerator;
use crate::record::TransactionRecord;
use crate::error::ServiceError;
use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

/// Which step of the degradation chain produced the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// The service answered with valid JSON.
    Parsed,
    /// The service answered, but the fields had to be regexed out of its reply.
    Salvaged,
    /// No usable answer; the sentence went through the regex heuristics.
    FallbackUsed,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Parsed => "parsed",
            Tier::Salvaged => "salvaged",
            Tier::FallbackUsed => "fallback_used",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "parsed" => Some(Tier::Parsed),
            "salvaged" => Some(Tier::Salvaged),
            "fallback_used" => Some(Tier::FallbackUsed),
            _ => None,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Extraction {
    pub tier: Tier,
    pub record: TransactionRecord,
}

/// Run the extraction chain on one sentence: semantic parse, regex salvage of
/// the reply, then the heuristics. Always yields a complete record.
pub async fn extract(generator: Option<&dyn TextGenerator>, sentence: &str) -> Extraction {
    let attempt = match generator {
        Some(g) => semantic::extract(g, sentence).await,
        None => Err(ServiceError::Disabled),
    };

    let extraction = match attempt {
        Ok((tier, fields)) => Extraction {
            tier,
            record: assemble(Some(&fields), None),
        },
        Err(e) => {
            warn!(error = %e, "Semantic extraction unavailable, falling back to heuristics");
            let fallback = heuristics::extract_fields(sentence);
            Extraction {
                tier: Tier::FallbackUsed,
                record: assemble(None, Some(&fallback)),
            }
        }
    };

    let (filled, total) = extraction.record.coverage();
    info!(tier = %extraction.tier, filled, total, "Extraction result");
    extraction
}
