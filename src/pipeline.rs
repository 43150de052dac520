// src/pipeline.rs

use crate::calculator::{self, InvoiceTotals};
use crate::config::Config;
use crate::document::{self, InvoiceMeta};
use crate::error::Result;
use crate::extract::{self, Extraction};
use crate::llm::{self, TextGenerator};
use crate::normalize::normalize;
use crate::store::TransactionStore;
use serde::Serialize;
use std::path::PathBuf;
use time::OffsetDateTime;
use tracing::{Instrument, error, info, info_span, warn};

/// Everything the core derives from one sentence.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    pub sentence: String,
    pub normalized: String,
    pub extraction: Extraction,
    pub totals: InvoiceTotals,
}

/// A processed sentence after it went through persistence and rendering.
#[derive(Debug, Clone, Serialize)]
pub struct Submission {
    pub id: i64,
    pub uid: String,
    pub output: PipelineOutput,
    /// `None` when the PDF could not be written; the error is logged.
    pub invoice_path: Option<PathBuf>,
}

pub struct Pipeline {
    config: Config,
    generator: Option<Box<dyn TextGenerator>>,
}

impl Pipeline {
    /// Build the pipeline from config. A backend that cannot be set up (say, a
    /// missing API key) leaves the pipeline running on heuristics alone.
    pub fn new(config: Config) -> Self {
        let generator = match llm::resolve_generator(&config.llm) {
            Ok(g) => g,
            Err(e) => {
                warn!(error = %e, backend = ?config.llm.backend, "Generative backend unavailable, using heuristics only");
                None
            }
        };
        Self::with_generator(config, generator)
    }

    pub fn with_generator(config: Config, generator: Option<Box<dyn TextGenerator>>) -> Self {
        Self { config, generator }
    }

    /// Normalize, extract, assemble and compute. Blank input is a no-op.
    pub async fn process(&self, sentence: &str) -> Option<PipelineOutput> {
        let sentence = sentence.trim();
        if sentence.is_empty() {
            return None;
        }

        let generator = self.generator.as_deref();
        let normalized = normalize(generator, sentence).await;
        let extraction = extract::extract(generator, &normalized).await;
        let totals = calculator::compute(&extraction.record);

        info!(
            tier = %extraction.tier,
            unit_price = totals.unit_price,
            tax_rate = totals.tax_rate,
            total = totals.total,
            "Invoice totals"
        );

        Some(PipelineOutput {
            sentence: sentence.to_string(),
            normalized,
            extraction,
            totals,
        })
    }

    /// Process one sentence, persist the record and write its invoice.
    ///
    /// Storage errors are returned; a failed PDF only drops `invoice_path`.
    pub async fn submit(
        &self,
        store: &TransactionStore,
        sentence: &str,
    ) -> Result<Option<Submission>> {
        let now = OffsetDateTime::now_utc();
        let uid = TransactionStore::generate_uid(sentence, &now.unix_timestamp_nanos().to_string());
        let span = info_span!("submission", uid = %&uid[..12]);
        self.persist_and_render(store, sentence, uid, now)
            .instrument(span)
            .await
    }

    async fn persist_and_render(
        &self,
        store: &TransactionStore,
        sentence: &str,
        uid: String,
        now: OffsetDateTime,
    ) -> Result<Option<Submission>> {
        let Some(output) = self.process(sentence).await else {
            info!("Empty sentence, nothing to do");
            return Ok(None);
        };

        let id = store
            .insert_transaction(
                &uid,
                &output.sentence,
                &output.normalized,
                output.extraction.tier,
                &output.extraction.record,
            )
            .inspect_err(|e| error!(error = %e, "Failed to store transaction"))?;

        let invoice = &self.config.invoice;
        let meta = InvoiceMeta::new(&invoice.invoice_prefix, id, now.date(), invoice.due_days);
        let invoice_path = match document::write_invoice(
            &output.extraction.record,
            &output.totals,
            &meta,
            invoice,
            id,
        ) {
            Ok(path) => Some(path),
            Err(e) => {
                error!(error = %e, id, "Failed to generate invoice");
                None
            }
        };

        Ok(Some(Submission {
            id,
            uid,
            output,
            invoice_path,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::Tier;
    use crate::record::Field;
    use crate::testing::ScriptedGenerator;

    fn config_in(dir: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.invoice.output_dir = dir.join("invoices");
        config
    }

    #[tokio::test]
    async fn test_blank_sentence_is_noop() {
        let pipeline = Pipeline::with_generator(Config::default(), None);
        assert!(pipeline.process("   ").await.is_none());

        let store = TransactionStore::in_memory().unwrap();
        assert!(pipeline.submit(&store, "").await.unwrap().is_none());
        assert_eq!(store.get_counts().unwrap().0, 0);
    }

    #[tokio::test]
    async fn test_parsed_path_uses_normalized_sentence() {
        let generator = ScriptedGenerator::replying(&[
            "I need social media management for $200 with 5% tax.",
            r#"{"Service": "social media management", "Price": "$200", "Tax": "5%",
                "Payment Method": null, "Billing Address": null, "Shipping Address": null}"#,
        ]);
        let pipeline = Pipeline::with_generator(Config::default(), Some(Box::new(generator)));

        let out = pipeline
            .process("i need social media managment for $200 with 5% tax")
            .await
            .unwrap();

        assert_eq!(out.normalized, "I need social media management for $200 with 5% tax.");
        assert_eq!(out.extraction.tier, Tier::Parsed);
        assert_eq!(out.totals.total, 210.0);
    }

    #[tokio::test]
    async fn test_dead_service_still_produces_invoice() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::with_generator(
            config_in(dir.path()),
            Some(Box::new(ScriptedGenerator::failing())),
        );
        let store = TransactionStore::in_memory().unwrap();

        let submission = pipeline
            .submit(&store, "graphic design for $100 with 10% tax, paid by cash")
            .await
            .unwrap()
            .unwrap();

        let out = &submission.output;
        // normalization passed the text through untouched
        assert_eq!(out.normalized, out.sentence);
        assert_eq!(out.extraction.tier, Tier::FallbackUsed);
        assert_eq!(out.extraction.record.payment_method, Field::known("cash"));
        assert_eq!(out.totals.total, 110.0);

        let stored = store.get_transaction(submission.id).unwrap().unwrap();
        assert_eq!(stored.record, out.extraction.record);
        assert_eq!(stored.tier, Some(Tier::FallbackUsed));

        let path = submission.invoice_path.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_salvaged_tax_goes_through_calculator() {
        let generator = ScriptedGenerator::replying(&[
            "Design for $50, tax is 20 %.",
            r#"Here: {"Service": "design service", "Price": "$50", "Tax": "20 %" "#,
        ]);
        let pipeline = Pipeline::with_generator(Config::default(), Some(Box::new(generator)));

        let out = pipeline.process("design for $50 tax 20 %").await.unwrap();
        assert_eq!(out.extraction.tier, Tier::Salvaged);
        assert_eq!(out.extraction.record.tax, Field::known("20 %"));
        assert_eq!(out.totals.tax_rate, 20.0);
        assert_eq!(out.totals.total, 60.0);
    }

    #[tokio::test]
    async fn test_missing_api_key_runs_on_heuristics() {
        let mut config = Config::default();
        config.llm.gemini.api_key_env = Some("SENTENCE_INVOICE_TEST_UNSET_GEMINI_KEY".to_string());
        let pipeline = Pipeline::new(config);

        let out = pipeline
            .process("consulting for $40 with 5% tax, paid by paypal")
            .await
            .unwrap();

        assert_eq!(out.normalized, out.sentence);
        assert_eq!(out.extraction.tier, Tier::FallbackUsed);
        assert_eq!(out.extraction.record.service, Field::known("consulting"));
        assert_eq!(out.totals.total, 42.0);
    }

    #[tokio::test]
    async fn test_unwritable_output_dir_keeps_record() {
        let dir = tempfile::tempdir().unwrap();
        // a plain file where the output directory should be
        let blocker = dir.path().join("invoices");
        std::fs::write(&blocker, b"not a dir").unwrap();

        let pipeline = Pipeline::with_generator(config_in(dir.path()), None);
        let store = TransactionStore::in_memory().unwrap();
        let submission = pipeline.submit(&store, "cash, $10").await.unwrap().unwrap();

        assert!(submission.invoice_path.is_none());
        assert!(store.get_transaction(submission.id).unwrap().is_some());
    }
}
