use crate::llm::TextGenerator;
use tracing::{info, warn};

/// Ask the service to fix the sentence's grammar.
///
/// Best effort: any failure, or no service at all, returns `sentence` untouched.
pub async fn normalize(generator: Option<&dyn TextGenerator>, sentence: &str) -> String {
    let Some(generator) = generator else {
        return sentence.to_string();
    };

    let prompt = format!("Correct the grammar of the following sentence: {sentence}");
    match generator.generate(&prompt).await {
        Ok(corrected) => {
            let corrected = corrected.trim().to_string();
            info!(backend = generator.name(), corrected = %corrected, "Grammar corrected");
            corrected
        }
        Err(e) => {
            warn!(error = %e, "Grammar correction failed, using the sentence as given");
            sentence.to_string()
        }
    }
}
