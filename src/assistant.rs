//! Asking the model a question within the running conversation.

use crate::conversation::History;
use crate::llm::{ChatModel, ModelError};
use tracing::{debug, warn};

/// Ask `question` in the context of `history`.
///
/// On success the question and the trimmed completion are both appended to
/// `history` and the completion is returned as-is. On failure the question is
/// removed again, leaving `history` exactly as it was, and the error is
/// returned for the caller to report. Nothing is retried.
pub async fn ask<M>(model: &M, history: &mut History, question: &str) -> Result<String, ModelError>
where
    M: ChatModel + ?Sized,
{
    let exchange = history.begin(question);

    debug!(
        backend = model.name(),
        model = model.model(),
        messages = exchange.messages().len(),
        "querying model"
    );
    let result = model.complete(exchange.messages()).await;
    match result {
        Ok(completion) => {
            let completion = completion.trim().to_string();
            debug!(chars = completion.len(), "model replied");
            exchange.commit(completion.clone());
            Ok(completion)
        }
        Err(err) => {
            warn!(error = %err, "model request failed");
            Err(err)
        }
    }
}
