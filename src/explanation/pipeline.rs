use std::sync::{RwLock, RwLockReadGuard};

use thiserror::Error;

use super::completion::{CompletionError, CompletionOptions, Completer};
use super::markdown::sanitize_html;
use super::openrouter::OpenRouterClient;
use super::prompt::{build_prompt, build_prompt_all};
use crate::db::{HistoryEntry, HistoryEntryPatch};
use crate::history::{HistoryError, HistoryStore};
use crate::settings::UserSettings;
use crate::{log_info, log_warn};

const ENABLE_LOGS: bool = true;

#[derive(Debug, Error)]
pub enum ExplainError {
    #[error("explanations are disabled")]
    Disabled,
    #[error("OpenRouter API key is not set")]
    MissingApiKey,
    #[error("no text selected")]
    EmptySelection,
    #[error("prompt is empty")]
    EmptyPrompt,
    #[error(transparent)]
    Completion(#[from] CompletionError),
    #[error(transparent)]
    History(#[from] HistoryError),
}

/// Snapshot of the settings the pipeline reads on every request.
#[derive(Debug, Clone, PartialEq)]
pub struct ExplainConfig {
    pub enabled: bool,
    pub api_key: String,
    pub model: String,
    pub prompt_template: String,
    pub options: CompletionOptions,
}

impl From<&UserSettings> for ExplainConfig {
    fn from(settings: &UserSettings) -> Self {
        Self {
            enabled: settings.is_enabled,
            api_key: settings.openrouter_api_key.trim().to_string(),
            model: settings.model.clone(),
            prompt_template: settings.prompt.clone(),
            options: CompletionOptions::default(),
        }
    }
}

/// Selected text in, stored explanation out.
///
/// A request either ends with a new history entry or with an error; a failed
/// completion never writes to history.
pub struct ExplanationPipeline {
    history: HistoryStore,
    config: RwLock<ExplainConfig>,
}

impl ExplanationPipeline {
    pub fn new(history: HistoryStore, config: ExplainConfig) -> Self {
        Self {
            history,
            config: RwLock::new(config),
        }
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    fn read_config(&self) -> RwLockReadGuard<'_, ExplainConfig> {
        match self.config.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn config(&self) -> ExplainConfig {
        self.read_config().clone()
    }

    /// Swap in fresh settings, typically after a change notification.
    pub fn reload(&self, config: ExplainConfig) {
        let mut guard = match self.config.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = config;
        log_info!("Explanation settings reloaded");
    }

    /// OpenRouter client for the configured key and model.
    pub fn openrouter_client(&self) -> Result<OpenRouterClient, ExplainError> {
        let config = self.config();
        if config.api_key.is_empty() {
            return Err(ExplainError::MissingApiKey);
        }
        OpenRouterClient::new(&config.api_key, &config.model)
            .map_err(|err| CompletionError::Network(format!("{err:#}")).into())
    }

    /// Build the prompt, ask `completer`, sanitize, and store the result.
    pub async fn explain(
        &self,
        selected_text: &str,
        sentence: &str,
        prompt_template: &str,
        completer: &dyn Completer,
    ) -> Result<HistoryEntry, ExplainError> {
        if selected_text.trim().is_empty() {
            return Err(ExplainError::EmptySelection);
        }

        let prompt = build_prompt(prompt_template, selected_text, sentence);
        let content = self.complete(&prompt, completer).await.map_err(|err| {
            log_warn!("Completion failed for '{selected_text}': {err}");
            err
        })?;

        let explanation = sanitize_html(content.trim());
        let entry = self
            .history
            .add_entry(selected_text, &explanation, sentence)
            .await?;
        Ok(entry)
    }

    /// Explain a stored entry again with `prompt_template`, filling every
    /// placeholder. The sanitized text is returned for preview; history is
    /// left alone until [`save_reexplanation`](Self::save_reexplanation).
    pub async fn reexplain(
        &self,
        id: i64,
        prompt_template: &str,
        completer: &dyn Completer,
    ) -> Result<String, ExplainError> {
        if prompt_template.trim().is_empty() {
            return Err(ExplainError::EmptyPrompt);
        }
        let entry = self
            .history
            .get_entry(id)
            .await?
            .ok_or(HistoryError::NotFound(id))?;

        let prompt = build_prompt_all(prompt_template, &entry.word, &entry.sentence);
        let content = self.complete(&prompt, completer).await.map_err(|err| {
            log_warn!("Re-explanation failed for entry {id}: {err}");
            err
        })?;
        Ok(sanitize_html(content.trim()))
    }

    /// Replace only the explanation of entry `id`.
    pub async fn save_reexplanation(
        &self,
        id: i64,
        explanation: &str,
    ) -> Result<HistoryEntry, ExplainError> {
        let patch = HistoryEntryPatch {
            explanation: Some(sanitize_html(explanation.trim())),
            ..Default::default()
        };
        let entry = self.history.update_entry(id, patch).await?;
        log_info!("Saved new explanation for entry {id}");
        Ok(entry)
    }

    async fn complete(
        &self,
        prompt: &str,
        completer: &dyn Completer,
    ) -> Result<String, ExplainError> {
        let options = self.read_config().options;
        let response = completer.complete(prompt, &options).await?;
        let content = response.first_content().ok_or_else(|| {
            CompletionError::InvalidResponse("no explanation available".into())
        })?;
        Ok(content.to_string())
    }

    /// [`explain`](Self::explain) with the configured template, gated on the
    /// enabled flag and a stored API key.
    pub async fn explain_selection(
        &self,
        selected_text: &str,
        sentence: Option<&str>,
        completer: &dyn Completer,
    ) -> Result<HistoryEntry, ExplainError> {
        let config = self.config();
        if !config.enabled {
            return Err(ExplainError::Disabled);
        }
        if config.api_key.is_empty() {
            return Err(ExplainError::MissingApiKey);
        }

        self.explain(
            selected_text,
            sentence.unwrap_or_default(),
            &config.prompt_template,
            completer,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explanation::completion::CompletionResponse;
    use crate::history::HISTORY_DB_FILE;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct FakeCompleter {
        reply: Result<CompletionResponse, CompletionError>,
        prompts: Mutex<Vec<String>>,
    }

    impl FakeCompleter {
        fn replying(text: &str) -> Self {
            Self {
                reply: Ok(CompletionResponse::from_text(text)),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn failing(err: CompletionError) -> Self {
            Self {
                reply: Err(err),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Completer for FakeCompleter {
        async fn complete(
            &self,
            prompt: &str,
            _options: &CompletionOptions,
        ) -> Result<CompletionResponse, CompletionError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply.clone()
        }
    }

    fn config() -> ExplainConfig {
        ExplainConfig {
            enabled: true,
            api_key: "sk-test".into(),
            model: "test/model".into(),
            prompt_template: "Explain {word} in \"{sentence}\"".into(),
            options: CompletionOptions::default(),
        }
    }

    async fn pipeline() -> (TempDir, ExplanationPipeline) {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join(HISTORY_DB_FILE));
        store.init().await.unwrap();
        (dir, ExplanationPipeline::new(store, config()))
    }

    #[tokio::test]
    async fn stores_sanitized_explanation() {
        let (_dir, pipeline) = pipeline().await;
        let completer =
            FakeCompleter::replying("  **fast** /fæst/ rápido\n<script>x</script>El tren es <em>rápido</em>.  ");

        let entry = pipeline
            .explain("fast", "The train is fast.", "{word} | {sentence}", &completer)
            .await
            .unwrap();

        assert_eq!(
            completer.prompts.lock().unwrap().as_slice(),
            ["fast | The train is fast."]
        );
        assert_eq!(
            entry.explanation,
            "**fast** /fæst/ rápido\n&lt;script&gt;x&lt;/script&gt;El tren es <em>rápido</em>."
        );
        assert_eq!(entry.word, "fast");
        assert_eq!(entry.sentence, "The train is fast.");

        let latest = pipeline.history().get_entries(1, true).await.unwrap();
        assert_eq!(latest, vec![entry]);
    }

    #[tokio::test]
    async fn auth_failure_writes_nothing() {
        let (_dir, pipeline) = pipeline().await;
        let completer = FakeCompleter::failing(CompletionError::Auth("bad key".into()));

        let err = pipeline
            .explain("fast", "The train is fast.", "{word}", &completer)
            .await
            .unwrap_err();

        assert!(matches!(err, ExplainError::Completion(CompletionError::Auth(_))));
        assert_eq!(pipeline.history().count_entries().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn empty_response_writes_nothing() {
        let (_dir, pipeline) = pipeline().await;
        let completer = FakeCompleter {
            reply: Ok(CompletionResponse::default()),
            prompts: Mutex::new(Vec::new()),
        };

        let err = pipeline
            .explain("fast", "", "{word}", &completer)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ExplainError::Completion(CompletionError::InvalidResponse(_))
        ));
        assert_eq!(pipeline.history().count_entries().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn missing_sentence_uses_word_in_prompt_but_stores_empty() {
        let (_dir, pipeline) = pipeline().await;
        let completer = FakeCompleter::replying("ok");

        let entry = pipeline
            .explain_selection("fast", None, &completer)
            .await
            .unwrap();

        assert_eq!(
            completer.prompts.lock().unwrap().as_slice(),
            ["Explain fast in \"fast\""]
        );
        assert_eq!(entry.sentence, "");
    }

    #[tokio::test]
    async fn disabled_and_keyless_requests_are_rejected() {
        let (_dir, pipeline) = pipeline().await;
        let completer = FakeCompleter::replying("ok");

        pipeline.reload(ExplainConfig {
            enabled: false,
            ..config()
        });
        assert!(matches!(
            pipeline.explain_selection("fast", None, &completer).await,
            Err(ExplainError::Disabled)
        ));

        pipeline.reload(ExplainConfig {
            api_key: String::new(),
            ..config()
        });
        assert!(matches!(
            pipeline.explain_selection("fast", None, &completer).await,
            Err(ExplainError::MissingApiKey)
        ));
        assert!(matches!(
            pipeline.openrouter_client(),
            Err(ExplainError::MissingApiKey)
        ));

        assert!(completer.prompts.lock().unwrap().is_empty());
        assert_eq!(pipeline.history().count_entries().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn storage_failure_surfaces() {
        let dir = tempfile::tempdir().unwrap();
        // Never initialized.
        let store = HistoryStore::new(dir.path().join(HISTORY_DB_FILE));
        let pipeline = ExplanationPipeline::new(store, config());

        let err = pipeline
            .explain("fast", "", "{word}", &FakeCompleter::replying("ok"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ExplainError::History(HistoryError::StorageUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn selected_text_is_stored_as_given() {
        let (_dir, pipeline) = pipeline().await;
        let completer = FakeCompleter::replying("ok");

        let entry = pipeline
            .explain(" fast\n", "", "{word}", &completer)
            .await
            .unwrap();
        assert_eq!(entry.word, " fast\n");

        let err = pipeline
            .explain("  \t", "", "{word}", &completer)
            .await
            .unwrap_err();
        assert!(matches!(err, ExplainError::EmptySelection));
    }

    #[tokio::test]
    async fn reexplain_previews_without_touching_history() {
        let (_dir, pipeline) = pipeline().await;
        let stored = pipeline
            .explain("fast", "The train is fast.", "{word}", &FakeCompleter::replying("rápido"))
            .await
            .unwrap();

        let completer = FakeCompleter::replying("  <b>veloz</b> **fast**  ");
        let preview = pipeline
            .reexplain(stored.id, "{word}/{sentence}/{word}", &completer)
            .await
            .unwrap();

        assert_eq!(
            completer.prompts.lock().unwrap().as_slice(),
            ["fast/The train is fast./fast"]
        );
        assert_eq!(preview, "&lt;b&gt;veloz&lt;/b&gt; **fast**");
        let unchanged = pipeline.history().get_entry(stored.id).await.unwrap();
        assert_eq!(unchanged, Some(stored));
    }

    #[tokio::test]
    async fn saving_reexplanation_changes_only_explanation() {
        let (_dir, pipeline) = pipeline().await;
        let stored = pipeline
            .explain("fast", "The train is fast.", "{word}", &FakeCompleter::replying("rápido"))
            .await
            .unwrap();

        let preview = pipeline
            .reexplain(stored.id, "{word}", &FakeCompleter::replying("veloz"))
            .await
            .unwrap();
        let saved = pipeline.save_reexplanation(stored.id, &preview).await.unwrap();

        assert_eq!(
            saved,
            HistoryEntry {
                explanation: "veloz".into(),
                ..stored
            }
        );
        assert_eq!(pipeline.history().count_entries().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn reexplain_rejects_blank_prompt_and_unknown_entry() {
        let (_dir, pipeline) = pipeline().await;
        let completer = FakeCompleter::replying("ok");

        assert!(matches!(
            pipeline.reexplain(1, "  ", &completer).await,
            Err(ExplainError::EmptyPrompt)
        ));
        assert!(matches!(
            pipeline.reexplain(42, "{word}", &completer).await,
            Err(ExplainError::History(HistoryError::NotFound(42)))
        ));
        assert!(matches!(
            pipeline.save_reexplanation(42, "x").await,
            Err(ExplainError::History(HistoryError::NotFound(42)))
        ));
        assert!(completer.prompts.lock().unwrap().is_empty());
    }
}
