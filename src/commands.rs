use std::path::{Path, PathBuf};

use crate::{
    db::{HistoryEntry, HistoryEntryPatch},
    explanation::{
        openrouter::{sort_models, ModelInfo, OpenRouterClient},
        Completer, ExplainError,
    },
    extraction::{extract_sentence, Document, Selection},
    log_info,
    protocol::{SelectionContextResponse, ShowExplanation},
    settings::UserSettings,
    AppState,
};

const ENABLE_LOGS: bool = true;

/// Sentence around the first occurrence of `selected_text` in `page_text`.
pub fn get_selection_context(page_text: &str, selected_text: &str) -> SelectionContextResponse {
    let document = Document::from_plain_text(page_text);
    let sentence = document
        .find_text(selected_text)
        .and_then(|range| extract_sentence(&document, &Selection::from_range(range)));
    SelectionContextResponse { sentence }
}

/// Explain through the configured OpenRouter model. Failures come back as an
/// error message rather than an `Err`.
pub async fn explain_selection(
    state: &AppState,
    selected_text: &str,
    sentence: Option<&str>,
) -> ShowExplanation {
    if !state.pipeline.config().enabled {
        return ShowExplanation::error(ExplainError::Disabled);
    }
    match state.pipeline.openrouter_client() {
        Ok(client) => explain_with(state, &client, selected_text, sentence).await,
        Err(err) => ShowExplanation::error(err),
    }
}

pub async fn explain_with(
    state: &AppState,
    completer: &dyn Completer,
    selected_text: &str,
    sentence: Option<&str>,
) -> ShowExplanation {
    match state
        .pipeline
        .explain_selection(selected_text, sentence, completer)
        .await
    {
        Ok(entry) => ShowExplanation::success(entry.explanation),
        Err(err) => ShowExplanation::error(err),
    }
}

pub async fn get_history(
    state: &AppState,
    limit: Option<usize>,
    sort_descending: Option<bool>,
) -> Result<Vec<HistoryEntry>, String> {
    state
        .history
        .get_entries(limit.unwrap_or(usize::MAX), sort_descending.unwrap_or(true))
        .await
        .map_err(|e| e.to_string())
}

/// Newest-first page `page` (zero-based) of `page_size` entries.
pub async fn get_history_paginated(
    state: &AppState,
    page: usize,
    page_size: usize,
) -> Result<Vec<HistoryEntry>, String> {
    let offset = page.saturating_mul(page_size);
    state
        .history
        .get_entries_paginated(page_size, offset, true)
        .await
        .map_err(|e| e.to_string())
}

pub async fn get_history_entry(state: &AppState, id: i64) -> Result<HistoryEntry, String> {
    state
        .history
        .get_entry(id)
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("no history entry with id {id}"))
}

pub async fn update_history_entry(
    state: &AppState,
    id: i64,
    patch: HistoryEntryPatch,
) -> Result<HistoryEntry, String> {
    state
        .history
        .update_entry(id, patch)
        .await
        .map_err(|e| e.to_string())
}

pub async fn delete_history_entry(state: &AppState, id: i64) -> Result<(), String> {
    state
        .history
        .delete_entry(id)
        .await
        .map_err(|e| e.to_string())
}

/// Preview a new explanation for entry `id`; the store is not written.
pub async fn reexplain_entry(
    state: &AppState,
    id: i64,
    prompt_template: &str,
    completer: &dyn Completer,
) -> Result<String, String> {
    state
        .pipeline
        .reexplain(id, prompt_template, completer)
        .await
        .map_err(|e| e.to_string())
}

pub async fn save_reexplanation(
    state: &AppState,
    id: i64,
    explanation: &str,
) -> Result<HistoryEntry, String> {
    state
        .pipeline
        .save_reexplanation(id, explanation)
        .await
        .map_err(|e| e.to_string())
}

pub async fn export_history(state: &AppState, dir: &Path) -> Result<PathBuf, String> {
    state
        .history
        .export_to_file(dir)
        .await
        .map_err(|e| e.to_string())
}

pub fn get_settings(state: &AppState) -> UserSettings {
    state.settings.get()
}

pub fn set_settings(state: &AppState, settings: UserSettings) -> Result<(), String> {
    state.settings.update(settings).map_err(|e| e.to_string())
}

/// Fetch the provider's models, sort them for display and cache the result.
pub async fn fetch_models(state: &AppState) -> Result<Vec<ModelInfo>, String> {
    let client = state
        .pipeline
        .openrouter_client()
        .map_err(|e| e.to_string())?;
    refresh_models(state, &client).await
}

pub async fn refresh_models(
    state: &AppState,
    client: &OpenRouterClient,
) -> Result<Vec<ModelInfo>, String> {
    let mut models = client.list_models().await.map_err(|e| e.to_string())?;
    sort_models(&mut models);

    let cached = models.clone();
    state
        .settings
        .modify(|settings| settings.cached_models = cached)
        .map_err(|e| e.to_string())?;
    log_info!("Cached {} models", models.len());
    Ok(models)
}
