use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::LevelFilter;

use word_tracker_lib::{
    commands,
    db::HistoryEntryPatch,
    default_data_dir,
    explanation::markdown::{highlight_word, render_inline},
    utils::logging::init_logging,
    AppState, DATA_DIR_ENV,
};

#[derive(Parser, Debug)]
#[command(name = "word-tracker")]
#[command(about = "Explain selected words in context and keep a history of explanations")]
#[command(version)]
struct Cli {
    /// Directory holding the history database and settings
    #[arg(long, global = true, env = DATA_DIR_ENV)]
    data_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Explain a word, optionally within its sentence
    Explain(ExplainArgs),
    /// Print the sentence around a selection in a text file
    Context {
        /// Plain-text page; blank lines separate paragraphs
        file: PathBuf,
        /// Selected text to locate
        selected: String,
    },
    /// Browse and edit stored explanations
    #[command(subcommand)]
    History(HistoryCommand),
    /// Write the whole history to a dated JSON file
    Export {
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
    /// Show or change settings
    #[command(subcommand)]
    Settings(SettingsCommand),
    /// List available models, recommended first, and cache them
    Models,
}

#[derive(Args, Debug)]
struct ExplainArgs {
    word: String,
    /// Sentence the word appeared in
    #[arg(long, conflicts_with = "context_file")]
    sentence: Option<String>,
    /// Derive the sentence from this plain-text file
    #[arg(long)]
    context_file: Option<PathBuf>,
    /// Print the explanation as HTML
    #[arg(long)]
    html: bool,
}

#[derive(Subcommand, Debug)]
enum HistoryCommand {
    List {
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        page: usize,
        /// Oldest first
        #[arg(long)]
        ascending: bool,
    },
    Show {
        id: i64,
    },
    Edit {
        id: i64,
        #[arg(long)]
        word: Option<String>,
        #[arg(long)]
        sentence: Option<String>,
        #[arg(long)]
        explanation: Option<String>,
    },
    Delete {
        id: i64,
    },
    /// Ask again with a custom prompt and show the answer
    Reexplain {
        id: i64,
        /// Template with {word} and {sentence}; every occurrence is filled
        #[arg(long)]
        prompt: String,
        /// Replace the stored explanation with the answer
        #[arg(long)]
        save: bool,
    },
}

#[derive(Subcommand, Debug)]
enum SettingsCommand {
    Show,
    Set {
        #[arg(long, env = "OPENROUTER_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
        #[arg(long)]
        model: Option<String>,
        /// Prompt template with {word} and {sentence} placeholders
        #[arg(long)]
        prompt: Option<String>,
        #[arg(long)]
        enabled: Option<bool>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    });

    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };

    if let Command::Context { file, selected } = &cli.command {
        let page = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let response = commands::get_selection_context(&page, selected);
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    let state = AppState::bootstrap(&data_dir).await?;
    run(&state, cli.command).await
}

async fn run(state: &AppState, command: Command) -> Result<()> {
    match command {
        Command::Explain(args) => explain(state, args).await,
        Command::Context { .. } => Ok(()),
        Command::History(history) => run_history(state, history).await,
        Command::Export { dir } => {
            let path = commands::export_history(state, &dir)
                .await
                .map_err(|e| anyhow!(e))?;
            println!("{}", path.display());
            Ok(())
        }
        Command::Settings(SettingsCommand::Show) => {
            let mut settings = commands::get_settings(state);
            if !settings.openrouter_api_key.is_empty() {
                settings.openrouter_api_key = "********".into();
            }
            settings.cached_models.clear();
            println!("{}", serde_json::to_string_pretty(&settings)?);
            Ok(())
        }
        Command::Settings(SettingsCommand::Set {
            api_key,
            model,
            prompt,
            enabled,
        }) => {
            let mut settings = commands::get_settings(state);
            if let Some(api_key) = api_key {
                settings.openrouter_api_key = api_key.trim().to_string();
            }
            if let Some(model) = model {
                settings.model = model;
            }
            if let Some(prompt) = prompt {
                settings.prompt = prompt;
            }
            if let Some(enabled) = enabled {
                settings.is_enabled = enabled;
            }
            commands::set_settings(state, settings).map_err(|e| anyhow!(e))?;
            println!("Settings saved to {}", state.settings.path().display());
            Ok(())
        }
        Command::Models => {
            let current = commands::get_settings(state).model;
            for model in commands::fetch_models(state).await.map_err(|e| anyhow!(e))? {
                let marker = if model.id == current { "*" } else { " " };
                let star = if model.is_recommended() { " (recommended)" } else { "" };
                println!("{marker} {}{star}", model.id);
            }
            Ok(())
        }
    }
}

async fn explain(state: &AppState, args: ExplainArgs) -> Result<()> {
    let sentence = match (&args.sentence, &args.context_file) {
        (Some(sentence), _) => Some(sentence.clone()),
        (None, Some(file)) => {
            let page = std::fs::read_to_string(file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            commands::get_selection_context(&page, &args.word).sentence
        }
        (None, None) => None,
    };

    if let Some(sentence) = &sentence {
        if args.html {
            println!("{}", highlight_word(sentence, &args.word));
        } else {
            println!("{sentence}");
        }
    }

    let shown = commands::explain_selection(state, &args.word, sentence.as_deref()).await;
    if shown.is_error() {
        bail!("{}", shown.explanation);
    }
    if args.html {
        println!("{}", render_inline(&shown.explanation));
    } else {
        println!("{}", shown.explanation);
    }
    Ok(())
}

async fn run_history(state: &AppState, command: HistoryCommand) -> Result<()> {
    match command {
        HistoryCommand::List {
            limit,
            page,
            ascending,
        } => {
            let entries = if ascending {
                state
                    .history
                    .get_entries_paginated(limit, page.saturating_mul(limit), false)
                    .await?
            } else {
                commands::get_history_paginated(state, page, limit)
                    .await
                    .map_err(|e| anyhow!(e))?
            };
            let total = state.history.count_entries().await?;
            for entry in &entries {
                let when = entry
                    .created_at()
                    .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                println!("{:>5}  {when}  {}  {}", entry.id, entry.word, entry.headline());
            }
            println!("{} of {total} entries", entries.len());
        }
        HistoryCommand::Show { id } => {
            let entry = commands::get_history_entry(state, id)
                .await
                .map_err(|e| anyhow!(e))?;
            println!("{}", serde_json::to_string_pretty(&entry)?);
        }
        HistoryCommand::Edit {
            id,
            word,
            sentence,
            explanation,
        } => {
            let patch = HistoryEntryPatch {
                word,
                sentence,
                explanation,
                timestamp: None,
            };
            if patch.is_empty() {
                bail!("nothing to change; pass --word, --sentence or --explanation");
            }
            let entry = commands::update_history_entry(state, id, patch)
                .await
                .map_err(|e| anyhow!(e))?;
            println!("Updated entry {}", entry.id);
        }
        HistoryCommand::Reexplain { id, prompt, save } => {
            let client = state
                .pipeline
                .openrouter_client()
                .map_err(|e| anyhow!(e))?;
            let preview = commands::reexplain_entry(state, id, &prompt, &client)
                .await
                .map_err(|e| anyhow!(e))?;
            println!("{preview}");
            if save {
                commands::save_reexplanation(state, id, &preview)
                    .await
                    .map_err(|e| anyhow!(e))?;
                println!("Saved to entry {id}");
            }
        }
        HistoryCommand::Delete { id } => {
            commands::delete_history_entry(state, id)
                .await
                .map_err(|e| anyhow!(e))?;
            println!("Deleted entry {id}");
        }
    }
    Ok(())
}
