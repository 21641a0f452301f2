pub mod completion;
pub mod markdown;
pub mod openrouter;
pub mod pipeline;
pub mod prompt;

pub use completion::{Completer, CompletionError, CompletionOptions, CompletionResponse};
pub use openrouter::{sort_models, ModelInfo, OpenRouterClient};
pub use pipeline::{ExplainConfig, ExplainError, ExplanationPipeline};
pub use prompt::{build_prompt, build_prompt_all};
