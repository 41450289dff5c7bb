mod anthropic_compatible;
mod openai_compatible;

pub use anthropic_compatible::AnthropicCompatibleClient;
pub use openai_compatible::OpenAiCompatibleClient;
