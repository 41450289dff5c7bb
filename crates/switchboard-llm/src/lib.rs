//! LLM Gateway: provider abstraction, candidate-list model failover, and
//! retry/backoff for the routing engine's AI reply path.

pub mod client;
pub mod error;
pub mod gateway;
pub mod mock_client;
pub mod providers;
pub mod retry;
pub mod switcher;

pub use client::{ChatMessage, CompletionRequest, CompletionResponse, LlmClient, Role};
pub use error::{LlmError, Result};
pub use gateway::{GatewayReply, LlmGateway, FALLBACK_TEXT};
pub use providers::{AnthropicCompatibleClient, OpenAiCompatibleClient};
pub use retry::LlmRetryConfig;
pub use switcher::{ClientFactory, Health, LlmSwitcher};
