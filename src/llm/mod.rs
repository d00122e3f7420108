pub mod message;
pub mod provider;
pub mod providers;
pub mod registry;
pub mod retry;
pub mod stream;
pub mod transform;
pub mod transport;
pub mod types;

pub use message::{ContentPart, Conversation, ImageData, Role, Turn};
pub use provider::{ApiHandler, Gateway, build_api_handler};
pub use retry::{RetryConfig, RetryExecutor, RetryNotice, RetryObserver};
pub use stream::{ApiStream, CompletedResponse, UsageAccumulator, collect_response};
pub use transport::{HttpRequest, ReqwestTransport, Transport, TransportConfig};
pub use types::*;
