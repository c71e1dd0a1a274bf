//! Webhook Endpoint
//!
//! Receives update deliveries from the Bot API, authenticates them with the
//! shared secret header and forwards decoded payloads to an
//! [`UpdateProcessor`].
//!
//! | Method | Path       | Response                                  |
//! |--------|------------|-------------------------------------------|
//! | POST   | `/webhook` | 200 accepted, 403 bad secret, 500 bad JSON |

pub mod endpoint;
pub mod processor;

pub use endpoint::{
    webhook_handler, webhook_router, HandlerResult, InboundRequest, WebhookEndpoint,
    MAX_UPDATE_BYTES,
};
pub use processor::{LoggingProcessor, UpdateProcessor};
