//! Outbound messaging abstractions (Telegram is the one adapter today).

pub mod port;
pub mod throttled;
pub mod types;

pub use port::{send_pages, MessagingPort};
pub use throttled::{ThrottleConfig, ThrottledMessenger};
pub use types::{IncomingCommand, MessagingCapabilities};
