pub mod dispatcher;
pub mod error;
pub mod expo;
pub mod service;

pub use dispatcher::{DispatchReport, PushConfig, PushDispatcher};
pub use error::{NotifyError, Result};
pub use expo::{DEFAULT_PUSH_URL, is_valid_push_token};
pub use service::{CreateOutcome, NotificationService, notification_body};
