/// Notification side effects
///
/// - [`events`]: workflow events and the channel carrying them
/// - [`dispatcher`]: recipient rules, delivery and inbox operations
/// - [`mailer`]: outbound email collaborator

pub mod dispatcher;
pub mod events;
pub mod mailer;

pub use dispatcher::NotificationDispatcher;
pub use events::{EventReceiver, EventSink, WorkflowEvent};
pub use mailer::{MailError, Mailer};
