pub mod models;
pub mod services;

pub use models::*;
pub use services::dispatch::NotificationDispatcher;
pub use services::mailer::{confirmation_email, Mailer};
