pub mod dispatch;
pub mod mailer;
