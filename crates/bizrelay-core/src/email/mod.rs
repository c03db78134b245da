//! Outbound email: request validation, composition and relay delivery.

mod compose;
mod request;
mod transport;

pub use compose::compose;
pub use request::{EmailMessage, SendEmailRequest, ValidationError};
pub use transport::{DeliveryError, DeliveryReport, DeliveryStep, MailTransport, SmtpTransport};
