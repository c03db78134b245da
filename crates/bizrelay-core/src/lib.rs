//! # bizrelay-core
//!
//! Service logic shared by the bizrelay HTTP front end.
//!
//! This crate provides:
//! - Process configuration loaded from the environment
//! - Send-email request validation
//! - Message composition and delivery through an SMTP relay

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod config;
pub mod email;
mod error;

pub use config::{Config, Relay, SmtpSettings};
pub use email::{
    DeliveryError, DeliveryReport, DeliveryStep, EmailMessage, MailTransport, SendEmailRequest,
    SmtpTransport, ValidationError, compose,
};
pub use error::{Error, Result};
