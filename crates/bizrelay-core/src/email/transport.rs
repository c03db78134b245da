//! Relay delivery.
//!
//! Session establishment is the only part that depends on the transport
//! strategy ([`Security`]); authentication and the envelope are shared.

use super::compose::compose;
use super::request::EmailMessage;
use crate::config::{Relay, SmtpSettings};
use crate::error::{Error, Result};
use async_trait::async_trait;
use bizrelay_smtp::connection::establish;
use bizrelay_smtp::{
    Address, AuthMechanism, Client, Connected, Security, SmtpConnection, TransactionReady,
};
use chrono::Utc;
use std::fmt;
use std::io;
use std::time::Duration;
use tokio::time::{Instant, timeout, timeout_at};
use tracing::{info, warn};

/// Upper bound for the QUIT exchange once the message has been accepted.
const QUIT_TIMEOUT: Duration = Duration::from_secs(2);

/// SMTP step during which a delivery failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStep {
    /// Dial, greeting, EHLO and TLS negotiation.
    Connect,
    /// AUTH exchange.
    Authenticate,
    /// MAIL FROM.
    MailFrom,
    /// RCPT TO (any recipient).
    RcptTo,
    /// DATA, message transfer and final acceptance.
    Data,
}

impl fmt::Display for DeliveryStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connect => "connect",
            Self::Authenticate => "authenticate",
            Self::MailFrom => "mail_from",
            Self::RcptTo => "rcpt_to",
            Self::Data => "data",
        })
    }
}

/// Delivery failure tagged with the step in progress.
#[derive(Debug, thiserror::Error)]
#[error("delivery failed during {step}: {source}")]
pub struct DeliveryError {
    /// Step in progress when the failure happened.
    pub step: DeliveryStep,
    /// Underlying protocol or I/O failure.
    #[source]
    pub source: bizrelay_smtp::Error,
}

impl DeliveryError {
    /// Returns true if the relay could not be reached or timed out, as
    /// opposed to rejecting the message.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(
            self.source,
            bizrelay_smtp::Error::Io(_)
                | bizrelay_smtp::Error::Tls(_)
                | bizrelay_smtp::Error::ConnectionClosed
        )
    }

    /// Returns true if sending the same message later may succeed: the relay
    /// was unreachable or answered with a 4xx.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.is_transport() || self.source.is_transient()
    }
}

/// Summary of an accepted delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Number of recipients accepted by the relay.
    pub recipients: usize,
}

/// Sends validated messages.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Composes and delivers `message`.
    async fn send(&self, message: &EmailMessage) -> Result<DeliveryReport>;
}

/// [`MailTransport`] backed by an SMTP relay.
#[derive(Debug, Clone)]
pub struct SmtpTransport {
    settings: SmtpSettings,
}

impl SmtpTransport {
    /// Creates a transport for the configured relay.
    #[must_use]
    pub const fn new(settings: SmtpSettings) -> Self {
        Self { settings }
    }

    /// Delivers already-composed bytes to every recipient.
    ///
    /// The whole session (connect to final reply) is bounded by the relay
    /// timeout. Any rejected recipient fails the whole delivery.
    ///
    /// # Errors
    ///
    /// Returns a [`DeliveryError`] tagged with the step that failed or was
    /// in progress when the deadline expired.
    pub async fn deliver(
        relay: &Relay<'_>,
        recipients: &[Address],
        message: &[u8],
    ) -> std::result::Result<(), DeliveryError> {
        let sender = Address::new(relay.from).map_err(|source| DeliveryError {
            step: DeliveryStep::MailFrom,
            source,
        })?;

        let deadline = Instant::now() + relay.timeout;
        let mut step = DeliveryStep::Connect;

        let outcome = timeout_at(
            deadline,
            run_session(relay, &mut step, sender, recipients, message),
        )
        .await;

        let client = match outcome {
            Ok(Ok(client)) => client,
            Ok(Err(source)) => return Err(DeliveryError { step, source }),
            Err(_) => {
                return Err(DeliveryError {
                    step,
                    source: bizrelay_smtp::Error::Io(io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!("relay did not answer within {:?}", relay.timeout),
                    )),
                });
            }
        };

        // The message is accepted at this point; QUIT problems are not delivery failures.
        match timeout(QUIT_TIMEOUT, client.quit()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "QUIT failed after message was accepted"),
            Err(_) => warn!("QUIT timed out after message was accepted"),
        }

        Ok(())
    }
}

#[async_trait]
impl MailTransport for SmtpTransport {
    async fn send(&self, message: &EmailMessage) -> Result<DeliveryReport> {
        let relay = self.settings.relay()?;
        let bytes = compose(message, relay.from, Utc::now())?;

        Self::deliver(&relay, message.recipients(), &bytes)
            .await
            .map_err(|e| {
                warn!(
                    step = %e.step,
                    error = %e.source,
                    host = relay.host,
                    retryable = e.is_retryable(),
                    permanent = e.source.is_permanent(),
                    "delivery failed"
                );
                Error::from(e)
            })?;

        info!(
            recipients = message.recipients().len(),
            bytes = bytes.len(),
            host = relay.host,
            security = %relay.security,
            "message delivered"
        );
        Ok(DeliveryReport {
            recipients: message.recipients().len(),
        })
    }
}

async fn run_session(
    relay: &Relay<'_>,
    step: &mut DeliveryStep,
    sender: Address,
    recipients: &[Address],
    message: &[u8],
) -> bizrelay_smtp::Result<Client<Connected>> {
    *step = DeliveryStep::Connect;
    let client = establish(relay.host, relay.port, relay.security, relay.helo_name).await?;

    let Some((user, password)) = relay.credentials else {
        return envelope(client, step, sender, recipients, message).await;
    };

    if !client.server_info().supports_auth() {
        if relay.security != Security::None {
            warn!(host = relay.host, "relay does not advertise AUTH; sending unauthenticated");
        }
        return envelope(client, step, sender, recipients, message).await;
    }

    let mechanisms = client.server_info().auth_mechanisms();
    if !mechanisms.contains(&AuthMechanism::Plain) && !mechanisms.contains(&AuthMechanism::Login) {
        warn!(?mechanisms, "no supported AUTH mechanism; sending unauthenticated");
        return envelope(client, step, sender, recipients, message).await;
    }

    *step = DeliveryStep::Authenticate;
    let client = client.authenticate(user, password).await?;
    envelope(client, step, sender, recipients, message).await
}

async fn envelope<S: TransactionReady>(
    client: Client<S>,
    step: &mut DeliveryStep,
    sender: Address,
    recipients: &[Address],
    message: &[u8],
) -> bizrelay_smtp::Result<Client<Connected>> {
    let Some((first, rest)) = recipients.split_first() else {
        return Err(bizrelay_smtp::Error::InvalidAddress(
            "no recipients".to_string(),
        ));
    };

    *step = DeliveryStep::MailFrom;
    let client = client.mail_from(sender, Some(message.len())).await?;

    *step = DeliveryStep::RcptTo;
    let mut client = client.rcpt_to(first.clone()).await?;
    for recipient in rest {
        client = client.rcpt_to(recipient.clone()).await?;
    }

    *step = DeliveryStep::Data;
    client.data().await?.send_message(message).await
}
