//! Delivery tests against a scripted relay on the loopback interface.

#![allow(clippy::unwrap_used, missing_docs)]

use bizrelay_core::{
    DeliveryStep, Error, MailTransport, SendEmailRequest, SmtpSettings, SmtpTransport,
};
use bizrelay_smtp::Security;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_test::{assert_err, assert_ok};

/// How the scripted relay misbehaves.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Script {
    Accept,
    RejectRecipient,
    StallOnRecipient,
    NoAuth,
    LoginOnly,
    CramMd5Only,
    StartTls,
}

#[derive(Debug, Default)]
struct Transcript {
    commands: Vec<String>,
    data: String,
}

async fn spawn_relay(script: Script) -> (u16, JoinHandle<Transcript>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let (reader, mut writer) = socket.into_split();
        let mut reader = BufReader::new(reader);
        let mut transcript = Transcript::default();

        writer.write_all(b"220 relay.test ESMTP\r\n").await.unwrap();

        let mut line = String::new();
        loop {
            line.clear();
            if reader.read_line(&mut line).await.unwrap() == 0 {
                break;
            }
            let command = line.trim_end().to_string();
            transcript.commands.push(command.clone());
            let verb = command.to_ascii_uppercase();

            let reply: &[u8] = if verb.starts_with("EHLO") {
                match script {
                    Script::NoAuth => b"250-relay.test\r\n250 SIZE 1000000\r\n",
                    Script::LoginOnly => b"250-relay.test\r\n250 AUTH LOGIN\r\n",
                    Script::CramMd5Only => b"250-relay.test\r\n250 AUTH CRAM-MD5\r\n",
                    Script::StartTls => b"250-relay.test\r\n250 STARTTLS\r\n",
                    _ => b"250-relay.test\r\n250-SIZE 1000000\r\n250 AUTH PLAIN LOGIN\r\n",
                }
            } else if verb == "STARTTLS" {
                // Hang up instead of negotiating: the client must fail the handshake.
                writer.write_all(b"220 2.0.0 Ready to start TLS\r\n").await.unwrap();
                break;
            } else if verb.starts_with("AUTH PLAIN") {
                b"235 2.7.0 Authentication successful\r\n"
            } else if verb == "AUTH LOGIN" {
                for prompt in [&b"334 VXNlcm5hbWU6\r\n"[..], b"334 UGFzc3dvcmQ6\r\n"] {
                    writer.write_all(prompt).await.unwrap();
                    line.clear();
                    reader.read_line(&mut line).await.unwrap();
                    transcript.commands.push(line.trim_end().to_string());
                }
                b"235 2.7.0 Authentication successful\r\n"
            } else if verb.starts_with("MAIL FROM") {
                b"250 2.1.0 Ok\r\n"
            } else if verb.starts_with("RCPT TO") {
                match script {
                    Script::StallOnRecipient => {
                        tokio::time::sleep(Duration::from_secs(30)).await;
                        break;
                    }
                    Script::RejectRecipient if command.contains("unknown@") => {
                        b"550 5.1.1 No such user\r\n"
                    }
                    _ => b"250 2.1.5 Ok\r\n",
                }
            } else if verb == "DATA" {
                writer.write_all(b"354 End data with <CR><LF>.<CR><LF>\r\n").await.unwrap();
                loop {
                    line.clear();
                    if reader.read_line(&mut line).await.unwrap() == 0 {
                        return transcript;
                    }
                    if line == ".\r\n" {
                        break;
                    }
                    transcript.data.push_str(&line);
                }
                b"250 2.0.0 Queued\r\n"
            } else if verb == "QUIT" {
                writer.write_all(b"221 2.0.0 Bye\r\n").await.unwrap();
                break;
            } else {
                b"502 5.5.2 Command not recognized\r\n"
            };
            writer.write_all(reply).await.unwrap();
        }

        transcript
    });

    (port, handle)
}

fn settings(port: u16) -> SmtpSettings {
    let mut settings = SmtpSettings::new("127.0.0.1", port);
    settings.security = Security::None;
    settings.username = Some("relay-user".into());
    settings.password = Some("relay-secret".into());
    settings.from = Some("contact@example.com".into());
    settings.helo_name = "bizrelay.test".into();
    settings.timeout = Duration::from_secs(5);
    settings
}

fn request(to: &str) -> SendEmailRequest {
    SendEmailRequest {
        to: Some(to.into()),
        subject: Some("Votre devis".into()),
        body: Some("Bonjour,\nvoici le devis.".into()),
        attachment_name: Some("devis.pdf".into()),
        attachment_data: Some("JVBERi0xLjQK".into()),
    }
}

#[tokio::test]
async fn delivers_to_every_recipient() {
    let (port, relay) = spawn_relay(Script::Accept).await;
    let transport = SmtpTransport::new(settings(port));
    let message = request("a@example.com, b@example.org").validate().unwrap();

    let report = assert_ok!(transport.send(&message).await);
    assert_eq!(report.recipients, 2);

    let transcript = relay.await.unwrap();
    let verbs: Vec<&str> = transcript
        .commands
        .iter()
        .map(|c| c.split([' ', ':']).next().unwrap())
        .collect();
    assert_eq!(verbs, ["EHLO", "AUTH", "MAIL", "RCPT", "RCPT", "DATA", "QUIT"]);
    assert_eq!(transcript.commands[0], "EHLO bizrelay.test");
    assert!(transcript.commands[2].starts_with("MAIL FROM:<contact@example.com>"));
    assert_eq!(transcript.commands[3], "RCPT TO:<a@example.com>");
    assert_eq!(transcript.commands[4], "RCPT TO:<b@example.org>");

    assert!(transcript.data.contains("From: contact@example.com\r\n"));
    assert!(transcript.data.contains("To: a@example.com, b@example.org\r\n"));
    assert!(transcript.data.contains("Subject: Votre devis\r\n"));
    assert!(transcript.data.contains("filename=\"devis.pdf\""));
}

#[tokio::test]
async fn rejected_recipient_fails_whole_delivery() {
    let (port, relay) = spawn_relay(Script::RejectRecipient).await;
    let transport = SmtpTransport::new(settings(port));
    let message = request("a@example.com, unknown@example.com").validate().unwrap();

    match assert_err!(transport.send(&message).await) {
        Error::Delivery(e) => {
            assert_eq!(e.step, DeliveryStep::RcptTo);
            assert!(!e.is_transport());
            assert!(matches!(e.source, bizrelay_smtp::Error::SmtpError { code: 550, .. }));
        }
        other => panic!("expected delivery error, got {other:?}"),
    }

    let transcript = relay.await.unwrap();
    assert!(!transcript.commands.iter().any(|c| c == "DATA"));
}

#[tokio::test]
async fn stalled_relay_times_out_during_current_step() {
    let (port, _relay) = spawn_relay(Script::StallOnRecipient).await;
    let mut settings = settings(port);
    settings.timeout = Duration::from_millis(300);
    let transport = SmtpTransport::new(settings);
    let message = request("a@example.com").validate().unwrap();

    match assert_err!(transport.send(&message).await) {
        Error::Delivery(e) => {
            assert_eq!(e.step, DeliveryStep::RcptTo);
            assert!(e.is_transport());
            match e.source {
                bizrelay_smtp::Error::Io(io) => {
                    assert_eq!(io.kind(), std::io::ErrorKind::TimedOut);
                }
                other => panic!("expected timeout, got {other:?}"),
            }
        }
        other => panic!("expected delivery error, got {other:?}"),
    }
}

#[tokio::test]
async fn relay_without_auth_is_used_unauthenticated() {
    let (port, relay) = spawn_relay(Script::NoAuth).await;
    let transport = SmtpTransport::new(settings(port));
    let message = request("a@example.com").validate().unwrap();

    assert_ok!(transport.send(&message).await);

    let transcript = relay.await.unwrap();
    assert!(!transcript.commands.iter().any(|c| c.starts_with("AUTH")));
}

#[tokio::test]
async fn login_is_used_when_plain_is_not_offered() {
    let (port, relay) = spawn_relay(Script::LoginOnly).await;
    let transport = SmtpTransport::new(settings(port));
    let message = request("a@example.com").validate().unwrap();

    assert_ok!(transport.send(&message).await);

    let transcript = relay.await.unwrap();
    assert_eq!(transcript.commands[1], "AUTH LOGIN");
    // base64("relay-user"), base64("relay-secret")
    assert_eq!(transcript.commands[2], "cmVsYXktdXNlcg==");
    assert_eq!(transcript.commands[3], "cmVsYXktc2VjcmV0");
    assert!(transcript.commands[4].starts_with("MAIL FROM:"));
}

#[tokio::test]
async fn unsupported_auth_mechanism_is_skipped() {
    let (port, relay) = spawn_relay(Script::CramMd5Only).await;
    let transport = SmtpTransport::new(settings(port));
    let message = request("a@example.com").validate().unwrap();

    assert_ok!(transport.send(&message).await);

    let transcript = relay.await.unwrap();
    assert!(!transcript.commands.iter().any(|c| c.starts_with("AUTH")));
    assert!(transcript.commands.iter().any(|c| c == "DATA"));
}

#[tokio::test]
async fn failed_starttls_handshake_is_a_connect_error() {
    let (port, relay) = spawn_relay(Script::StartTls).await;
    let mut settings = settings(port);
    settings.host = Some("localhost".into());
    settings.security = Security::StartTls;
    let transport = SmtpTransport::new(settings);
    let message = request("a@example.com").validate().unwrap();

    match assert_err!(transport.send(&message).await) {
        Error::Delivery(e) => {
            assert_eq!(e.step, DeliveryStep::Connect);
            assert!(e.is_transport(), "unexpected source {:?}", e.source);
        }
        other => panic!("expected delivery error, got {other:?}"),
    }

    let transcript = relay.await.unwrap();
    assert_eq!(transcript.commands, ["EHLO bizrelay.test", "STARTTLS"]);
}

#[tokio::test]
async fn implicit_tls_against_plaintext_relay_is_a_connect_error() {
    // The relay greets in plaintext; the client expects a TLS handshake.
    let (port, _relay) = spawn_relay(Script::Accept).await;
    let mut settings = settings(port);
    settings.host = Some("localhost".into());
    settings.security = Security::Implicit;
    let transport = SmtpTransport::new(settings);
    let message = request("a@example.com").validate().unwrap();

    match assert_err!(transport.send(&message).await) {
        Error::Delivery(e) => {
            assert_eq!(e.step, DeliveryStep::Connect);
            assert!(e.is_transport(), "unexpected source {:?}", e.source);
        }
        other => panic!("expected delivery error, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_relay_fails_at_connect() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let transport = SmtpTransport::new(settings(port));
    let message = request("a@example.com").validate().unwrap();

    match assert_err!(transport.send(&message).await) {
        Error::Delivery(e) => {
            assert_eq!(e.step, DeliveryStep::Connect);
            assert!(e.is_transport());
        }
        other => panic!("expected delivery error, got {other:?}"),
    }
}

#[tokio::test]
async fn incomplete_relay_settings_are_config_errors() {
    let mut settings = settings(2525);
    settings.security = Security::Implicit;
    settings.password = None;
    let transport = SmtpTransport::new(settings);
    let message = request("a@example.com").validate().unwrap();

    match assert_err!(transport.send(&message).await) {
        Error::Config(reason) => assert!(reason.contains("SMTP_PASSWORD")),
        other => panic!("expected config error, got {other:?}"),
    }
}
