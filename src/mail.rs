//! Outbound SMTP mail.

use anyhow::Context;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{error, info};

use crate::config::SmtpConfig;

#[derive(Clone)]
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl Mailer {
    /// Without a username the relay is assumed to be a local catcher
    /// (plain SMTP, no auth); otherwise STARTTLS with credentials.
    pub fn new(cfg: &SmtpConfig) -> anyhow::Result<Self> {
        let transport = if cfg.username.is_empty() {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&cfg.host)
                .port(cfg.port)
                .build()
        } else {
            let creds = Credentials::new(cfg.username.clone(), cfg.password.clone());
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.host)
                .context("smtp relay")?
                .credentials(creds)
                .port(cfg.port)
                .build()
        };
        Ok(Self {
            transport,
            from: sender(cfg)?,
        })
    }

    pub fn build_message(&self, to: &str, subject: &str, body: &str, html: bool) -> anyhow::Result<Message> {
        let to: Mailbox = to.parse().context("invalid recipient address")?;
        let content_type = if html {
            ContentType::TEXT_HTML
        } else {
            ContentType::TEXT_PLAIN
        };
        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(content_type)
            .body(body.to_string())
            .context("build message")
    }

    pub async fn send(&self, message: Message) -> anyhow::Result<()> {
        let recipients: Vec<String> = message
            .envelope()
            .to()
            .iter()
            .map(|a| a.to_string())
            .collect();
        self.transport.send(message).await.map_err(|e| {
            error!(error = %e, ?recipients, "failed to send email");
            anyhow::Error::new(e).context("send email")
        })?;
        info!(?recipients, "email sent");
        Ok(())
    }

    pub async fn send_simple(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        self.send(self.build_message(to, subject, body, false)?).await
    }

    pub async fn send_html(&self, to: &str, subject: &str, html: &str) -> anyhow::Result<()> {
        self.send(self.build_message(to, subject, html, true)?).await
    }
}

fn sender(cfg: &SmtpConfig) -> anyhow::Result<Mailbox> {
    let address: Address = cfg.from.parse().context("invalid SMTP_FROM address")?;
    let name = (!cfg.from_name.is_empty()).then(|| cfg.from_name.clone());
    Ok(Mailbox::new(name, address))
}
