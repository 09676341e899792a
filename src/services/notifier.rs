// src/services/notifier.rs

//! Report formatting and delivery to the messaging sink.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Local};
use reqwest::Client;
use serde::Serialize;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Locale, PollResult, Settings, TelegramConfig};
use crate::utils::html::{escape_attr, escape_text};
use crate::utils::http;

/// Destination for formatted text messages.
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn send(&self, text: &str) -> Result<()>;
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
}

/// Bot API `sendMessage` sink.
pub struct TelegramSink {
    client: Client,
    endpoint: Url,
    chat_id: String,
}

impl TelegramSink {
    /// Create a sink from the bot API config and the user's credentials.
    pub fn new(config: &TelegramConfig, settings: &Settings) -> Result<Self> {
        let client = http::create_sink_client(config)?;
        Self::with_client(
            client,
            &config.api_base,
            &settings.telegram_token,
            &settings.telegram_chat_id,
        )
    }

    pub fn with_client(client: Client, api_base: &str, token: &str, chat_id: &str) -> Result<Self> {
        // The token contains ':' so it cannot go through Url::join as a
        // relative reference.
        let endpoint = Url::parse(&format!(
            "{}/bot{}/sendMessage",
            api_base.trim_end_matches('/'),
            token.trim()
        ))?;
        Ok(Self {
            client,
            endpoint,
            chat_id: chat_id.trim().to_string(),
        })
    }
}

#[async_trait]
impl MessageSink for TelegramSink {
    async fn send(&self, text: &str) -> Result<()> {
        let payload = SendMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode: "HTML",
        };
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&payload)
            .send()
            .await
            .map_err(AppError::notify)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::notify(format!("{status}: {body}")));
        }
        Ok(())
    }
}

/// Builds reports from poll results and decides whether to send them.
pub struct Notifier {
    sink: Arc<dyn MessageSink>,
    locale: Locale,
    last_sent: Mutex<Option<DateTime<Local>>>,
}

impl Notifier {
    pub fn new(sink: Arc<dyn MessageSink>, locale: Locale) -> Self {
        Self {
            sink,
            locale,
            last_sent: Mutex::new(None),
        }
    }

    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    /// Local time of the last successful delivery.
    pub fn last_sent(&self) -> Option<DateTime<Local>> {
        *self.last_sent.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Send policy: appointments always go out, an empty list only when the
    /// user asked for every update.
    pub fn should_send(result: &PollResult, settings: &Settings) -> bool {
        result.is_error() || !result.appointments().is_empty() || settings.send_all_updates
    }

    /// Render the multi-line report for a successful cycle.
    pub fn format_report(&self, result: &PollResult, settings: &Settings) -> String {
        let l = &self.locale;
        let previous = result
            .last_check
            .as_deref()
            .unwrap_or(l.first_check.as_str());

        let mut lines = vec![
            l.report_title.clone(),
            l.route
                .replace("{source}", &escape_text(&settings.source_country))
                .replace("{mission}", &escape_text(&settings.mission_country)),
            l.checked_at.replace("{time}", &result.current_time),
            l.previous_check.replace("{time}", &escape_text(previous)),
        ];
        if let Some(updated) = &result.api_last_checked {
            lines.push(l.feed_updated.replace("{time}", updated));
        }
        lines.push(String::new());

        let appointments = result.appointments();
        if appointments.is_empty() {
            lines.push(l.no_appointments.clone());
            return lines.join("\n");
        }

        lines.push(
            l.appointments_header
                .replace("{count}", &appointments.len().to_string()),
        );
        lines.push(String::new());

        for apt in appointments {
            let s = &apt.snapshot;
            let mut people = l
                .people_looking
                .replace("{count}", &s.people_looking.to_string());
            if let Some(change) = apt.people_looking_change {
                people.push_str(&l.people_change.replace("{change}", &format!("{change:+}")));
            }

            lines.push(l.date.replace("{date}", &s.date));
            lines.push(l.center.replace("{center}", &escape_text(&s.center)));
            lines.push(l.visa_type.replace("{category}", &escape_text(&s.visa_category)));
            lines.push(
                l.subcategory
                    .replace("{subcategory}", &escape_text(&s.visa_subcategory)),
            );
            lines.push(people);
            lines.push(l.booking_link.replace("{link}", &escape_attr(&s.link)));
            lines.push(String::new());
        }

        lines.join("\n").trim_end().to_string()
    }

    /// Render a cycle-level error.
    pub fn format_error(&self, message: &str) -> String {
        self.locale.error.replace("{error}", &escape_text(message))
    }

    /// Deliver `text`. Failures are logged, never raised.
    pub async fn send(&self, text: &str) -> bool {
        match self.sink.send(text).await {
            Ok(()) => {
                *self.last_sent.lock().unwrap_or_else(|e| e.into_inner()) = Some(Local::now());
                log::debug!("Message delivered ({} chars)", text.len());
                true
            }
            Err(e) => {
                log::error!("Failed to deliver message: {}", e);
                false
            }
        }
    }

    /// Apply the send policy to a result. Returns whether a message went out.
    pub async fn dispatch(&self, result: &PollResult, settings: &Settings) -> bool {
        if let Some(error) = result.error() {
            return self.send(&self.format_error(error)).await;
        }
        if !Self::should_send(result, settings) {
            log::debug!("No appointments and send_all_updates is off, skipping message");
            return false;
        }
        self.send(&self.format_report(result, settings)).await
    }
}
