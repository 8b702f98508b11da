use serde::Serialize;
use reqwest::Client;
use tracing::{info, error, warn};
use std::collections::HashMap;
use tokio::sync::Mutex;
use std::time::{Instant, Duration};

use crate::config::AlertsConfig;
use crate::severity::Severity;

#[derive(Debug, Serialize)]
struct DiscordEmbed {
    title: String,
    description: String,
    color: u32,
    fields: Vec<EmbedField>,
}

#[derive(Debug, Serialize)]
struct EmbedField {
    name: String,
    value: String,
    inline: bool,
}

#[derive(Debug, Serialize)]
struct DiscordPayload {
    content: Option<String>,
    embeds: Vec<DiscordEmbed>,
}

#[derive(Debug, Serialize)]
struct TelegramPayload {
    chat_id: String,
    text: String,
    parse_mode: String,
}

pub struct AlertManager {
    client: Client,
    config: AlertsConfig,
    last_alerts: Mutex<HashMap<String, Instant>>,
    cooldown: Duration,
}

impl AlertManager {
    pub fn new(config: AlertsConfig) -> Self {
        let cooldown = Duration::from_secs(config.cooldown_secs);
        Self {
            client: Client::new(),
            config,
            last_alerts: Mutex::new(HashMap::new()),
            cooldown,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.config.webhook_url.is_empty() || self.telegram_target().is_some()
    }

    /// Dispatches to every configured channel. Returns false when the
    /// message is still inside its cooldown window.
    pub async fn send_alert(&self, severity: Severity, message: &str) -> bool {
        if !self.admit(severity, message).await {
            warn!("Alert suppressed (Rate Limit): {}", message);
            return false;
        }

        info!("Sending Alert: [{}] {}", severity, message);
        self.send_discord_alert(severity, message).await;
        self.send_telegram_alert(severity, message).await;
        true
    }

    async fn admit(&self, severity: Severity, message: &str) -> bool {
        let key = format!("{}:{}", severity, message);

        let mut history = self.last_alerts.lock().await;
        if let Some(last_time) = history.get(&key) {
            if last_time.elapsed() < self.cooldown {
                return false;
            }
        }
        history.insert(key, Instant::now());
        true
    }

    fn telegram_target(&self) -> Option<(&str, &str)> {
        let token = self.config.telegram_bot_token.as_deref().filter(|t| !t.is_empty())?;
        let chat_id = self.config.telegram_chat_id.as_deref().filter(|id| !id.is_empty())?;
        Some((token, chat_id))
    }

    async fn send_discord_alert(&self, severity: Severity, message: &str) {
        if self.config.webhook_url.is_empty() { return; }

        let embed = DiscordEmbed {
            title: format!("AVAX Insight Alert: {}", severity),
            description: message.to_string(),
            color: embed_color(severity),
            fields: vec![
                EmbedField { name: "Severity".to_string(), value: severity.to_string(), inline: true },
                EmbedField { name: "Timestamp".to_string(), value: chrono::Utc::now().to_rfc3339(), inline: true },
            ],
        };

        let payload = DiscordPayload {
            content: None,
            embeds: vec![embed],
        };

        if let Err(e) = self.client.post(&self.config.webhook_url).json(&payload).send().await {
            error!("Failed to send Discord alert: {}", e);
        } else {
            info!("Discord Alert Sent");
        }
    }

    async fn send_telegram_alert(&self, severity: Severity, message: &str) {
        let Some((token, chat_id)) = self.telegram_target() else { return };

        let payload = TelegramPayload {
            chat_id: chat_id.to_string(),
            text: format!(
                "*AVAX Insight Alert*\n\n*Severity:* {}\n*Message:* {}\n*Time:* {}",
                severity,
                message,
                chrono::Utc::now().to_rfc3339()
            ),
            parse_mode: "Markdown".to_string(),
        };

        let url = format!("https://api.telegram.org/bot{}/sendMessage", token);

        if let Err(e) = self.client.post(&url).json(&payload).send().await {
            error!("Failed to send Telegram alert: {}", e);
        } else {
            info!("Telegram Alert Sent");
        }
    }
}

fn embed_color(severity: Severity) -> u32 {
    match severity {
        Severity::Critical => 0xFF0000,
        Severity::High => 0xE67E22,
        Severity::Medium => 0xF1C40F,
        Severity::Low => 0x3498DB,
        Severity::Info => 0x95A5A6,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cooldown_suppresses_repeats() {
        let manager = AlertManager::new(AlertsConfig::default());
        assert!(!manager.is_configured());

        assert!(manager.send_alert(Severity::Medium, "AVAX is above $30.000").await);
        assert!(!manager.send_alert(Severity::Medium, "AVAX is above $30.000").await);
        // Different severity is a different key
        assert!(manager.send_alert(Severity::High, "AVAX is above $30.000").await);
    }

    #[tokio::test]
    async fn test_zero_cooldown_never_suppresses() {
        let manager = AlertManager::new(AlertsConfig {
            cooldown_secs: 0,
            ..AlertsConfig::default()
        });
        assert!(manager.send_alert(Severity::Low, "ping").await);
        assert!(manager.send_alert(Severity::Low, "ping").await);
    }

    #[test]
    fn test_telegram_needs_both_fields() {
        let manager = AlertManager::new(AlertsConfig {
            telegram_bot_token: Some("token".to_string()),
            ..AlertsConfig::default()
        });
        assert!(!manager.is_configured());
    }
}
