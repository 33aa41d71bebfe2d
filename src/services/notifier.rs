//! Alert delivery to the Telegram Bot API.

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{DeliveryError, Result};
use crate::models::{Alert, NotifierConfig};
use crate::utils::HeaderTemplate;

/// Sink for composed alerts.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, alert: &Alert) -> std::result::Result<(), DeliveryError>;
}

/// Bot credentials. Both values are required before the pipeline starts.
#[derive(Clone)]
pub struct Credentials {
    pub token: String,
    pub chat_id: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

/// Sends alerts as photos with captions, or as plain messages when there is no image.
pub struct TelegramNotifier {
    client: Client,
    headers: HeaderTemplate,
    credentials: Credentials,
    api_base: String,
    parse_mode: String,
}

impl TelegramNotifier {
    pub fn new(
        client: Client,
        headers: HeaderTemplate,
        credentials: Credentials,
        config: &NotifierConfig,
    ) -> Self {
        Self {
            client,
            headers,
            credentials,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            parse_mode: config.parse_mode.clone(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.credentials.token, method)
    }

    /// Endpoint method and form payload for an alert.
    fn request_for<'a>(&'a self, alert: &'a Alert) -> (&'static str, Vec<(&'static str, &'a str)>) {
        let chat_id = self.credentials.chat_id.as_str();
        match alert.image_path.as_deref() {
            Some(photo) => (
                "sendPhoto",
                vec![
                    ("chat_id", chat_id),
                    ("photo", photo),
                    ("caption", alert.message.as_str()),
                    ("parse_mode", self.parse_mode.as_str()),
                ],
            ),
            None => (
                "sendMessage",
                vec![
                    ("chat_id", chat_id),
                    ("text", alert.message.as_str()),
                    ("parse_mode", self.parse_mode.as_str()),
                ],
            ),
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn deliver(&self, alert: &Alert) -> std::result::Result<(), DeliveryError> {
        let (method, payload) = self.request_for(alert);

        let response = self
            .client
            .post(self.method_url(method))
            .headers(self.headers.build())
            .form(&payload)
            .send()
            .await
            // The URL carries the bot token.
            .map_err(|e| DeliveryError::Transport(e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Status {
                status: status.as_u16(),
                body,
            });
        }

        log::debug!("Delivered alert via {}", method);
        Ok(())
    }
}

impl Credentials {
    /// Read `TOKEN` and `CHAT_ID` through the given lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| crate::error::AppError::config(format!("No {key} env variable found")))
        };
        Ok(Self {
            token: read("TOKEN")?,
            chat_id: read("CHAT_ID")?,
        })
    }

    /// Read credentials from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};

    use super::*;
    use crate::error::AppError;

    fn notifier() -> TelegramNotifier {
        let headers = HeaderTemplate::new(&BTreeMap::new(), &["ua".to_string()]).unwrap();
        TelegramNotifier::new(
            Client::new(),
            headers,
            Credentials {
                token: "123:abc".into(),
                chat_id: "-100".into(),
            },
            &NotifierConfig::default(),
        )
    }

    #[test]
    fn photo_when_image_present() {
        let n = notifier();
        let alert = Alert {
            image_path: Some("https://img/1.png".into()),
            message: "hello".into(),
        };
        let (method, payload) = n.request_for(&alert);
        assert_eq!(method, "sendPhoto");
        assert!(payload.contains(&("photo", "https://img/1.png")));
        assert!(payload.contains(&("caption", "hello")));
        assert!(payload.contains(&("parse_mode", "HTML")));
        assert!(payload.contains(&("chat_id", "-100")));
    }

    #[test]
    fn text_when_no_image() {
        let n = notifier();
        let alert = Alert {
            image_path: None,
            message: "hello".into(),
        };
        let (method, payload) = n.request_for(&alert);
        assert_eq!(method, "sendMessage");
        assert!(payload.contains(&("text", "hello")));
        assert!(!payload.iter().any(|(k, _)| *k == "photo"));
    }

    #[test]
    fn method_url_includes_token() {
        assert_eq!(
            notifier().method_url("sendMessage"),
            "https://api.telegram.org/bot123:abc/sendMessage"
        );
    }

    #[test]
    fn credentials_required() {
        let env: HashMap<&str, &str> = HashMap::from([("TOKEN", "t")]);
        let result = Credentials::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert!(matches!(result, Err(AppError::Config(msg)) if msg.contains("CHAT_ID")));

        let env: HashMap<&str, &str> = HashMap::from([("TOKEN", " "), ("CHAT_ID", "1")]);
        let result = Credentials::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert!(matches!(result, Err(AppError::Config(msg)) if msg.contains("TOKEN")));
    }

    #[test]
    fn credentials_debug_hides_token() {
        let creds = Credentials {
            token: "secret".into(),
            chat_id: "1".into(),
        };
        assert!(!format!("{creds:?}").contains("secret"));
    }
}
