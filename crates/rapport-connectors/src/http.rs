//! HTTP polling connector.
//!
//! Polls a relay endpoint for new messages with a cursor, the same shape
//! as long-polling a bot API: `GET {base_url}/messages?since=<cursor>`.
//! The caller owns retry/backoff; a failed poll is just an error result.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rapport_core::{
    config::HttpConnectorConfig,
    error::RapportError,
    message::LiveMessage,
    traits::{Connector, PollFilter},
};
use serde::Deserialize;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

/// Connector polling a JSON endpoint for one platform.
pub struct HttpConnector {
    platform: String,
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    /// Opaque server-issued cursor; `None` until the first poll.
    cursor: Mutex<Option<String>>,
}

/// Wire shape of one relayed message.
#[derive(Debug, Deserialize)]
struct WireMessage {
    id: String,
    content: String,
    sender: String,
    recipient: String,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    conversation_id: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct PollResponse {
    #[serde(default)]
    messages: Vec<WireMessage>,
    #[serde(default)]
    cursor: Option<String>,
}

impl HttpConnector {
    pub fn from_config(config: &HttpConnectorConfig) -> Self {
        Self {
            platform: config.platform.clone(),
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            cursor: Mutex::new(None),
        }
    }

    fn to_live(&self, wire: WireMessage) -> LiveMessage {
        LiveMessage {
            id: Uuid::new_v4(),
            platform: self.platform.clone(),
            message_id: wire.id,
            content: wire.content,
            sender: wire.sender,
            recipient: wire.recipient,
            timestamp: wire.timestamp.unwrap_or_else(Utc::now),
            conversation_id: wire.conversation_id,
            metadata: wire.metadata,
        }
    }
}

#[async_trait]
impl Connector for HttpConnector {
    fn name(&self) -> &str {
        &self.platform
    }

    async fn poll_new_messages(
        &self,
        filter: &PollFilter,
    ) -> Result<Vec<LiveMessage>, RapportError> {
        let mut url = format!("{}/messages", self.base_url);
        {
            let cursor = self.cursor.lock().await;
            if let Some(ref since) = *cursor {
                url.push_str(&format!("?since={since}"));
            }
        }

        let mut request = self.client.get(&url);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| RapportError::Connector(format!("{}: poll failed: {e}", self.platform)))?;

        if !resp.status().is_success() {
            return Err(RapportError::Connector(format!(
                "{}: poll returned {}",
                self.platform,
                resp.status()
            )));
        }

        let body: PollResponse = resp
            .json()
            .await
            .map_err(|e| RapportError::Connector(format!("{}: parse failed: {e}", self.platform)))?;

        if let Some(next) = body.cursor {
            *self.cursor.lock().await = Some(next);
        }

        debug!("{}: polled {} new messages", self.platform, body.messages.len());

        Ok(body
            .messages
            .into_iter()
            .map(|wire| self.to_live(wire))
            .filter(|m| filter.matches(m))
            .collect())
    }
}
