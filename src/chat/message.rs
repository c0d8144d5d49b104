//! Message envelopes and content validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::ChatError;
use super::link::{is_video_id, youtube_video_id, YOUTUBE};
use super::types::{Identity, RoomId};

/// What a message carries besides its text body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageKind {
    /// Plain text.
    #[default]
    Text,
    /// An image hosted at `url`.
    Image {
        /// Absolute http(s) URL.
        url: String,
        /// Size in bytes, if known.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        size: Option<i64>,
    },
    /// An embedded video link.
    Link {
        /// Video provider, e.g. `youtube`.
        provider: String,
        /// Provider-specific video ID.
        video_id: String,
    },
    /// Server-generated notice. Never accepted from clients.
    System,
}

impl MessageKind {
    /// Storage name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Image { .. } => "image",
            MessageKind::Link { .. } => "link",
            MessageKind::System => "system",
        }
    }

    /// Rebuild a kind from its stored columns.
    ///
    /// Rows whose payload columns are missing degrade to `Text`.
    pub fn from_columns(
        kind: &str,
        file_url: Option<String>,
        file_size: Option<i64>,
        link_provider: Option<String>,
        link_video_id: Option<String>,
    ) -> Self {
        match (kind, file_url, link_provider, link_video_id) {
            ("image", Some(url), _, _) => MessageKind::Image {
                url,
                size: file_size,
            },
            ("link", _, Some(provider), Some(video_id)) => MessageKind::Link { provider, video_id },
            ("system", _, _, _) => MessageKind::System,
            _ => MessageKind::Text,
        }
    }
}

/// A persisted chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Store-assigned ID, increasing in acceptance order.
    pub id: i64,
    /// Room the message belongs to.
    pub room_id: RoomId,
    /// Author.
    pub author: Identity,
    /// Text body.
    pub body: String,
    /// Payload kind.
    pub kind: MessageKind,
    /// Acceptance timestamp.
    pub created_at: DateTime<Utc>,
}

/// A validated message awaiting persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    /// Target room.
    pub room_id: RoomId,
    /// Author.
    pub author: Identity,
    /// Trimmed text body.
    pub body: String,
    /// Payload kind.
    pub kind: MessageKind,
}

impl NewMessage {
    /// Validate client-supplied content and build a message.
    ///
    /// The body is trimmed and must be non-empty and at most `max_len`
    /// characters. Text containing a YouTube URL becomes a link message.
    pub fn from_client(
        room_id: RoomId,
        author: Identity,
        content: &str,
        kind: MessageKind,
        max_len: usize,
    ) -> Result<Self, ChatError> {
        let body = content.trim();
        if body.is_empty() {
            return Err(ChatError::InvalidMessage("message is empty".to_string()));
        }
        if body.chars().count() > max_len {
            return Err(ChatError::InvalidMessage(format!(
                "message exceeds {max_len} characters"
            )));
        }

        let kind = match kind {
            MessageKind::Text => match youtube_video_id(body) {
                Some(video_id) => MessageKind::Link {
                    provider: YOUTUBE.to_string(),
                    video_id,
                },
                None => MessageKind::Text,
            },
            MessageKind::Image { url, size } => {
                check_image_url(&url)?;
                if size.is_some_and(|s| s < 0) {
                    return Err(ChatError::InvalidMessage(
                        "image size must not be negative".to_string(),
                    ));
                }
                MessageKind::Image { url, size }
            }
            MessageKind::Link { provider, video_id } => {
                if provider != YOUTUBE || !is_video_id(&video_id) {
                    return Err(ChatError::InvalidMessage("unsupported link".to_string()));
                }
                MessageKind::Link { provider, video_id }
            }
            MessageKind::System => {
                return Err(ChatError::InvalidMessage(
                    "system messages cannot be sent by clients".to_string(),
                ));
            }
        };

        Ok(Self {
            room_id,
            author,
            body: body.to_string(),
            kind,
        })
    }
}

fn check_image_url(raw: &str) -> Result<(), ChatError> {
    let parsed = url::Url::parse(raw)
        .map_err(|_| ChatError::InvalidMessage("image url is not absolute".to_string()))?;
    match parsed.scheme() {
        "http" | "https" if parsed.host().is_some() => Ok(()),
        _ => Err(ChatError::InvalidMessage(
            "image url must use http or https".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Identity {
        Identity::new(1, "alice")
    }

    #[test]
    fn test_text_is_trimmed() {
        let msg = NewMessage::from_client(1, alice(), "  hi  ", MessageKind::Text, 10).unwrap();
        assert_eq!(msg.body, "hi");
        assert_eq!(msg.kind, MessageKind::Text);
    }

    #[test]
    fn test_empty_and_too_long_rejected() {
        assert!(matches!(
            NewMessage::from_client(1, alice(), "   ", MessageKind::Text, 10),
            Err(ChatError::InvalidMessage(_))
        ));
        assert!(matches!(
            NewMessage::from_client(1, alice(), "12345678901", MessageKind::Text, 10),
            Err(ChatError::InvalidMessage(_))
        ));
        // length counts characters, not bytes
        assert!(NewMessage::from_client(1, alice(), "ééééé", MessageKind::Text, 5).is_ok());
    }

    #[test]
    fn test_youtube_text_becomes_link() {
        let msg = NewMessage::from_client(
            1,
            alice(),
            "watch https://youtu.be/dQw4w9WgXcQ",
            MessageKind::Text,
            100,
        )
        .unwrap();
        assert_eq!(
            msg.kind,
            MessageKind::Link {
                provider: "youtube".to_string(),
                video_id: "dQw4w9WgXcQ".to_string()
            }
        );
    }

    #[test]
    fn test_system_rejected() {
        assert!(matches!(
            NewMessage::from_client(1, alice(), "x", MessageKind::System, 100),
            Err(ChatError::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_image_url_checked() {
        let ok = MessageKind::Image {
            url: "https://cdn.example.com/cat.png".to_string(),
            size: Some(2048),
        };
        assert!(NewMessage::from_client(1, alice(), "cat", ok, 100).is_ok());

        for url in ["/uploads/cat.png", "ftp://example.com/cat.png", "javascript:alert(1)"] {
            let kind = MessageKind::Image {
                url: url.to_string(),
                size: None,
            };
            assert!(
                NewMessage::from_client(1, alice(), "cat", kind, 100).is_err(),
                "{url}"
            );
        }
    }

    #[test]
    fn test_client_link_validated() {
        let bad = MessageKind::Link {
            provider: "vimeo".to_string(),
            video_id: "123".to_string(),
        };
        assert!(NewMessage::from_client(1, alice(), "v", bad, 100).is_err());
    }

    #[test]
    fn test_kind_wire_format() {
        let json = serde_json::to_value(MessageKind::Image {
            url: "https://x.test/a.png".to_string(),
            size: None,
        })
        .unwrap();
        assert_eq!(json["type"], "image");
        assert!(json.get("size").is_none());

        let kind: MessageKind = serde_json::from_str(r#"{"type":"text"}"#).unwrap();
        assert_eq!(kind, MessageKind::Text);
    }

    #[test]
    fn test_from_columns() {
        assert_eq!(
            MessageKind::from_columns("link", None, None, Some("youtube".into()), Some("dQw4w9WgXcQ".into())),
            MessageKind::Link {
                provider: "youtube".into(),
                video_id: "dQw4w9WgXcQ".into()
            }
        );
        assert_eq!(
            MessageKind::from_columns("image", None, None, None, None),
            MessageKind::Text
        );
        assert_eq!(
            MessageKind::from_columns("system", None, None, None, None),
            MessageKind::System
        );
    }
}
