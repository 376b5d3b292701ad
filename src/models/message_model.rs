//! models/message_model.rs
//! Requests and responses for the outbound messages API.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::errors::InvalidMessage;
use crate::models::request_model::{RequestRecord, RequestStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Sms,
    Mms,
    Whatsapp,
    Messenger,
    #[serde(rename = "viber_service", alias = "viber")]
    Viber,
    Rcs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Text,
    Image,
    Audio,
    Video,
    File,
    Vcard,
    Sticker,
    Location,
}

impl Channel {
    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Sms => "sms",
            Channel::Mms => "mms",
            Channel::Whatsapp => "whatsapp",
            Channel::Messenger => "messenger",
            Channel::Viber => "viber_service",
            Channel::Rcs => "rcs",
        }
    }

    /// Outbound message types the demo can compose for this channel.
    pub fn supported_message_types(self) -> &'static [MessageType] {
        use MessageType::*;
        match self {
            Channel::Sms => &[Text],
            Channel::Mms => &[Vcard, Audio, Image, Video],
            Channel::Whatsapp => &[Text, Audio, Image, Video, File, Sticker, Location],
            Channel::Messenger => &[Text, Image, Audio, Video, File],
            Channel::Viber => &[Text, Image, File],
            Channel::Rcs => &[Text, Image, File, Video],
        }
    }

    pub fn supports(self, message_type: MessageType) -> bool {
        self.supported_message_types().contains(&message_type)
    }

    /// Only WhatsApp visual media and MMS carry a caption.
    fn accepts_caption(self, message_type: MessageType) -> bool {
        use MessageType::*;
        match self {
            Channel::Whatsapp => matches!(message_type, Image | Video | File),
            Channel::Mms => matches!(message_type, Vcard | Audio | Image | Video),
            _ => false,
        }
    }
}

impl MessageType {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::Text => "text",
            MessageType::Image => "image",
            MessageType::Audio => "audio",
            MessageType::Video => "video",
            MessageType::File => "file",
            MessageType::Vcard => "vcard",
            MessageType::Sticker => "sticker",
            MessageType::Location => "location",
        }
    }

}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `POST /api/messages`.
#[derive(Debug, Clone, Deserialize)]
pub struct SendMessageRequest {
    pub channel: Channel,
    pub message_type: MessageType,
    pub from: String,
    pub to: String,
    /// Message text for `text`, caption for media, sticker id for `sticker`,
    /// place name for `location`.
    pub text: Option<String>,
    pub url: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub address: Option<String>,
    /// Route through the provider's sandbox endpoint.
    #[serde(default)]
    pub sandbox: bool,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl SendMessageRequest {
    /// Builds the provider's JSON payload for this message.
    pub fn to_payload(&self) -> Result<Value, InvalidMessage> {
        if !self.channel.supports(self.message_type) {
            return Err(InvalidMessage::UnsupportedType {
                channel: self.channel,
                message_type: self.message_type,
            });
        }
        if self.from.trim().is_empty() {
            return Err(InvalidMessage::MissingField("from"));
        }
        if self.to.trim().is_empty() {
            return Err(InvalidMessage::MissingField("to"));
        }

        let mut payload = Map::new();
        payload.insert("channel".into(), json!(self.channel));
        payload.insert("from".into(), json!(self.from.trim()));
        payload.insert("to".into(), json!(self.to.trim()));

        match self.message_type {
            MessageType::Text => {
                let text = non_blank(&self.text).ok_or(InvalidMessage::MissingField("text"))?;
                payload.insert("message_type".into(), json!("text"));
                payload.insert("text".into(), json!(text));
            }
            MessageType::Location => {
                let latitude = self.latitude.ok_or(InvalidMessage::MissingField("latitude"))?;
                let longitude = self
                    .longitude
                    .ok_or(InvalidMessage::MissingField("longitude"))?;
                let mut location = Map::new();
                location.insert("latitude".into(), json!(latitude));
                location.insert("longitude".into(), json!(longitude));
                if let Some(name) = non_blank(&self.text) {
                    location.insert("name".into(), json!(name));
                }
                if let Some(address) = non_blank(&self.address) {
                    location.insert("address".into(), json!(address));
                }
                // WhatsApp carries locations as a custom message.
                payload.insert("message_type".into(), json!("custom"));
                payload.insert(
                    "custom".into(),
                    json!({ "type": "location", "location": location }),
                );
            }
            MessageType::Sticker => {
                // A sticker is sent by URL, by a previously uploaded id, or both.
                let mut sticker = Map::new();
                if let Some(url) = non_blank(&self.url) {
                    sticker.insert("url".into(), json!(url));
                }
                if let Some(id) = non_blank(&self.text) {
                    sticker.insert("id".into(), json!(id));
                }
                if sticker.is_empty() {
                    return Err(InvalidMessage::MissingField("url"));
                }
                payload.insert("message_type".into(), json!("sticker"));
                payload.insert("sticker".into(), Value::Object(sticker));
            }
            media => {
                let url = non_blank(&self.url).ok_or(InvalidMessage::MissingField("url"))?;
                let mut content = Map::new();
                content.insert("url".into(), json!(url));
                if self.channel.accepts_caption(media) {
                    if let Some(caption) = non_blank(&self.text) {
                        content.insert("caption".into(), json!(caption));
                    }
                }
                payload.insert("message_type".into(), json!(media));
                payload.insert(media.as_str().into(), Value::Object(content));
            }
        }

        Ok(Value::Object(payload))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageResponse {
    pub success: bool,
    pub local_id: Uuid,
    pub status: RequestStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListMessagesResponse {
    pub total: usize,
    pub items: Vec<RequestRecord>,
}

/// Sender ids configured for the provider's sandbox.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxNumbers {
    pub whatsapp: Option<String>,
    pub viber: Option<String>,
    pub messenger: Option<String>,
}
