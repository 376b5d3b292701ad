//! tests/message_model_tests.rs
//! Composition of provider payloads from send requests.

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::errors::InvalidMessage;
    use crate::models::message_model::{Channel, MessageType, SendMessageRequest};

    fn request(channel: Channel, message_type: MessageType) -> SendMessageRequest {
        SendMessageRequest {
            channel,
            message_type,
            from: "447700900001".to_string(),
            to: "447700900000".to_string(),
            text: None,
            url: None,
            latitude: None,
            longitude: None,
            address: None,
            sandbox: false,
        }
    }

    #[test]
    fn sms_text_payload() {
        let mut req = request(Channel::Sms, MessageType::Text);
        req.text = Some("Hello, World!".to_string());

        assert_eq!(
            req.to_payload().unwrap(),
            json!({
                "channel": "sms",
                "from": "447700900001",
                "to": "447700900000",
                "message_type": "text",
                "text": "Hello, World!"
            })
        );
    }

    #[test]
    fn media_payload_nests_url_and_caption_under_the_type() {
        let mut req = request(Channel::Whatsapp, MessageType::Image);
        req.url = Some("https://example.com/cat.jpg".to_string());
        req.text = Some("A cat".to_string());

        let payload = req.to_payload().unwrap();
        assert_eq!(payload["message_type"], "image");
        assert_eq!(
            payload["image"],
            json!({"url": "https://example.com/cat.jpg", "caption": "A cat"})
        );
    }

    #[test]
    fn audio_ignores_caption() {
        let mut req = request(Channel::Messenger, MessageType::Audio);
        req.url = Some("https://example.com/a.mp3".to_string());
        req.text = Some("ignored".to_string());

        let payload = req.to_payload().unwrap();
        assert_eq!(payload["audio"], json!({"url": "https://example.com/a.mp3"}));
    }

    #[test]
    fn captions_only_go_where_the_channel_carries_them() {
        for (channel, message_type) in [
            (Channel::Messenger, MessageType::Image),
            (Channel::Viber, MessageType::File),
            (Channel::Rcs, MessageType::Video),
            (Channel::Whatsapp, MessageType::Audio),
        ] {
            let mut req = request(channel, message_type);
            req.url = Some("https://example.com/m".to_string());
            req.text = Some("cap".to_string());

            let payload = req.to_payload().unwrap();
            assert_eq!(
                payload[message_type.as_str()],
                json!({"url": "https://example.com/m"}),
                "{channel} {message_type}"
            );
        }
    }

    #[test]
    fn mms_media_keeps_its_caption() {
        for message_type in [
            MessageType::Audio,
            MessageType::Vcard,
            MessageType::Image,
            MessageType::Video,
        ] {
            let mut req = request(Channel::Mms, message_type);
            req.url = Some("https://example.com/m".to_string());
            req.text = Some("cap".to_string());

            let payload = req.to_payload().unwrap();
            assert_eq!(
                payload[message_type.as_str()],
                json!({"url": "https://example.com/m", "caption": "cap"}),
                "{message_type}"
            );
        }
    }

    #[test]
    fn whatsapp_sticker_by_id_or_url() {
        let mut by_id = request(Channel::Whatsapp, MessageType::Sticker);
        by_id.text = Some("13aaecab-2485-4255-a0a7-97a2ed4a0c7f".to_string());
        let payload = by_id.to_payload().unwrap();
        assert_eq!(payload["message_type"], "sticker");
        assert_eq!(
            payload["sticker"],
            json!({"id": "13aaecab-2485-4255-a0a7-97a2ed4a0c7f"})
        );

        let mut by_url = request(Channel::Whatsapp, MessageType::Sticker);
        by_url.url = Some("https://example.com/sticker.webp".to_string());
        assert_eq!(
            by_url.to_payload().unwrap()["sticker"],
            json!({"url": "https://example.com/sticker.webp"})
        );

        let neither = request(Channel::Whatsapp, MessageType::Sticker);
        assert_eq!(neither.to_payload(), Err(InvalidMessage::MissingField("url")));
    }

    #[test]
    fn viber_uses_the_provider_channel_name() {
        let mut req = request(Channel::Viber, MessageType::Text);
        req.text = Some("hi".to_string());
        assert_eq!(req.to_payload().unwrap()["channel"], "viber_service");

        let parsed: Channel = serde_json::from_value(json!("viber")).unwrap();
        assert_eq!(parsed, Channel::Viber);
    }

    #[test]
    fn whatsapp_location_is_a_custom_message() {
        let mut req = request(Channel::Whatsapp, MessageType::Location);
        req.latitude = Some(51.5072);
        req.longitude = Some(-0.1276);
        req.text = Some("Aliens Sighted!".to_string());
        req.address = Some("London".to_string());

        let payload = req.to_payload().unwrap();
        assert_eq!(payload["message_type"], "custom");
        assert_eq!(
            payload["custom"],
            json!({
                "type": "location",
                "location": {
                    "latitude": 51.5072,
                    "longitude": -0.1276,
                    "name": "Aliens Sighted!",
                    "address": "London"
                }
            })
        );
    }

    #[test]
    fn unsupported_channel_type_pairs_are_rejected() {
        for (channel, message_type) in [
            (Channel::Sms, MessageType::Image),
            (Channel::Viber, MessageType::Video),
            (Channel::Mms, MessageType::Text),
            (Channel::Rcs, MessageType::Location),
        ] {
            let mut req = request(channel, message_type);
            req.text = Some("hi".to_string());
            req.url = Some("https://example.com/x".to_string());
            assert_eq!(
                req.to_payload(),
                Err(InvalidMessage::UnsupportedType {
                    channel,
                    message_type
                })
            );
        }
    }

    #[test]
    fn required_fields_are_enforced() {
        let req = request(Channel::Sms, MessageType::Text);
        assert_eq!(req.to_payload(), Err(InvalidMessage::MissingField("text")));

        let mut req = request(Channel::Mms, MessageType::Image);
        req.url = Some("   ".to_string());
        assert_eq!(req.to_payload(), Err(InvalidMessage::MissingField("url")));

        let mut req = request(Channel::Whatsapp, MessageType::Location);
        req.latitude = Some(1.0);
        assert_eq!(
            req.to_payload(),
            Err(InvalidMessage::MissingField("longitude"))
        );

        let mut req = request(Channel::Sms, MessageType::Text);
        req.text = Some("hi".to_string());
        req.to = " ".to_string();
        assert_eq!(req.to_payload(), Err(InvalidMessage::MissingField("to")));
    }

    #[test]
    fn every_channel_supports_something_and_sms_is_text_only() {
        for channel in [
            Channel::Sms,
            Channel::Mms,
            Channel::Whatsapp,
            Channel::Messenger,
            Channel::Viber,
            Channel::Rcs,
        ] {
            assert!(!channel.supported_message_types().is_empty());
        }
        assert_eq!(Channel::Sms.supported_message_types(), &[MessageType::Text]);
    }
}
