//! Property-based tests for the JSON wire codec.
//!
//! Uses proptest to verify:
//! 1. Arbitrary text never causes a panic in `decode_inbound`.
//! 2. Any inbound event survives encode → decode.
//! 3. Any outbound event survives encode → decode and stays a flat envelope.
//! 4. Envelopes with unrecognised tags decode to `None`.

use proptest::prelude::*;
use wschat_proto::codec;
use wschat_proto::event::{InboundEvent, OutboundEvent};

fn arb_name() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 _-]{1,24}"
}

fn arb_inbound() -> impl Strategy<Value = InboundEvent> {
    prop_oneof![
        prop::collection::vec(arb_name(), 0..8).prop_map(|users| InboundEvent::OnlineList { users }),
        (arb_name(), ".*").prop_map(|(from, text)| InboundEvent::Chat { from, text }),
        arb_name().prop_map(|user| InboundEvent::UserJoined { user }),
        arb_name().prop_map(|user| InboundEvent::UserLeft { user }),
        (arb_name(), any::<bool>())
            .prop_map(|(user, is_typing)| InboundEvent::Typing { user, is_typing }),
        arb_name().prop_map(|error| InboundEvent::Error { error }),
    ]
}

fn arb_outbound() -> impl Strategy<Value = OutboundEvent> {
    prop_oneof![
        ".*".prop_map(|text| OutboundEvent::Chat { text }),
        any::<bool>().prop_map(|is_typing| OutboundEvent::Typing { is_typing }),
    ]
}

const KNOWN_TAGS: [&str; 6] = [
    "online_list",
    "chat",
    "user_joined",
    "user_left",
    "typing",
    "error",
];

proptest! {
    #[test]
    fn decode_arbitrary_text_never_panics(text in ".*") {
        let _ = codec::decode_inbound(&text);
    }

    #[test]
    fn inbound_survives_encode_decode(evt in arb_inbound()) {
        let text = codec::encode_inbound(&evt).unwrap();
        prop_assert_eq!(codec::decode_inbound(&text).unwrap(), Some(evt));
    }

    #[test]
    fn outbound_survives_encode_decode(evt in arb_outbound()) {
        let text = codec::encode_outbound(&evt).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        prop_assert!(value.get("data").is_none());
        prop_assert_eq!(codec::decode_outbound(&text).unwrap(), evt);
    }

    #[test]
    fn unrecognised_tags_decode_to_none(tag in "[a-z_]{1,16}") {
        prop_assume!(!KNOWN_TAGS.contains(&tag.as_str()));
        let frame = serde_json::json!({"type": tag, "data": {"x": 1}}).to_string();
        prop_assert!(codec::decode_inbound(&frame).unwrap().is_none());
    }
}
