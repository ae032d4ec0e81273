use super::*;
use serde_json::json;

fn sample_request() -> InnerRequest {
    InnerRequest::new("send_image")
        .with("matte_id", "shadowbox_polar")
        .with("file_type", "PNG")
}

fn inner_of(text: &str) -> Value {
    let outer: Value = serde_json::from_str(text).expect("envelope should be JSON");
    let data = outer["params"]["data"].as_str().expect("data should be a string");
    serde_json::from_str(data).expect("inner request should be JSON")
}

#[test]
fn encode_request_wraps_inner_request_in_emit_envelope() {
    let encoded = encode_request(&sample_request()).expect("encode");
    let outer: Value = serde_json::from_str(&encoded.text).expect("json");

    assert_eq!(outer["method"], "ms.channel.emit");
    assert_eq!(outer["params"]["event"], "art_app_request");
    assert_eq!(outer["params"]["to"], "host");
    assert!(outer["params"]["data"].is_string());

    let inner = inner_of(&encoded.text);
    assert_eq!(inner["request"], "send_image");
    assert_eq!(inner["matte_id"], "shadowbox_polar");
    assert_eq!(inner["file_type"], "PNG");
}

#[test]
fn encode_request_injects_id_matching_returned_id() {
    let encoded = encode_request(&sample_request()).expect("encode");
    let inner = inner_of(&encoded.text);
    assert!(!encoded.id.is_empty());
    assert_eq!(inner["id"], encoded.id.as_str());
}

#[test]
fn encode_request_never_reuses_ids() {
    let request = sample_request();
    let mut ids = std::collections::HashSet::new();
    for _ in 0..64 {
        let encoded = encode_request(&request).expect("encode");
        assert!(ids.insert(encoded.id), "id should be unique");
    }
}

#[test]
fn encode_request_replaces_caller_supplied_id() {
    let request = InnerRequest::new("get_content_list").with("id", "stale");
    let encoded = encode_request(&request).expect("encode");
    assert_ne!(encoded.id, "stale");
    assert_eq!(inner_of(&encoded.text)["id"], encoded.id.as_str());
}

#[test]
fn server_wrapped_request_decodes_back_to_original_fields() {
    let request = InnerRequest::new("delete_image_list")
        .with("content_id_list", json!([{ "content_id": "MY_F0001" }]));
    let encoded = encode_request(&request).expect("encode");
    let outer: Value = serde_json::from_str(&encoded.text).expect("json");

    let echoed = json!({
        "event": "d2d_service_message",
        "data": outer["params"]["data"],
    })
    .to_string();
    let decoded = decode_frame(&Frame::Text(echoed)).expect("decode");

    assert_eq!(decoded.event, "d2d_service_message");
    let mut fields = decoded.data.as_object().expect("object").clone();
    fields.remove("id");
    assert_eq!(&fields, request.fields());
}

#[test]
fn binary_frame_layout_is_length_envelope_payload() {
    let payload = [0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10];
    let encoded = encode_binary_frame(&sample_request(), &payload).expect("encode");
    let bytes = &encoded.bytes;

    let json_len = usize::from(u16::from_be_bytes([bytes[0], bytes[1]]));
    assert_eq!(bytes.len(), 2 + json_len + payload.len());
    assert_eq!(&bytes[2 + json_len..], &payload);

    let (text, tail) = split_binary_frame(bytes).expect("split");
    assert_eq!(text.len(), json_len);
    assert_eq!(tail, &payload);
    assert_eq!(inner_of(text)["id"], encoded.id.as_str());
}

#[test]
fn binary_frame_accepts_empty_payload() {
    let encoded = encode_binary_frame(&sample_request(), &[]).expect("encode");
    let (_, tail) = split_binary_frame(&encoded.bytes).expect("split");
    assert!(tail.is_empty());
}

#[test]
fn binary_frame_rejects_oversized_envelope() {
    let request = InnerRequest::new("send_image").with("filler", "x".repeat(MAX_ENVELOPE_LEN));
    let err = encode_binary_frame(&request, b"img").expect_err("envelope should be too large");
    assert!(matches!(err, CodecError::PayloadTooLarge { len } if len > MAX_ENVELOPE_LEN));
}

fn filler_request(len: usize) -> InnerRequest {
    InnerRequest::new("send_image").with("filler", "x".repeat(len))
}

#[test]
fn binary_frame_limit_is_exactly_u16_max() {
    // Ids are fixed-width UUIDs, so envelope length grows one byte per filler byte.
    let base = encode_request(&filler_request(0)).expect("encode").text.len();
    let at_limit = filler_request(MAX_ENVELOPE_LEN - base);

    let encoded = encode_binary_frame(&at_limit, b"img").expect("envelope at limit");
    assert_eq!(&encoded.bytes[..2], &[0xff_u8, 0xff]);
    assert_eq!(encoded.bytes.len(), 2 + MAX_ENVELOPE_LEN + 3);

    let over = filler_request(MAX_ENVELOPE_LEN - base + 1);
    let err = encode_binary_frame(&over, b"img").expect_err("one byte over");
    assert!(matches!(err, CodecError::PayloadTooLarge { len: 65_536 }));
}

#[test]
fn large_payload_does_not_count_against_envelope_limit() {
    let payload = vec![7_u8; MAX_ENVELOPE_LEN * 2];
    let encoded = encode_binary_frame(&sample_request(), &payload).expect("encode");
    let (_, tail) = split_binary_frame(&encoded.bytes).expect("split");
    assert_eq!(tail.len(), payload.len());
}

#[test]
fn split_binary_frame_rejects_truncated_input() {
    assert!(split_binary_frame(&[0x00]).is_none());
    assert!(split_binary_frame(&[0x00, 0x05, b'{']).is_none());
}

#[test]
fn decode_frame_handles_structured_data() {
    let text = json!({ "event": "ms.channel.connect", "data": { "clients": [] } }).to_string();
    let decoded = decode_frame(&Frame::Text(text)).expect("decode");
    assert_eq!(decoded.event, "ms.channel.connect");
    assert_eq!(decoded.data, json!({ "clients": [] }));
    assert_eq!(decoded.data_event(), None);
}

#[test]
fn decode_frame_parses_string_encoded_data() {
    let inner = json!({ "event": "content_list", "content_list": "[]" }).to_string();
    let text = json!({ "event": "d2d_service_message", "data": inner }).to_string();
    let decoded = decode_frame(&Frame::Text(text)).expect("decode");
    assert_eq!(decoded.data_event(), Some("content_list"));
    assert_eq!(decoded.data["content_list"], "[]");
}

#[test]
fn decode_frame_treats_missing_data_as_null() {
    let decoded = decode_frame(&Frame::Text(r#"{"event":"ms.channel.ready"}"#.to_owned()))
        .expect("decode");
    assert_eq!(decoded.data, Value::Null);
    assert_eq!(decoded.into_data(), Value::Null);
}

#[test]
fn decode_frame_rejects_malformed_json() {
    let err = decode_frame(&Frame::Text("{not json".to_owned())).expect_err("should fail");
    assert!(matches!(err, CodecError::Json(_)));
}

#[test]
fn decode_frame_rejects_missing_event() {
    let err = decode_frame(&Frame::Text(r#"{"data":{}}"#.to_owned())).expect_err("should fail");
    assert!(matches!(err, CodecError::MissingEvent));
}

#[test]
fn decode_frame_rejects_malformed_nested_data() {
    let text = json!({ "event": "d2d_service_message", "data": "{oops" }).to_string();
    let err = decode_frame(&Frame::Text(text)).expect_err("should fail");
    assert!(matches!(err, CodecError::NestedJson(_)));
}

#[test]
fn decode_frame_rejects_binary_frames() {
    let err = decode_frame(&Frame::Binary(vec![1, 2, 3])).expect_err("should fail");
    assert!(matches!(err, CodecError::UnexpectedBinary { len: 3 }));
}

#[test]
fn frame_len_reports_body_size() {
    assert_eq!(Frame::Text("abc".to_owned()).len(), 3);
    assert!(Frame::Binary(Vec::new()).is_empty());
}
