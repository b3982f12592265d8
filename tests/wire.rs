//! Decode tests over hand-built binary fixtures.

use maildns::{encode_query, Message, Resource, Type};
use pretty_assertions::assert_eq;

/// A NOERROR response header: id 0x0001, qr+rd+ra, one question, `ancount`
/// answers.
fn response_header(ancount: u16) -> Vec<u8> {
    let mut buf = hex::decode("000181800001").unwrap();
    buf.extend_from_slice(&ancount.to_be_bytes());
    buf.extend_from_slice(&[0, 0, 0, 0]);
    buf
}

/// Question section for `example.com`, with the given QTYPE.
fn question(qtype: u16) -> Vec<u8> {
    let mut buf = hex::decode("076578616d706c6503636f6d00").unwrap();
    buf.extend_from_slice(&qtype.to_be_bytes());
    buf.extend_from_slice(&[0, 1]);
    buf
}

/// One answer whose owner is a pointer to the question's QNAME.
fn answer(rtype: u16, rdata: &[u8]) -> Vec<u8> {
    let mut buf = hex::decode("c00c").unwrap();
    buf.extend_from_slice(&rtype.to_be_bytes());
    buf.extend_from_slice(&[0, 1]); // IN
    buf.extend_from_slice(&[0, 0, 0, 60]); // TTL
    buf.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
    buf.extend_from_slice(rdata);
    buf
}

#[test]
fn query_round_trip() {
    let req = encode_query(0x4242, "_xmpp-client._tcp.example.com", Type::SRV)
        .expect("encode failed");
    let msg = Message::from_slice(&req).expect("parse failed");

    assert_eq!(msg.id, 0x4242);
    assert!(!msg.response);
    assert_eq!(msg.questions.len(), 1);
    assert_eq!(msg.questions[0].name, "_xmpp-client._tcp.example.com");
    assert_eq!(msg.questions[0].r#type, Type::SRV);
    assert!(msg.answers.is_empty());
}

#[test]
fn owner_name_decompresses_to_qname() {
    let mut buf = response_header(1);
    buf.extend(question(15));
    buf.extend(answer(15, &hex::decode("000a046d61696cc00c").unwrap()));

    let msg = Message::from_slice(&buf).expect("parse failed");

    assert_eq!(msg.answers.len(), 1);
    assert_eq!(msg.answers[0].name, "example.com");
    assert_eq!(
        msg.answers[0].resource,
        Resource::MX(maildns::MX {
            preference: 10,
            exchange: "mail.example.com".to_string(),
        })
    );
}

#[test]
fn txt_character_strings_are_reassembled() {
    let mut buf = response_header(1);
    buf.extend(question(16));
    buf.extend(answer(16, b"\x05hello\x05world"));

    let msg = Message::from_slice(&buf).expect("parse failed");

    assert_eq!(
        msg.answers[0].resource,
        Resource::TXT(maildns::TXT {
            text: "helloworld".to_string(),
        })
    );
}

#[test]
fn malformed_txt_drops_only_that_record() {
    let mut buf = response_header(2);
    buf.extend(question(16));
    // First TXT claims 11 bytes with 2 present inside its RDLENGTH.
    buf.extend(answer(16, b"\x0bhi"));
    buf.extend(answer(16, b"\x02ok"));

    let msg = Message::from_slice(&buf).expect("parse failed");

    assert_eq!(msg.answers.len(), 1);
    assert_eq!(
        msg.answers[0].resource,
        Resource::TXT(maildns::TXT {
            text: "ok".to_string(),
        })
    );
}

#[test]
fn unknown_record_types_are_skipped() {
    let mut buf = response_header(2);
    buf.extend(question(15));
    // A record (type 1) for the same owner, then a real MX.
    buf.extend(answer(1, &[127, 0, 0, 1]));
    buf.extend(answer(15, &hex::decode("0005c00c").unwrap()));

    let msg = Message::from_slice(&buf).expect("parse failed");

    assert_eq!(msg.answers.len(), 1);
    assert_eq!(msg.answers[0].r#type, Type::MX);
    assert_eq!(
        msg.answers[0].resource,
        Resource::MX(maildns::MX {
            preference: 5,
            exchange: "example.com".to_string(),
        })
    );
}

#[test]
fn srv_answer_decodes() {
    let mut buf = response_header(1);
    buf.extend(question(33));
    // 1 0 5269, target = pointer to qname.
    buf.extend(answer(33, &hex::decode("000100001495c00c").unwrap()));

    let msg = Message::from_slice(&buf).expect("parse failed");

    assert_eq!(
        msg.answers[0].resource,
        Resource::SRV(maildns::SRV {
            priority: 1,
            weight: 0,
            port: 5269,
            target: "example.com".to_string(),
        })
    );
}

#[test]
fn truncation_bit_is_surfaced() {
    let mut buf = response_header(0);
    buf[2] |= 0b0000_0010; // TC
    buf.extend(question(15));

    let msg = Message::from_slice(&buf).expect("parse failed");

    assert!(msg.truncated);
}

#[test]
fn srv_rdata_overrunning_message_fails_decode() {
    let mut buf = response_header(1);
    buf.extend(question(33));
    // RDLENGTH says 8 but only 3 bytes follow.
    let mut bad = hex::decode("c00c002100010000003c0008").unwrap();
    bad.extend_from_slice(&[0, 1, 0]);
    buf.extend(bad);

    assert!(Message::from_slice(&buf).is_err());
}

#[test]
fn mx_name_overrunning_message_fails_decode() {
    let mut buf = response_header(1);
    buf.extend(question(15));
    // The exchange name claims a 7-byte label with nothing behind it.
    buf.extend(answer(15, &[0x00, 0x0a, 0x07]));

    assert!(Message::from_slice(&buf).is_err());
}
