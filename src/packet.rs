//! 패킷 코덱
//!
//! 페이로드를 MD5 다이제스트와 함께 감싸고 JSON 봉투로 직렬화
//!
//! ```text
//! {"data":"<hex payload>","hash":"<hex md5>"}
//! ```

use std::borrow::Cow;

use bytes::Bytes;
use md5::{Digest, Md5};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::message::Control;
use crate::{Error, Result};

/// 미리 만들어 재사용하는 ACK 패킷
pub static ACK: Lazy<Packet> = Lazy::new(|| Control::Ack.packet());

/// 봉투 고정 부분 길이: `{"data":"` + `","hash":"` + `"}`
const ENVELOPE_OVERHEAD: usize = 9 + 10 + 2;

/// MD5 hex 문자열 길이
const DIGEST_HEX_LEN: usize = 32;

/// 와이어 봉투
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct Envelope<'a> {
    #[serde(borrow)]
    data: Cow<'a, str>,
    #[serde(borrow)]
    hash: Cow<'a, str>,
}

/// 무결성 검증이 가능한 패킷
///
/// 생성 이후 변경되지 않으며 `hash`는 항상 `data`의 다이제스트와 일치
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    data: Bytes,
    hash: String,
}

impl Packet {
    /// 페이로드로 새 패킷 생성 (다이제스트 계산)
    pub fn new(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let hash = Self::digest(&data);
        Self { data, hash }
    }

    /// 텍스트 페이로드 패킷
    pub fn text(text: &str) -> Self {
        Self::new(Bytes::copy_from_slice(text.as_bytes()))
    }

    /// 페이로드
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// hex 다이제스트
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// 페이로드 소유권 반환
    pub fn into_data(self) -> Bytes {
        self.data
    }

    /// 페이로드를 UTF-8 텍스트로 해석 (잘못된 바이트는 대체 문자)
    pub fn as_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }

    /// 페이로드가 주어진 제어 토큰과 정확히 같은지
    pub fn is(&self, control: Control) -> bool {
        self.data.as_ref() == control.as_str().as_bytes()
    }

    /// JSON 봉투로 직렬화
    pub fn to_bytes(&self) -> Vec<u8> {
        let envelope = Envelope {
            data: Cow::Owned(hex::encode(&self.data)),
            hash: Cow::Borrowed(&self.hash),
        };
        serde_json::to_vec(&envelope).expect("envelope serialization failed")
    }

    /// JSON 봉투에서 역직렬화 후 다이제스트 검증
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let envelope: Envelope<'_> = serde_json::from_slice(bytes)
            .map_err(|e| Error::MalformedEnvelope(e.to_string()))?;

        let data = hex::decode(envelope.data.as_ref())
            .map_err(|e| Error::MalformedEnvelope(format!("data 필드: {}", e)))?;

        let packet = Self::new(data);
        if packet.hash != envelope.hash {
            return Err(Error::CorruptPacket {
                expected: envelope.hash.into_owned(),
                got: packet.hash,
            });
        }

        Ok(packet)
    }

    /// MD5 다이제스트 (소문자 hex)
    pub fn digest(data: &[u8]) -> String {
        hex::encode(Md5::digest(data))
    }

    /// 주어진 페이로드 길이의 직렬화 크기
    pub const fn envelope_len(payload_len: usize) -> usize {
        ENVELOPE_OVERHEAD + payload_len * 2 + DIGEST_HEX_LEN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forge(data_hex: &str, hash: &str) -> Vec<u8> {
        format!(r#"{{"data":"{}","hash":"{}"}}"#, data_hex, hash).into_bytes()
    }

    #[test]
    fn test_packet_roundtrip() {
        let payloads: [&[u8]; 4] = [b"", b"ACK", &[0u8, 255, 1, 128], b"HELLOWORLD"];

        for payload in payloads {
            let packet = Packet::new(Bytes::copy_from_slice(payload));
            let restored = Packet::from_bytes(&packet.to_bytes()).unwrap();
            assert_eq!(restored.data().as_ref(), payload);
            assert_eq!(restored, packet);
        }
    }

    #[test]
    fn test_wire_format() {
        let packet = Packet::text("ACK");
        let json = String::from_utf8(packet.to_bytes()).unwrap();

        assert_eq!(
            json,
            format!(r#"{{"data":"41434b","hash":"{}"}}"#, Packet::digest(b"ACK"))
        );
        assert_eq!(json.len(), Packet::envelope_len(3));
    }

    #[test]
    fn test_known_digest() {
        // RFC 1321 테스트 벡터
        assert_eq!(Packet::digest(b""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(Packet::digest(b"abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn test_payload_bit_flip_is_corrupt() {
        let payload = b"HELLOWORLD".to_vec();
        let hash = Packet::digest(&payload);

        for byte in 0..payload.len() {
            for bit in 0..8 {
                let mut flipped = payload.clone();
                flipped[byte] ^= 1 << bit;

                let result = Packet::from_bytes(&forge(&hex::encode(&flipped), &hash));
                assert!(
                    matches!(result, Err(Error::CorruptPacket { .. })),
                    "byte {} bit {}",
                    byte,
                    bit
                );
            }
        }
    }

    #[test]
    fn test_digest_bit_flip_is_corrupt() {
        let payload = b"OWOR";
        let hash = Packet::digest(payload);

        for i in 0..hash.len() {
            let mut bytes = hash.clone().into_bytes();
            bytes[i] ^= 1;
            let flipped = String::from_utf8(bytes).unwrap();

            let result = Packet::from_bytes(&forge(&hex::encode(payload), &flipped));
            assert!(matches!(result, Err(Error::CorruptPacket { .. })), "index {}", i);
        }
    }

    #[test]
    fn test_malformed_envelopes() {
        let hash = Packet::digest(b"x");
        let cases: Vec<Vec<u8>> = vec![
            b"not json".to_vec(),
            br#"{"data":"78"}"#.to_vec(),
            forge("7", &hash),
            forge("zz", &hash),
            format!(r#"{{"data":"78","hash":"{}","extra":1}}"#, hash).into_bytes(),
            vec![0xff, 0xfe, 0x00],
        ];

        for case in cases {
            let err = Packet::from_bytes(&case).unwrap_err();
            assert!(matches!(err, Error::MalformedEnvelope(_)), "{:?}", err);
            assert!(err.is_corruption());
        }
    }

    #[test]
    fn test_control_match() {
        assert!(ACK.is(Control::Ack));
        assert!(!ACK.is(Control::Next));
        assert_eq!(ACK.to_bytes(), Control::Ack.packet().to_bytes());
        assert!(!Packet::text("next ").is(Control::Next));
        assert_eq!(Packet::text("re-send").as_text(), "re-send");
    }
}
