//! Serde helper encoding `Vec<u8>` fields as standard base64 strings.
//!
//! Use with `#[serde(with = "apireg_types::serde_bytes")]`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Deserializer, Serializer};

pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(bytes))
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let encoded = String::deserialize(deserializer)?;
    STANDARD
        .decode(encoded.as_bytes())
        .map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Holder {
        #[serde(with = "super")]
        data: Vec<u8>,
    }

    #[test]
    fn encodes_as_base64() {
        let h = Holder {
            data: b"hello".to_vec(),
        };
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, r#"{"data":"aGVsbG8="}"#);
        let back: Holder = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);
    }

    #[test]
    fn rejects_bad_base64() {
        assert!(serde_json::from_str::<Holder>(r#"{"data":"!!"}"#).is_err());
    }
}
