//! MessagePack codec for component records and templates.
//!
//! Records are written with named fields (`rmp_serde::to_vec_named`), so each
//! field's name acts as its stable tag. Decoding ignores fields it does not
//! know, and records that declare `#[serde(default)]` fill absent fields from
//! their `Default` value. Together this keeps old and new builds able to read
//! each other's data.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::EntityError;

/// Encode a record to MessagePack bytes.
///
/// `component` only labels the error.
///
/// # Errors
///
/// Returns [`EntityError::Encode`] if serialisation fails.
pub fn encode<T: Serialize>(component: &'static str, value: &T) -> Result<Vec<u8>, EntityError> {
    rmp_serde::to_vec_named(value).map_err(|source| EntityError::Encode { component, source })
}

/// Decode a record from MessagePack bytes.
///
/// # Errors
///
/// Returns [`EntityError::Decode`] on truncated or malformed input.
pub fn decode<T: DeserializeOwned>(component: &'static str, bytes: &[u8]) -> Result<T, EntityError> {
    rmp_serde::from_slice(bytes).map_err(|source| EntityError::Decode { component, source })
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Motion {
        speed: f32,
        label: String,
    }

    #[derive(Debug, PartialEq, Default, Serialize, Deserialize)]
    #[serde(default)]
    struct MotionV2 {
        speed: f32,
        label: String,
        damping: f32,
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let m = Motion {
            speed: 4.5,
            label: "raft".to_string(),
        };
        let bytes = encode("Motion", &m).unwrap();
        let restored: Motion = decode("Motion", &bytes).unwrap();
        assert_eq!(m, restored);
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let newer = MotionV2 {
            speed: 2.0,
            label: "x".to_string(),
            damping: 0.5,
        };
        let bytes = encode("Motion", &newer).unwrap();
        let older: Motion = decode("Motion", &bytes).unwrap();
        assert_eq!(older.speed, 2.0);
        assert_eq!(older.label, "x");
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let older = Motion {
            speed: 3.0,
            label: "y".to_string(),
        };
        let bytes = encode("Motion", &older).unwrap();
        let newer: MotionV2 = decode("Motion", &bytes).unwrap();
        assert_eq!(newer.speed, 3.0);
        assert_eq!(newer.damping, 0.0);
    }

    #[test]
    fn test_truncated_input_is_a_decode_error() {
        let bytes = encode(
            "Motion",
            &Motion {
                speed: 1.0,
                label: "truncate me".to_string(),
            },
        )
        .unwrap();
        let result: Result<Motion, _> = decode("Motion", &bytes[..bytes.len() / 2]);
        assert!(matches!(
            result,
            Err(EntityError::Decode {
                component: "Motion",
                ..
            })
        ));
    }

    #[test]
    fn test_garbage_is_a_decode_error() {
        let result: Result<Motion, _> = decode("Motion", &[0xFF, 0xFF]);
        assert!(result.is_err());
    }
}
