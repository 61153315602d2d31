//! Control messages accepted by the inbox
//!
//! Wire format is one JSON object per message, discriminated by `action`:
//!
//! ```json
//! {"action": "purchased", "bucket": "servers", "amount": 120}
//! ```
//!
//! Decoding is defensive. Anything that fails to parse or validate comes back
//! as a [`MessageError`] and the caller drops it.

use serde::{Deserialize, Serialize};

use crate::{BucketName, MessageError};

/// One control message, carrying only the fields its action needs
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum ControlMessage {
    /// Money was spent from a bucket
    Purchased { bucket: BucketName, amount: f64 },
    /// The bucket's owner has nothing left to buy
    Done { bucket: BucketName },
    /// Remaining known cost of the bucket's purchases
    ReportCap { bucket: BucketName, cap: f64 },
    /// Route all income to this bucket
    Rush { bucket: BucketName },
    /// Stop routing all income to one bucket
    CancelRush {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bucket: Option<BucketName>,
    },
    /// Set the bucket's allocation weight
    UpdateWeight { bucket: BucketName, weight: f64 },
    /// Restore every bucket's default weight
    ResetWeights {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bucket: Option<BucketName>,
    },
}

impl ControlMessage {
    /// Decode and validate a raw payload
    pub fn decode(raw: &str) -> Result<Self, MessageError> {
        let message: ControlMessage = serde_json::from_str(raw.trim())?;
        message.validate()?;
        Ok(message)
    }

    /// Encode as a single-line JSON payload
    pub fn encode(&self) -> Result<String, MessageError> {
        self.validate()?;
        Ok(serde_json::to_string(self)?)
    }

    /// Check bucket names and numeric ranges
    pub fn validate(&self) -> Result<(), MessageError> {
        if let Some(bucket) = self.bucket() {
            if bucket.as_str().trim().is_empty() {
                return Err(MessageError::EmptyBucket);
            }
        }

        match self {
            ControlMessage::Purchased { amount, .. } if !(amount.is_finite() && *amount > 0.0) => {
                Err(self.invalid("amount", *amount))
            }
            ControlMessage::ReportCap { cap, .. } if !(cap.is_finite() && *cap >= 0.0) => {
                Err(self.invalid("cap", *cap))
            }
            ControlMessage::UpdateWeight { weight, .. }
                if !(weight.is_finite() && *weight >= 0.0) =>
            {
                Err(self.invalid("weight", *weight))
            }
            _ => Ok(()),
        }
    }

    /// The bucket this message references, if any
    pub fn bucket(&self) -> Option<&BucketName> {
        match self {
            ControlMessage::Purchased { bucket, .. }
            | ControlMessage::Done { bucket }
            | ControlMessage::ReportCap { bucket, .. }
            | ControlMessage::Rush { bucket }
            | ControlMessage::UpdateWeight { bucket, .. } => Some(bucket),
            ControlMessage::CancelRush { bucket } | ControlMessage::ResetWeights { bucket } => {
                bucket.as_ref()
            }
        }
    }

    /// Wire name of the action
    pub fn action(&self) -> &'static str {
        match self {
            ControlMessage::Purchased { .. } => "purchased",
            ControlMessage::Done { .. } => "done",
            ControlMessage::ReportCap { .. } => "report-cap",
            ControlMessage::Rush { .. } => "rush",
            ControlMessage::CancelRush { .. } => "cancel-rush",
            ControlMessage::UpdateWeight { .. } => "update-weight",
            ControlMessage::ResetWeights { .. } => "reset-weights",
        }
    }

    fn invalid(&self, field: &'static str, value: f64) -> MessageError {
        MessageError::InvalidValue {
            action: self.action(),
            field,
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_purchased() {
        let msg = ControlMessage::decode(r#"{"action":"purchased","bucket":"A","amount":120}"#)
            .unwrap();
        assert_eq!(
            msg,
            ControlMessage::Purchased {
                bucket: BucketName::new("A"),
                amount: 120.0
            }
        );
    }

    #[test]
    fn test_decode_ignores_extra_fields() {
        let msg =
            ControlMessage::decode(r#"{"action":"done","bucket":"hacknet","sender":"hacknet.js"}"#)
                .unwrap();
        assert_eq!(msg.bucket(), Some(&BucketName::new("hacknet")));
    }

    #[test]
    fn test_decode_optional_bucket() {
        let msg = ControlMessage::decode(r#"{"action":"cancel-rush"}"#).unwrap();
        assert_eq!(msg, ControlMessage::CancelRush { bucket: None });

        let msg = ControlMessage::decode(r#"{"action":"reset-weights","bucket":"x"}"#).unwrap();
        assert_eq!(msg.bucket(), Some(&BucketName::new("x")));
    }

    #[test]
    fn test_rejects_negative_weight() {
        let err = ControlMessage::decode(r#"{"action":"update-weight","bucket":"A","weight":-5}"#)
            .unwrap_err();
        assert!(matches!(
            err,
            MessageError::InvalidValue {
                field: "weight",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_zero_purchase() {
        let err = ControlMessage::decode(r#"{"action":"purchased","bucket":"A","amount":0}"#)
            .unwrap_err();
        assert!(matches!(err, MessageError::InvalidValue { .. }));
    }

    #[test]
    fn test_rejects_negative_cap() {
        assert!(
            ControlMessage::decode(r#"{"action":"report-cap","bucket":"A","cap":-1}"#).is_err()
        );
        assert!(ControlMessage::decode(r#"{"action":"report-cap","bucket":"A","cap":0}"#).is_ok());
    }

    #[test]
    fn test_rejects_malformed_payloads() {
        for raw in [
            "not json",
            r#"{"bucket":"A"}"#,
            r#"{"action":"explode","bucket":"A"}"#,
            r#"{"action":"purchased","bucket":"A"}"#,
            r#"{"action":"purchased","bucket":"A","amount":"lots"}"#,
            r#"{"action":"rush"}"#,
        ] {
            assert!(
                matches!(ControlMessage::decode(raw), Err(MessageError::Malformed(_))),
                "expected malformed: {}",
                raw
            );
        }
    }

    #[test]
    fn test_rejects_empty_bucket() {
        let err = ControlMessage::decode(r#"{"action":"rush","bucket":"  "}"#).unwrap_err();
        assert_eq!(err, MessageError::EmptyBucket);
    }

    #[test]
    fn test_encode_uses_wire_names() {
        let msg = ControlMessage::ReportCap {
            bucket: BucketName::new("programs"),
            cap: 5_000_000.0,
        };
        let raw = msg.encode().unwrap();
        assert!(raw.contains(r#""action":"report-cap""#));
        assert_eq!(ControlMessage::decode(&raw).unwrap(), msg);
    }

    #[test]
    fn test_encode_refuses_invalid() {
        let msg = ControlMessage::UpdateWeight {
            bucket: BucketName::new("A"),
            weight: -1.0,
        };
        assert!(msg.encode().is_err());
    }
}
