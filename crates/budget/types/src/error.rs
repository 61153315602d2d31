use thiserror::Error;

/// Reasons a control message is rejected.
///
/// Rejected messages are dropped by the inbox; none of these is fatal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MessageError {
    /// Not JSON, unknown action, or a required field is missing
    #[error("malformed control message: {0}")]
    Malformed(String),

    #[error("control message names an empty bucket")]
    EmptyBucket,

    /// Numeric field outside its allowed range
    #[error("invalid {field} for {action}: {value}")]
    InvalidValue {
        action: &'static str,
        field: &'static str,
        value: f64,
    },
}

impl From<serde_json::Error> for MessageError {
    fn from(e: serde_json::Error) -> Self {
        MessageError::Malformed(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = MessageError::InvalidValue {
            action: "update-weight",
            field: "weight",
            value: -5.0,
        };
        assert_eq!(err.to_string(), "invalid weight for update-weight: -5");
        assert!(MessageError::EmptyBucket.to_string().contains("empty bucket"));
    }
}
