use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of `POST /api/contact`.
///
/// Every field is optional at the wire level so that an incomplete form maps
/// to a 400 rather than a deserialization failure.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactSubmission {
    pub name: Option<String>,
    pub email: Option<String>,
    pub message: Option<String>,
    pub csrf_token: Option<String>,
}

/// A submission whose required fields are all present and non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub message: String,
}

impl ContactSubmission {
    pub fn into_message(self) -> Option<ContactMessage> {
        fn present(v: Option<String>) -> Option<String> {
            v.filter(|s| !s.is_empty())
        }
        Some(ContactMessage {
            name: present(self.name)?,
            email: present(self.email)?,
            message: present(self.message)?,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactReceipt {
    pub success: bool,
    pub message: String,
    /// Human-readable, e.g. "October 16, 2026 at 02:05:09 PM UTC".
    pub received_at: String,
    /// RFC 3339.
    pub timestamp: String,
}

impl ContactReceipt {
    pub fn at(received: DateTime<Utc>) -> Self {
        Self {
            success: true,
            message: "Message received successfully!".to_string(),
            received_at: received.format("%B %-d, %Y at %I:%M:%S %p UTC").to_string(),
            timestamp: received.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsrfTokenResponse {
    pub csrf_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_submission_reads_camel_case_token() {
        let s: ContactSubmission = serde_json::from_str(
            r#"{"name":"Ada","email":"ada@example.com","message":"hi","csrfToken":"a.1.b"}"#,
        )
        .unwrap();
        assert_eq!(s.csrf_token.as_deref(), Some("a.1.b"));
        assert!(s.into_message().is_some());
    }

    #[test]
    fn test_empty_field_is_missing() {
        let s = ContactSubmission {
            name: Some("Ada".into()),
            email: Some("".into()),
            message: Some("hi".into()),
            csrf_token: None,
        };
        assert!(s.into_message().is_none());
    }

    #[test]
    fn test_whitespace_field_is_present() {
        let s = ContactSubmission {
            name: Some("Ada".into()),
            email: Some("ada@example.com".into()),
            message: Some("   ".into()),
            csrf_token: None,
        };
        let msg = s.into_message().unwrap();
        assert_eq!(msg.message, "   ");
    }

    #[test]
    fn test_receipt_formats() {
        let at = Utc.with_ymd_and_hms(2026, 10, 16, 14, 5, 9).unwrap();
        let receipt = ContactReceipt::at(at);
        assert_eq!(receipt.received_at, "October 16, 2026 at 02:05:09 PM UTC");
        assert_eq!(receipt.timestamp, "2026-10-16T14:05:09.000Z");

        let json = serde_json::to_value(&receipt).unwrap();
        assert_eq!(json["success"], true);
        assert!(json.get("receivedAt").is_some());
    }

    #[test]
    fn test_token_response_shape() {
        let json = serde_json::to_value(CsrfTokenResponse { csrf_token: "t".into() }).unwrap();
        assert_eq!(json, serde_json::json!({ "csrfToken": "t" }));
    }
}
