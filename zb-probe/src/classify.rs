//! Normalization of detection failures into stable messages

use zb_detect::DetectError;

pub const TIMEOUT: &str = "Detection timeout - possibly not a Zigbee adapter";
pub const PERMISSION_DENIED: &str = "Permission denied - check device permissions";
pub const NOT_FOUND: &str = "Device not found";
pub const BUSY: &str = "Device busy - possibly in use by another process";

/// Message reported for a failed detection
///
/// Structured variants map directly. Anything else goes through
/// [`classify_message`] on its rendered text.
pub fn classify_error(err: &DetectError) -> String {
    match err {
        DetectError::Timeout { .. } => TIMEOUT.to_string(),
        DetectError::PermissionDenied(_) => PERMISSION_DENIED.to_string(),
        DetectError::NotFound(_) => NOT_FOUND.to_string(),
        DetectError::PortBusy(_) => BUSY.to_string(),
        other => classify_message(&other.to_string()),
    }
}

/// Match an opaque error message against known patterns, first match wins
pub fn classify_message(message: &str) -> String {
    const PATTERNS: [(&[&str], &str); 4] = [
        (&["timeout", "TIMEOUT"], TIMEOUT),
        (&["Permission denied", "EACCES"], PERMISSION_DENIED),
        (&["No such file", "ENOENT"], NOT_FOUND),
        (&["Device or resource busy", "EBUSY"], BUSY),
    ];

    PATTERNS
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| message.contains(n)))
        .map(|(_, classified)| classified.to_string())
        .unwrap_or_else(|| message.to_string())
}
