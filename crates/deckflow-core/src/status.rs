//! User-visible device status.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a device status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusType {
    /// Running normally
    #[default]
    Ok,
    /// Running with a caveat
    Warning,
    /// Not running because of a configuration or hardware problem
    Error,
    /// Not bound to hardware
    Unused,
}

impl fmt::Display for StatusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StatusType::Ok => "Ok",
            StatusType::Warning => "Warning",
            StatusType::Error => "Error",
            StatusType::Unused => "Unused",
        };
        f.write_str(s)
    }
}

/// Message and severity shown for a device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStatus {
    /// Human readable message, empty when nothing to report
    pub message: String,
    /// Severity
    pub kind: StatusType,
}

impl DeviceStatus {
    /// A status with a message.
    pub fn new(message: impl Into<String>, kind: StatusType) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    /// An error status.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(message, StatusType::Error)
    }

    /// A warning status.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(message, StatusType::Warning)
    }

    /// True when nothing has been reported.
    pub fn is_clear(&self) -> bool {
        self.message.is_empty() && self.kind == StatusType::Ok
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}
