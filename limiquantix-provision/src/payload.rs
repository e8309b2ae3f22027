//! Boot-time configuration payloads.
//!
//! A payload is a set of named text files handed to the VM on a virtual
//! device at first boot, where cloud-init or sysprep picks them up.

use serde::{Deserialize, Serialize};

use crate::error::{ProvisionError, Result};

/// Device a payload is delivered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadKind {
    Floppy,
}

impl PayloadKind {
    /// Name used by the backend APIs.
    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadKind::Floppy => "floppy",
        }
    }
}

impl std::fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single file inside a payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadFile {
    pub name: String,
    pub content: String,
}

impl PayloadFile {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// A typed payload holding at least one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationPayload {
    kind: PayloadKind,
    files: Vec<PayloadFile>,
}

impl ConfigurationPayload {
    /// Create a payload from a list of files.
    ///
    /// Fails when `files` is empty, has a file without a name, or names the
    /// same file twice.
    pub fn new(kind: PayloadKind, files: Vec<PayloadFile>) -> Result<Self> {
        if files.is_empty() {
            return Err(ProvisionError::InvalidPayload(
                "a payload must contain at least one file".to_string(),
            ));
        }

        for (i, file) in files.iter().enumerate() {
            if file.name.trim().is_empty() {
                return Err(ProvisionError::InvalidPayload(
                    format!("file #{} has an empty name", i),
                ));
            }
            if files[..i].iter().any(|f| f.name == file.name) {
                return Err(ProvisionError::InvalidPayload(
                    format!("duplicate file name '{}'", file.name),
                ));
            }
        }

        Ok(Self { kind, files })
    }

    /// A floppy payload carrying exactly one file.
    pub fn floppy(name: impl Into<String>, content: impl Into<String>) -> Result<Self> {
        Self::new(PayloadKind::Floppy, vec![PayloadFile::new(name, content)])
    }

    pub fn kind(&self) -> PayloadKind {
        self.kind
    }

    pub fn files(&self) -> &[PayloadFile] {
        &self.files
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floppy_payload() {
        let payload = ConfigurationPayload::floppy("user-data.txt", "#cloud-config").unwrap();

        assert_eq!(payload.kind(), PayloadKind::Floppy);
        assert_eq!(payload.files().len(), 1);
        assert_eq!(payload.files()[0].name, "user-data.txt");
        assert_eq!(payload.files()[0].content, "#cloud-config");
    }

    #[test]
    fn test_empty_payload_rejected() {
        let err = ConfigurationPayload::new(PayloadKind::Floppy, Vec::new()).unwrap_err();
        assert!(matches!(err, ProvisionError::InvalidPayload(_)));
    }

    #[test]
    fn test_duplicate_and_blank_names_rejected() {
        let dup = ConfigurationPayload::new(
            PayloadKind::Floppy,
            vec![PayloadFile::new("a", "1"), PayloadFile::new("a", "2")],
        );
        assert!(dup.is_err());

        assert!(ConfigurationPayload::floppy("  ", "x").is_err());
    }

    #[test]
    fn test_kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&PayloadKind::Floppy).unwrap(), "\"floppy\"");
        assert_eq!(PayloadKind::Floppy.to_string(), "floppy");
    }
}
