use thiserror::Error;

/// A roster photo reference. The roster only ever stores the file
/// name of a photo kept elsewhere, never the image itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhotoRef<'a>(&'a str);

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PhotoRefError {
    #[error("photo reference is empty")]
    Empty,
    #[error("photo is an inline data URL instead of a file name")]
    InlineData,
    #[error("photo is a structured blob instead of a file name")]
    Structured,
    #[error("photo reference is longer than {} bytes", PhotoRef::MAX_LEN)]
    TooLong,
    #[error("photo reference must not contain path separators")]
    PathSeparator,
}

impl<'a> PhotoRef<'a> {
    pub const MAX_LEN: usize = 200;

    pub fn parse(value: &'a str) -> Result<Self, PhotoRefError> {
        let value = value.trim();
        if value.is_empty() {
            Err(PhotoRefError::Empty)
        } else if value.starts_with("data:") {
            Err(PhotoRefError::InlineData)
        } else if value.starts_with('{') || value.starts_with('[') {
            Err(PhotoRefError::Structured)
        } else if value.len() >= Self::MAX_LEN {
            Err(PhotoRefError::TooLong)
        } else if value.contains(['/', '\\']) || value == ".." {
            Err(PhotoRefError::PathSeparator)
        } else {
            Ok(Self(value))
        }
    }

    #[must_use]
    pub fn file_name(self) -> &'a str {
        self.0
    }
}
