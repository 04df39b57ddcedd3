//! File slots holding the two inputs of a conversion.

use std::fmt;
use std::path::Path;

use bytes::Bytes;

use super::error::DomainError;

/// The two named inputs a conversion needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileSlot {
    /// Copper/outline layer in Gerber format.
    Gerber,
    /// Excellon drill file.
    Drill,
}

impl FileSlot {
    pub const ALL: [FileSlot; 2] = [FileSlot::Gerber, FileSlot::Drill];

    /// Multipart field name the conversion endpoint expects for this slot.
    pub fn form_field(self) -> &'static str {
        match self {
            FileSlot::Gerber => "gerber_file",
            FileSlot::Drill => "drill_file",
        }
    }
}

impl fmt::Display for FileSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileSlot::Gerber => f.write_str("primary layout"),
            FileSlot::Drill => f.write_str("drill"),
        }
    }
}

/// An opaque file picked by the user: its original name plus its bytes.
///
/// The contents are never interpreted on this side of the wire.
#[derive(Clone, PartialEq, Eq)]
pub struct SelectedFile {
    name: String,
    data: Bytes,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Result<Self, DomainError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("file name must not be empty"));
        }
        Ok(Self {
            name,
            data: data.into(),
        })
    }

    /// Build a selection from a path, using its final component as the name.
    pub fn from_path(path: &Path, data: impl Into<Bytes>) -> Result<Self, DomainError> {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                DomainError::validation(format!("`{}` has no usable file name", path.display()))
            })?;
        Self::new(name, data)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for SelectedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedFile")
            .field("name", &self.name)
            .field("len", &self.data.len())
            .finish()
    }
}
