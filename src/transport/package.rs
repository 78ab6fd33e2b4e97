// ABOUTME: Binary schema for an update package on the wire.
// ABOUTME: Magic, schema version, then tagged length-delimited fields.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Leading bytes of every encoded package.
pub const PACKAGE_MAGIC: &[u8; 4] = b"DSPK";

/// Schema version written by this build.
pub const PACKAGE_SCHEMA_VERSION: u16 = 1;

const TAG_INTEGRITY_KEY: u8 = 1;
const TAG_PAYLOAD: u8 = 2;

const HEADER_SIZE: usize = 4 + 2;
const FIELD_HEADER_SIZE: usize = 1 + 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PackageError {
    #[error("package does not start with the DSPK magic")]
    BadMagic,

    #[error("unsupported package schema version {0}")]
    UnsupportedVersion(u16),

    #[error("package truncated: field needs {needed} bytes, {available} remain")]
    Truncated { needed: usize, available: usize },

    #[error("package is missing the {0} field")]
    MissingField(&'static str),

    #[error("package repeats field tag {0}")]
    DuplicateField(u8),

    #[error("integrity key is not valid UTF-8")]
    InvalidKey,
}

/// A release archive plus the shared secret that authorizes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePackage {
    pub integrity_key: String,
    pub payload: Bytes,
}

impl UpdatePackage {
    pub fn new(integrity_key: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            integrity_key: integrity_key.into(),
            payload: payload.into(),
        }
    }

    pub fn encode(&self) -> Bytes {
        let key = self.integrity_key.as_bytes();
        let mut buf = BytesMut::with_capacity(
            HEADER_SIZE + 2 * FIELD_HEADER_SIZE + key.len() + self.payload.len(),
        );
        buf.put_slice(PACKAGE_MAGIC);
        buf.put_u16(PACKAGE_SCHEMA_VERSION);
        put_field(&mut buf, TAG_INTEGRITY_KEY, key);
        put_field(&mut buf, TAG_PAYLOAD, &self.payload);
        buf.freeze()
    }

    /// Decode a package, skipping tags this build does not know.
    pub fn decode(bytes: &[u8]) -> Result<Self, PackageError> {
        let mut buf = bytes;
        if buf.len() < HEADER_SIZE || &buf[..4] != PACKAGE_MAGIC {
            return Err(PackageError::BadMagic);
        }
        buf.advance(4);

        let version = buf.get_u16();
        if version != PACKAGE_SCHEMA_VERSION {
            return Err(PackageError::UnsupportedVersion(version));
        }

        let mut key: Option<String> = None;
        let mut payload: Option<Bytes> = None;

        while buf.has_remaining() {
            if buf.remaining() < FIELD_HEADER_SIZE {
                return Err(PackageError::Truncated {
                    needed: FIELD_HEADER_SIZE,
                    available: buf.remaining(),
                });
            }
            let tag = buf.get_u8();
            let len = buf.get_u32() as usize;
            if buf.remaining() < len {
                return Err(PackageError::Truncated {
                    needed: len,
                    available: buf.remaining(),
                });
            }
            let value = &buf[..len];

            match tag {
                TAG_INTEGRITY_KEY => {
                    if key.is_some() {
                        return Err(PackageError::DuplicateField(tag));
                    }
                    let text = std::str::from_utf8(value).map_err(|_| PackageError::InvalidKey)?;
                    key = Some(text.to_string());
                }
                TAG_PAYLOAD => {
                    if payload.is_some() {
                        return Err(PackageError::DuplicateField(tag));
                    }
                    payload = Some(Bytes::copy_from_slice(value));
                }
                other => tracing::debug!(tag = other, len, "skipping unknown package field"),
            }
            buf.advance(len);
        }

        Ok(Self {
            integrity_key: key.ok_or(PackageError::MissingField("integrity key"))?,
            payload: payload.ok_or(PackageError::MissingField("payload"))?,
        })
    }
}

fn put_field(buf: &mut BytesMut, tag: u8, value: &[u8]) {
    buf.put_u8(tag);
    buf.put_u32(value.len() as u32);
    buf.put_slice(value);
}
