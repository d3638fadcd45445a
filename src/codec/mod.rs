//! Value Codec Module
//!
//! The store never looks inside values. Callers hand it types that can turn
//! themselves into bytes ([`Marshal`]) and fill themselves back in from bytes
//! ([`Unmarshal`]); the store keeps only the resulting payload.
//!
//! ```text
//!   caller value ──marshal──> Bytes ──(map slot)──> Bytes ──unmarshal──> caller value
//! ```
//!
//! Implementations are provided for raw byte and string types. With the
//! `json` feature, [`Json`] adapts any serde type.

#[cfg(feature = "json")]
pub mod json;

#[cfg(feature = "json")]
pub use json::Json;

use bytes::Bytes;

/// Boxed error returned by codec implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Serializes a value into an opaque payload.
pub trait Marshal {
    /// Encodes `self`. Encoding may be slow; it always runs outside the
    /// store's lock.
    fn marshal(&self) -> Result<Bytes, BoxError>;
}

/// Deserializes a payload into an existing value.
pub trait Unmarshal {
    /// Overwrites `self` with the value encoded in `data`.
    fn unmarshal(&mut self, data: &[u8]) -> Result<(), BoxError>;
}

/// A sink for [`Store::get_all`](crate::Store::get_all).
///
/// Each retrieved entry is decoded into a fresh slot obtained from
/// [`new_item`](Collection::new_item).
pub trait Collection {
    /// The element type entries are decoded into.
    type Item: Unmarshal;

    /// Appends a fresh decode target and returns it.
    fn new_item(&mut self) -> &mut Self::Item;
}

impl<T: Unmarshal + Default> Collection for Vec<T> {
    type Item = T;

    fn new_item(&mut self) -> &mut T {
        self.push(T::default());
        let last = self.len() - 1;
        &mut self[last]
    }
}

impl Marshal for Bytes {
    fn marshal(&self) -> Result<Bytes, BoxError> {
        Ok(self.clone())
    }
}

impl Unmarshal for Bytes {
    fn unmarshal(&mut self, data: &[u8]) -> Result<(), BoxError> {
        *self = Bytes::copy_from_slice(data);
        Ok(())
    }
}

impl Marshal for Vec<u8> {
    fn marshal(&self) -> Result<Bytes, BoxError> {
        Ok(Bytes::copy_from_slice(self))
    }
}

impl Unmarshal for Vec<u8> {
    fn unmarshal(&mut self, data: &[u8]) -> Result<(), BoxError> {
        self.clear();
        self.extend_from_slice(data);
        Ok(())
    }
}

impl Marshal for str {
    fn marshal(&self) -> Result<Bytes, BoxError> {
        Ok(Bytes::copy_from_slice(self.as_bytes()))
    }
}

impl Marshal for String {
    fn marshal(&self) -> Result<Bytes, BoxError> {
        self.as_str().marshal()
    }
}

impl Unmarshal for String {
    fn unmarshal(&mut self, data: &[u8]) -> Result<(), BoxError> {
        let text = std::str::from_utf8(data)?;
        self.clear();
        self.push_str(text);
        Ok(())
    }
}
