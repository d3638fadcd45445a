//! JSON adapter for serde types.

use super::{BoxError, Marshal, Unmarshal};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Stores any serde type as a JSON payload.
///
/// ```
/// use memkv::{Json, Marshal, Unmarshal};
///
/// let payload = Json(vec![1, 2, 3]).marshal().unwrap();
/// assert_eq!(&payload[..], b"[1,2,3]");
///
/// let mut out: Json<Vec<u32>> = Json::default();
/// out.unmarshal(&payload).unwrap();
/// assert_eq!(out.0, vec![1, 2, 3]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    /// Unwraps the inner value.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T: Serialize> Marshal for Json<T> {
    fn marshal(&self) -> Result<Bytes, BoxError> {
        Ok(Bytes::from(serde_json::to_vec(&self.0)?))
    }
}

impl<T: DeserializeOwned> Unmarshal for Json<T> {
    fn unmarshal(&mut self, data: &[u8]) -> Result<(), BoxError> {
        self.0 = serde_json::from_slice(data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Session {
        user: String,
        hits: u32,
    }

    #[test]
    fn test_struct_roundtrip() {
        let session = Json(Session {
            user: "ariz".into(),
            hits: 3,
        });
        let payload = session.marshal().unwrap();

        let mut out = Json::<Session>::default();
        out.unmarshal(&payload).unwrap();
        assert_eq!(out, session);
    }

    #[test]
    fn test_malformed_payload_is_error() {
        let mut out = Json::<Session>::default();
        assert!(out.unmarshal(b"{not json").is_err());
        assert_eq!(out.into_inner(), Session::default());
    }
}
