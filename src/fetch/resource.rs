//! The immutable result of a successful fetch.

use std::io::Cursor;

use bytes::Bytes;
use encoding_rs::{Encoding, UTF_8};

use super::FetchError;

/// Fetched bytes. Cloning is cheap and shares the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    data: Bytes,
}

impl Resource {
    #[must_use]
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    /// Read-only view of the bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Shared handle to the bytes.
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        self.data.clone()
    }

    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        self.data
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// A fresh reader positioned at the start. Each call is independent.
    #[must_use]
    pub fn as_stream(&self) -> Cursor<Bytes> {
        Cursor::new(self.data.clone())
    }

    /// Decodes the whole buffer with `encoding`.
    ///
    /// No BOM sniffing is done and malformed input is an error rather than
    /// being replaced.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Decoding`] if the bytes are not valid in `encoding`.
    pub fn as_text(&self, encoding: &'static Encoding) -> Result<String, FetchError> {
        encoding
            .decode_without_bom_handling_and_without_replacement(&self.data)
            .map(std::borrow::Cow::into_owned)
            .ok_or_else(|| {
                FetchError::decoding(encoding.name(), "malformed byte sequence")
            })
    }

    /// Decodes the buffer as UTF-8.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Decoding`] on invalid UTF-8.
    pub fn as_string(&self) -> Result<String, FetchError> {
        self.as_text(UTF_8)
    }

    /// Decodes with the encoding named by a WHATWG label such as
    /// `"latin1"` or `"shift_jis"`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Decoding`] for an unknown label or malformed bytes.
    pub fn as_text_with_label(&self, label: &str) -> Result<String, FetchError> {
        let encoding = Encoding::for_label(label.trim().as_bytes())
            .ok_or_else(|| FetchError::decoding(label, "unknown encoding label"))?;
        self.as_text(encoding)
    }
}

impl From<Vec<u8>> for Resource {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl AsRef<[u8]> for Resource {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Read;

    use encoding_rs::{SHIFT_JIS, WINDOWS_1252};

    use super::*;

    #[test]
    fn test_stream_reads_are_repeatable() {
        let resource = Resource::new(b"hello ftp".to_vec());

        let mut first = Vec::new();
        resource.as_stream().read_to_end(&mut first).unwrap();
        let mut second = Vec::new();
        resource.as_stream().read_to_end(&mut second).unwrap();

        assert_eq!(first, b"hello ftp");
        assert_eq!(first, second);
    }

    #[test]
    fn test_streams_are_independent() {
        let resource = Resource::new(b"abcdef".to_vec());
        let mut a = resource.as_stream();
        let mut b = resource.as_stream();

        let mut head = [0u8; 3];
        a.read_exact(&mut head).unwrap();
        let mut all = Vec::new();
        b.read_to_end(&mut all).unwrap();

        assert_eq!(&head, b"abc");
        assert_eq!(all, b"abcdef");
    }

    #[test]
    fn test_text_round_trips_through_encodings() {
        for (encoding, text) in [
            (UTF_8, "Grüße, 世界"),
            (WINDOWS_1252, "café crème"),
            (SHIFT_JIS, "こんにちは"),
        ] {
            let (encoded, _, had_errors) = encoding.encode(text);
            assert!(!had_errors);
            let resource = Resource::new(encoded.into_owned());

            let decoded = resource.as_text(encoding).unwrap();
            assert_eq!(decoded, text);
            assert_eq!(encoding.encode(&decoded).0.as_ref(), resource.as_bytes());
        }
    }

    #[test]
    fn test_invalid_utf8_is_decoding_error() {
        let resource = Resource::new(vec![0x66, 0x6f, 0xff, 0x6f]);
        let error = resource.as_string().unwrap_err();
        assert!(matches!(error, FetchError::Decoding { ref encoding, .. } if encoding == "UTF-8"));
    }

    #[test]
    fn test_label_lookup() {
        let resource = Resource::new(vec![0x63, 0x61, 0x66, 0xe9]);
        assert_eq!(resource.as_text_with_label("latin1").unwrap(), "café");
        assert!(matches!(
            resource.as_text_with_label("klingon").unwrap_err(),
            FetchError::Decoding { .. }
        ));
    }

    #[test]
    fn test_bom_is_kept() {
        let resource = Resource::new(b"\xEF\xBB\xBFhi".to_vec());
        assert_eq!(resource.as_string().unwrap(), "\u{feff}hi");
    }

    #[test]
    fn test_len_and_empty() {
        assert!(Resource::new(Vec::new()).is_empty());
        assert_eq!(Resource::from(vec![1, 2, 3]).len(), 3);
    }
}
