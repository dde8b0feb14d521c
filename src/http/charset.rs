//! Character sets for string content and text bodies.

use std::fmt;

/// Character sets the client can encode and decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Charset {
    #[default]
    Utf8,
    /// ISO-8859-1
    Latin1,
    /// US-ASCII
    Ascii,
}

impl Charset {
    /// Look up a charset by its IANA label, ignoring case.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim().trim_matches('"');
        match label.to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Some(Charset::Utf8),
            "iso-8859-1" | "iso8859-1" | "latin1" | "l1" => Some(Charset::Latin1),
            "us-ascii" | "ascii" => Some(Charset::Ascii),
            _ => None,
        }
    }

    /// The `charset=` parameter of a `Content-Type` value, when it names a known charset.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        content_type.split(';').skip(1).find_map(|param| {
            let (name, value) = param.split_once('=')?;
            if name.trim().eq_ignore_ascii_case("charset") {
                Self::from_label(value)
            } else {
                None
            }
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Charset::Utf8 => "utf-8",
            Charset::Latin1 => "iso-8859-1",
            Charset::Ascii => "us-ascii",
        }
    }

    /// Unrepresentable characters become `?`.
    pub fn encode(self, text: &str) -> Vec<u8> {
        match self {
            Charset::Utf8 => text.as_bytes().to_vec(),
            Charset::Latin1 => text
                .chars()
                .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
                .collect(),
            Charset::Ascii => text
                .chars()
                .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
                .collect(),
        }
    }

    pub fn encoded_len(self, text: &str) -> usize {
        match self {
            Charset::Utf8 => text.len(),
            Charset::Latin1 | Charset::Ascii => text.chars().count(),
        }
    }

    /// Invalid sequences become U+FFFD.
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Charset::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Charset::Latin1 => bytes.iter().map(|&b| char::from(b)).collect(),
            Charset::Ascii => bytes
                .iter()
                .map(|&b| if b.is_ascii() { char::from(b) } else { char::REPLACEMENT_CHARACTER })
                .collect(),
        }
    }

    /// Value of the `Accept-Charset` request header for this charset.
    pub fn accept_charset(self) -> String {
        match self {
            Charset::Utf8 => "utf-8;q=0.7,*;q=0.3".to_string(),
            other => format!("{},utf-8;q=0.7,*;q=0.3", other.name()),
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_content_type() {
        assert_eq!(
            Charset::from_content_type("text/html; charset=ISO-8859-1"),
            Some(Charset::Latin1)
        );
        assert_eq!(
            Charset::from_content_type("text/plain;charset=\"utf-8\""),
            Some(Charset::Utf8)
        );
        assert_eq!(Charset::from_content_type("text/plain"), None);
        assert_eq!(Charset::from_content_type("text/plain; charset=koi8-r"), None);
    }

    #[test]
    fn test_latin1_round_trip_of_high_bytes() {
        let bytes = Charset::Latin1.encode("caf\u{e9}");
        assert_eq!(bytes, b"caf\xe9");
        assert_eq!(Charset::Latin1.decode(&bytes), "caf\u{e9}");
        assert_eq!(Charset::Latin1.encode("\u{20ac}"), b"?");
    }

    #[test]
    fn test_encoded_len_matches_encode() {
        for charset in [Charset::Utf8, Charset::Latin1, Charset::Ascii] {
            let text = "na\u{ef}ve \u{2603}";
            assert_eq!(charset.encoded_len(text), charset.encode(text).len());
        }
    }

    #[test]
    fn test_accept_charset() {
        assert_eq!(Charset::Utf8.accept_charset(), "utf-8;q=0.7,*;q=0.3");
        assert_eq!(
            Charset::Latin1.accept_charset(),
            "iso-8859-1,utf-8;q=0.7,*;q=0.3"
        );
    }
}
