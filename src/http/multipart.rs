//! Multipart form data support.
//!
//! Provides RFC 2046 multipart/form-data encoding for file uploads. Each part
//! is framed as:
//!
//! ```text
//! --boundary\r\n
//! Content-Disposition: form-data; name="field"[; filename="f"\r\nContent-Type: t]\r\n\r\n
//! <payload>\r\n
//! ```
//!
//! and the form ends with `--boundary--\r\n`. The same header text is used to
//! compute `Content-Length` and to write the body.
//!
//! # Example
//! ```ignore
//! use proxynet::http::multipart::{Form, Part};
//!
//! let form = Form::new()
//!     .text("username", "user123")
//!     .part("file", Part::file("doc.txt"));
//! ```

use crate::http::params::determine_media_type;
use crate::http::requestbody::RequestBody;
use rand::distr::Alphanumeric;
use rand::Rng;
use std::borrow::Cow;
use std::io::{self, Write};
use std::path::Path;

const BOUNDARY_PREFIX: &str = "----------------";
const BOUNDARY_RANDOM_LEN: usize = 16;
/// Longest boundary RFC 2046 allows.
pub const MAX_BOUNDARY_LEN: usize = 70;

/// A multipart form for file uploads.
#[derive(Debug)]
pub struct Form {
    boundary: String,
    fields: Vec<(String, Part)>,
}

impl Default for Form {
    fn default() -> Self {
        Self::new()
    }
}

impl Form {
    /// Create a new empty form with a random boundary.
    pub fn new() -> Self {
        Self::with_rng(&mut rand::rng())
    }

    /// Create a new empty form, drawing the boundary from `rng`.
    pub fn with_rng<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            boundary: generate_boundary(rng),
            fields: Vec::new(),
        }
    }

    /// Use a fixed boundary of 1 to 70 characters.
    pub fn with_boundary(boundary: impl Into<String>) -> io::Result<Self> {
        let boundary = boundary.into();
        if boundary.is_empty() || boundary.len() > MAX_BOUNDARY_LEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("boundary must be 1 to {MAX_BOUNDARY_LEN} characters"),
            ));
        }
        Ok(Self {
            boundary,
            fields: Vec::new(),
        })
    }

    /// Get the boundary string.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Add a text field.
    pub fn text(self, name: impl Into<String>, value: &str) -> Self {
        self.part(name, Part::new(RequestBody::from(value)))
    }

    /// Add a custom part.
    pub fn part(mut self, name: impl Into<String>, part: Part) -> Self {
        self.fields.push((name.into(), part));
        self
    }

    /// Add a part through a mutable reference.
    pub fn push(&mut self, name: impl Into<String>, part: Part) {
        self.fields.push((name.into(), part));
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Get the Content-Type header value.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Total body length: every part's framing and payload plus the closing boundary.
    pub fn content_length(&self) -> io::Result<u64> {
        let mut length = 0u64;
        for (name, part) in &self.fields {
            // --boundary\r\n <headers> <payload> \r\n
            length += (2 + self.boundary.len() + 2) as u64;
            length += part.format_headers(name).len() as u64;
            length += part.content.content_length()?;
            length += 2;
        }
        // --boundary--\r\n
        length += (2 + self.boundary.len() + 4) as u64;
        Ok(length)
    }

    pub fn write_to<W: Write + ?Sized>(&mut self, out: &mut W) -> io::Result<()> {
        let opening = format!("--{}\r\n", self.boundary);
        for (name, part) in &mut self.fields {
            out.write_all(opening.as_bytes())?;
            out.write_all(part.format_headers(name).as_bytes())?;
            part.content.write_to(out)?;
            out.write_all(b"\r\n")?;
        }
        out.write_all(format!("--{}--\r\n", self.boundary).as_bytes())
    }
}

/// A part of a multipart form.
#[derive(Debug)]
pub struct Part {
    content: RequestBody,
    file_name: Option<String>,
    content_type: Option<String>,
}

impl Part {
    pub fn new(content: RequestBody) -> Self {
        Self {
            content,
            file_name: None,
            content_type: None,
        }
    }

    /// A file part named after the file, typed by its extension.
    pub fn file(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::new(RequestBody::file(path)).file_name(file_name)
    }

    /// Set the file name. Unless a content type was set explicitly, it is
    /// derived from the file name's extension.
    pub fn file_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if self.content_type.is_none() {
            let extension = Path::new(&name)
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or_default();
            self.content_type = Some(determine_media_type(extension).to_string());
        }
        self.file_name = Some(name);
        self
    }

    /// Set the content type sent for a file part.
    pub fn content_type(mut self, mime: impl Into<String>) -> Self {
        self.content_type = Some(mime.into());
        self
    }

    /// Headers of this part, including the blank line that ends them.
    fn format_headers(&self, name: &str) -> String {
        match &self.file_name {
            Some(file_name) => {
                let content_type = self
                    .content_type
                    .clone()
                    .unwrap_or_else(|| self.content.content_type());
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                    escape_quotes(name),
                    escape_quotes(file_name),
                    content_type
                )
            }
            None => format!(
                "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                escape_quotes(name)
            ),
        }
    }
}

/// Escape quotes and backslashes in a string.
fn escape_quotes(s: &str) -> Cow<'_, str> {
    if s.contains('"') || s.contains('\\') || s.contains('\r') || s.contains('\n') {
        Cow::Owned(
            s.replace('\\', "\\\\")
                .replace('"', "\\\"")
                .replace('\r', "\\r")
                .replace('\n', "\\n"),
        )
    } else {
        Cow::Borrowed(s)
    }
}

/// Sixteen dashes followed by sixteen random alphanumerics.
fn generate_boundary<R: Rng + ?Sized>(rng: &mut R) -> String {
    let random: String = (0..BOUNDARY_RANDOM_LEN)
        .map(|_| char::from(rng.sample(Alphanumeric)))
        .collect();
    format!("{BOUNDARY_PREFIX}{random}")
}
