//! Upload operations
//!
//! An [`UploadOperation`] is one part of a multi-part asset upload as handed
//! out by an App Store Connect reservation: a byte window into the asset and
//! the pre-signed destination that window must be sent to.

use std::fmt;
use std::io::{self, Read, Seek, SeekFrom};
use std::ops::Range;

use reqwest::header::CONTENT_LENGTH;
use reqwest::{Client, Method, Request};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{Result, UploadError};

/// One part of an asset upload.
///
/// Mirrors the `UploadOperation` object of the App Store Connect API. Every
/// field is optional on the wire; missing bounds and missing destinations are
/// reported separately when the part is chunked or turned into a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOperation {
    /// Number of bytes in this part
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u64>,

    /// HTTP method for the part request (usually `PUT`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// Byte offset of this part within the asset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,

    /// Headers the destination expects on the part request
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub request_headers: Vec<UploadOperationHeader>,

    /// Pre-signed destination URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A single header of an upload operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadOperationHeader {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl UploadOperationHeader {
    /// Create a header with both name and value present
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            value: Some(value.into()),
        }
    }
}

impl UploadOperation {
    /// Create a fully specified operation
    pub fn new(
        method: impl Into<String>,
        url: impl Into<String>,
        offset: u64,
        length: u64,
    ) -> Self {
        Self {
            length: Some(length),
            method: Some(method.into()),
            offset: Some(offset),
            request_headers: Vec::new(),
            url: Some(url.into()),
        }
    }

    /// Add a header to the operation
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request_headers.push(UploadOperationHeader::new(name, value));
        self
    }

    /// The `[offset, offset + length)` window, when both bounds are present
    pub fn range(&self) -> Option<Range<u64>> {
        let offset = self.offset?;
        let length = self.length?;
        Some(offset..offset.saturating_add(length))
    }

    /// Headers that carry both a name and a value, in list order
    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.request_headers
            .iter()
            .filter_map(|h| Some((h.name.as_deref()?, h.value.as_deref()?)))
    }

    /// Read this part's bytes from `source`.
    ///
    /// Seeks to the absolute offset and reads exactly `length` bytes. A
    /// source that ends before the window is filled is an error.
    pub fn chunk<R: Read + Seek + ?Sized>(&self, source: &mut R) -> Result<Vec<u8>> {
        let (Some(offset), Some(length)) = (self.offset, self.length) else {
            return Err(UploadError::MissingChunkBounds);
        };

        let length = usize::try_from(length).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("part length {} does not fit in memory", length),
            )
        })?;

        source.seek(SeekFrom::Start(offset))?;

        let mut data = vec![0u8; length];
        source.read_exact(&mut data)?;

        trace!(offset, length, "read upload chunk");
        Ok(data)
    }

    /// Build the request that sends `data` to this part's destination.
    ///
    /// The request carries no credentials; destinations are pre-signed.
    /// Content-Length is always set explicitly to the body size.
    pub fn request(&self, client: &Client, data: Vec<u8>) -> Result<Request> {
        let (Some(method), Some(url)) = (self.method.as_deref(), self.url.as_deref()) else {
            return Err(UploadError::MissingUploadDestination);
        };

        let method = Method::from_bytes(method.as_bytes())
            .map_err(|_| UploadError::InvalidRequest(format!("invalid method {:?}", method)))?;

        let mut builder = client
            .request(method, url)
            .header(CONTENT_LENGTH, data.len());

        for (name, value) in self.headers() {
            builder = builder.header(name, value);
        }

        builder
            .body(data)
            .build()
            .map_err(|e| UploadError::InvalidRequest(e.to_string()))
    }
}

impl fmt::Display for UploadOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}",
            self.method.as_deref().unwrap_or("<no method>"),
            self.url.as_deref().unwrap_or("<no url>")
        )?;
        match self.range() {
            Some(range) => write!(f, " [{}..{})", range.start, range.end),
            None => write!(f, " [unbounded]"),
        }
    }
}
