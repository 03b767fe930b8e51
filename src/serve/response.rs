//! Response capability shared by the router, the error interceptor and the
//! buffered sink handed to tiny_http.

use std::io;

use tiny_http::{Header, ResponseBox, StatusCode};

use crate::debug;
use crate::utils::mime::types::PLAIN;

/// Response headers, case-insensitive by name, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Replace any existing value for `name`.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
        {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Something a handler writes a response into.
///
/// The status is written at most once; writing a body without a status
/// implies `200`.
pub trait ResponseSink {
    fn headers(&mut self) -> &mut Headers;

    fn write_status(&mut self, status: u16);

    fn write_body(&mut self, data: &[u8]);

    /// Complete response with a content type.
    fn send(&mut self, status: u16, content_type: &str, body: &[u8]) {
        self.headers().set("Content-Type", content_type);
        self.write_status(status);
        self.write_body(body);
    }

    /// Plain-text error response.
    fn fail(&mut self, status: u16, message: &str) {
        let headers = self.headers();
        headers.set("Content-Type", PLAIN);
        headers.set("X-Content-Type-Options", "nosniff");
        self.write_status(status);
        self.write_body(message.as_bytes());
    }
}

/// In-memory response, sent to the client in one piece.
#[derive(Debug, Default)]
pub struct HttpResponse {
    status: Option<u16>,
    headers: Headers,
    body: Vec<u8>,
    body_writes: usize,
}

impl HttpResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> u16 {
        self.status.unwrap_or(200)
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    #[cfg(test)]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Number of `write_body` calls that reached this response.
    #[cfg(test)]
    pub fn body_writes(&self) -> usize {
        self.body_writes
    }

    /// Convert to a tiny_http response. `head` keeps the headers and the
    /// content length but sends no body.
    pub fn into_response(self, head: bool) -> ResponseBox {
        let headers: Vec<Header> = self
            .headers
            .iter()
            .filter_map(|(name, value)| match Header::from_bytes(name, value) {
                Ok(header) => Some(header),
                Err(()) => {
                    debug!("serve"; "dropping invalid header {}", name);
                    None
                }
            })
            .collect();

        let status = StatusCode(self.status());
        let length = self.body.len();
        if head {
            tiny_http::Response::new(status, headers, io::empty(), Some(length), None).boxed()
        } else {
            tiny_http::Response::new(status, headers, io::Cursor::new(self.body), Some(length), None)
                .boxed()
        }
    }
}

impl ResponseSink for HttpResponse {
    fn headers(&mut self) -> &mut Headers {
        &mut self.headers
    }

    fn write_status(&mut self, status: u16) {
        match self.status {
            Some(current) => {
                debug!("serve"; "superfluous status {} (already {})", status, current);
            }
            None => self.status = Some(status),
        }
    }

    fn write_body(&mut self, data: &[u8]) {
        if self.status.is_none() {
            self.status = Some(200);
        }
        self.body.extend_from_slice(data);
        self.body_writes += 1;
        if self.body_writes == 2 {
            debug!("serve"; "response body written in more than one piece");
        }
    }
}
