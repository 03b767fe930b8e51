//! Replaces error responses with the `notfound` and `error` templates.
//!
//! One [`ErrorInterceptingResponse`] wraps the sink for the length of a
//! single request:
//!
//! ```text
//! Pending ──status 4xx/5xx, template rendered──▶ Handled
//!    │                                              │
//!    └── any other first write ──▶ Committed        └── absorbs every
//!        (status or body passed through)                later write
//! ```
//!
//! A broken error page never hides the original status: the caller's own
//! headers and body go through as if nothing had been intercepted. Once
//! anything has reached the inner sink the response is committed and no
//! page is substituted, so at most one body is ever written.

use std::sync::Arc;

use serde::Serialize;

use super::response::{Headers, ResponseSink};
use crate::content::{CompiledTemplate, TemplateStore};
use crate::utils::mime::types::HTML;
use crate::{debug, log};

/// The two error templates, captured once at the start of a request.
#[derive(Debug, Clone, Default)]
pub struct ErrorPages {
    not_found: Option<Arc<CompiledTemplate>>,
    error: Option<Arc<CompiledTemplate>>,
}

impl ErrorPages {
    pub fn snapshot(templates: &TemplateStore) -> Self {
        Self {
            not_found: templates.get("notfound"),
            error: templates.get("error"),
        }
    }
}

#[derive(Serialize)]
struct NotFoundContext<'a> {
    path: &'a str,
}

#[derive(Serialize)]
struct ErrorContext {
    code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Nothing written yet.
    Pending,
    /// The caller's own response has started; everything passes through.
    Committed,
    Handled,
}

pub struct ErrorInterceptingResponse<'a, S: ResponseSink> {
    inner: &'a mut S,
    pages: ErrorPages,
    path: String,
    state: State,
    /// Scratch headers handed out once the response is handled.
    absorbed: Headers,
}

impl<'a, S: ResponseSink> ErrorInterceptingResponse<'a, S> {
    pub fn new(inner: &'a mut S, pages: ErrorPages, path: impl Into<String>) -> Self {
        Self {
            inner,
            pages,
            path: path.into(),
            state: State::Pending,
            absorbed: Headers::default(),
        }
    }

    #[cfg(test)]
    pub fn is_handled(&self) -> bool {
        self.state == State::Handled
    }

    /// Render the substitute page for `status`, if there is one.
    fn substitute(&self, status: u16) -> Option<String> {
        let rendered = match status {
            404 => {
                let Some(template) = &self.pages.not_found else {
                    debug!("serve"; "no notfound template, passing 404 through");
                    return None;
                };
                template.render(&NotFoundContext { path: &self.path })
            }
            400..=599 => {
                let Some(template) = &self.pages.error else {
                    debug!("serve"; "no error template, passing {} through", status);
                    return None;
                };
                template.render(&ErrorContext {
                    code: status.to_string(),
                })
            }
            _ => return None,
        };

        match rendered {
            Ok(html) => Some(html),
            Err(e) => {
                log!("error"; "{} {}: {:#}", status, self.path, e);
                None
            }
        }
    }
}

impl<S: ResponseSink> ResponseSink for ErrorInterceptingResponse<'_, S> {
    fn headers(&mut self) -> &mut Headers {
        match self.state {
            State::Pending | State::Committed => self.inner.headers(),
            State::Handled => {
                self.absorbed.clear();
                &mut self.absorbed
            }
        }
    }

    fn write_status(&mut self, status: u16) {
        match self.state {
            State::Handled => {}
            State::Committed => self.inner.write_status(status),
            State::Pending => match self.substitute(status) {
                Some(html) => {
                    self.inner.headers().set("Content-Type", HTML);
                    self.inner.write_status(status);
                    self.inner.write_body(html.as_bytes());
                    self.state = State::Handled;
                }
                None => {
                    self.inner.write_status(status);
                    self.state = State::Committed;
                }
            },
        }
    }

    fn write_body(&mut self, data: &[u8]) {
        match self.state {
            State::Handled => {}
            State::Pending | State::Committed => {
                self.inner.write_body(data);
                self.state = State::Committed;
            }
        }
    }
}
