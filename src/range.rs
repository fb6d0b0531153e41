//! HTTP byte-range negotiation.
//!
//! [`negotiate`] is a pure function from a `Range` header value and a known
//! total size to the status, headers and byte window of the response. It
//! never touches a stream or the filesystem.
//!
//! | request                      | outcome          | status |
//! |------------------------------|------------------|--------|
//! | no header / unparsable       | `Full`           | 200    |
//! | one range inside the object  | `Partial`        | 206    |
//! | one range past the end       | `NotSatisfiable` | 416    |
//! | several ranges               | `Full`           | 200    |

use axum::http::{header, HeaderMap, HeaderValue, StatusCode};

/// Inclusive byte interval `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteWindow {
    pub start: u64,
    pub end: u64,
}

// An inclusive window always covers at least one byte
#[allow(clippy::len_without_is_empty)]
impl ByteWindow {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Number of bytes covered by the window.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Value for an HTTP `Range` request header.
    pub fn to_range_header(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

/// Result of negotiating a range against an object of known size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOutcome {
    /// Serve the whole object
    Full,

    /// Serve only the given window
    Partial(ByteWindow),

    /// The requested range lies outside the object
    NotSatisfiable,
}

/// A negotiated response shape: outcome plus the total size it was computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Negotiation {
    pub outcome: RangeOutcome,
    pub total_size: u64,
}

impl Negotiation {
    /// HTTP status for this outcome.
    pub fn status(&self) -> StatusCode {
        match self.outcome {
            RangeOutcome::Full => StatusCode::OK,
            RangeOutcome::Partial(_) => StatusCode::PARTIAL_CONTENT,
            RangeOutcome::NotSatisfiable => StatusCode::RANGE_NOT_SATISFIABLE,
        }
    }

    /// Byte window to stream, if only part of the object is served.
    pub fn window(&self) -> Option<ByteWindow> {
        match self.outcome {
            RangeOutcome::Partial(window) => Some(window),
            _ => None,
        }
    }

    /// Whether a body should be streamed at all.
    pub fn has_body(&self) -> bool {
        !matches!(self.outcome, RangeOutcome::NotSatisfiable)
    }

    /// Length headers for this outcome.
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        match self.outcome {
            RangeOutcome::Full => {
                headers.insert(header::CONTENT_LENGTH, HeaderValue::from(self.total_size));
                headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
            }
            RangeOutcome::Partial(window) => {
                headers.insert(header::CONTENT_LENGTH, HeaderValue::from(window.len()));
                headers.insert(
                    header::CONTENT_RANGE,
                    content_range(&format!(
                        "bytes {}-{}/{}",
                        window.start, window.end, self.total_size
                    )),
                );
                headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
            }
            RangeOutcome::NotSatisfiable => {
                headers.insert(
                    header::CONTENT_RANGE,
                    content_range(&format!("bytes */{}", self.total_size)),
                );
            }
        }
        headers
    }
}

fn content_range(value: &str) -> HeaderValue {
    // Built from digits, '-', '/', '*' and spaces only
    HeaderValue::from_str(value).unwrap_or_else(|_| HeaderValue::from_static("bytes */0"))
}

/// A single range as written in the header, before it is checked against the size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RangeSpec {
    /// `a-b`
    Bounded(u64, u64),
    /// `a-`
    From(u64),
    /// `-n`
    Suffix(u64),
}

/// Negotiate the response for an optional `Range` header and a total size.
pub fn negotiate(range_header: Option<&str>, total_size: u64) -> Negotiation {
    let outcome = match range_header.and_then(parse_single_range) {
        None => RangeOutcome::Full,
        Some(spec) => resolve_spec(spec, total_size),
    };

    Negotiation {
        outcome,
        total_size,
    }
}

/// Parse a `Range` header holding exactly one byte range.
///
/// Returns `None` for any other unit, for syntax errors, for `a > b` and for
/// multi-range requests.
fn parse_single_range(value: &str) -> Option<RangeSpec> {
    let (unit, set) = value.trim().split_once('=')?;
    if !unit.trim().eq_ignore_ascii_case("bytes") {
        return None;
    }

    let mut specs = set.split(',').filter(|s| !s.trim().is_empty());
    let spec = specs.next()?;
    if specs.next().is_some() {
        return None;
    }

    let (first, last) = spec.trim().split_once('-')?;
    let (first, last) = (first.trim(), last.trim());

    match (first.is_empty(), last.is_empty()) {
        (true, true) => None,
        (true, false) => parse_number(last).map(RangeSpec::Suffix),
        (false, true) => parse_number(first).map(RangeSpec::From),
        (false, false) => {
            let start = parse_number(first)?;
            let end = parse_number(last)?;
            (start <= end).then_some(RangeSpec::Bounded(start, end))
        }
    }
}

fn parse_number(digits: &str) -> Option<u64> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn resolve_spec(spec: RangeSpec, size: u64) -> RangeOutcome {
    let (start, end) = match spec {
        RangeSpec::Bounded(start, end) => (start, end),
        RangeSpec::From(start) => (start, size.saturating_sub(1)),
        RangeSpec::Suffix(0) => return RangeOutcome::NotSatisfiable,
        RangeSpec::Suffix(n) => (size.saturating_sub(n), size.saturating_sub(1)),
    };

    if start >= size || end >= size {
        return RangeOutcome::NotSatisfiable;
    }

    RangeOutcome::Partial(ByteWindow::new(start, end))
}
