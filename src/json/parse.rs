//! Purpose: Provide the runtime JSON decode entrypoints for every engine profile.
//! Exports: `serde_from_slice`, `simd_from_slice`, `simd_from_slice_reusing`,
//! `ParseFailureCategory`, `categorize_*`, `is_shape_error`, `hint_for_category`.
//! Role: Parser boundary that centralizes serde_json and simd-json usage details.
//! Invariants: Caller payloads are never mutated; simd-json always parses a private copy.
//! Invariants: Category mapping is diagnostic only and never changes decode outcomes.
//! Notes: Kept free of crate-internal imports so tests can include it by path.

use serde::de::DeserializeOwned;
use std::cell::RefCell;
use std::fmt;

/// Coarse classification of a decode failure, used for hints and logs.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ParseFailureCategory {
    Syntax,
    Eof,
    Utf8,
    NumericRange,
    DepthLimit,
    Shape,
    Unknown,
}

impl ParseFailureCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Syntax => "syntax",
            Self::Eof => "eof",
            Self::Utf8 => "utf8",
            Self::NumericRange => "numeric-range",
            Self::DepthLimit => "depth-limit",
            Self::Shape => "shape",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ParseFailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) fn serde_from_slice<T: DeserializeOwned>(input: &[u8]) -> Result<T, serde_json::Error> {
    serde_json::from_slice(input)
}

pub(crate) fn simd_from_slice<T: DeserializeOwned>(input: &[u8]) -> Result<T, simd_json::Error> {
    let mut bytes = input.to_vec();
    simd_json::serde::from_slice(&mut bytes)
}

struct Scratch {
    input: Vec<u8>,
    buffers: simd_json::Buffers,
}

thread_local! {
    static SCRATCH: RefCell<Scratch> = RefCell::new(Scratch {
        input: Vec::new(),
        buffers: simd_json::Buffers::default(),
    });
}

/// Scratch capacity kept per thread between calls; larger buffers are released.
pub(crate) const SCRATCH_RETAIN_BYTES: usize = 1 << 20;

impl Scratch {
    fn release_if_oversized(&mut self) {
        if self.input.capacity() > SCRATCH_RETAIN_BYTES {
            self.input = Vec::new();
            self.buffers = simd_json::Buffers::default();
        }
    }
}

/// Like `simd_from_slice`, but parses out of per-thread scratch buffers that
/// survive across calls. Falls back to fresh buffers on reentrant use.
pub(crate) fn simd_from_slice_reusing<T: DeserializeOwned>(
    input: &[u8],
) -> Result<T, simd_json::Error> {
    SCRATCH.with(|cell| match cell.try_borrow_mut() {
        Ok(mut scratch) => {
            let Scratch { input: bytes, buffers } = &mut *scratch;
            bytes.clear();
            bytes.extend_from_slice(input);
            let result = simd_json::serde::from_slice_with_buffers(bytes.as_mut_slice(), buffers);
            scratch.release_if_oversized();
            result
        }
        Err(_) => simd_from_slice(input),
    })
}

pub(crate) fn categorize_serde_error(err: &serde_json::Error) -> ParseFailureCategory {
    use serde_json::error::Category;
    match err.classify() {
        Category::Eof => ParseFailureCategory::Eof,
        Category::Data => ParseFailureCategory::Shape,
        Category::Syntax | Category::Io => match categorize_message(&err.to_string()) {
            ParseFailureCategory::Unknown => ParseFailureCategory::Syntax,
            other => other,
        },
    }
}

/// True for errors raised by simd-json's serde layer rather than its parser.
/// These carry no input position; their index is always 0.
pub(crate) fn is_shape_error(err: &simd_json::Error) -> bool {
    use simd_json::ErrorType;
    matches!(
        err.error(),
        ErrorType::Serde(_)
            | ErrorType::BadKeyType
            | ErrorType::ExpectedArray
            | ErrorType::ExpectedBoolean
            | ErrorType::ExpectedEnum
            | ErrorType::ExpectedFloat
            | ErrorType::ExpectedInteger
            | ErrorType::ExpectedMap
            | ErrorType::ExpectedNull
            | ErrorType::ExpectedSigned
            | ErrorType::ExpectedString
            | ErrorType::ExpectedUnsigned
    )
}

pub(crate) fn categorize_error(err: &simd_json::Error) -> ParseFailureCategory {
    match err.error() {
        simd_json::ErrorType::Serde(message) => match categorize_message(message) {
            ParseFailureCategory::Unknown => ParseFailureCategory::Shape,
            other => other,
        },
        _ if is_shape_error(err) => ParseFailureCategory::Shape,
        _ => categorize_message(&err.to_string()),
    }
}

// simd-json names its type-mismatch errors after the expected type.
// Matched on the leading word only, so `ExpectedArrayComma` stays syntax.
const SHAPE_ERROR_NAMES: &[&str] = &[
    "badkeytype",
    "expectedarray",
    "expectedboolean",
    "expectedenum",
    "expectedfloat",
    "expectedinteger",
    "expectedmap",
    "expectednull",
    "expectedsigned",
    "expectedstring",
    "expectedunsigned",
];

pub(crate) fn categorize_message(message: &str) -> ParseFailureCategory {
    let message = message.to_ascii_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|needle| message.contains(needle));
    let lead = message
        .trim_start()
        .split(|c: char| c.is_whitespace() || c == '(')
        .next()
        .unwrap_or_default();

    if has(&["recursion limit", "depth"]) {
        ParseFailureCategory::DepthLimit
    } else if SHAPE_ERROR_NAMES.contains(&lead)
        || has(&[
            "invalid type",
            "invalid length",
            "invalid value",
            "missing field",
            "unknown field",
            "unknown variant",
            "duplicate field",
        ])
    {
        ParseFailureCategory::Shape
    } else if has(&["utf8", "utf-8", "unicode"]) {
        ParseFailureCategory::Utf8
    } else if has(&["number", "overflow", "out of range"]) {
        ParseFailureCategory::NumericRange
    } else if has(&["eof", "end of input"]) {
        ParseFailureCategory::Eof
    } else if has(&["syntax", "expected", "unexpected", "trailing", "invalid"]) {
        ParseFailureCategory::Syntax
    } else {
        ParseFailureCategory::Unknown
    }
}

pub(crate) fn hint_for_category(category: ParseFailureCategory, context: &str) -> String {
    let advice = match category {
        ParseFailureCategory::Syntax => "payload is not well-formed JSON",
        ParseFailureCategory::Eof => "payload is empty or truncated",
        ParseFailureCategory::Utf8 => "payload contains bytes that are not valid UTF-8",
        ParseFailureCategory::NumericRange => {
            "payload holds a number outside the range the decoder supports"
        }
        ParseFailureCategory::DepthLimit => "payload nests deeper than the decoder allows",
        ParseFailureCategory::Shape => "payload structure does not match the destination type",
        ParseFailureCategory::Unknown => "decoder rejected the payload",
    };
    format!("{advice} (parse category: {category}; context: {context})")
}
