//! Purpose: Define the pluggable strategy that turns response bodies into typed values.
//! Exports: `Decoder`, `DecoderKind`, the four built-in variants, `DecodeError`.
//! Role: The only place that picks a JSON engine; clients hold exactly one strategy.
//! Invariants: Strategies are stateless, `Send + Sync`, and never mutate or retain the payload.
//! Invariants: A failed decode leaves the destination untouched and is never retried elsewhere.

use std::error::Error as StdError;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::core::error::{Error, ErrorKind};
pub use crate::json::parse::ParseFailureCategory;
use crate::json::{parse, scan};

/// Decodes one complete JSON response body into a caller-provided destination.
///
/// On success the destination is overwritten with the decoded value. Every
/// syntactic or structural failure is reported as a [`DecodeError`].
///
/// Implement this trait to plug a different engine into a
/// [`Client`](crate::api::Client):
///
/// ```
/// use quarry::api::{Client, DecodeError, Decoder};
/// use serde::de::DeserializeOwned;
///
/// struct Lenient;
///
/// impl Decoder for Lenient {
///     fn decode<T: DeserializeOwned>(&self, payload: &[u8], dest: &mut T) -> Result<(), DecodeError> {
///         let trimmed = payload.strip_prefix(b")]}',\n").unwrap_or(payload);
///         *dest = serde_json::from_slice(trimmed)
///             .map_err(|err| DecodeError::new(self.name(), err.to_string()))?;
///         Ok(())
///     }
///
///     fn name(&self) -> &'static str {
///         "lenient"
///     }
/// }
///
/// let client = Client::new().with_decoder(Lenient);
/// let mut hits: Vec<u32> = Vec::new();
/// client.decode(b")]}',\n[1,2]", &mut hits).unwrap();
/// assert_eq!(hits, vec![1, 2]);
/// ```
pub trait Decoder: Send + Sync {
    fn decode<T>(&self, payload: &[u8], destination: &mut T) -> Result<(), DecodeError>
    where
        T: DeserializeOwned;

    /// Short stable name used in errors and logs.
    fn name(&self) -> &'static str {
        "custom"
    }
}

impl<D: Decoder> Decoder for &D {
    fn decode<T>(&self, payload: &[u8], destination: &mut T) -> Result<(), DecodeError>
    where
        T: DeserializeOwned,
    {
        (**self).decode(payload, destination)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

impl<D: Decoder> Decoder for Arc<D> {
    fn decode<T>(&self, payload: &[u8], destination: &mut T) -> Result<(), DecodeError>
    where
        T: DeserializeOwned,
    {
        self.as_ref().decode(payload, destination)
    }

    fn name(&self) -> &'static str {
        self.as_ref().name()
    }
}

impl<D: Decoder> Decoder for Box<D> {
    fn decode<T>(&self, payload: &[u8], destination: &mut T) -> Result<(), DecodeError>
    where
        T: DeserializeOwned,
    {
        self.as_ref().decode(payload, destination)
    }

    fn name(&self) -> &'static str {
        self.as_ref().name()
    }
}

/// Reference engine (serde_json).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct StandardDecoder;

/// simd-json with its default semantics: no recursion limit, and integers
/// outside the 64-bit ranges are rejected.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct FastDecoder;

/// simd-json, except payloads whose outcome differs between engines are
/// decided by the reference engine: nesting of 128 levels or more, integers
/// outside the 64-bit ranges, `-0`, decimals that need more than one rounding,
/// and `\u` escapes in the surrogate range.
///
/// Differences that depend on the destination type are not detected. Non-string
/// map keys (`BTreeMap<bool, _>` from `{"true":1}`) are rejected here but
/// accepted by [`StandardDecoder`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct FastCompatibleDecoder;

/// simd-json parsing out of per-thread scratch buffers, no compatibility guards.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct FastestDecoder;

impl Decoder for StandardDecoder {
    fn decode<T>(&self, payload: &[u8], destination: &mut T) -> Result<(), DecodeError>
    where
        T: DeserializeOwned,
    {
        *destination = parse::serde_from_slice(payload)
            .map_err(|err| DecodeError::from_serde(self.name(), err))?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        DecoderKind::Standard.as_str()
    }
}

impl Decoder for FastDecoder {
    fn decode<T>(&self, payload: &[u8], destination: &mut T) -> Result<(), DecodeError>
    where
        T: DeserializeOwned,
    {
        *destination = parse::simd_from_slice(payload)
            .map_err(|err| DecodeError::from_simd(self.name(), err))?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        DecoderKind::Fast.as_str()
    }
}

impl Decoder for FastCompatibleDecoder {
    fn decode<T>(&self, payload: &[u8], destination: &mut T) -> Result<(), DecodeError>
    where
        T: DeserializeOwned,
    {
        *destination = if scan::scan(payload).needs_reference_semantics() {
            parse::serde_from_slice(payload)
                .map_err(|err| DecodeError::from_serde(self.name(), err))?
        } else {
            parse::simd_from_slice(payload)
                .map_err(|err| DecodeError::from_simd(self.name(), err))?
        };
        Ok(())
    }

    fn name(&self) -> &'static str {
        DecoderKind::FastCompatible.as_str()
    }
}

impl Decoder for FastestDecoder {
    fn decode<T>(&self, payload: &[u8], destination: &mut T) -> Result<(), DecodeError>
    where
        T: DeserializeOwned,
    {
        *destination = parse::simd_from_slice_reusing(payload)
            .map_err(|err| DecodeError::from_simd(self.name(), err))?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        DecoderKind::Fastest.as_str()
    }
}

/// The closed set of built-in strategies, usable directly as a [`Decoder`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecoderKind {
    #[default]
    Standard,
    #[serde(alias = "fast-default")]
    Fast,
    #[serde(alias = "fast-compat")]
    FastCompatible,
    Fastest,
}

impl DecoderKind {
    pub const ALL: [DecoderKind; 4] = [
        DecoderKind::Standard,
        DecoderKind::Fast,
        DecoderKind::FastCompatible,
        DecoderKind::Fastest,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Fast => "fast",
            Self::FastCompatible => "fast-compatible",
            Self::Fastest => "fastest",
        }
    }
}

impl fmt::Display for DecoderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DecoderKind {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized = input.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "standard" | "std" => Ok(Self::Standard),
            "fast" | "fast-default" => Ok(Self::Fast),
            "fast-compatible" | "fast-compat" => Ok(Self::FastCompatible),
            "fastest" => Ok(Self::Fastest),
            _ => Err(Error::new(ErrorKind::Usage)
                .with_message(format!("unknown decoder {input:?}"))
                .with_hint("use one of: standard, fast, fast-compatible, fastest")),
        }
    }
}

impl Decoder for DecoderKind {
    fn decode<T>(&self, payload: &[u8], destination: &mut T) -> Result<(), DecodeError>
    where
        T: DeserializeOwned,
    {
        match self {
            Self::Standard => StandardDecoder.decode(payload, destination),
            Self::Fast => FastDecoder.decode(payload, destination),
            Self::FastCompatible => FastCompatibleDecoder.decode(payload, destination),
            Self::Fastest => FastestDecoder.decode(payload, destination),
        }
    }

    fn name(&self) -> &'static str {
        self.as_str()
    }
}

/// The single failure type of every [`Decoder`].
///
/// Syntax errors and shape mismatches share this type; [`category`](Self::category)
/// is a diagnostic aid for logs and hints.
#[derive(Debug)]
pub struct DecodeError {
    decoder: &'static str,
    category: ParseFailureCategory,
    message: String,
    offset: Option<usize>,
    line: Option<usize>,
    column: Option<usize>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl DecodeError {
    pub fn new(decoder: &'static str, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            decoder,
            category: parse::categorize_message(&message),
            message,
            offset: None,
            line: None,
            column: None,
            source: None,
        }
    }

    pub fn with_category(mut self, category: ParseFailureCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_position(mut self, line: usize, column: usize) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub(crate) fn from_serde(decoder: &'static str, err: serde_json::Error) -> Self {
        let category = parse::categorize_serde_error(&err);
        let mut out = Self::new(decoder, err.to_string()).with_category(category);
        // serde_json reports line 0 for errors not tied to a position.
        if err.line() > 0 {
            out = out.with_position(err.line(), err.column());
        }
        out.with_source(err)
    }

    pub(crate) fn from_simd(decoder: &'static str, err: simd_json::Error) -> Self {
        let category = parse::categorize_error(&err);
        let mut out = Self::new(decoder, err.to_string()).with_category(category);
        if !parse::is_shape_error(&err) {
            out = out.with_offset(err.index());
        }
        out.with_source(err)
    }

    pub fn decoder(&self) -> &'static str {
        self.decoder
    }

    pub fn category(&self) -> ParseFailureCategory {
        self.category
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Byte offset into the payload, when the engine reports one.
    pub fn offset(&self) -> Option<usize> {
        self.offset
    }

    pub fn line(&self) -> Option<usize> {
        self.line
    }

    pub fn column(&self) -> Option<usize> {
        self.column
    }

    pub fn hint(&self) -> String {
        parse::hint_for_category(self.category, self.decoder)
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} decoder: {}", self.decoder, self.message)?;
        if let Some(offset) = self.offset {
            write!(f, " (offset: {offset})")?;
        }
        Ok(())
    }
}

impl StdError for DecodeError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn StdError + 'static))
    }
}
