//! Purpose: Client seam that owns exactly one decode strategy.
//! Exports: `Client`.
//! Role: Every response body decoded on behalf of a client goes through its strategy.
//! Invariants: The strategy is fixed at construction; swapping yields a new client value.
//! Invariants: Decode failures are logged and returned unchanged, never retried.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use super::ClientConfig;
use crate::core::decoder::{DecodeError, Decoder, DecoderKind};
use crate::core::error::Error;

pub struct Client<D = DecoderKind> {
    inner: Arc<ClientInner<D>>,
}

struct ClientInner<D> {
    decoder: D,
}

impl Client<DecoderKind> {
    pub fn new() -> Self {
        Self::from_config(&ClientConfig::default())
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        debug!(decoder = config.decoder.as_str(), "client configured");
        Self {
            inner: Arc::new(ClientInner {
                decoder: config.decoder,
            }),
        }
    }

    pub fn from_env() -> Result<Self, Error> {
        Ok(Self::from_config(&ClientConfig::from_env()?))
    }
}

impl<D: Decoder> Client<D> {
    /// Returns a client using `decoder` in place of the current strategy.
    pub fn with_decoder<E: Decoder>(self, decoder: E) -> Client<E> {
        debug!(decoder = decoder.name(), "client decoder replaced");
        Client {
            inner: Arc::new(ClientInner { decoder }),
        }
    }

    pub fn decoder(&self) -> &D {
        &self.inner.decoder
    }

    pub fn decode<T>(&self, payload: &[u8], destination: &mut T) -> Result<(), DecodeError>
    where
        T: DeserializeOwned,
    {
        let decoder = &self.inner.decoder;
        match decoder.decode(payload, destination) {
            Ok(()) => {
                trace!(
                    decoder = decoder.name(),
                    bytes = payload.len(),
                    "decoded response body"
                );
                Ok(())
            }
            Err(err) => {
                debug!(
                    decoder = decoder.name(),
                    bytes = payload.len(),
                    category = %err.category(),
                    offset = ?err.offset(),
                    error = %err,
                    "response body decode failed"
                );
                Err(err)
            }
        }
    }
}

impl Default for Client<DecoderKind> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> Clone for Client<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<D: Decoder> fmt::Debug for Client<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("decoder", &self.inner.decoder.name())
            .finish()
    }
}
