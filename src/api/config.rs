//! Purpose: Client configuration, including which decode strategy to install.
//! Exports: `ClientConfig`, `DECODER_ENV`.
//! Role: Explicit value handed to `Client::from_config`; replaces any global default.
//! Invariants: Defaults select the standard decoder.
//! Invariants: Unknown decoder names are usage errors, never silently defaulted.

use serde::{Deserialize, Serialize};

use crate::core::decoder::DecoderKind;
use crate::core::error::{Error, ErrorKind};

/// Environment variable read by [`ClientConfig::from_env`].
pub const DECODER_ENV: &str = "QUARRY_DECODER";

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    pub decoder: DecoderKind,
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_decoder(mut self, decoder: DecoderKind) -> Self {
        self.decoder = decoder;
        self
    }

    /// Reads `QUARRY_DECODER`; an unset or blank variable keeps the default.
    pub fn from_env() -> Result<Self, Error> {
        match std::env::var(DECODER_ENV) {
            Ok(value) => Self::from_env_value(Some(&value)),
            Err(std::env::VarError::NotPresent) => Self::from_env_value(None),
            Err(err) => Err(Error::new(ErrorKind::Usage)
                .with_message(format!("{DECODER_ENV} is not valid unicode"))
                .with_source(err)),
        }
    }

    pub fn from_env_value(value: Option<&str>) -> Result<Self, Error> {
        match value.map(str::trim) {
            None | Some("") => Ok(Self::default()),
            Some(name) => name.parse::<DecoderKind>().map(|decoder| Self { decoder }).map_err(
                |err| {
                    let hint = err.hint().unwrap_or_default().to_string();
                    Error::new(ErrorKind::Usage)
                        .with_message(format!("invalid {DECODER_ENV} value {name:?}"))
                        .with_hint(hint)
                },
            ),
        }
    }

    /// Parses a JSON config document such as `{"decoder":"fast"}`.
    pub fn from_json(input: &[u8]) -> Result<Self, Error> {
        serde_json::from_slice(input).map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message("invalid client config json")
                .with_source(err)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::ClientConfig;
    use crate::core::decoder::DecoderKind;
    use crate::core::error::ErrorKind;

    #[test]
    fn default_selects_standard_decoder() {
        assert_eq!(ClientConfig::new().decoder, DecoderKind::Standard);
        assert_eq!(
            ClientConfig::from_env_value(None).expect("unset").decoder,
            DecoderKind::Standard
        );
        assert_eq!(
            ClientConfig::from_env_value(Some("  ")).expect("blank").decoder,
            DecoderKind::Standard
        );
    }

    #[test]
    fn env_value_selects_variant() {
        let config = ClientConfig::from_env_value(Some("fast-compatible")).expect("config");
        assert_eq!(config.decoder, DecoderKind::FastCompatible);
    }

    #[test]
    fn env_value_rejects_unknown_decoder() {
        let err = ClientConfig::from_env_value(Some("turbo")).expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert!(err.message().is_some_and(|message| message.contains("QUARRY_DECODER")));
        assert!(err.hint().is_some());
    }

    #[test]
    fn json_config_parses_and_rejects_unknown_fields() {
        let config = ClientConfig::from_json(br#"{"decoder":"fastest"}"#).expect("config");
        assert_eq!(config.decoder, DecoderKind::Fastest);

        let empty = ClientConfig::from_json(b"{}").expect("defaults");
        assert_eq!(empty, ClientConfig::default());

        let err = ClientConfig::from_json(br#"{"decoder":"fast","retries":3}"#).expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn builder_overrides_decoder() {
        let config = ClientConfig::new().with_decoder(DecoderKind::Fast);
        assert_eq!(config.decoder, DecoderKind::Fast);
    }
}
