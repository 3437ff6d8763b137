use std::path::PathBuf;

use derive_builder::Builder;
use parley_types::QuantizationEncoding;

/// Default ceiling on input+output tokens per turn.
pub const DEFAULT_MAX_LENGTH: usize = 12_000;
/// Default ceiling on generated tokens per turn.
pub const DEFAULT_MAX_NEW_TOKENS: usize = 6_000;

const DEFAULT_TEMPERATURE: f64 = 0.8;
const DEFAULT_TOP_P: f64 = 0.95;
const DEFAULT_SEED: u64 = 299_792_458;
const DEFAULT_REPEAT_PENALTY: f32 = 1.1;
const DEFAULT_REPEAT_LAST_N: usize = 64;

/// Everything the engine needs to load weights and run generation.
///
/// Constructed once per model start; a running engine never changes its
/// config. Build with [`InferenceConfig::builder`].
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct InferenceConfig {
    /// Local path of the GGUF weight file.
    pub weight_path: PathBuf,

    /// Encoding the weight file was quantized with.
    #[builder(default)]
    pub quantization_encoding: QuantizationEncoding,

    /// Hard ceiling on prompt tokens plus generated tokens.
    #[builder(default = "DEFAULT_MAX_LENGTH")]
    pub max_length: usize,

    /// Ceiling on generated tokens; the effective budget per turn is the
    /// smaller of this and the window remaining under `max_length`.
    #[builder(default = "DEFAULT_MAX_NEW_TOKENS")]
    pub max_new_tokens: usize,

    #[builder(default = "DEFAULT_TEMPERATURE")]
    pub temperature: f64,

    #[builder(default = "DEFAULT_TOP_P")]
    pub top_p: f64,

    /// Sampler seed; fixed by default so repeated runs are comparable.
    #[builder(default = "DEFAULT_SEED")]
    pub seed: u64,

    #[builder(default = "DEFAULT_REPEAT_PENALTY")]
    pub repeat_penalty: f32,

    /// How many trailing tokens the repeat penalty looks at.
    #[builder(default = "DEFAULT_REPEAT_LAST_N")]
    pub repeat_last_n: usize,
}

impl InferenceConfig {
    pub fn builder() -> InferenceConfigBuilder {
        InferenceConfigBuilder::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_fills_defaults() {
        let config = InferenceConfig::builder()
            .weight_path("/models/llama.gguf")
            .build()
            .unwrap();

        assert_eq!(config.weight_path, PathBuf::from("/models/llama.gguf"));
        assert_eq!(config.quantization_encoding, QuantizationEncoding::Q4K);
        assert_eq!(config.max_length, DEFAULT_MAX_LENGTH);
        assert_eq!(config.max_new_tokens, DEFAULT_MAX_NEW_TOKENS);
        assert_eq!(config.repeat_last_n, 64);
    }

    #[test]
    fn builder_requires_weight_path() {
        assert!(InferenceConfig::builder().build().is_err());
    }

    #[test]
    fn builder_accepts_overrides() {
        let config = InferenceConfig::builder()
            .weight_path("/m.gguf")
            .quantization_encoding(QuantizationEncoding::Q6K)
            .max_length(2_048_usize)
            .max_new_tokens(256_usize)
            .build()
            .unwrap();

        assert_eq!(config.quantization_encoding, QuantizationEncoding::Q6K);
        assert_eq!(config.max_length, 2_048);
        assert_eq!(config.max_new_tokens, 256);
    }
}
