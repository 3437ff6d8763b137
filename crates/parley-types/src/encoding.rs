use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Weight quantization encodings of the Llama 3.1 8B instruct GGUF builds.
///
/// Every variant maps to a concrete weight file published in the model hub
/// repository; see [`QuantizationEncoding::weights_file_name`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum QuantizationEncoding {
    #[strum(serialize = "float32")]
    #[serde(rename = "float32")]
    Float32,
    #[strum(serialize = "bfloat16")]
    #[serde(rename = "bfloat16")]
    BFloat16,
    #[strum(serialize = "q4_0")]
    #[serde(rename = "q4_0")]
    Q4_0,
    #[strum(serialize = "q4_k")]
    #[serde(rename = "q4_k")]
    Q4K,
    #[strum(serialize = "q6_k")]
    #[serde(rename = "q6_k")]
    Q6K,
}

impl QuantizationEncoding {
    /// GGUF weight file name for this encoding.
    pub fn weights_file_name(self) -> &'static str {
        match self {
            QuantizationEncoding::Float32 => "llama-3.1-8b-instruct-f32.gguf",
            QuantizationEncoding::BFloat16 => "llama-3.1-8b-instruct-bf16.gguf",
            QuantizationEncoding::Q4_0 => "llama-3.1-8b-instruct-q4_0.gguf",
            QuantizationEncoding::Q4K => "llama-3.1-8b-instruct-q4_k_m.gguf",
            QuantizationEncoding::Q6K => "llama-3.1-8b-instruct-q6_k.gguf",
        }
    }

    /// Encodings offered in the UI selector, in display order.
    ///
    /// The full-precision encodings stay available through config and the
    /// hub client but are not offered interactively.
    pub fn selectable() -> [QuantizationEncoding; 3] {
        [
            QuantizationEncoding::Q4K,
            QuantizationEncoding::Q4_0,
            QuantizationEncoding::Q6K,
        ]
    }
}

impl Default for QuantizationEncoding {
    fn default() -> Self {
        QuantizationEncoding::Q4K
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn display_matches_wire_names() {
        assert_eq!(QuantizationEncoding::Q4K.to_string(), "q4_k");
        assert_eq!(QuantizationEncoding::Q4_0.to_string(), "q4_0");
        assert_eq!(QuantizationEncoding::Q6K.to_string(), "q6_k");
        assert_eq!(QuantizationEncoding::Float32.to_string(), "float32");
        assert_eq!(QuantizationEncoding::BFloat16.to_string(), "bfloat16");
    }

    #[test]
    fn parse_round_trips() {
        for enc in [
            QuantizationEncoding::Float32,
            QuantizationEncoding::BFloat16,
            QuantizationEncoding::Q4_0,
            QuantizationEncoding::Q4K,
            QuantizationEncoding::Q6K,
        ] {
            let parsed = QuantizationEncoding::from_str(&enc.to_string()).unwrap();
            assert_eq!(parsed, enc);
        }
        assert!(QuantizationEncoding::from_str("q8_0").is_err());
    }

    #[test]
    fn weight_files_are_distinct_gguf_names() {
        let names = [
            QuantizationEncoding::Float32,
            QuantizationEncoding::BFloat16,
            QuantizationEncoding::Q4_0,
            QuantizationEncoding::Q4K,
            QuantizationEncoding::Q6K,
        ]
        .map(QuantizationEncoding::weights_file_name);
        for name in &names {
            assert!(name.ends_with(".gguf"), "{name}");
        }
        let mut deduped = names.to_vec();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(deduped.len(), names.len());
    }

    #[test]
    fn selector_offers_quantized_encodings_only() {
        let offered = QuantizationEncoding::selectable();
        assert_eq!(offered[0], QuantizationEncoding::default());
        assert!(!offered.contains(&QuantizationEncoding::Float32));
        assert!(!offered.contains(&QuantizationEncoding::BFloat16));
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&QuantizationEncoding::Q4K).unwrap();
        assert_eq!(json, "\"q4_k\"");
        let back: QuantizationEncoding = serde_json::from_str("\"q6_k\"").unwrap();
        assert_eq!(back, QuantizationEncoding::Q6K);
    }
}
