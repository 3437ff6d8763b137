use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use candle_core::quantized::gguf_file;
use candle_core::{Device, Tensor};
use candle_transformers::generation::LogitsProcessor;
use candle_transformers::models::quantized_llama::ModelWeights;
use tokenizers::Tokenizer;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::config::InferenceConfig;
use crate::errors::{EngineError, StreamChunk};
use crate::stream::TokenStream;

/// Token texts that terminate an assistant turn. The first two are the
/// Llama 3 markers; `</s>` covers earlier llama-family GGUF builds. Tokens
/// missing from the loaded tokenizer are simply not matched.
const STOP_TOKEN_TEXTS: [&str; 3] = ["<|eot_id|>", "<|end_of_text|>", "</s>"];

// ── Internal channel protocol ─────────────────────────────────────────────────

/// Commands sent by the engine handle to the inference worker.
pub(crate) enum WorkerCommand {
    Generate {
        prompt: String,
        stream_tx: mpsc::Sender<StreamChunk>,
        reply_tx: oneshot::Sender<Result<(), EngineError>>,
    },
}

// ── Inference worker ──────────────────────────────────────────────────────────

/// Owns the model weights, tokenizer, and sampler state on one OS thread.
///
/// The worker is the only code that touches the model; it serves one
/// generation at a time and blocks on the command channel in between.
pub(crate) struct InferenceWorkerState {
    model: ModelWeights,
    tokenizer: Tokenizer,
    device: Device,
    config: InferenceConfig,
    stop_tokens: Vec<u32>,
    /// Set by the engine handle; checked at every token boundary.
    cancel_flag: Arc<AtomicBool>,
    cmd_rx: mpsc::Receiver<WorkerCommand>,
}

impl InferenceWorkerState {
    /// Load GGUF weights and the tokenizer. Blocking and memory-heavy.
    pub(crate) fn load(
        config: InferenceConfig,
        tokenizer_path: &Path,
        cancel_flag: Arc<AtomicBool>,
        cmd_rx: mpsc::Receiver<WorkerCommand>,
    ) -> Result<Self, EngineError> {
        let device = Device::Cpu;

        let mut weight_file =
            std::fs::File::open(&config.weight_path).map_err(|source| EngineError::OpenWeights {
                path: config.weight_path.clone(),
                source,
            })?;
        let content =
            gguf_file::Content::read(&mut weight_file).map_err(|source| {
                EngineError::LoadWeights {
                    path: config.weight_path.clone(),
                    source: source.into(),
                }
            })?;
        info!(
            path = %config.weight_path.display(),
            encoding = %config.quantization_encoding,
            tensors = content.tensor_infos.len(),
            "loading GGUF weights"
        );
        let model = ModelWeights::from_gguf(content, &mut weight_file, &device).map_err(
            |source| EngineError::LoadWeights {
                path: config.weight_path.clone(),
                source: source.into(),
            },
        )?;

        let tokenizer =
            Tokenizer::from_file(tokenizer_path).map_err(|source| EngineError::LoadTokenizer {
                path: tokenizer_path.to_path_buf(),
                source: anyhow::Error::msg(source),
            })?;

        let stop_tokens: Vec<u32> = STOP_TOKEN_TEXTS
            .iter()
            .filter_map(|text| tokenizer.token_to_id(text))
            .collect();
        if stop_tokens.is_empty() {
            warn!("tokenizer defines no known stop tokens; generation only stops on budget");
        }

        Ok(Self {
            model,
            tokenizer,
            device,
            config,
            stop_tokens,
            cancel_flag,
            cmd_rx,
        })
    }

    /// Main loop for the inference worker thread.
    ///
    /// Exits when every engine handle is dropped and the command channel
    /// closes.
    pub(crate) fn run(mut self) {
        while let Some(cmd) = self.cmd_rx.blocking_recv() {
            match cmd {
                WorkerCommand::Generate {
                    prompt,
                    stream_tx,
                    reply_tx,
                } => {
                    // Tokenize and budget-check up front so a bad prompt is
                    // reported on the reply channel instead of the stream.
                    let prompt_tokens = match self.tokenize_prompt(&prompt) {
                        Ok(tokens) => tokens,
                        Err(e) => {
                            let _ = reply_tx.send(Err(e));
                            continue;
                        }
                    };
                    let _ = reply_tx.send(Ok(()));

                    if let Err(e) = self.run_generation(&prompt_tokens, &stream_tx) {
                        warn!(error = %e, "generation failed");
                        let _ = stream_tx.blocking_send(StreamChunk::Error(e.to_string()));
                    }
                }
            }
        }
    }

    fn tokenize_prompt(&self, prompt: &str) -> Result<Vec<u32>, EngineError> {
        // The rendered prompt already carries its special tokens; they are
        // matched as added tokens, so no post-processor pass is wanted here.
        let encoding = self
            .tokenizer
            .encode(prompt, false)
            .map_err(|source| EngineError::TokenizeFailed {
                source: anyhow::Error::msg(source),
            })?;
        let tokens = encoding.get_ids().to_vec();

        if tokens.is_empty() || tokens.len() >= self.config.max_length {
            return Err(EngineError::PromptTooLong {
                prompt_tokens: tokens.len(),
                max_length: self.config.max_length,
            });
        }
        Ok(tokens)
    }

    /// Prefill the prompt and stream generated pieces until a stop token,
    /// the token budget, cancellation, or a dropped receiver.
    fn run_generation(
        &mut self,
        prompt_tokens: &[u32],
        stream_tx: &mpsc::Sender<StreamChunk>,
    ) -> Result<(), EngineError> {
        let budget = self
            .config
            .max_new_tokens
            .min(self.config.max_length - prompt_tokens.len());
        debug!(
            prompt_tokens = prompt_tokens.len(),
            budget, "starting generation"
        );
        if budget == 0 {
            let _ = stream_tx.blocking_send(StreamChunk::Done);
            return Ok(());
        }

        let mut logits_processor = LogitsProcessor::new(
            self.config.seed,
            Some(self.config.temperature),
            Some(self.config.top_p),
        );
        let mut all_tokens = prompt_tokens.to_vec();
        let mut token_stream = TokenStream::new(&self.tokenizer);

        // Prefill: one forward pass over the whole prompt. index_pos 0 resets
        // the model's KV cache, so every turn starts from a clean window.
        let input = Tensor::new(prompt_tokens, &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(generation_error)?;
        let logits = self
            .model
            .forward(&input, 0)
            .and_then(|l| l.squeeze(0))
            .map_err(generation_error)?;
        let mut next_token = self.sample(&mut logits_processor, &logits, &all_tokens)?;

        let mut generated = 0usize;
        loop {
            all_tokens.push(next_token);
            generated += 1;

            if self.stop_tokens.contains(&next_token) {
                debug!(generated, "stop token reached");
                break;
            }
            if let Some(piece) = token_stream.push(next_token)? {
                if stream_tx.blocking_send(StreamChunk::Token(piece)).is_err() {
                    // Receiver was dropped; stop generation silently.
                    return Ok(());
                }
            }
            if generated >= budget {
                debug!(generated, "token budget exhausted");
                break;
            }
            if self.cancel_flag.load(Ordering::Relaxed) {
                debug!(generated, "generation cancelled");
                break;
            }

            let position = prompt_tokens.len() + generated - 1;
            let input = Tensor::new(&[next_token], &self.device)
                .and_then(|t| t.unsqueeze(0))
                .map_err(generation_error)?;
            let logits = self
                .model
                .forward(&input, position)
                .and_then(|l| l.squeeze(0))
                .map_err(generation_error)?;
            next_token = self.sample(&mut logits_processor, &logits, &all_tokens)?;
        }

        if let Some(rest) = token_stream.finish()? {
            let _ = stream_tx.blocking_send(StreamChunk::Token(rest));
        }
        let _ = stream_tx.blocking_send(StreamChunk::Done);
        Ok(())
    }

    fn sample(
        &self,
        logits_processor: &mut LogitsProcessor,
        logits: &Tensor,
        all_tokens: &[u32],
    ) -> Result<u32, EngineError> {
        let logits = if self.config.repeat_penalty == 1.0 {
            logits.clone()
        } else {
            let start = all_tokens.len().saturating_sub(self.config.repeat_last_n);
            candle_transformers::utils::apply_repeat_penalty(
                logits,
                self.config.repeat_penalty,
                &all_tokens[start..],
            )
            .map_err(generation_error)?
        };
        logits_processor.sample(&logits).map_err(generation_error)
    }
}

fn generation_error(source: candle_core::Error) -> EngineError {
    EngineError::Generation {
        source: source.into(),
    }
}
