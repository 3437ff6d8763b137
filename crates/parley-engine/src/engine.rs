use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::info;

use crate::config::InferenceConfig;
use crate::errors::{EngineError, StreamChunk, StreamHandle};
use crate::worker::{InferenceWorkerState, WorkerCommand};

/// Handle to a loaded chat model.
///
/// # Architecture
///
/// ```text
/// Caller ──► cmd_tx ──► [Inference worker thread]
///                         GGUF weights + tokenizer
///                              │
///                         stream_tx ──► Caller
/// ```
///
/// Loading happens in [`LlamaChatEngine::load`]; afterwards the weights live
/// on a single worker OS-thread and all generation requests are serialized
/// through its command channel.
///
/// # Shutdown
/// The engine shuts down naturally when all [`LlamaChatEngine`] clones are
/// dropped: the command sender closes, the worker exits its `blocking_recv`
/// loop, and the thread ends. No explicit shutdown call exists.
#[derive(Clone)]
pub struct LlamaChatEngine {
    cmd_tx: mpsc::Sender<WorkerCommand>,
    cancel_flag: Arc<AtomicBool>,
    config: InferenceConfig,
}

impl std::fmt::Debug for LlamaChatEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlamaChatEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl LlamaChatEngine {
    /// Load the model described by `config` and start the worker thread.
    ///
    /// Blocking: reads the full GGUF file. Call from a blocking context
    /// (e.g. `spawn_blocking`) when a UI thread must stay responsive.
    pub fn load(config: InferenceConfig, tokenizer_path: &Path) -> Result<Self, EngineError> {
        let cancel_flag = Arc::new(AtomicBool::new(false));
        let (cmd_tx, cmd_rx) = mpsc::channel::<WorkerCommand>(16);

        let worker = InferenceWorkerState::load(
            config.clone(),
            tokenizer_path,
            Arc::clone(&cancel_flag),
            cmd_rx,
        )?;

        std::thread::Builder::new()
            .name("parley-inference".to_owned())
            .spawn(move || worker.run())
            .map_err(|source| EngineError::SpawnWorkerFailed { source })?;

        info!(
            encoding = %config.quantization_encoding,
            max_length = config.max_length,
            max_new_tokens = config.max_new_tokens,
            "chat engine ready"
        );
        Ok(Self {
            cmd_tx,
            cancel_flag,
            config,
        })
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    /// Start streaming generation for an already-rendered prompt.
    ///
    /// The prompt is validated against `max_length` before this returns; the
    /// stream then yields [`StreamChunk`] items until `Done` or `Error`.
    ///
    /// **The caller must drive the returned receiver** — the worker blocks on
    /// its backpressure path once the channel fills up.
    pub async fn generate_stream(&self, prompt: String) -> Result<StreamHandle, EngineError> {
        self.cancel_flag.store(false, Ordering::Relaxed);

        let (stream_tx, stream_rx) = mpsc::channel::<StreamChunk>(64);
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(WorkerCommand::Generate {
                prompt,
                stream_tx,
                reply_tx,
            })
            .await
            .map_err(|_| EngineError::WorkerShutdown)?;
        reply_rx.await.map_err(|_| EngineError::WorkerShutdown)??;
        Ok(stream_rx)
    }

    /// Generate to completion, collecting the streamed pieces into one
    /// string.
    pub async fn generate(&self, prompt: String) -> Result<String, EngineError> {
        let mut stream = self.generate_stream(prompt).await?;
        let mut output = String::new();
        while let Some(chunk) = stream.recv().await {
            match chunk {
                StreamChunk::Token(piece) => output.push_str(&piece),
                StreamChunk::Done => break,
                StreamChunk::Error(message) => {
                    return Err(EngineError::InferenceStreamError { message });
                }
            }
        }
        Ok(output)
    }

    /// Stop the in-flight generation at the next token boundary.
    ///
    /// The worker finishes the current stream with `Done`; the engine stays
    /// usable for further turns.
    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::Relaxed);
    }
}
