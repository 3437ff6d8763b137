//! The chat window: sidebar controls, transcript view, and the channel
//! plumbing between the egui thread and background work.
//!
//! Long-running work (hub downloads, model load, indexing, generation) runs
//! on the tokio runtime or the engine worker thread; every outcome comes
//! back through one [`AppEvent`] channel drained once per frame.

use std::sync::mpsc;
use std::sync::Arc;

use eframe::egui;
use parley_engine::{render_chat_prompt, InferenceConfig, LlamaChatEngine, StreamChunk};
use parley_hub::ModelHub;
use parley_rag::{
    render_rag_prompt, Chunker, DirectoryIndex, DocumentCollection, RagError, TextEmbedder,
    RAG_SYSTEM_PROMPT,
};
use parley_types::{ChatMessage, QuantizationEncoding, Transcript};

use crate::config::AppConfig;

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful coding assistant named Llama3.";

const MAX_LENGTH_LIMIT: usize = 128_000;
const MAX_NEW_TOKENS_LIMIT: usize = 24_000;
const DEFAULT_TOP_K: usize = 5;

/// Everything background tasks report back to the UI thread.
enum AppEvent {
    ModelReady(LlamaChatEngine),
    ModelFailed(String),
    IndexReady {
        embedder: Arc<TextEmbedder>,
        index: DirectoryIndex,
        dir: String,
    },
    IndexFailed(String),
    Chunk(StreamChunk),
}

#[derive(Debug)]
enum ModelStatus {
    NotStarted,
    Starting,
    Ready,
    Failed(String),
}

#[derive(Debug)]
enum IndexStatus {
    NotBuilt,
    Building,
    Ready,
    Failed(String),
}

/// A built retrieval index, pinned to the directory it came from.
struct RagAssets {
    collection: Arc<DocumentCollection>,
    files: Vec<String>,
    dir: String,
}

pub struct ParleyApp {
    cfg: AppConfig,
    runtime: tokio::runtime::Runtime,
    event_tx: mpsc::Sender<AppEvent>,
    event_rx: mpsc::Receiver<AppEvent>,

    // Sidebar state.
    encoding: QuantizationEncoding,
    max_length: usize,
    max_new_tokens: usize,
    rag_enabled: bool,
    system_prompt: String,
    top_k: usize,
    rag_dir: String,

    // Model lifecycle.
    model_status: ModelStatus,
    engine: Option<LlamaChatEngine>,

    // Retrieval lifecycle. The embedder outlives individual indexes so
    // re-indexing does not re-download or re-load the model.
    index_status: IndexStatus,
    embedder: Option<Arc<TextEmbedder>>,
    rag: Option<RagAssets>,

    // Chat state.
    transcript: Transcript,
    draft: String,
    /// Assistant text accumulated for the in-flight generation.
    streaming: Option<String>,
    generating: bool,
    notice: Option<String>,
}

impl ParleyApp {
    pub fn new(cfg: AppConfig, runtime: tokio::runtime::Runtime) -> Self {
        let (event_tx, event_rx) = mpsc::channel();
        let rag_dir = cfg.rag_dir.clone();
        Self {
            cfg,
            runtime,
            event_tx,
            event_rx,
            encoding: QuantizationEncoding::default(),
            max_length: parley_engine::DEFAULT_MAX_LENGTH,
            max_new_tokens: parley_engine::DEFAULT_MAX_NEW_TOKENS,
            rag_enabled: false,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_owned(),
            top_k: DEFAULT_TOP_K,
            rag_dir,
            model_status: ModelStatus::NotStarted,
            engine: None,
            index_status: IndexStatus::NotBuilt,
            embedder: None,
            rag: None,
            transcript: Transcript::new(),
            draft: String::new(),
            streaming: None,
            generating: false,
            notice: None,
        }
    }

    // ── Event handling ───────────────────────────────────────────────────────

    fn drain_events(&mut self) {
        while let Ok(event) = self.event_rx.try_recv() {
            self.handle_event(event);
        }
    }

    fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::ModelReady(engine) => {
                self.engine = Some(engine);
                self.model_status = ModelStatus::Ready;
            }
            AppEvent::ModelFailed(message) => {
                self.model_status = ModelStatus::Failed(message);
            }
            AppEvent::IndexReady {
                embedder,
                index,
                dir,
            } => {
                self.embedder = Some(embedder);
                self.rag = Some(RagAssets {
                    collection: Arc::new(index.collection),
                    files: index.files,
                    dir,
                });
                self.index_status = IndexStatus::Ready;
            }
            AppEvent::IndexFailed(message) => {
                self.index_status = IndexStatus::Failed(message);
            }
            AppEvent::Chunk(StreamChunk::Token(piece)) => {
                if let Some(streaming) = &mut self.streaming {
                    streaming.push_str(&piece);
                }
            }
            AppEvent::Chunk(StreamChunk::Done) => {
                let text = self.streaming.take().unwrap_or_default();
                if !text.is_empty() {
                    self.transcript.push(ChatMessage::assistant(text));
                }
                self.generating = false;
            }
            AppEvent::Chunk(StreamChunk::Error(message)) => {
                // Keep whatever streamed before the failure.
                let partial = self.streaming.take().unwrap_or_default();
                if !partial.is_empty() {
                    self.transcript.push(ChatMessage::assistant(partial));
                }
                self.generating = false;
                self.notice = Some(format!("generation failed: {message}"));
            }
        }
    }

    // ── Background work ──────────────────────────────────────────────────────

    fn start_model(&mut self, egui_ctx: egui::Context) {
        if matches!(self.model_status, ModelStatus::Starting) {
            return;
        }
        self.model_status = ModelStatus::Starting;
        self.engine = None;

        let repo = self.cfg.weights_repo.clone();
        let encoding = self.encoding;
        let max_length = self.max_length;
        let max_new_tokens = self.max_new_tokens;
        let event_tx = self.event_tx.clone();

        self.runtime.spawn(async move {
            let result: anyhow::Result<LlamaChatEngine> = async {
                let hub = ModelHub::new()?;
                let weights = hub.fetch_weights(&repo, encoding).await?;
                let tokenizer = hub.fetch_tokenizer(&repo).await?;
                let config = InferenceConfig::builder()
                    .weight_path(weights)
                    .quantization_encoding(encoding)
                    .max_length(max_length)
                    .max_new_tokens(max_new_tokens)
                    .build()?;
                let engine =
                    tokio::task::spawn_blocking(move || LlamaChatEngine::load(config, &tokenizer))
                        .await??;
                Ok(engine)
            }
            .await;

            let event = match result {
                Ok(engine) => AppEvent::ModelReady(engine),
                Err(e) => AppEvent::ModelFailed(format!("{e:#}")),
            };
            let _ = event_tx.send(event);
            egui_ctx.request_repaint();
        });
    }

    fn start_indexing(&mut self, egui_ctx: egui::Context) {
        if matches!(self.index_status, IndexStatus::Building) {
            return;
        }
        self.index_status = IndexStatus::Building;
        self.rag = None;

        let repo = self.cfg.embedding_repo.clone();
        let dir = self.rag_dir.clone();
        let embedder = self.embedder.clone();
        let event_tx = self.event_tx.clone();

        self.runtime.spawn(async move {
            let result: anyhow::Result<(Arc<TextEmbedder>, DirectoryIndex)> = async {
                let embedder = match embedder {
                    Some(embedder) => embedder,
                    None => {
                        let hub = ModelHub::new()?;
                        let files = hub.fetch_embedding_model(&repo).await?;
                        let loaded = tokio::task::spawn_blocking(move || {
                            TextEmbedder::load(&files.config, &files.tokenizer, &files.weights)
                        })
                        .await??;
                        Arc::new(loaded)
                    }
                };
                let dir_path = std::path::PathBuf::from(&dir);
                let index_embedder = Arc::clone(&embedder);
                let index = tokio::task::spawn_blocking(move || {
                    parley_rag::index_directory(&dir_path, &index_embedder, &Chunker::default())
                })
                .await??;
                Ok((embedder, index))
            }
            .await;

            let event = match result {
                Ok((embedder, index)) => AppEvent::IndexReady {
                    embedder,
                    index,
                    dir,
                },
                Err(e) => AppEvent::IndexFailed(format!("{e:#}")),
            };
            let _ = event_tx.send(event);
            egui_ctx.request_repaint();
        });
    }

    fn send_current_draft(&mut self, egui_ctx: egui::Context) {
        let Some(engine) = self.engine.clone() else {
            return;
        };
        let question = std::mem::take(&mut self.draft).trim().to_owned();
        if question.is_empty() {
            return;
        }

        let system_prompt = self.system_prompt.clone();
        let history: Vec<ChatMessage> = self.transcript.messages().to_vec();
        let rag = if self.rag_enabled {
            match (&self.embedder, &self.rag) {
                (Some(embedder), Some(assets)) => Some((
                    Arc::clone(embedder),
                    Arc::clone(&assets.collection),
                    self.top_k,
                )),
                // Index not ready yet; fall back to a plain turn.
                _ => None,
            }
        } else {
            None
        };

        self.transcript.push(ChatMessage::user(question.clone()));
        self.streaming = Some(String::new());
        self.generating = true;
        self.notice = None;

        let event_tx = self.event_tx.clone();
        self.runtime.spawn(async move {
            let fail = |message: String| {
                let _ = event_tx.send(AppEvent::Chunk(StreamChunk::Error(message)));
                egui_ctx.request_repaint();
            };

            // Retrieval runs on the blocking pool: embedding is CPU-bound.
            let user_content = match rag {
                Some((embedder, collection, top_k)) => {
                    let query = question.clone();
                    let augmented = tokio::task::spawn_blocking(move || {
                        let embedding = embedder.embed(&query)?;
                        let results = collection.query(&embedding, top_k)?;
                        Ok::<String, RagError>(render_rag_prompt(&query, &results))
                    })
                    .await;
                    match augmented {
                        Ok(Ok(content)) => content,
                        Ok(Err(e)) => return fail(e.to_string()),
                        Err(e) => return fail(e.to_string()),
                    }
                }
                None => question.clone(),
            };

            let mut messages = Vec::with_capacity(history.len() + 2);
            messages.push(ChatMessage::system(system_prompt));
            messages.extend(history);
            messages.push(ChatMessage::user(user_content));

            let prompt = match render_chat_prompt(&messages) {
                Ok(prompt) => prompt,
                Err(e) => return fail(e.to_string()),
            };

            let mut stream = match engine.generate_stream(prompt).await {
                Ok(stream) => stream,
                Err(e) => return fail(e.to_string()),
            };
            while let Some(chunk) = stream.recv().await {
                let done = matches!(chunk, StreamChunk::Done | StreamChunk::Error(_));
                let _ = event_tx.send(AppEvent::Chunk(chunk));
                egui_ctx.request_repaint();
                if done {
                    break;
                }
            }
        });
    }

    fn save_transcript(&mut self) {
        if self.transcript.is_empty() {
            self.notice = Some("nothing to save yet".to_owned());
            return;
        }
        let file_name = format!(
            "parley-transcript-{}.json",
            chrono::Utc::now().format("%Y%m%dT%H%M%SZ")
        );
        let outcome = self
            .transcript
            .to_json()
            .map_err(anyhow::Error::from)
            .and_then(|json| std::fs::write(&file_name, json).map_err(anyhow::Error::from));
        self.notice = Some(match outcome {
            Ok(()) => format!("transcript saved to {file_name}"),
            Err(e) => format!("failed to save transcript: {e}"),
        });
    }

    // ── UI ───────────────────────────────────────────────────────────────────

    fn sidebar_ui(&mut self, ui: &mut egui::Ui) {
        ui.heading("Model");
        ui.add_space(4.0);

        egui::ComboBox::from_label("Encoding")
            .selected_text(self.encoding.to_string())
            .show_ui(ui, |ui| {
                for encoding in QuantizationEncoding::selectable() {
                    ui.selectable_value(&mut self.encoding, encoding, encoding.to_string());
                }
            });

        ui.label("Max input and output tokens");
        ui.add(
            egui::DragValue::new(&mut self.max_length)
                .range(0..=MAX_LENGTH_LIMIT)
                .speed(100),
        );
        ui.label("Max output tokens");
        ui.add(
            egui::DragValue::new(&mut self.max_new_tokens)
                .range(0..=MAX_NEW_TOKENS_LIMIT)
                .speed(100),
        );
        ui.add_space(4.0);

        let start_enabled = !matches!(self.model_status, ModelStatus::Starting);
        if ui
            .add_enabled(start_enabled, egui::Button::new("Start Llama3"))
            .clicked()
        {
            self.start_model(ui.ctx().clone());
        }
        match &self.model_status {
            ModelStatus::NotStarted => {}
            ModelStatus::Starting => {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Starting Llama3…");
                });
            }
            ModelStatus::Ready => {
                ui.colored_label(egui::Color32::from_rgb(0x2e, 0xcc, 0x71), "Llama3 is ready");
            }
            ModelStatus::Failed(message) => {
                ui.colored_label(egui::Color32::RED, format!("start failed: {message}"));
            }
        }

        ui.separator();
        ui.heading("Retrieval");
        ui.add_space(4.0);

        let was_enabled = self.rag_enabled;
        ui.checkbox(&mut self.rag_enabled, "Activate RAG");
        if was_enabled != self.rag_enabled {
            // Swap in the matching default prompt on toggle.
            self.system_prompt = if self.rag_enabled {
                RAG_SYSTEM_PROMPT.to_owned()
            } else {
                DEFAULT_SYSTEM_PROMPT.to_owned()
            };
            if self.rag_enabled && self.rag.is_none() {
                self.start_indexing(ui.ctx().clone());
            }
        }

        if self.rag_enabled {
            ui.label("Number of top embedding search results");
            ui.add(egui::Slider::new(&mut self.top_k, 1..=7));

            ui.label("RAG directory");
            let dir_edit = ui.text_edit_singleline(&mut self.rag_dir);
            let dir_changed = self
                .rag
                .as_ref()
                .is_some_and(|assets| assets.dir != self.rag_dir);
            if dir_edit.lost_focus() && dir_changed {
                self.start_indexing(ui.ctx().clone());
            }
            if ui.button("Reindex").clicked() {
                self.start_indexing(ui.ctx().clone());
            }
            match &self.index_status {
                IndexStatus::NotBuilt => {}
                IndexStatus::Building => {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label("Indexing documents…");
                    });
                }
                IndexStatus::Ready => {
                    let (files, chunks) = self
                        .rag
                        .as_ref()
                        .map(|a| (a.files.len(), a.collection.len()))
                        .unwrap_or((0, 0));
                    ui.colored_label(
                        egui::Color32::from_rgb(0x2e, 0xcc, 0x71),
                        format!("RAG data is indexed ({files} files, {chunks} chunks)"),
                    );
                }
                IndexStatus::Failed(message) => {
                    ui.colored_label(egui::Color32::RED, format!("indexing failed: {message}"));
                }
            }
        }

        ui.label("System Prompt");
        ui.add(
            egui::TextEdit::multiline(&mut self.system_prompt)
                .desired_rows(4)
                .desired_width(f32::INFINITY),
        );

        ui.separator();
        ui.horizontal(|ui| {
            if ui
                .add_enabled(!self.generating, egui::Button::new("New chat"))
                .clicked()
            {
                self.transcript = Transcript::new();
                self.streaming = None;
                self.notice = None;
            }
            if ui.button("Save transcript").clicked() {
                self.save_transcript();
            }
        });

        if let Some(notice) = &self.notice {
            ui.add_space(4.0);
            ui.label(egui::RichText::new(notice).small().weak());
        }
    }

    fn input_bar_ui(&mut self, ui: &mut egui::Ui) {
        let chat_enabled = matches!(self.model_status, ModelStatus::Ready) && !self.generating;
        ui.horizontal(|ui| {
            if self.generating && ui.button("Cancel").clicked() {
                if let Some(engine) = &self.engine {
                    engine.cancel();
                }
            }
            let edit = ui.add_enabled(
                chat_enabled,
                egui::TextEdit::singleline(&mut self.draft)
                    .hint_text("Send a message to llama3")
                    .desired_width(f32::INFINITY),
            );
            let submitted = edit.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            if submitted && !self.draft.trim().is_empty() {
                self.send_current_draft(ui.ctx().clone());
                edit.request_focus();
            }
        });
    }

    fn transcript_ui(&mut self, ui: &mut egui::Ui) {
        if self.transcript.is_empty() && self.streaming.is_none() {
            ui.heading("Llama 3.1 🦙");
            ui.add_space(4.0);
            ui.label(
                "Download and start a quantized Llama 3.1 model, then chat with it \
                 continuously. Tick “Activate RAG” in the sidebar to augment your prompts \
                 with text from documents in the retrieval directory \
                 (.txt, .md, .csv, .html, .ipynb).",
            );
            return;
        }

        egui::ScrollArea::vertical()
            .stick_to_bottom(true)
            .auto_shrink([false; 2])
            .show(ui, |ui| {
                for message in self.transcript.iter() {
                    message_bubble(ui, message.avatar.as_deref(), &message.content);
                }
                if let Some(partial) = &self.streaming {
                    message_bubble(ui, Some(parley_types::ASSISTANT_AVATAR), partial);
                    if self.generating {
                        ui.spinner();
                    }
                }
            });
    }
}

fn message_bubble(ui: &mut egui::Ui, avatar: Option<&str>, content: &str) {
    ui.horizontal_top(|ui| {
        ui.label(egui::RichText::new(avatar.unwrap_or("•")).size(18.0));
        ui.add(egui::Label::new(content).wrap());
    });
    ui.add_space(10.0);
}

impl eframe::App for ParleyApp {
    fn ui(&mut self, ui: &mut egui::Ui, _frame: &mut eframe::Frame) {
        let ctx = ui.ctx();
        self.drain_events();

        egui::SidePanel::left("controls")
            .default_width(280.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| self.sidebar_ui(ui));
            });

        egui::TopBottomPanel::bottom("chat_input").show(ctx, |ui| {
            ui.add_space(6.0);
            self.input_bar_ui(ui);
            ui.add_space(6.0);
        });

        egui::CentralPanel::default().show(ctx, |ui| self.transcript_ui(ui));
    }
}
