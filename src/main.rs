//! Main application for the YouTube downloader GUI.

// Headless UI state machine (validation, in-flight gate, event handling)
mod app;
// Process-wide path configuration
mod config;
// External downloader spawning logic (yt-dlp)
mod downloader;
// Error taxonomies
mod error;
// Data models for the download request and events
mod model;
// Structured progress parsing
mod progress;
// ffmpeg provisioning (probe, vendor, fetch)
mod provision;
// Thumbnail fetching
mod thumbnail;

use std::{
    fs,
    path::PathBuf,
    sync::{Arc, Mutex},
    time::{SystemTime, UNIX_EPOCH},
};

use anyhow::anyhow;
use eframe::{App, Frame, egui};
use egui::{ColorImage, TextureOptions, Visuals};
use once_cell::sync::OnceCell;
use rfd::{FileDialog, MessageDialog, MessageLevel};
use tokio::{
    runtime::Runtime,
    sync::mpsc::{UnboundedReceiver, unbounded_channel},
};
use tracing::{error, info, warn};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use app::{Dialog, UiState};
use config::AppPaths;
use model::DownloadEvent;

// Global Tokio runtime stored in a OnceCell for lazy init
static RUNTIME: OnceCell<Arc<Runtime>> = OnceCell::new();

fn main() {
    let paths = AppPaths::resolve();
    if let Err(err) = run(paths) {
        // Startup faults always leave a trace and a final dialog.
        error!(error = %err, "fatal startup error");
        eprintln!("baixavid: {err}");
        let _ = MessageDialog::new()
            .set_level(MessageLevel::Error)
            .set_title("Erro fatal")
            .set_description(&format!("O aplicativo não pôde iniciar:\n{err}"))
            .show();
        std::process::exit(1);
    }
}

fn run(paths: AppPaths) -> anyhow::Result<()> {
    setup_logging(&paths)?;
    install_panic_hook();
    info!("starting baixavid");

    // Tool provisioning failures degrade audio conversion but never abort
    // startup.
    match provision::ensure_ffmpeg(&paths.vendor_dir) {
        Ok(location) => info!(?location, "conversion tool ready"),
        Err(err) => {
            warn!(error = %err, "ffmpeg provisioning failed");
            let _ = MessageDialog::new()
                .set_level(MessageLevel::Warning)
                .set_title("Aviso")
                .set_description(&format!(
                    "Não foi possível preparar o FFmpeg:\n{err}\n\nDownloads em mp3 podem falhar."
                ))
                .show();
        }
    }

    // Create the Tokio runtime and store it globally
    let rt = Arc::new(Runtime::new()?);
    RUNTIME
        .set(rt)
        .map_err(|_| anyhow!("runtime initialized twice"))?;

    let default_folder = paths.default_download_dir.clone();
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([500.0, 420.0])
            .with_resizable(false),
        ..Default::default()
    };
    eframe::run_native(
        "YouTube Downloader",
        options,
        Box::new(move |cc| {
            cc.egui_ctx.set_visuals(Visuals::dark());
            Box::new(BaixaVidApp::new(default_folder))
        }),
    )
    .map_err(|err| anyhow!("falha ao iniciar a interface: {err}"))
}

/// One log file per run under the user-profile log directory, plus console
/// output.
fn setup_logging(paths: &AppPaths) -> anyhow::Result<()> {
    fs::create_dir_all(&paths.log_dir)?;

    let run_stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0);
    let file_appender = rolling::never(&paths.log_dir, format!("baixavid-{run_stamp}.log"));
    let (non_blocking_file, guard) = non_blocking(file_appender);
    // Keep the writer alive for the duration of the program
    std::mem::forget(guard);

    let console_layer = fmt::layer().with_target(false);
    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|err| anyhow!("failed to initialize logging: {err}"))?;

    info!(log_dir = %paths.log_dir.display(), "logging initialized");
    Ok(())
}

/// Anything that escapes the normal error paths is logged with a backtrace
/// and announced in a final dialog before the process dies.
fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::force_capture();
        error!("unhandled fault: {info}\n{backtrace}");
        let _ = MessageDialog::new()
            .set_level(MessageLevel::Error)
            .set_title("Erro fatal")
            .set_description(&format!("Erro inesperado:\n{info}"))
            .show();
    }));
}

/// The egui shell: renders `UiState`, drains worker events, owns dialogs.
struct BaixaVidApp {
    state: UiState,
    /// Channel from the active download task, if one is running.
    events_rx: Option<UnboundedReceiver<DownloadEvent>>,
    /// Video id the current preview belongs to.
    thumbnail_id: Option<String>,
    thumbnail: Option<egui::TextureHandle>,
    /// Incoming thumbnail fetch results (video_id, image)
    thumbnail_results: Arc<Mutex<Vec<(String, ColorImage)>>>,
}

impl BaixaVidApp {
    fn new(default_folder: PathBuf) -> Self {
        Self {
            state: UiState::new(default_folder),
            events_rx: None,
            thumbnail_id: None,
            thumbnail: None,
            thumbnail_results: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Validates the form and spawns the background download task.
    fn start_download(&mut self) {
        let Some(request) = self.state.submit() else {
            return;
        };

        let bin = match downloader::resolve_extractor() {
            Ok(bin) => bin,
            Err(err) => {
                self.state.apply_event(DownloadEvent::Failed(err.to_string()));
                return;
            }
        };

        let (tx, rx) = unbounded_channel();
        self.events_rx = Some(rx);
        RUNTIME
            .get()
            .unwrap()
            .spawn(downloader::run_download(bin, request, tx));
    }

    /// Keeps the thumbnail preview in sync with the pasted URL.
    fn refresh_thumbnail(&mut self, ctx: &egui::Context) {
        let current_id = thumbnail::extract_video_id(&self.state.url_input);
        if current_id == self.thumbnail_id {
            return;
        }
        self.thumbnail_id = current_id.clone();
        self.thumbnail = None;

        if let Some(id) = current_id {
            let results = Arc::clone(&self.thumbnail_results);
            let ctx_c = ctx.clone();
            RUNTIME.get().unwrap().spawn_blocking(move || {
                if let Some(img) = thumbnail::fetch_thumbnail(&id) {
                    results.lock().unwrap().push((id, img));
                    ctx_c.request_repaint();
                }
            });
        }
    }

    fn show_dialog(dialog: Dialog) {
        let (level, title, text) = match dialog {
            Dialog::Warning(text) => (MessageLevel::Warning, "Aviso", text),
            Dialog::Error(text) => (MessageLevel::Error, "Erro", text),
            Dialog::Success(text) => (MessageLevel::Info, "Sucesso", text),
        };
        let _ = MessageDialog::new()
            .set_level(level)
            .set_title(title)
            .set_description(&text)
            .show();
    }
}

impl App for BaixaVidApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        // Drain download events; drop the channel after a terminal event.
        if let Some(rx) = self.events_rx.as_mut() {
            let mut finished = false;
            while let Ok(event) = rx.try_recv() {
                if matches!(event, DownloadEvent::Finished | DownloadEvent::Failed(_)) {
                    finished = true;
                }
                self.state.apply_event(event);
            }
            if finished {
                self.events_rx = None;
            }
        }

        // Handle completed thumbnail fetches
        {
            let mut pending = self.thumbnail_results.lock().unwrap();
            for (vid, img) in pending.drain(..) {
                if self.thumbnail_id.as_deref() == Some(vid.as_str()) {
                    let tex = ctx.load_texture(&vid, img, TextureOptions::default());
                    self.thumbnail = Some(tex);
                }
            }
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("YouTube Downloader");
            ui.add_space(6.0);

            ui.label("Link do vídeo do YouTube:");
            ui.text_edit_singleline(&mut self.state.url_input);
            if let Some(tex) = &self.thumbnail {
                ui.add(egui::Image::new(tex).max_height(90.0));
            }
            ui.add_space(4.0);

            ui.label("Qualidade do vídeo:");
            egui::ComboBox::from_id_source("quality")
                .selected_text(self.state.quality.label())
                .show_ui(ui, |ui| {
                    for quality in model::Quality::ALL {
                        ui.selectable_value(&mut self.state.quality, quality, quality.label());
                    }
                });

            ui.label("Formato:");
            egui::ComboBox::from_id_source("format")
                .selected_text(self.state.format.label())
                .show_ui(ui, |ui| {
                    for format in model::OutputFormat::ALL {
                        ui.selectable_value(&mut self.state.format, format, format.label());
                    }
                });
            ui.add_space(4.0);

            ui.label("Pasta de destino:");
            ui.horizontal(|ui| {
                ui.text_edit_singleline(&mut self.state.folder_input);
                if ui.button("Selecionar").clicked() {
                    if let Some(folder) = FileDialog::new()
                        .set_directory(&self.state.folder_input)
                        .pick_folder()
                    {
                        self.state.folder_input = folder.display().to_string();
                    }
                }
            });
            ui.add_space(8.0);

            let label = if self.state.in_flight { "Baixando..." } else { "Baixar" };
            let trigger = ui.add_enabled(!self.state.in_flight, egui::Button::new(label));
            if trigger.clicked() {
                self.start_download();
            }
            ui.add_space(8.0);

            ui.add(egui::ProgressBar::new(self.state.progress / 100.0).show_percentage());
            ui.label(&self.state.status);
        });

        self.refresh_thumbnail(ctx);

        // Modals are shown here and nowhere else, always on the UI thread.
        if let Some(dialog) = self.state.take_dialog() {
            Self::show_dialog(dialog);
        }

        // Request periodic repaint for progress updates
        ctx.request_repaint_after(std::time::Duration::from_millis(100));
    }
}
