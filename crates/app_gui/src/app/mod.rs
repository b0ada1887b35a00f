//! Single-window app: pick or drop a photo, show the verdict.

mod prediction;

use anyhow::Context;
use eframe::{App, Frame, egui};
use flora_core::config::CONFIG_FILE;
use flora_core::{ClassifierConfig, FlowerClassifier, FlowerError, Prediction, Predictor};
use image::DynamicImage;
use rfd::FileDialog;
use std::path::PathBuf;

type Classifier = FlowerClassifier<Box<dyn Predictor + Send + Sync>>;

const PREVIEW_SIZE: u32 = 480;

// No camera widget; photos taken with a camera arrive as saved files.
const UPLOAD_HINT: &str =
    "atau seret foto ke jendela ini (foto dari kamera: simpan dulu, lalu seret ke sini)";

/// Result of the most recent request.
enum Outcome {
    Predicted(Prediction),
    Failed { message: String, recoverable: bool },
}

struct Selected {
    name: String,
    preview: Option<egui::TextureHandle>,
}

pub struct UiApp {
    // Err holds the message shown while prediction is disabled.
    classifier: Result<Classifier, String>,
    selected: Option<Selected>,
    outcome: Option<Outcome>,
    status: String,
}

impl UiApp {
    pub fn new() -> Self {
        let classifier = load_classifier().map_err(|e| {
            tracing::error!("Model unavailable: {e:#}");
            match e.downcast_ref::<FlowerError>() {
                Some(fe) => fe.user_message(),
                None => format!("{e:#}"),
            }
        });
        let status = match &classifier {
            Ok(_) => "Model berhasil dimuat!".to_string(),
            Err(_) => String::new(),
        };
        Self {
            classifier,
            selected: None,
            outcome: None,
            status,
        }
    }

    fn handle_upload(&mut self, ctx: &egui::Context, name: String, bytes: &[u8]) {
        let image = match flora_core::preprocess::decode(bytes) {
            Ok(img) => img,
            Err(e) => {
                tracing::warn!("Cannot decode {name}: {e}");
                self.reject_upload(&e);
                return;
            }
        };
        let preview = Some(load_preview(ctx, &name, &image));
        self.selected = Some(Selected { name, preview });

        let classifier = match &self.classifier {
            Ok(c) => c,
            Err(_) => {
                self.outcome = None;
                self.status = "Model gagal dimuat, prediksi tidak dapat dilakukan.".to_string();
                return;
            }
        };
        self.outcome = Some(match classifier.classify_image(&image) {
            Ok(p) => Outcome::Predicted(p),
            Err(e) => {
                if !e.is_recoverable() {
                    tracing::error!("Prediction aborted: {e}");
                }
                Outcome::Failed {
                    message: e.user_message(),
                    recoverable: e.is_recoverable(),
                }
            }
        });
        self.status.clear();
    }

    fn open_from_disk(&mut self, ctx: &egui::Context, path: PathBuf) {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        match std::fs::read(&path) {
            Ok(bytes) => self.handle_upload(ctx, name, &bytes),
            Err(e) => {
                tracing::warn!("Cannot read {}: {e}", path.display());
                self.reject_upload(&FlowerError::from(e));
            }
        }
    }

    /// The previous image must not stay on screen next to the new error.
    fn reject_upload(&mut self, err: &FlowerError) {
        self.selected = None;
        self.outcome = Some(Outcome::Failed {
            message: err.user_message(),
            recoverable: err.is_recoverable(),
        });
    }

    fn take_dropped_file(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.first().cloned());
        let Some(file) = dropped else {
            return;
        };
        if let Some(bytes) = file.bytes {
            self.handle_upload(ctx, file.name, &bytes);
        } else if let Some(path) = file.path {
            self.open_from_disk(ctx, path);
        }
    }
}

fn load_classifier() -> anyhow::Result<Classifier> {
    let cfg = ClassifierConfig::load_or_default(CONFIG_FILE)
        .with_context(|| format!("reading {CONFIG_FILE}"))?
        .with_env_overrides();
    tracing::info!("Loading model from {}", cfg.model_path.display());
    let predictor = flora_core::load_predictor(&cfg)?;
    Ok(FlowerClassifier::new(predictor, &cfg)?)
}

fn load_preview(ctx: &egui::Context, name: &str, image: &DynamicImage) -> egui::TextureHandle {
    let thumb = image.thumbnail(PREVIEW_SIZE, PREVIEW_SIZE).to_rgba8();
    let (w, h) = thumb.dimensions();
    let size = [w as usize, h as usize];
    let pixels = thumb.into_raw();
    let color = egui::ColorImage::from_rgba_unmultiplied(size, &pixels);
    ctx.load_texture(format!("preview:{name}"), color, egui::TextureOptions::LINEAR)
}

impl App for UiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        self.take_dropped_file(ctx);

        egui::TopBottomPanel::top("top").show(ctx, |ui| {
            ui.heading("Prediksi Jenis Bunga");
            if let Err(msg) = &self.classifier {
                ui.colored_label(egui::Color32::RED, msg);
            }
            ui.horizontal(|ui| {
                if ui.button("Pilih gambar...").clicked()
                    && let Some(path) = FileDialog::new().set_directory(".").pick_file()
                {
                    self.open_from_disk(ctx, path);
                }
                ui.label(UPLOAD_HINT);
                if !self.status.is_empty() {
                    ui.label(&self.status);
                }
            });
        });

        egui::TopBottomPanel::bottom("footer").show(ctx, |ui| {
            ui.label(format!("Flora {}", env!("FLORA_VERSION")));
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .auto_shrink([false; 2])
                .show(ui, |ui| {
                    if let Some(sel) = &self.selected {
                        if let Some(tex) = &sel.preview {
                            ui.add(egui::Image::new(tex).max_width(PREVIEW_SIZE as f32));
                        }
                        ui.label(format!("Gambar yang dipilih: {}", sel.name));
                        ui.add_space(8.0);
                    }
                    match &self.outcome {
                        Some(Outcome::Predicted(p)) => prediction::render(ui, p),
                        Some(Outcome::Failed {
                            message,
                            recoverable,
                        }) => {
                            ui.colored_label(egui::Color32::RED, message);
                            if *recoverable {
                                ui.label("Coba lagi dengan gambar lain.");
                            }
                        }
                        None => {}
                    }
                });
        });
    }
}
