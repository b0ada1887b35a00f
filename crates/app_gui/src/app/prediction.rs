//! Verdict, probability table and bar chart for one prediction.

use eframe::egui;
use egui_extras::{Column, TableBuilder};
use flora_core::{Distribution, Prediction, Verdict};

pub(super) fn render(ui: &mut egui::Ui, prediction: &Prediction) {
    ui.heading(headline(&prediction.verdict));
    if let Verdict::Known { confidence, .. } = &prediction.verdict {
        ui.label(format!("Tingkat Kepastian: {}", percent(*confidence)));
    }

    // Rejected predictions never show per-class numbers.
    let Some(dist) = &prediction.distribution else {
        return;
    };

    ui.add_space(12.0);
    ui.strong("Probabilitas Prediksi");
    render_table(ui, dist);
    ui.monospace(dist.to_json().to_string());

    ui.add_space(12.0);
    ui.strong("Grafik Probabilitas");
    for c in dist.iter() {
        ui.horizontal(|ui| {
            ui.add_sized([120.0, 18.0], egui::Label::new(&c.label));
            ui.add(
                egui::ProgressBar::new(c.probability.clamp(0.0, 1.0))
                    .desired_width(260.0)
                    .text(percent(c.probability)),
            );
        });
    }
}

fn render_table(ui: &mut egui::Ui, dist: &Distribution) {
    TableBuilder::new(ui)
        .striped(true)
        .column(Column::auto().at_least(120.0))
        .column(Column::remainder())
        .header(20.0, |mut header| {
            header.col(|ui| {
                ui.strong("Kelas");
            });
            header.col(|ui| {
                ui.strong("Probabilitas");
            });
        })
        .body(|mut body| {
            for c in dist.iter() {
                body.row(18.0, |mut row| {
                    row.col(|ui| {
                        ui.label(&c.label);
                    });
                    row.col(|ui| {
                        ui.label(format!("{:.4}", c.probability));
                    });
                });
            }
        });
}

fn headline(verdict: &Verdict) -> String {
    format!("Prediksi: {}", verdict.display_label())
}

fn percent(p: f32) -> String {
    format!("{:.2}%", p * 100.0)
}
