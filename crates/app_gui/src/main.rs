mod app;

use eframe::NativeOptions;

fn main() {
    tracing_subscriber::fmt::init();
    let options = NativeOptions::default();
    if let Err(e) = eframe::run_native(
        "Prediksi Jenis Bunga",
        options,
        Box::new(|_cc| {
            Ok::<_, Box<dyn std::error::Error + Send + Sync>>(Box::new(app::UiApp::new()))
        }),
    ) {
        eprintln!("Aplikasi berhenti karena kesalahan: {e}");
    }
}
