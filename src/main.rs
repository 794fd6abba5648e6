mod app;
mod state;
mod ui;

use std::path::PathBuf;

use app::ClockStatsApp;
use eframe::egui;

fn main() -> eframe::Result {
    env_logger::init();

    let mut app = ClockStatsApp::default();
    for path in std::env::args_os().skip(1).map(PathBuf::from) {
        let result = app.state.open(&path);
        app.state.report(result);
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "clockstats – Stamp Viewer",
        options,
        Box::new(|_cc| Ok(Box::new(app))),
    )
}
