use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::state::{AppState, Source, ViewMode};

// ---------------------------------------------------------------------------
// Left side panel – sources, series and view
// ---------------------------------------------------------------------------

/// Render the left panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Files");
    ui.separator();

    if state.files.is_empty() {
        ui.label("No stamp file loaded.");
        return;
    }

    // Labels first so the loop below can mutate state.
    let labels: Vec<String> = state.files.iter().map(|f| f.label()).collect();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for (i, label) in labels.iter().enumerate() {
                ui.horizontal(|ui: &mut Ui| {
                    let mut ticked = state.selected.contains(&i);
                    if ui.checkbox(&mut ticked, "").changed() {
                        if ticked {
                            state.selected.insert(i);
                        } else {
                            state.selected.remove(&i);
                        }
                    }
                    let current = state.source == Some(Source::File(i));
                    if ui.selectable_label(current, label).clicked() {
                        state.set_source(Source::File(i));
                    }
                });
            }

            ui.add_space(4.0);
            let can_merge = state.selected.len() == 2;
            if ui
                .add_enabled(can_merge, egui::Button::new("Merge selected"))
                .clicked()
            {
                let result = state.merge_selected();
                state.report(result);
            }
            if let Some(merged) = &state.merged {
                let label = format!("merged {} + {} ({} rows)", merged.left, merged.right, merged.len());
                let current = state.source == Some(Source::Merged);
                if ui.selectable_label(current, label).clicked() {
                    state.set_source(Source::Merged);
                }
            }
            ui.separator();

            // ---- Series selector ----
            ui.strong("Series");
            let available = state.available_series();
            let current = state.series.clone().unwrap_or_default();
            egui::ComboBox::from_id_salt("series")
                .selected_text(&current)
                .show_ui(ui, |ui: &mut Ui| {
                    for name in &available {
                        if ui.selectable_label(current == *name, name).clicked() {
                            state.series = Some(name.clone());
                            state.refresh();
                        }
                    }
                });
            ui.separator();

            // ---- View mode ----
            ui.strong("View");
            let mut changed = false;
            for mode in ViewMode::ALL {
                changed |= ui.radio_value(&mut state.view, mode, mode.label()).changed();
            }
            match state.view {
                ViewMode::Histogram => {
                    changed |= ui.checkbox(&mut state.options.kde, "Density estimate").changed();
                }
                ViewMode::AllanDeviation => {
                    changed |= ui.checkbox(&mut state.smoothed, "Smoothed").changed();
                }
                ViewMode::TimeSeries => {}
            }
            if changed {
                state.refresh();
            }

            if let Some(summary) = &state.summary {
                ui.separator();
                egui::CollapsingHeader::new(RichText::new("Summary").strong())
                    .default_open(true)
                    .show(ui, |ui: &mut Ui| {
                        egui::Grid::new("summary").striped(true).show(ui, |ui: &mut Ui| {
                            let rows = [
                                ("count", summary.count as f64),
                                ("mean", summary.mean),
                                ("std", summary.std),
                                ("min", summary.min),
                                ("1%", summary.p1),
                                ("25%", summary.p25),
                                ("50%", summary.p50),
                                ("75%", summary.p75),
                                ("99%", summary.p99),
                                ("max", summary.max),
                            ];
                            for (name, value) in rows {
                                ui.label(name);
                                ui.monospace(format!("{value:.9}"));
                                ui.end_row();
                            }
                        });
                    });
            }
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui.button("Export CSV…").clicked() {
                export_csv_dialog(state);
                ui.close_menu();
            }
            if ui.button("Save plot as PNG…").clicked() {
                save_png_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        ui.label(format!("{} files loaded", state.files.len()));

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let files = rfd::FileDialog::new()
        .set_title("Open stamp files")
        .add_filter("Stamp files", &["dat", "txt", "log"])
        .add_filter("All files", &["*"])
        .pick_files();

    for path in files.unwrap_or_default() {
        let result = state.open(&path);
        state.report(result);
    }
}

fn export_csv_dialog(state: &mut AppState) {
    let Some(path) = rfd::FileDialog::new()
        .set_title("Export data")
        .add_filter("CSV", &["csv"])
        .save_file()
    else {
        return;
    };
    let result = state.export_csv(&path);
    state.report(result);
}

fn save_png_dialog(state: &mut AppState) {
    let Some(path) = rfd::FileDialog::new()
        .set_title("Save plot")
        .add_filter("PNG", &["png"])
        .save_file()
    else {
        return;
    };
    let result = state.save_png(&path);
    state.report(result);
}
