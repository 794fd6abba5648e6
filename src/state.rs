use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};

use clockstats::data::loader::load_path;
use clockstats::data::{export, merge, DataContainer, MergePolicy, MergedDataset, Radclock, Series, TabularDataset};
use clockstats::plots::{self, Figure, PlotOptions};
use clockstats::stats::Summary;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// A stamp file opened in the viewer.
pub struct LoadedFile {
    pub path: PathBuf,
    pub container: DataContainer,
}

impl LoadedFile {
    pub fn label(&self) -> String {
        let name = self
            .path
            .file_name()
            .map_or_else(|| self.path.display().to_string(), |n| n.to_string_lossy().into_owned());
        let kind = self
            .container
            .declared_type()
            .map_or("untyped", |t| t.as_str());
        format!("{name} ({kind}, {} rows)", self.container.data().len())
    }
}

/// Which dataset the plot is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    File(usize),
    Merged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    Histogram,
    #[default]
    TimeSeries,
    AllanDeviation,
}

impl ViewMode {
    pub const ALL: [ViewMode; 3] = [
        ViewMode::Histogram,
        ViewMode::TimeSeries,
        ViewMode::AllanDeviation,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ViewMode::Histogram => "Histogram",
            ViewMode::TimeSeries => "Time series",
            ViewMode::AllanDeviation => "Allan deviation",
        }
    }
}

/// The full UI state, independent of rendering.
pub struct AppState {
    pub files: Vec<LoadedFile>,

    /// Indices into `files` ticked for merging.
    pub selected: BTreeSet<usize>,

    pub merged: Option<MergedDataset>,

    pub source: Option<Source>,

    /// Column or derived radclock series being plotted.
    pub series: Option<String>,

    pub view: ViewMode,

    /// Smoothed Allan variance estimate.
    pub smoothed: bool,

    pub options: PlotOptions,

    /// Figure prepared from the current selection.
    pub figure: Option<Figure>,

    /// Summary of the plotted series.
    pub summary: Option<Summary>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            files: Vec::new(),
            selected: BTreeSet::new(),
            merged: None,
            source: None,
            series: None,
            view: ViewMode::default(),
            smoothed: true,
            options: PlotOptions::default(),
            figure: None,
            summary: None,
            status_message: None,
        }
    }
}

impl AppState {
    /// Load a stamp file, adopting the type its header declares.
    pub fn open(&mut self, path: &Path) -> anyhow::Result<()> {
        let container =
            load_path(path, None).with_context(|| format!("loading {}", path.display()))?;
        self.files.push(LoadedFile {
            path: path.to_path_buf(),
            container,
        });
        self.set_source(Source::File(self.files.len() - 1));
        Ok(())
    }

    /// Merge the two files ticked in the side panel.
    pub fn merge_selected(&mut self) -> anyhow::Result<()> {
        let picked: Vec<usize> = self.selected.iter().copied().collect();
        let [left, right] = picked[..] else {
            bail!("select exactly two files to merge, {} selected", picked.len());
        };
        let merged = merge(
            &self.files[left].container,
            &self.files[right].container,
            MergePolicy::default(),
        )?;
        log::info!(
            "merged {} and {} into {} rows",
            self.files[left].path.display(),
            self.files[right].path.display(),
            merged.len()
        );
        self.merged = Some(merged);
        self.set_source(Source::Merged);
        Ok(())
    }

    pub fn set_source(&mut self, source: Source) {
        self.source = Some(source);
        let available = self.available_series();
        if !self
            .series
            .as_ref()
            .is_some_and(|s| available.contains(s))
        {
            self.series = available.into_iter().next();
        }
        self.refresh();
    }

    fn dataset(&self) -> Option<&TabularDataset> {
        match self.source? {
            Source::File(i) => self.files.get(i).map(|f| f.container.data()),
            Source::Merged => self.merged.as_ref().map(|m| &m.data),
        }
    }

    /// Derived radclock accessors, when the current source has them.
    fn radclock(&self) -> Option<Radclock<'_>> {
        match self.source? {
            Source::File(i) => self.files.get(i)?.container.radclock().ok(),
            Source::Merged => self.merged.as_ref().map(MergedDataset::radclock),
        }
    }

    /// Derived series first, then the numeric columns of the source.
    pub fn available_series(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        if let Some(radclock) = self.radclock() {
            names.extend(
                Radclock::DERIVED
                    .iter()
                    .filter(|name| radclock.derived(name).is_ok())
                    .map(|name| name.to_string()),
            );
        }
        if let Some(data) = self.dataset() {
            names.extend(data.numeric_columns().into_iter().map(str::to_string));
        }
        names
    }

    fn current_series(&self) -> anyhow::Result<Series> {
        let Some(name) = &self.series else {
            bail!("no series selected");
        };
        if let Some(radclock) = self.radclock() {
            if Radclock::DERIVED.contains(&name.as_str()) {
                return Ok(radclock.derived(name)?);
            }
        }
        let Some(data) = self.dataset() else {
            bail!("no dataset loaded");
        };
        Ok(data.series(name)?)
    }

    /// Rebuild the figure from the current selection.
    pub fn refresh(&mut self) {
        if self.source.is_none() {
            return;
        }
        match self.build_figure() {
            Ok((figure, summary)) => {
                self.figure = Some(figure);
                self.summary = summary;
                self.status_message = None;
            }
            Err(e) => {
                log::error!("Failed to plot: {e:#}");
                self.figure = None;
                self.summary = None;
                self.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }

    fn build_figure(&self) -> anyhow::Result<(Figure, Option<Summary>)> {
        let series = self.current_series()?;
        let mut options = self.options.clone();
        options.title = series.name.clone();
        options.path = None;
        match self.view {
            ViewMode::Histogram => {
                options.x_label = series.name.clone();
                options.y_label = "density".to_string();
                let (figure, summary) = plots::hist(&series, &options)?;
                Ok((figure, Some(summary)))
            }
            ViewMode::TimeSeries => {
                options.x_label = "time".to_string();
                options.y_label = series.name.clone();
                let (figure, mut stats) = plots::tseries(std::slice::from_ref(&series), &options)?;
                Ok((figure, stats.pop().map(|(_, s)| s)))
            }
            ViewMode::AllanDeviation => {
                options.x_label = "tau".to_string();
                options.y_label = "Allan deviation".to_string();
                let (figure, _) = plots::allanvar(&series, self.smoothed, &options)?;
                Ok((figure, None))
            }
        }
    }

    /// Write the current source as CSV.
    pub fn export_csv(&self, path: &Path) -> anyhow::Result<()> {
        let Some(data) = self.dataset() else {
            bail!("nothing to export");
        };
        export::write_csv_path(data, path).with_context(|| format!("exporting {}", path.display()))
    }

    /// Write the current figure as PNG.
    pub fn save_png(&self, path: &Path) -> anyhow::Result<()> {
        let Some(figure) = &self.figure else {
            bail!("nothing to save");
        };
        plots::render::save_png(figure, path).with_context(|| format!("saving {}", path.display()))
    }

    /// Record the outcome of a user action in the status line.
    pub fn report(&mut self, result: anyhow::Result<()>) {
        if let Err(e) = result {
            log::error!("{e:#}");
            self.status_message = Some(format!("Error: {e:#}"));
        }
    }
}
