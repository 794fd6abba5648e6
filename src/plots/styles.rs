use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::str::FromStr;

use eframe::egui::Color32;
use serde::Deserialize;

use crate::color::{generate_palette, parse_color};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// LineStyle / Style
// ---------------------------------------------------------------------------

/// Dash pattern of a line, written the usual way: `-`, `--`, `:`, `-.`, `.`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
    DashDot,
    /// Markers only, no connecting line.
    Points,
}

impl FromStr for LineStyle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "-" | "" => Ok(LineStyle::Solid),
            "--" => Ok(LineStyle::Dashed),
            ":" => Ok(LineStyle::Dotted),
            "-." => Ok(LineStyle::DashDot),
            "." | "o" => Ok(LineStyle::Points),
            other => Err(Error::Style(format!("unknown line style '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Style {
    pub color: Color32,
    pub line: LineStyle,
}

impl Default for Style {
    fn default() -> Self {
        Style {
            color: Color32::from_rgb(0, 0, 255),
            line: LineStyle::Solid,
        }
    }
}

impl Style {
    pub fn parse(color: &str, line: &str) -> Result<Self> {
        Ok(Style {
            color: parse_color(color)?,
            line: line.parse()?,
        })
    }
}

// ---------------------------------------------------------------------------
// PlotStyles – series name → style
// ---------------------------------------------------------------------------

/// `[colour, linestyle]` pair as found in a JSON style file.
#[derive(Debug, Deserialize)]
struct StyleEntry(String, String);

/// Colour and line style per series name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlotStyles {
    styles: BTreeMap<String, Style>,
}

impl PlotStyles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(name, (colour, linestyle))` pairs.
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, (&'a str, &'a str))>,
    {
        let mut styles = PlotStyles::new();
        for (name, (color, line)) in pairs {
            styles.add_style(name, color, line)?;
        }
        Ok(styles)
    }

    /// Parse `{"rtt": ["r", "--"], ...}`.
    pub fn from_json(text: &str) -> Result<Self> {
        let entries: BTreeMap<String, StyleEntry> = serde_json::from_str(text)?;
        let mut styles = PlotStyles::new();
        for (name, StyleEntry(color, line)) in entries {
            styles.add_style(&name, &color, &line)?;
        }
        Ok(styles)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// One palette colour per name, solid lines.
    pub fn palette<S: AsRef<str>>(names: &[S]) -> Self {
        let styles = names
            .iter()
            .zip(generate_palette(names.len()))
            .map(|(name, color)| {
                (
                    AsRef::<str>::as_ref(name).to_string(),
                    Style {
                        color,
                        line: LineStyle::Solid,
                    },
                )
            })
            .collect();
        PlotStyles { styles }
    }

    pub fn add_style(&mut self, name: &str, color: &str, line: &str) -> Result<()> {
        self.styles.insert(name.to_string(), Style::parse(color, line)?);
        Ok(())
    }

    /// Fails with [`Error::StyleKey`] unless every name has a style.
    pub fn validate_for<S: AsRef<str>>(&self, names: &[S]) -> Result<()> {
        let missing: BTreeSet<String> = names
            .iter()
            .map(AsRef::<str>::as_ref)
            .filter(|name| !self.styles.contains_key(*name))
            .map(str::to_string)
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            log::warn!(
                "styles {:?} do not cover series {missing:?}",
                self.styles.keys().collect::<Vec<_>>()
            );
            Err(Error::StyleKey {
                missing: missing.into_iter().collect(),
            })
        }
    }

    pub fn get(&self, name: &str) -> Option<&Style> {
        self.styles.get(name)
    }

    pub fn color_for(&self, name: &str) -> Option<Color32> {
        self.get(name).map(|s| s.color)
    }

    pub fn linestyle_for(&self, name: &str) -> Option<LineStyle> {
        self.get(name).map(|s| s.line)
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_requires_a_superset() {
        let styles =
            PlotStyles::from_pairs([("rtt", ("r", "-")), ("rtt_host", ("b", "--"))]).unwrap();
        assert!(styles.validate_for(&["rtt"]).is_ok());
        assert!(styles.validate_for(&["rtt", "rtt_host"]).is_ok());

        match styles.validate_for(&["rtt", "server_delay"]) {
            Err(Error::StyleKey { missing }) => assert_eq!(missing, vec!["server_delay"]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn json_style_file() {
        let styles = PlotStyles::from_json(r##"{"rtt": ["r", "--"], "Te": ["#00ff00", ":"]}"##)
            .unwrap();
        assert_eq!(styles.len(), 2);
        assert_eq!(styles.linestyle_for("rtt"), Some(LineStyle::Dashed));
        assert_eq!(styles.color_for("Te"), Some(Color32::from_rgb(0, 255, 0)));
        assert_eq!(styles.linestyle_for("Te"), Some(LineStyle::Dotted));
    }

    #[test]
    fn bad_entries_are_rejected() {
        assert!(matches!(
            PlotStyles::from_pairs([("rtt", ("r", "~~"))]),
            Err(Error::Style(_))
        ));
        assert!(matches!(
            PlotStyles::from_json(r#"{"rtt": "r"}"#),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn palette_covers_names() {
        let styles = PlotStyles::palette(&["a", "b", "c"]);
        assert!(styles.validate_for(&["c", "a"]).is_ok());
        assert_ne!(styles.color_for("a"), styles.color_for("b"));
    }
}
