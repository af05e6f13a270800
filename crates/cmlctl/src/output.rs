//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one identifier per line.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use cml_api::models::State;

use crate::cli::{ColorMode, OutputFormat};

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Lab or node state, green when booted and yellow while in transition.
pub fn state(state: State, color: bool) -> String {
    let text = state.to_string();
    if !color {
        return text;
    }
    match state {
        State::Booted => text.green().to_string(),
        State::Started => text.yellow().to_string(),
        State::Stopped | State::Defined => text.dimmed().to_string(),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            render_table(&rows)
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => data.iter().map(&id_fn).collect::<Vec<_>>().join("\n"),
    }
}

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses `detail_fn`, a pre-formatted key/value view.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => detail_fn(data),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => id_fn(data),
    }
}

/// Aligned `key: value` lines for detail views.
pub fn detail(pairs: &[(&str, String)]) -> String {
    let width = pairs.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    pairs
        .iter()
        .map(|(k, v)| format!("{k:<width$}  {v}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> String {
    let rendered = if compact {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    rendered.expect("serialization should not fail")
}

fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> String {
    serde_yaml::to_string(data).expect("serialization should not fail")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(serde::Serialize, Tabled)]
    struct Row {
        id: String,
        title: String,
    }

    fn rows() -> Vec<Row> {
        vec![
            Row {
                id: "l1".into(),
                title: "core".into(),
            },
            Row {
                id: "l2".into(),
                title: "edge".into(),
            },
        ]
    }

    #[test]
    fn plain_prints_one_id_per_line() {
        let out = render_list(
            OutputFormat::Plain,
            &rows(),
            |r| Row {
                id: r.id.clone(),
                title: r.title.clone(),
            },
            |r| r.id.clone(),
        );
        assert_eq!(out, "l1\nl2");
    }

    #[test]
    fn compact_json_is_single_line() {
        let rows = rows();
        let out = render_single(
            OutputFormat::JsonCompact,
            &rows[0],
            |_| String::new(),
            |r| r.id.clone(),
        );
        assert_eq!(out, r#"{"id":"l1","title":"core"}"#);
    }

    #[test]
    fn detail_aligns_keys() {
        let out = detail(&[("id", "l1".into()), ("title", "core".into())]);
        assert_eq!(out, "id     l1\ntitle  core");
    }

    #[test]
    fn uncolored_state_is_plain_text() {
        assert_eq!(state(State::Booted, false), "BOOTED");
    }
}
