use std::{
    fs,
    io::{self, Read},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use modelwrap_engine::{AdapterSettings, CURRENT_VERSION, CompatibilityVersion, get_instance_simple_map, get_instance_with};
use modelwrap_types::DateKind;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod input;

/// Wrap a JSON document into interpretable values and print the result.
#[derive(Parser, Debug)]
#[command(name = "modelwrap", version, about)]
struct Args {
    /// JSON file to read; stdin when omitted or `-`
    input: Option<PathBuf>,

    /// Compatibility version to request
    #[arg(long, default_value_t = CURRENT_VERSION)]
    compat: CompatibilityVersion,

    /// Settings file (YAML or JSON); defaults to MODELWRAP_SETTINGS_PATH or the config dir
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Subkind for timestamps that carry no subkind information
    #[arg(long, value_enum)]
    default_date_kind: Option<DateKindArg>,

    /// Turn date, time and timestamp strings into dates
    #[arg(long)]
    detect_dates: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Tree)]
    format: OutputFormat,

    /// Request a simple-map-wrapper adapter (not supported; always fails)
    #[arg(long)]
    simple_map_wrapper: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Tree,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DateKindArg {
    Date,
    Time,
    Datetime,
    Unknown,
}

impl From<DateKindArg> for DateKind {
    fn from(kind: DateKindArg) -> Self {
        match kind {
            DateKindArg::Date => DateKind::Date,
            DateKindArg::Time => DateKind::Time,
            DateKindArg::Datetime => DateKind::DateTime,
            DateKindArg::Unknown => DateKind::Unknown,
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let output = render(&args)?;
    println!("{output}");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn render(args: &Args) -> Result<String> {
    let adapter = if args.simple_map_wrapper {
        get_instance_simple_map(args.compat, true).context("requesting a simple-map-wrapper adapter")?
    } else {
        get_instance_with(args.compat, load_settings(args)?)
            .with_context(|| format!("requesting an adapter for compatibility version {}", args.compat))?
    };
    debug!(
        instance_id = adapter.instance_id(),
        version = %adapter.compatibility_version(),
        "using adapter"
    );

    let text = read_input(args.input.as_deref())?;
    let document: serde_json::Value = serde_json::from_str(&text).context("parsing JSON input")?;
    let value = adapter
        .wrap(input::to_native(document, args.detect_dates))
        .context("wrapping the document")?;

    match args.format {
        OutputFormat::Tree => Ok(value.to_string()),
        OutputFormat::Json => {
            let json = value.to_json().context("rendering the wrapped value as JSON")?;
            Ok(serde_json::to_string_pretty(&json)?)
        }
    }
}

fn load_settings(args: &Args) -> Result<AdapterSettings> {
    let settings = match &args.settings {
        Some(path) => {
            AdapterSettings::load(path).with_context(|| format!("loading settings from {}", path.display()))?
        }
        None => AdapterSettings::load_default().context("loading default settings")?,
    };
    Ok(match args.default_date_kind {
        Some(kind) => settings.with_default_date_kind(kind.into()),
        None => settings,
    })
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) if path != Path::new("-") => {
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
        }
        _ => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer).context("reading stdin")?;
            Ok(buffer)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str], document: &str) -> (Args, tempfile::TempDir) {
        let directory = tempfile::tempdir().expect("temp dir");
        let input = directory.path().join("input.json");
        fs::write(&input, document).expect("write input");
        let settings = directory.path().join("settings.yaml");
        fs::write(&settings, "").expect("write settings");

        let mut argv = vec![
            "modelwrap".to_string(),
            input.to_string_lossy().to_string(),
            "--settings".to_string(),
            settings.to_string_lossy().to_string(),
        ];
        argv.extend(extra.iter().map(|arg| arg.to_string()));
        (Args::try_parse_from(argv).expect("valid arguments"), directory)
    }

    #[test]
    fn renders_a_tree_by_default() {
        let (args, _directory) = args(&[], r#"{"tags": ["a", "b"], "count": 2, "ok": true}"#);
        let output = render(&args).expect("render");
        assert!(output.starts_with("Mapping{"), "output: {output}");
        assert!(output.contains(r#""tags": Sequence[Scalar("a"), Scalar("b")]"#), "output: {output}");
        assert!(output.contains(r#""ok": Boolean(true)"#), "output: {output}");
    }

    #[test]
    fn detected_dates_render_as_json_dates() {
        let (args, _directory) = args(
            &["--detect-dates", "--format", "json", "--default-date-kind", "datetime"],
            r#"["2024-03-01", "2024-03-01T10:00:00Z"]"#,
        );
        let output: serde_json::Value = serde_json::from_str(&render(&args).expect("render")).expect("json output");
        assert_eq!(output[0]["kind"], "date");
        assert_eq!(output[1]["kind"], "datetime");
    }

    #[test]
    fn output_keeps_the_document_key_order() {
        let document = r#"{"zulu": 1, "alpha": 2, "mike": 3}"#;

        let (args, _directory) = args(&[], document);
        let tree = render(&args).expect("render");
        let positions: Vec<_> = ["\"zulu\"", "\"alpha\"", "\"mike\""]
            .iter()
            .map(|key| tree.find(key).expect("key in output"))
            .collect();
        assert!(positions.is_sorted(), "output: {tree}");

        let (args, _directory) = self::args(&["--format", "json"], document);
        let output: serde_json::Value = serde_json::from_str(&render(&args).expect("render")).expect("json output");
        let keys: Vec<_> = output.as_object().expect("object").keys().cloned().collect();
        assert_eq!(keys, ["zulu", "alpha", "mike"]);
    }

    #[test]
    fn compat_flag_is_validated() {
        let (args, _directory) = args(&["--compat", "2.4.0"], "1");
        let error = render(&args).unwrap_err();
        assert!(format!("{error:#}").contains("configuration rejected"), "error: {error:#}");

        assert!(Args::try_parse_from(["modelwrap", "--compat", "two"]).is_err());
    }

    #[test]
    fn simple_map_wrapper_flag_fails() {
        let (args, _directory) = args(&["--simple-map-wrapper"], "{}");
        let error = render(&args).unwrap_err();
        assert!(format!("{error:#}").contains("simple_map_wrapper"), "error: {error:#}");
    }
}
