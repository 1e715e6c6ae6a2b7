use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use siteproxy::config::ProxyConfig;
use siteproxy::core::{ContentKind, ProxyError, ProxyManager};
use siteproxy::env::{core::LogLevel, EnvVar};
use siteproxy::selector::{Rewrite, Selector};
use siteproxy::site_prefix::RequestContext;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum InputType {
    Auto,
    Html,
    Json,
    Css,
}

/// Rewrites asset URLs and links in HTML, ajax JSON or CSS the way the
/// reverse proxy would
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Input file (reads stdin when omitted or "-")
    input: Option<PathBuf>,

    /// How to treat the input
    #[arg(short = 't', long = "type", value_enum, default_value = "auto")]
    input_type: InputType,

    /// Write output to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Configuration file (TOML or JSON)
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Request path the document was served for
    #[arg(long, default_value = "/")]
    path: String,

    /// Request scheme
    #[arg(long, default_value = "http")]
    scheme: String,

    /// Request host
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Directory of the stylesheet, relative to the web root
    #[arg(long, default_value = "")]
    base_path: String,

    /// Rewrite a single value instead of a document
    #[arg(long, conflicts_with = "input")]
    value: Option<String>,

    /// Selectors tried on --value, in order; the first one that changes it wins (repeatable)
    #[arg(short, long = "selector", requires = "value")]
    selectors: Vec<String>,

    /// Print the selector registry and exit
    #[arg(long)]
    list_selectors: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging() {
    let level = LogLevel::get().unwrap_or_else(|e| {
        eprintln!("Warning: {}", e);
        "info".to_string()
    });

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("siteproxy={level}").into()),
        )
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), ProxyError> {
    let config = ProxyConfig::load(cli.config.as_deref())?;
    let manager = ProxyManager::new(config)?;

    if cli.list_selectors {
        let mut stdout = io::stdout().lock();
        for selector in manager.selectors().iter() {
            writeln!(
                stdout,
                "{}\t{}\t{}\t{}",
                selector.name,
                selector.locator,
                selector.attribute,
                describe_rewrite(&selector.rewrite)
            )?;
        }
        return Ok(());
    }

    let ctx = RequestContext::new(&cli.path, &cli.scheme, &cli.host);

    if let Some(value) = &cli.value {
        let selectors = cli
            .selectors
            .iter()
            .map(|name| {
                manager.selectors().get(name).cloned().ok_or_else(|| {
                    ProxyError::InvalidSelector(format!("unknown selector '{}'", name))
                })
            })
            .collect::<Result<Vec<Selector>, _>>()?;

        let selectors = (!selectors.is_empty()).then_some(selectors.as_slice());
        let rewritten = manager.rewrite_value(value, &ctx, selectors);
        return write_output(cli.output.as_ref(), format!("{}\n", rewritten).as_bytes());
    }

    let input_name = cli
        .input
        .as_ref()
        .filter(|path| path.as_os_str() != "-")
        .map(|path| path.to_string_lossy().into_owned());

    let data = match &input_name {
        Some(path) => fs::read(path)?,
        None => {
            let mut buf = Vec::new();
            io::stdin().read_to_end(&mut buf)?;
            buf
        }
    };

    let kind = match cli.input_type {
        InputType::Html => ContentKind::Html,
        InputType::Json => ContentKind::Json,
        InputType::Css => ContentKind::Css,
        InputType::Auto => detect_kind(input_name.as_deref(), &data),
    };

    let output = if kind == ContentKind::Css {
        let css = String::from_utf8_lossy(&data);
        manager
            .rewrite_css(&css, &cli.base_path)
            .into_owned()
            .into_bytes()
    } else {
        manager
            .rewrite_body_as(kind, None, &data, &ctx)
            .unwrap_or(data)
    };

    write_output(cli.output.as_ref(), &output)
}

fn detect_kind(input_name: Option<&str>, data: &[u8]) -> ContentKind {
    match input_name.map(ContentKind::from_extension) {
        Some(kind) if kind != ContentKind::Other => kind,
        _ => ContentKind::sniff(&String::from_utf8_lossy(data)),
    }
}

fn describe_rewrite(rewrite: &Rewrite) -> String {
    match rewrite {
        Rewrite::Plain => "asset-path".to_string(),
        Rewrite::MultiValue { separator } => format!("multi-value \"{}\"", separator),
        Rewrite::AbsoluteUri => "always-absolute".to_string(),
        Rewrite::ForceRelative => "force-relative".to_string(),
        Rewrite::SitePrefix => "site-prefix".to_string(),
    }
}

fn write_output(output: Option<&PathBuf>, data: &[u8]) -> Result<(), ProxyError> {
    match output {
        Some(path) => fs::write(path, data)?,
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(data)?;
            stdout.flush()?;
        }
    }
    Ok(())
}
