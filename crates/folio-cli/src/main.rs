use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use folio_common::telemetry::{self, TelemetryConfig};
use folio_common::{EditorConfig, FileStore};
use folio_editor_core::{BlockColor, Fragment, classify, source_to_visual, visual_to_source};
use miette::{IntoDiagnostic, Result, WrapErr};

#[derive(Parser)]
#[command(version, about = "folio - block editor tooling for blog post HTML", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the editor configuration (.toml or .json)
    #[arg(long, global = true, env = "FOLIO_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize post HTML the way the editor stores it
    Fmt {
        /// Input file, or `-` for stdin
        input: PathBuf,

        /// Rewrite the file in place instead of printing
        #[arg(long, short)]
        write: bool,
    },
    /// Print the block kind of each top-level node
    Classify {
        /// Input file, or `-` for stdin
        input: PathBuf,
    },
    /// Print the markup for an inserted block
    Fragment {
        #[command(subcommand)]
        kind: FragmentKind,
    },
}

#[derive(Subcommand)]
enum FragmentKind {
    /// YouTube embed
    Youtube { url: String },
    /// Note block
    Note {
        text: String,
        #[arg(long, default_value = "blue")]
        color: String,
    },
    /// Quote block with an optional citation
    Quote {
        text: String,
        #[arg(long)]
        cite: Option<String>,
        #[arg(long, default_value = "blue")]
        color: String,
    },
    /// Button link
    Button {
        url: String,
        /// Label; the configured delimiter marks mobile-only line breaks
        #[arg(long)]
        text: Option<String>,
        /// Palette class, background color, or JSON color spec
        #[arg(long, default_value = "")]
        color: String,
        /// Open in the same tab
        #[arg(long)]
        same_tab: bool,
    },
    /// Plain link
    Link {
        url: String,
        #[arg(long)]
        label: Option<String>,
        #[arg(long)]
        new_tab: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_miette();
    telemetry::init(TelemetryConfig::from_env("folio"));

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Fmt { input, write } => {
            let source = read_input(&input)?;
            let formatted = visual_to_source(&source_to_visual(&source));
            if write && !is_stdin(&input) {
                std::fs::write(&input, format!("{formatted}\n")).into_diagnostic()?;
                tracing::info!(path = %input.display(), "formatted");
            } else {
                println!("{formatted}");
            }
        }
        Commands::Classify { input } => {
            let source = read_input(&input)?;
            let tree = source_to_visual(&source);
            for (index, &node) in tree.children(tree.root()).iter().enumerate() {
                let tag = tree.tag(node).unwrap_or("#text");
                println!("{index}\t{tag}\t{:?}", classify(&tree, node));
            }
        }
        Commands::Fragment { kind } => {
            println!("{}", build_fragment(kind, &config)?.to_html());
        }
    }

    Ok(())
}

fn build_fragment(kind: FragmentKind, config: &EditorConfig) -> Result<Fragment> {
    let fragment = match kind {
        FragmentKind::Youtube { url } => Fragment::youtube(&url)?,
        FragmentKind::Note { text, color } => Fragment::note(&text, BlockColor::from_input(&color))?,
        FragmentKind::Quote { text, cite, color } => {
            Fragment::quote(&text, cite.as_deref(), BlockColor::from_input(&color))?
        }
        FragmentKind::Button {
            url,
            text,
            color,
            same_tab,
        } => Fragment::button(
            text.as_deref().unwrap_or(&config.default_button_label),
            &url,
            &color,
            config.button_new_tab && !same_tab,
            config.button_delimiter,
        )?,
        FragmentKind::Link {
            url,
            label,
            new_tab,
        } => Fragment::link(
            &url,
            label.as_deref().unwrap_or(&config.default_link_label),
            new_tab,
        )?,
    };
    Ok(fragment)
}

/// Explicit paths must load; the default location is optional.
async fn load_config(path: Option<&Path>) -> Result<EditorConfig> {
    let (path, explicit) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => match default_config_path() {
            Some(path) => (path, false),
            None => return Ok(EditorConfig::default()),
        },
    };
    if !explicit && !path.exists() {
        return Ok(EditorConfig::default());
    }
    let config = EditorConfig::load(&FileStore::new(&path)).await?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("folio").join("config.toml"))
}

fn is_stdin(path: &Path) -> bool {
    path.as_os_str() == "-"
}

fn read_input(path: &Path) -> Result<String> {
    if is_stdin(path) {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).into_diagnostic()?;
        return Ok(buf);
    }
    std::fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("could not read {}", path.display()))
}

fn init_miette() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))
    .expect("couldn't set the miette hook");
    miette::set_panic_hook();
}
