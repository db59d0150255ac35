//! Command line entry point for retrieving and rewriting metadata archives.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};

use metadata_namespacer::{
    Archive, FileFetcher, FilesystemExtractor, ProjectConfig, RetrieveMetadata, RetrieveOptions,
    TaskOptions, TokenGrammar, rewrite,
};

/// Namespace token rewriting for metadata archives
#[derive(Parser)]
#[command(name = "metadata-namespacer")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Project configuration file (defaults to ./metadata.config.json when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite a retrieved archive and extract it into a directory
    Retrieve {
        /// Zip file holding the retrieved metadata
        #[arg(long)]
        from: PathBuf,

        /// Directory to write the retrieved metadata into
        #[arg(long)]
        path: PathBuf,

        #[command(flatten)]
        namespace: NamespaceArgs,
    },

    /// Rewrite an archive into a new archive without extracting it
    Rewrite {
        /// Source zip file
        #[arg(long)]
        input: PathBuf,

        /// Destination zip file
        #[arg(long)]
        output: PathBuf,

        #[command(flatten)]
        namespace: NamespaceArgs,
    },
}

#[derive(Args)]
struct NamespaceArgs {
    /// Replace tokens with blanks instead of the namespace prefix
    #[arg(long)]
    unmanaged: Option<String>,

    /// Replace namespace tokens with this namespace's prefix
    #[arg(long)]
    namespace_inject: Option<String>,

    /// Strip this namespace's prefix from files and filenames
    #[arg(long)]
    namespace_strip: Option<String>,

    /// Replace this namespace's prefix with tokens
    #[arg(long)]
    namespace_tokenize: Option<String>,

    /// Replace the namespaced org tokens with the namespace
    #[arg(long)]
    namespaced_org: Option<String>,
}

impl NamespaceArgs {
    fn into_task_options(self, path: &Path) -> TaskOptions {
        let mut options = TaskOptions::new();
        options.insert("path".into(), path.to_string_lossy().into_owned());
        let pairs = [
            ("unmanaged", self.unmanaged),
            ("namespace_inject", self.namespace_inject),
            ("namespace_strip", self.namespace_strip),
            ("namespace_tokenize", self.namespace_tokenize),
            ("namespaced_org", self.namespaced_org),
        ];
        for (name, value) in pairs {
            if let Some(value) = value {
                options.insert(name.into(), value);
            }
        }
        options
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    let grammar = load_grammar(cli.config.as_deref())?;

    match cli.command {
        Commands::Retrieve {
            from,
            path,
            namespace,
        } => {
            let options = RetrieveOptions::from_task_options(&namespace.into_task_options(&path))?;
            RetrieveMetadata::new(options, FileFetcher::new(from), FilesystemExtractor)
                .with_grammar(grammar)
                .run()?;
        }
        Commands::Rewrite {
            input,
            output,
            namespace,
        } => {
            let options =
                RetrieveOptions::from_task_options(&namespace.into_task_options(&output))?;
            let bytes =
                fs::read(&input).with_context(|| format!("failed to read {}", input.display()))?;
            let archive = Archive::from_zip_bytes(&bytes)?;
            let rewritten = rewrite(&archive, &options.namespace_plan().operations(), &grammar)?;
            fs::write(&output, rewritten.to_zip_bytes()?)
                .with_context(|| format!("failed to write {}", output.display()))?;
            tracing::info!("Wrote rewritten metadata to {}", output.display());
        }
    }

    Ok(())
}

fn load_grammar(config: Option<&Path>) -> Result<TokenGrammar> {
    match config {
        Some(path) => ProjectConfig::from_path(path)
            .map(ProjectConfig::into_grammar)
            .ok_or_else(|| anyhow!("failed to load configuration from {}", path.display())),
        None => {
            let cwd = std::env::current_dir().context("failed to resolve working directory")?;
            Ok(ProjectConfig::discover(&cwd).into_grammar())
        }
    }
}
