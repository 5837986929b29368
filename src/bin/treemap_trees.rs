use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use nyc_treemap::app::App;
use nyc_treemap::config::ConfigLoader;
use nyc_treemap::image::ImageHttpClient;
use nyc_treemap::treemap::TreemapHttpClient;

#[derive(Parser)]
#[command(name = "treemap-trees")]
#[command(about = "Look up the species of each NYC Tree Map tree URL and save its photo")]
#[command(version)]
struct Cli {
    /// Text file with one tree URL (ending in a 7-digit tree id) per line
    input_filename: Utf8PathBuf,

    /// CSV file to write: commonName,speciesPhotoId,imageFilePath
    output_filename: Utf8PathBuf,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stdout)
        .init();

    let cli = Cli::parse();
    let settings = ConfigLoader::resolve(None)?;
    let treemap = TreemapHttpClient::new(settings.api_url.clone()).into_diagnostic()?;
    let images = ImageHttpClient::new().into_diagnostic()?;
    let app = App::new(settings, treemap, images);

    app.process_tree_file(&cli.input_filename, &cli.output_filename)?;
    Ok(())
}
