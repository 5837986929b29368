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
#[command(name = "treemap-species")]
#[command(about = "Build a CSV of NYC Tree Map species with downloaded photos")]
#[command(version)]
struct Cli {
    /// CSV file with a speciesId column
    #[arg(default_value = "./species_ids.csv")]
    input_filename: Utf8PathBuf,

    /// CSV file to write: commonName,imageFilePath,url
    #[arg(default_value = "./tree_data.csv")]
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

    app.process_species_file(&cli.input_filename, &cli.output_filename)?;
    Ok(())
}
