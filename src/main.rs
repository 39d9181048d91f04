use std::process::ExitCode;

use clap::Parser;
use yt_audio_dl::{
    cli::{Cli, Command},
    configuration::Settings,
    error::{AppError, format_error_details},
    startup::Application,
    telemetry::init_subscriber,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_subscriber(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!("{:?}", e);
            eprintln!("Error: {}", format_error_details(&e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = Settings::load(&cli.settings).map_err(AppError::from)?;
    let settings = cli.apply(settings);

    let app = Application::build(settings).await;
    match cli.command() {
        Command::Download(url) => {
            app.download(&url).await?;
        }
        Command::ListFormats(url) => {
            app.list_formats(&url).await?;
        }
    }
    Ok(())
}
