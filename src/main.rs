use clap::error::ErrorKind;
use clap::Parser;
use solar_forecast::{cli, config, error::ForecastError, forecast::ResultDocument, telemetry};
use cli::Cli;
use config::Config;
use telemetry::init_tracing;
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing();

    let document = match Cli::try_parse() {
        Ok(cli) => match Config::load() {
            Ok(cfg) => {
                info!(base_url = %cfg.nasa.base_url, "starting solar-forecast");
                cli::run(cli.command, &cfg).await
            }
            Err(e) => ResultDocument::from_error(&ForecastError::from(e)),
        },
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            let message = e.to_string();
            let first_line = message.lines().next().unwrap_or_default();
            let reason = first_line.trim_start_matches("error: ").to_string();
            ResultDocument::from_error(&ForecastError::InvalidRequest(reason))
        }
    };

    let mut stdout = std::io::stdout().lock();
    if let Err(e) = document.write_to(&mut stdout) {
        error!(error = %e, "failed to write result document");
        std::process::exit(1);
    }

    std::process::exit(document.exit_code());
}
