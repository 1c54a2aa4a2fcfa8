use lib_scorekeep::{app::Application, cli::CliArgs};
use tracing::error;

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();

    let app = match Application::new(args).await {
        Ok(app) => app,
        Err(err) => {
            eprintln!("Failed to start scorekeep: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = app.run().await {
        error!("Fatal error: {err}");
        std::process::exit(1);
    }
}
