use log::{error, info, LevelFilter};
use log4rs_dynamic_filters::{default_deserializers, DynamicLevelFilter};
use rocket::Error as RocketError;
use thiserror::Error;

const LOG_CONFIG: &str = "log4rs.yaml";

#[derive(Debug, Error)]
enum LaunchError {
    #[error("server failed: {0}")]
    Rocket(#[from] RocketError),
}

async fn serve() -> Result<(), LaunchError> {
    let rocket = stuvote_backend::build().await.ignite().await?;
    info!("Election server ignited");
    // Rocket's own per-request chatter duplicates the logger fairing.
    DynamicLevelFilter::set("rocket", LevelFilter::Off);
    rocket.launch().await?;
    Ok(())
}

#[rocket::main]
async fn main() {
    if let Err(e) = log4rs::init_file(LOG_CONFIG, default_deserializers()) {
        eprintln!("Could not read {LOG_CONFIG}: {e}");
        std::process::exit(2);
    }

    if let Err(err) = serve().await {
        error!("{err}");
        std::process::exit(1);
    }
}
