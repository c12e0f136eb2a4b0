use std::error::Error;

use revise::config::AppConfig;
use revise::{build_rocket, logging};

#[rocket::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let figment = rocket::Config::figment();

    let config = AppConfig::from_figment(&figment)?;
    logging::init(&config.log_filter);

    build_rocket(figment)?.launch().await?;

    Ok(())
}
