use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use std::fs::File;
use tokio::select;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;
use tts_service::{
    app::{self, AppStateBuilder},
    config::{Cli, Commands, Config},
    version,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    let config = Config::resolve(cli.conf.as_deref())?;

    if matches!(cli.command, Some(Commands::CheckConfig)) {
        println!("{}", toml::to_string_pretty(&config.redacted())?);
        return Ok(());
    }

    let mut env_filter = EnvFilter::from_default_env();
    if let Some(Ok(level)) = config
        .log_level
        .as_ref()
        .map(|level| level.parse::<LevelFilter>())
    {
        env_filter = env_filter.add_directive(level.into());
    }
    let log_fmt = tracing_subscriber::fmt().with_env_filter(env_filter);

    let _guard = if let Some(ref log_file) = config.log_file {
        let file = File::create(log_file)?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        log_fmt.with_writer(non_blocking).try_init().ok();
        Some(guard)
    } else {
        log_fmt.try_init().ok();
        None
    };

    info!("{}", version::get_version_info());

    let state = AppStateBuilder::new().with_config(config).build().await?;
    select! {
        result = app::run(state) => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received CTRL+C, shutting down");
        }
    }
    Ok(())
}
