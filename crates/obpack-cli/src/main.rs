use clap::Parser;
use obpack_cli::cli::Cli;
use obpack_cli::error::{self, Result};
use obpack_cli::{commands, logger, ui};
use obpack_config::{Mode, ProjectSettings, build_config};

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    ui::init_colors(!cli.no_color);

    run(cli).await.map_err(error::cli_error_to_miette)
}

async fn run(cli: Cli) -> Result<()> {
    let mode = cli.mode();
    let root = cli.project_root()?;

    let settings = ProjectSettings::load(&root, cli.config.as_deref())?;
    let config = settings.apply(build_config(mode));

    logger::init_logger(config.log_level, cli.no_color);
    tracing::debug!(%mode, root = %root.display(), "starting");

    match mode {
        Mode::Release => commands::release::execute(config, &root).await,
        Mode::Development => commands::dev::execute(config, &settings.dev, &root).await,
    }
}
