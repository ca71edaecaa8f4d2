use std::sync::Arc;

use iris_core::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    iris_core::logging::init("iris")?;

    let cfg = Arc::new(Config::load()?);
    tracing::info!(
        prefix = %cfg.command_prefix,
        page_limit = cfg.help_page_limit,
        settings = %cfg.settings_file.display(),
        "configuration loaded"
    );

    iris_telegram::router::run_polling(cfg).await
}
