use std::sync::Arc;

use etr_core::config::Config;
use etr_recorder::HttpRecorder;

#[tokio::main]
async fn main() -> Result<(), etr_core::Error> {
    // Before logging, so RUST_LOG from `.env` applies.
    etr_core::config::load_dotenv()?;
    etr_core::logging::init("etr")?;

    let cfg = match Config::load() {
        Ok(cfg) => Arc::new(cfg),
        Err(e) => {
            tracing::error!("❌ {e}");
            return Err(e);
        }
    };

    let recorder = Arc::new(HttpRecorder::from_config(&cfg)?);

    etr_telegram::router::run_polling(cfg, recorder)
        .await
        .map_err(|e| etr_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
