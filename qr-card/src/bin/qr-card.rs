//! Generate one table card from `QR_CARD_*` settings.
//!
//! The payload may also be given as the first argument, overriding
//! `QR_CARD_PAYLOAD`. Prints the path of the written image. `--help` lists
//! every setting.

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use qr_card_lib::Pipeline;
use qr_card_lib::config::{self, CardConfig, defaults};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let arg = std::env::args().nth(1);
    if matches!(arg.as_deref(), Some("-h" | "--help")) {
        print!("{}", defaults::help_text());
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    config::load_dotenv();
    let mut card = CardConfig::from_env()?;
    if let Some(payload) = arg {
        card.payload = payload;
    }
    let pipeline = Pipeline::from_config(&card)?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, cancelling run");
            on_signal.cancel();
        }
    });

    let output = pipeline.run(&card, cancel).await?;
    println!("{}", output.display());
    Ok(())
}
