use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;
use tokio::sync::watch;
use tracing::{error, info, warn};
use voucher_ledger::config::Config;
use voucher_ledger::console;
use voucher_ledger::desk::Desk;
use voucher_ledger::store::LedgerStore;

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let rt = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    let result = rt.block_on(serve());
    // A pending stdin read parks a blocking thread forever; don't wait on it.
    rt.shutdown_timeout(Duration::from_millis(200));
    result
}

async fn serve() -> anyhow::Result<()> {
    info!("🚀 Voucher desk {} starting...", env!("CARGO_PKG_VERSION"));
    let config = Arc::new(Config::from_env()?);
    if config.allowed_chats.is_empty() {
        warn!("VOUCHER_ALLOWED_CHATS is empty, every caller will be turned away");
    }

    let store = Arc::new(LedgerStore::open_with(&config.db_path, &config.store_options())?);
    let desk = Arc::new(Desk::new(store.clone(), config.clone()));

    let (stop_tx, stop_rx) = watch::channel(false);
    let mut worker = {
        let desk = desk.clone();
        tokio::spawn(async move {
            let input = BufReader::new(tokio::io::stdin());
            console::run(&desk, input, tokio::io::stdout(), stop_rx).await
        })
    };
    info!("✅ Reading updates from stdin");

    let shutdown = console::shutdown_signal()?;
    let finished = tokio::select! {
        res = &mut worker => Some(res),
        sig = shutdown => {
            let sig = sig?;
            info!("got {}, draining for up to {:?}", sig, config.drain_timeout);
            let _ = stop_tx.send(true);
            match tokio::time::timeout(config.drain_timeout, &mut worker).await {
                Ok(res) => Some(res),
                Err(_) => {
                    warn!("drain period elapsed, abandoning the transport loop");
                    worker.abort();
                    None
                }
            }
        }
    };

    match finished {
        Some(Ok(Ok(stats))) => info!(
            updates = stats.updates,
            replies = stats.replies,
            malformed = stats.malformed,
            "transport stopped"
        ),
        Some(Ok(Err(e))) => error!("transport failed: {:#}", e),
        Some(Err(e)) => error!("transport task failed: {}", e),
        None => {}
    }

    // Waits for any ledger call still running on the blocking pool.
    store.close()?;
    Ok(())
}
