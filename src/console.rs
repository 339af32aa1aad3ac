use crate::desk::{Desk, Update};
use std::future::Future;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tracing::{info, warn};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub updates: u64,
    pub replies: u64,
    pub malformed: u64,
}

/// Feeds newline-delimited JSON updates to the desk and writes each reply as
/// one JSON line. Returns on end of input or once `shutdown` turns true; an
/// update already being handled is always finished first.
pub async fn run<R, W>(
    desk: &Desk,
    input: R,
    mut output: W,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<RunStats>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut stats = RunStats::default();

    loop {
        if *shutdown.borrow() {
            info!("shutdown requested, stop receiving updates");
            break;
        }

        let line = tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() {
                    info!("shutdown sender dropped, stop receiving updates");
                    break;
                }
                continue;
            }
            line = lines.next_line() => line?,
        };

        let Some(line) = line else {
            info!("input closed");
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let upd: Update = match serde_json::from_str(&line) {
            Ok(u) => u,
            Err(e) => {
                warn!("skipping malformed update: {}", e);
                stats.malformed += 1;
                continue;
            }
        };
        stats.updates += 1;

        for r in desk.handle(&upd).await {
            let mut buf = serde_json::to_vec(&r)?;
            buf.push(b'\n');
            output.write_all(&buf).await?;
            stats.replies += 1;
        }
        output.flush().await?;
    }

    Ok(stats)
}

/// Resolves with the name of the first termination signal received, SIGINT
/// or SIGTERM. The SIGTERM handler is installed before this returns.
pub fn shutdown_signal() -> std::io::Result<impl Future<Output = std::io::Result<&'static str>>> {
    let mut term = signal(SignalKind::terminate())?;
    Ok(async move {
        tokio::select! {
            res = tokio::signal::ctrl_c() => res.map(|_| "SIGINT"),
            _ = term.recv() => Ok("SIGTERM"),
        }
    })
}
