use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedSender;

use opsdash::config::Config;
use opsdash::logging::{info, obj, v_str, Domain};
use opsdash::render::TextSurface;
use opsdash::session::{Session, SessionEvent};
use opsdash::source::SnapshotLoader;

/// Stdin lines become search queries or `:reload` / `:quit` commands.
async fn read_input(events: UnboundedSender<SessionEvent>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if events.send(SessionEvent::from_input(&line)).is_err() {
            break;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();
    let loader = SnapshotLoader::from_config(&cfg)?;
    info(
        Domain::System,
        "startup",
        obj(&[("live_url", v_str(&cfg.live_url)), ("fallback", v_str(&cfg.fallback))]),
    );

    let mut session = Session::new(&cfg, loader, TextSurface::stdout());
    tokio::spawn(read_input(session.sender()));

    let events = session.sender();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = events.send(SessionEvent::Shutdown);
        }
    });

    session.run().await;
    Ok(())
}
