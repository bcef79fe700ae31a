//! Terminal departure board backed by the departures gateway.
//!
//! Press Enter to refresh manually. `SIGUSR1` marks the board as visible
//! again and triggers a background refresh.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ferjetider::client::{
    CacheStore, FileStore, HttpDeparturesSource, MemoryStore, RefreshController, board,
};
use ferjetider::routes::{self, DirectionKey, RouteKey};

#[derive(Debug, Parser)]
#[command(name = "ferjetider-watch", about = "Live ferry departures in the terminal")]
struct Args {
    /// Base URL of the departures gateway
    #[arg(long, default_value = "http://127.0.0.1:3000")]
    base_url: String,
    /// Route key, e.g. halhjem_sandvikvag
    #[arg(long, value_parser = parse_route)]
    route: RouteKey,
    /// Direction key belonging to the route, e.g. halhjem_to_sandvikvag
    #[arg(long, value_parser = parse_direction)]
    direction: DirectionKey,
    #[arg(long, default_value_t = 6, value_parser = clap::value_parser!(u16).range(1..=12))]
    limit: u16,
    /// Directory for the last-known departures. Kept in memory when omitted.
    #[arg(long)]
    cache_dir: Option<PathBuf>,
}

fn parse_route(value: &str) -> Result<RouteKey, String> {
    RouteKey::parse(value).ok_or_else(|| {
        let known: Vec<&str> = RouteKey::ALL.iter().map(|k| k.as_str()).collect();
        format!("unknown route, expected one of: {}", known.join(", "))
    })
}

fn parse_direction(value: &str) -> Result<DirectionKey, String> {
    DirectionKey::parse(value).ok_or_else(|| {
        let known: Vec<&str> = DirectionKey::ALL.iter().map(|k| k.as_str()).collect();
        format!("unknown direction, expected one of: {}", known.join(", "))
    })
}

#[cfg(unix)]
async fn visible_again(signal: &mut Option<tokio::signal::unix::Signal>) {
    match signal {
        Some(signal) => {
            signal.recv().await;
        }
        None => std::future::pending().await,
    }
}

#[cfg(not(unix))]
async fn visible_again(_signal: &mut Option<()>) {
    std::future::pending().await
}

fn redraw(snapshot: &ferjetider::client::Snapshot) {
    print!("\x1b[2J\x1b[H{}", board::render(snapshot));
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ferjetider=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    if routes::direction(args.route, args.direction).is_none() {
        return Err(format!(
            "direction {} does not belong to route {}",
            args.direction, args.route
        )
        .into());
    }

    let source = Arc::new(HttpDeparturesSource::new(&args.base_url)?);
    let store: Arc<dyn CacheStore> = match &args.cache_dir {
        Some(dir) => Arc::new(FileStore::new(dir)),
        None => Arc::new(MemoryStore::new()),
    };

    let controller = RefreshController::new(
        source,
        store,
        args.route,
        args.direction,
        usize::from(args.limit),
    );
    let mut updates = controller.subscribe();

    controller.select(args.route, args.direction).await;
    controller.spawn_auto_refresh();
    info!(base_url = %args.base_url, "Watching departures");

    #[cfg(unix)]
    let mut visibility =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::user_defined1()).ok();
    #[cfg(not(unix))]
    let mut visibility: Option<()> = None;

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    redraw(&controller.snapshot());

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                redraw(&snapshot);
            }
            line = stdin.next_line(), if stdin_open => {
                match line {
                    Ok(Some(_)) => {
                        let controller = controller.clone();
                        tokio::spawn(async move { controller.refetch().await });
                    }
                    // stdin closed, keep running on timers alone
                    Ok(None) | Err(_) => stdin_open = false,
                }
            }
            _ = visible_again(&mut visibility) => controller.notify_visible(),
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    controller.shutdown();
    Ok(())
}
