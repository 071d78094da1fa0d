//! Simple IRC client example
//!
//! Connects to a server, joins a channel, echoes channel traffic to stdout
//! and answers `!ping` with `pong`. Quits after five minutes.
//!
//! ```text
//! RUST_LOG=slirc_client=debug cargo run --example simple_client -- irc.libera.chat '#slirc'
//! ```

use std::time::Duration;

use anyhow::Context;
use slirc_client::{Client, Event, Options};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let server = args.next().unwrap_or_else(|| "irc.libera.chat".to_string());
    let channel = args.next().unwrap_or_else(|| "#slirc".to_string());

    let mut opts = Options::new(server, "slirc-demo");
    opts.port = 6697;
    opts.secure = true;
    opts.flood_protection = true;
    opts.retry_count = Some(3);
    opts.channels.push(channel.clone());

    let mut client = Client::new(opts);

    // Handlers run on the client task; hand commands back through a channel.
    let (replies_tx, mut replies) = mpsc::unbounded_channel::<String>();
    client.on("message#", move |event| {
        if let Event::Message { from, to, text } = event {
            println!("{} <{}> {}", to, from.as_deref().unwrap_or("*"), text);
            if text.trim() == "!ping" {
                let _ = replies_tx.send(to.clone());
            }
        }
    });
    client.on("registered", |event| {
        if let Event::Registered { nick } = event {
            println!("registered as {}", nick);
        }
    });
    client.on("abort", |event| {
        if let Event::Abort { retry_count } = event {
            eprintln!("giving up after {} retries", retry_count);
        }
    });

    let handle = client.handle();
    let task = tokio::spawn(client.run());

    let deadline = tokio::time::sleep(Duration::from_secs(300));
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            _ = &mut deadline => break,
            Some(target) = replies.recv() => {
                handle.say(&target, "pong").context("client stopped")?;
            }
        }
    }

    let closed = handle
        .disconnect(Some("demo over"))
        .context("client stopped")?;
    let _ = tokio::time::timeout(Duration::from_secs(5), closed).await;
    drop(handle);
    task.await.context("client task failed")?;
    Ok(())
}
