//! stream-feeds command line entry point

use anyhow::{Context, bail};
use stream_feeds::{Activity, Client, ClientConfig, Feed, FeedReadOptions};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const USAGE: &str = "\
usage: stream-feeds <command> [args]

commands:
  read <slug:user> [limit]                  print a page of a flat feed
  add <slug:user> <actor> <verb> <object>   add an activity
  follow <slug:user> <slug:user>            first feed follows the second
  unfollow <slug:user> <slug:user>          first feed unfollows the second
  followers <slug:user> [limit]             list followers
  token <slug:user>                         print the feed token";

/// Entry point
///
/// # Setup
/// 1. Initialize tracing/logging
/// 2. Load configuration from file and environment
/// 3. Build the client
/// 4. Run the requested command
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing/logging
    let log_format = std::env::var("STREAM_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    if log_format == "json" {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "stream_feeds=info".into()),
            )
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "stream_feeds=info".into()),
            )
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        println!("{USAGE}");
        return Ok(());
    };

    // 2. Load configuration
    let config = ClientConfig::load().context("failed to load configuration")?;
    tracing::info!(
        location = %config.location_param(),
        version = %config.version(),
        "Configuration loaded"
    );

    // 3. Build the client
    let client = Client::new(config)?;

    // 4. Run
    run(&client, command, &args[1..]).await
}

async fn run(client: &Client, command: &str, args: &[String]) -> anyhow::Result<()> {
    match (command, args) {
        ("read", [feed_id, rest @ ..]) => {
            let feed = flat_feed(client, feed_id)?;
            let limit = parse_limit(rest.first())?;
            let page = feed
                .activities(&FeedReadOptions::new().limit(limit))
                .await?;
            for activity in &page.activities {
                println!("{}", serde_json::to_string(activity)?);
            }
            if !page.next.is_empty() {
                tracing::info!(next = %page.next, "More activities available");
            }
        }
        ("add", [feed_id, actor, verb, object]) => {
            let feed = flat_feed(client, feed_id)?;
            let stored = feed
                .add_activity(&Activity::new(actor.as_str(), verb.as_str(), object.as_str()))
                .await?;
            println!("{}", serde_json::to_string(&stored)?);
        }
        ("follow", [source, target]) => {
            let target = Feed::parse(target)?;
            flat_feed(client, source)?.follow(&target).await?;
            tracing::info!(source = %source, target = %target, "Followed");
        }
        ("unfollow", [source, target]) => {
            let target = Feed::parse(target)?;
            flat_feed(client, source)?.unfollow(&target).await?;
            tracing::info!(source = %source, target = %target, "Unfollowed");
        }
        ("followers", [feed_id, rest @ ..]) => {
            let feed = flat_feed(client, feed_id)?;
            let limit = parse_limit(rest.first())?;
            for follower in feed.followers(limit, 0).await? {
                println!("{follower}");
            }
        }
        ("token", [feed_id]) => {
            let feed = flat_feed(client, feed_id)?;
            println!("{}", feed.token().unwrap_or_default());
        }
        _ => bail!("unknown command or arguments\n\n{USAGE}"),
    }

    Ok(())
}

fn flat_feed(client: &Client, feed_id: &str) -> anyhow::Result<stream_feeds::FlatFeed> {
    let feed = Feed::parse(feed_id)?;
    Ok(client.flat_feed(feed.slug(), feed.user_id())?)
}

fn parse_limit(value: Option<&String>) -> anyhow::Result<u32> {
    match value {
        Some(value) => value
            .parse()
            .with_context(|| format!("invalid limit {value:?}")),
        None => Ok(25),
    }
}
