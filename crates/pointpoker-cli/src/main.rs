//! Pointpoker round simulator.
//!
//! Runs one planning-poker round with several participants sharing an
//! in-memory store, printing what each of them sees along the way.
//!
//! Usage:
//!   cargo run -p pointpoker-cli
//!   cargo run -p pointpoker-cli -- --voter Ann=5 --voter Ben=3 --voter Cat
//!   RUST_LOG=pointpoker_client=debug cargo run -p pointpoker-cli -- --reset

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use pointpoker_client::{
    ClientConfig, ClientHandle, FilePreferences, IdentityStore, MemoryStore, RoomView, RoomWatch, spawn_client,
};
use pointpoker_types::format_point;
use tracing_subscriber::{EnvFilter, fmt};

/// Simulate a planning-poker round.
#[derive(Parser, Debug)]
#[command(name = "pointpoker")]
#[command(about = "Simulate a planning-poker round against an in-memory store")]
struct Args {
    /// Client config file (RON). Defaults to the platform config dir.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Name of the room to create
    #[arg(long, default_value = "Sprint planning")]
    room: String,

    /// Leader display name
    #[arg(long, default_value = "Lead")]
    leader: String,

    /// Participant as NAME or NAME=POINT (repeatable)
    #[arg(long = "voter", default_values = ["Ann=5", "Ben=3", "Cat=8", "Dan"])]
    voters: Vec<String>,

    /// Extra point values to add to the scale
    #[arg(long = "point")]
    points: Vec<String>,

    /// Persist the leader's identity in the configured preferences file
    #[arg(long)]
    persist: bool,

    /// Reset the average after revealing it
    #[arg(long)]
    reset: bool,
}

#[derive(Debug)]
struct Voter {
    name: String,
    point: Option<f64>,
}

fn parse_voter(spec: &str) -> Result<Voter> {
    match spec.split_once('=') {
        Some((name, point)) => Ok(Voter {
            name: name.to_string(),
            point: Some(point.trim().parse().with_context(|| format!("bad point for {name}: {point}"))?),
        }),
        None => Ok(Voter {
            name: spec.to_string(),
            point: None,
        }),
    }
}

async fn wait(room: &RoomWatch, what: &str, pred: impl FnMut(&RoomView) -> bool) -> Result<Arc<RoomView>> {
    tokio::time::timeout(Duration::from_secs(5), room.wait_until(pred))
        .await
        .with_context(|| format!("timed out waiting for {what}"))?
        .map_err(Into::into)
}

/// The room snapshot and the full roster have both arrived.
fn votes_in(view: &RoomView, members: usize, votes: usize) -> bool {
    view.room.is_some() && view.members.len() == members && view.members.iter().filter(|m| m.has_voted()).count() == votes
}

fn print_ballot(title: &str, view: &RoomView, mask: &str) {
    println!("── {title}");
    for line in view.ballot() {
        let marker = if line.its_me { "*" } else { " " };
        println!("  {marker} {:<12} {}", line.name, line.vote.render(mask));
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::load_or_default()?,
    };
    let voters = args.voters.iter().map(|s| parse_voter(s)).collect::<Result<Vec<_>>>()?;
    if voters.is_empty() {
        bail!("at least one --voter is required");
    }

    let store = MemoryStore::new();
    let leader_prefs = if args.persist {
        let path = config.preferences_path();
        tracing::info!(path = %path.display(), "persisting leader identity");
        IdentityStore::new(Arc::new(FilePreferences::open(path)?))
    } else {
        IdentityStore::in_memory()
    };
    let mask = config.mask_placeholder.clone();
    let leader = spawn_client(Arc::new(store.clone()), leader_prefs, config.clone());

    let mut draft = leader.new_draft();
    draft.name = args.room.clone();
    for point in &args.points {
        draft.add_point(point)?;
    }
    let scale: Vec<String> = draft.scale().values().iter().copied().map(format_point).collect();

    let room_id = leader.create_room(&args.leader, draft).await?;
    leader.join_room(&room_id, &args.leader).await?;
    println!("room {} ({room_id}) scale [{}]", args.room, scale.join(", "));

    let mut clients: Vec<(ClientHandle, &Voter)> = Vec::new();
    for voter in &voters {
        let client = spawn_client(Arc::new(store.clone()), IdentityStore::in_memory(), config.clone());
        client.join_room(&room_id, &voter.name).await?;
        if let Some(point) = voter.point {
            client.cast_vote(&room_id, point).await?;
        }
        clients.push((client, voter));
    }

    let expected_votes = voters.iter().filter(|v| v.point.is_some()).count();
    let expected_members = voters.len() + 1;
    let leader_room = leader.open_room(&room_id);
    let view = wait(&leader_room, "votes", |v| votes_in(v, expected_members, expected_votes)).await?;
    print_ballot(&format!("{} sees (voting open)", args.leader), &view, &mask);

    let (first_client, first_voter) = &clients[0];
    let peer_room = first_client.open_room(&room_id);
    let peer_view = wait(&peer_room, "peer roster", |v| v.members.len() == expected_members).await?;
    print_ballot(&format!("{} sees (voting open)", first_voter.name), &peer_view, &mask);

    match leader.compute_average(&view).await {
        Ok(_) => {
            let revealed = wait(&peer_room, "reveal", |v| !v.voting_open() && v.room.is_some()).await?;
            print_ballot(&format!("{} sees (revealed)", first_voter.name), &revealed, &mask);
            println!("average: {}", revealed.average_text().unwrap_or_default());

            if args.reset {
                let closed = wait(&leader_room, "leader reveal", |v| !v.voting_open() && v.room.is_some()).await?;
                leader.reset_average(&closed).await?;
                wait(&peer_room, "reset", |v| v.voting_open()).await?;
                println!("average reset; voting is open again");
            }
        }
        Err(e) => println!("no average: {e}"),
    }

    first_client.leave(&peer_room).await?;
    let after = wait(&leader_room, "leave", |v| v.members.len() == expected_members - 1).await?;
    println!("{} left; {} members remain", first_voter.name, after.members.len());
    Ok(())
}
