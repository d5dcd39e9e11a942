//! # PocketPad Test Client
//!
//! Stands in for phone controllers and receivers: sends single inputs, watches
//! relayed traffic, or simulates a group of players moving sticks and pressing
//! buttons.

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use pocketpad_relay::{events, InputEvent, PlayerIdentity};
use rand::Rng;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::{interval, sleep, timeout, Instant};
use tracing::{error, info, warn};

use pad_test_client::{PadBoard, PadSession};

#[derive(Parser, Debug)]
#[command(name = "pad-test-client")]
#[command(about = "PocketPad relay test client")]
struct Args {
    /// Relay base URL
    #[arg(short, long, default_value = "http://localhost:3000")]
    url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send one input event and wait for the relay to echo it back
    Send {
        #[arg(short, long, default_value = "1")]
        player: String,
        #[arg(short, long, value_enum, default_value = "axis")]
        kind: Kind,
        /// Button or axis name
        #[arg(short, long, default_value = "LX")]
        name: String,
        #[arg(short, long, default_value = "0.5", allow_negative_numbers = true)]
        value: f64,
        /// Join this channel before sending
        #[arg(long)]
        channel: Option<String>,
    },
    /// Print relayed events and keep each player's stick and button state
    Watch {
        #[arg(long)]
        channel: Option<String>,
        /// Stop after this many seconds (runs until closed otherwise)
        #[arg(short, long)]
        duration: Option<u64>,
    },
    /// Simulate players sending stick and button traffic
    Sim {
        #[arg(short, long, default_value = "2")]
        players: u32,
        /// Input events per second per player
        #[arg(short, long, default_value = "20.0")]
        rate: f64,
        /// Simulation duration in seconds
        #[arg(short, long, default_value = "10")]
        duration: u64,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum Kind {
    Axis,
    Button,
}

fn player_identity(raw: &str) -> PlayerIdentity {
    match raw.parse::<i64>() {
        Ok(n) => PlayerIdentity::Number(n),
        Err(_) => PlayerIdentity::Text(raw.to_string()),
    }
}

async fn join(session: &PadSession, channel: &Option<String>) -> Result<()> {
    if let Some(channel) = channel {
        session.emit(events::JOIN_ROOM, json!(channel)).await?;
        info!("🚪 Joined channel {}", channel);
    }
    Ok(())
}

async fn run_send(url: &str, player: String, kind: Kind, name: String, value: f64, channel: Option<String>) -> Result<()> {
    let player = player_identity(&player);
    let mut session = PadSession::connect(url).await?;
    join(&session, &channel).await?;
    session.emit(events::REGISTER_PLAYER, json!(player)).await?;

    let event = match kind {
        Kind::Axis => InputEvent::axis(player.clone(), &name, value),
        Kind::Button => InputEvent::button(player.clone(), &name, value),
    }
    .into_value();
    info!("📤 Sending {}", event);
    session.emit(events::CONTROLLER_INPUT, event.clone()).await?;

    let echoed = timeout(Duration::from_secs(5), async {
        while let Some((name, data)) = session.next_event().await {
            if name == events::CONTROLLER_INPUT && data == event {
                return true;
            }
        }
        false
    })
    .await;

    match echoed {
        Ok(true) => info!("✅ Relay echoed the event"),
        Ok(false) => warn!("🔌 Connection closed before the echo arrived"),
        Err(_) => warn!("⏰ No echo within 5s"),
    }
    session.close().await
}

async fn run_watch(url: &str, channel: Option<String>, duration: Option<u64>) -> Result<()> {
    let mut session = PadSession::connect(url).await?;
    join(&session, &channel).await?;
    let mut board = PadBoard::new();
    let deadline = duration.map(|secs| Instant::now() + Duration::from_secs(secs));

    loop {
        let next = match deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, session.next_event()).await {
                Ok(next) => next,
                Err(_) => break,
            },
            None => session.next_event().await,
        };
        let Some((name, data)) = next else {
            info!("🔌 Relay closed the connection");
            break;
        };

        match name.as_str() {
            events::CONTROLLER_INPUT => watch_input(&mut board, data),
            events::PING => {}
            other => info!("📨 {} {}", other, data),
        }
    }

    info!("📊 Final state:");
    for (player, state) in board.players() {
        info!("  🎮 {:>4}: {} ({} events)", player, state, state.events);
    }
    if board.anonymous_events() > 0 {
        info!("  ❔ {} events without a player", board.anonymous_events());
    }
    session.close().await
}

fn watch_input(board: &mut PadBoard, data: Value) {
    match InputEvent::from_value(data) {
        Ok(event) => match board.apply(&event) {
            Some((player, state)) => info!("🎮 {:>4}: {}", player, state),
            None => info!("❔ {}", event.into_value()),
        },
        Err(e) => warn!("⚠️ {}", e),
    }
}

const STICK_AXES: [&str; 4] = ["LX", "LY", "RX", "RY"];
const BUTTONS: [&str; 6] = ["A", "B", "X", "Y", "START", "SELECT"];

/// Random walk over the sticks with the occasional button tap.
fn next_input(player: &PlayerIdentity, sticks: &mut [f64; 4]) -> InputEvent {
    let mut rng = rand::thread_rng();
    if rng.gen_bool(0.15) {
        let button = BUTTONS[rng.gen_range(0..BUTTONS.len())];
        let pressed = if rng.gen_bool(0.5) { 1.0 } else { 0.0 };
        return InputEvent::button(player.clone(), button, pressed);
    }

    let axis = rng.gen_range(0..STICK_AXES.len());
    let value = (sticks[axis] + rng.gen_range(-0.25..0.25)).clamp(-1.0, 1.0);
    sticks[axis] = value;
    InputEvent::axis(player.clone(), STICK_AXES[axis], (value * 100.0).round() / 100.0)
}

const MAX_RATE: f64 = 1000.0;

/// Send period for `rate` events per second, never below one millisecond.
fn tick_period(rate: f64) -> Result<Duration> {
    anyhow::ensure!(
        rate.is_finite() && rate > 0.0 && rate <= MAX_RATE,
        "rate must be in (0, {}] events per second, got {}",
        MAX_RATE,
        rate
    );
    Ok(Duration::from_secs_f64(1.0 / rate).max(Duration::from_millis(1)))
}

async fn simulate_player(url: String, player: PlayerIdentity, period: Duration, duration: Duration) -> Result<()> {
    let mut session = PadSession::connect(&url).await?;
    session.emit(events::REGISTER_PLAYER, json!(player)).await?;
    info!("🎮 Player {} connected and ready", player);

    let mut ticker = interval(period);
    let stop = sleep(duration);
    tokio::pin!(stop);

    let mut sticks = [0.0; 4];
    let mut sent = 0u64;
    let mut received = 0u64;

    loop {
        tokio::select! {
            _ = &mut stop => break,
            _ = ticker.tick() => {
                let event = next_input(&player, &mut sticks);
                session.emit(events::CONTROLLER_INPUT, event.into_value()).await?;
                sent += 1;
            }
            next = session.next_event() => match next {
                Some((name, _)) if name == events::CONTROLLER_INPUT => received += 1,
                Some(_) => {}
                None => {
                    warn!("🔌 Player {} lost its connection", player);
                    break;
                }
            }
        }
    }

    info!("📊 Player {} sent {} events, received {} events", player, sent, received);
    session.close().await
}

async fn run_sim(url: &str, players: u32, rate: f64, duration: u64) -> Result<()> {
    let period = tick_period(rate)?;
    info!("🚀 Simulating {} players at {:.1} events/s for {}s", players, rate, duration);

    let mut handles = Vec::new();
    for n in 1..=players {
        let player = PlayerIdentity::Number(n.into());
        let url = url.to_string();
        handles.push(tokio::spawn(async move {
            if let Err(e) = simulate_player(url, player.clone(), period, Duration::from_secs(duration)).await {
                error!("❌ Player {} simulation failed: {:#}", player, e);
            }
        }));
        // stagger connections
        sleep(Duration::from_millis(100)).await;
    }

    for handle in handles {
        let _ = handle.await;
    }
    info!("✅ Simulation complete");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .init();

    let args = Args::parse();
    match args.command {
        Command::Send { player, kind, name, value, channel } => {
            run_send(&args.url, player, kind, name, value, channel).await
        }
        Command::Watch { channel, duration } => run_watch(&args.url, channel, duration).await,
        Command::Sim { players, rate, duration } => run_sim(&args.url, players, rate, duration).await,
    }
}
