#[cfg(not(feature = "std"))]
fn main() {}

#[cfg(feature = "std")]
use battleship_client::{
    init_logging, random_fleet, Board, Client, ClientConfig, ClientHandle, Coord, Declined,
    Effect, Exit, Notice, Party, RoomState, Sound, TcpTransport,
};

#[cfg(feature = "std")]
use clap::Parser;
#[cfg(feature = "std")]
use rand::rngs::SmallRng;
#[cfg(feature = "std")]
use rand::SeedableRng;
#[cfg(feature = "std")]
use std::path::PathBuf;
#[cfg(feature = "std")]
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[cfg(feature = "std")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser)]
#[cfg(feature = "std")]
enum Commands {
    /// Connect to a game server and play from the terminal.
    Connect {
        #[arg(long, default_value = "127.0.0.1:8080")]
        addr: String,
        #[arg(long)]
        nickname: String,
        #[arg(long, help = "TOML file with client settings")]
        config: Option<PathBuf>,
        #[arg(long, help = "Override the keep-alive interval (milliseconds)")]
        keep_alive_ms: Option<u64>,
        #[arg(long, help = "Override the receive timeout (milliseconds, 0 disables)")]
        receive_timeout_ms: Option<u64>,
    },
}

#[cfg(feature = "std")]
const HELP: &str =
    "commands: create | join CODE | leave | place | toggle RC | ready | fire RC | new | state | quit";

#[cfg(feature = "std")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Connect {
            addr,
            nickname,
            config,
            keep_alive_ms,
            receive_timeout_ms,
        } => {
            let mut settings = match config {
                Some(path) => ClientConfig::load(path)?,
                None => ClientConfig::default(),
            };
            if let Some(ms) = keep_alive_ms {
                settings.keep_alive_interval_ms = ms;
            }
            if let Some(ms) = receive_timeout_ms {
                settings.receive_timeout_ms = ms;
            }
            init_logging(settings.level_filter());
            play(&addr, nickname, settings).await
        }
    }
}

#[cfg(feature = "std")]
enum Flow {
    Continue,
    Quit,
}

#[cfg(feature = "std")]
async fn play(addr: &str, nickname: String, config: ClientConfig) -> anyhow::Result<()> {
    println!("Connecting to {}...", addr);
    let mut transport = TcpTransport::connect_with_timeout(addr, config.connect_timeout()).await?;
    transport.set_send_timeout(config.send_timeout());

    let (client, handle, mut effects) = Client::new(transport, &config);
    let mut client_task = tokio::spawn(client.run());
    let printer = tokio::spawn(async move {
        while let Some(effect) = effects.recv().await {
            print_effect(&effect);
        }
    });

    report(handle.handshake(nickname).await);
    println!("{}", HELP);

    let mut rng = SmallRng::from_rng(&mut rand::rng());
    let mut placed: Option<Board> = None;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let finished = loop {
        tokio::select! {
            finished = &mut client_task => break finished,
            line = lines.next_line() => {
                let flow = match line? {
                    Some(line) => execute(&handle, line.trim(), &mut placed, &mut rng).await,
                    None => Flow::Quit,
                };
                if let Flow::Quit = flow {
                    handle.close().await;
                    break (&mut client_task).await;
                }
            }
        }
    };
    drop(handle);
    let _ = printer.await;

    match finished?? {
        Exit::Closed => println!("Disconnected."),
        Exit::Terminated => println!("The server has terminated the connection."),
    }
    Ok(())
}

#[cfg(feature = "std")]
async fn execute(
    handle: &ClientHandle,
    line: &str,
    placed: &mut Option<Board>,
    rng: &mut SmallRng,
) -> Flow {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Flow::Continue;
    };
    let arg = words.next();

    match (command, arg) {
        ("create", None) => report(handle.create_room().await),
        ("join", Some(code)) => report(handle.join_room(code).await),
        ("leave", None) => report(handle.leave_room().await),
        ("place", None) => match random_fleet(rng) {
            Ok(board) => {
                print!("{}", board);
                *placed = Some(board);
            }
            Err(e) => println!("{}", e),
        },
        ("toggle", Some(code)) => match Coord::from_code(code) {
            Some(coord) => {
                let board = placed.get_or_insert_with(Board::new);
                board.toggle_ship(coord);
                print!("{}", board);
            }
            None => println!("Not a cell: {} (row digit then column digit, e.g. 23)", code),
        },
        ("ready", None) => match placed {
            Some(board) => report(handle.declare_ready(*board).await),
            None => println!("Place a fleet first (place)."),
        },
        ("fire", Some(code)) => match Coord::from_code(code) {
            Some(coord) => report(handle.fire(coord).await),
            None => println!("Not a cell: {} (row digit then column digit, e.g. 23)", code),
        },
        ("new", None) => {
            *placed = None;
            report(handle.new_game().await);
        }
        ("state", None) => match handle.snapshot().await {
            Some(state) => print_state(&state),
            None => println!("Not connected."),
        },
        ("quit", None) => return Flow::Quit,
        _ => println!("{}", HELP),
    }
    Flow::Continue
}

#[cfg(feature = "std")]
fn report(result: Result<(), Declined>) {
    if let Err(declined) = result {
        println!("Declined: {}", declined);
    }
}

#[cfg(feature = "std")]
fn print_effect(effect: &Effect) {
    match effect {
        Effect::StageChanged { to, .. } => println!("== {:?} ==", to),
        Effect::Sound(Sound::Hit) => println!("Hit!"),
        Effect::Sound(Sound::Miss) => println!("Miss."),
        Effect::Sound(Sound::Win) => println!("You won!"),
        Effect::Sound(Sound::Lose) => println!("You lost."),
        Effect::Notice(notice) => println!("{}", notice_text(*notice)),
    }
}

#[cfg(feature = "std")]
fn notice_text(notice: Notice) -> String {
    match notice {
        Notice::NicknameTaken => "Nickname already taken.".into(),
        Notice::RoomNotFound => "Room does not exist.".into(),
        Notice::RoomFull => "Room is full.".into(),
        Notice::RoomLimit(limit) => format!("Server room limit reached ({}).", limit),
        Notice::OpponentLeft => "Opponent left the room.".into(),
        Notice::OpponentUnresponsive => "Opponent is not responding.".into(),
        Notice::OpponentRejoined => "Opponent is back.".into(),
        Notice::BoardRejected => "Server rejected the fleet.".into(),
        Notice::TurnRejected => "Server rejected the turn.".into(),
        Notice::UnreadableReply => "Server sent a reply that could not be read.".into(),
        Notice::ConnectionLost => "Connection lost.".into(),
    }
}

#[cfg(feature = "std")]
fn print_state(state: &RoomState) {
    println!("Stage: {:?}", state.stage);
    if let Some(code) = &state.room_code {
        println!("Room: {}", code);
    }
    if let Some(winner) = state.winner {
        println!("Winner: {}", if winner == Party::Player { "you" } else { "opponent" });
    }
    for (label, side) in [("You", &state.player), ("Opponent", &state.opponent)] {
        println!(
            "{} {:?}: ready={} on_turn={} responding={}",
            label, side.nickname, side.ready, side.on_turn, side.responding
        );
        print!("{}", side.board);
    }
}
