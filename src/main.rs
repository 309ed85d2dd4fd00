use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

use irrigation_link::{util, ConnectionState, DeviceLink, LinkConfig, SpotKind};

/// Operator console for the irrigation controller's serial link.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// YAML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial device path; auto-detected when omitted
    #[arg(short, long, env = "IRRIGATION_PORT")]
    port: Option<String>,

    /// Baud rate override
    #[arg(short, long)]
    baud: Option<u32>,
}

const HELP: &str = "commands: on | off | toggle | npk | ph | tank | connect | disconnect | status | quit | <raw line>";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
    color_eyre::install()?;

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => LinkConfig::load(path)?,
        None => LinkConfig::default(),
    };
    if args.port.is_some() {
        config.port_path = args.port.clone();
    }
    if let Some(baud) = args.baud {
        config.baud_rate = baud;
    }

    match &config.log_dir {
        Some(dir) => util::log::init(dir, config.debug)?,
        None => util::log::set_debug(config.debug),
    }

    let link = DeviceLink::usb(config)?;
    spawn_printers(&link);

    if let Err(e) = link.connect().await {
        println!("connect failed: {} (type `connect` to retry)", e);
    }
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        match input {
            "" => continue,
            "quit" | "exit" => break,
            "help" => println!("{}", HELP),
            "status" => println!(
                "port={} baud={} state={} relay={} telemetry={:?}",
                link.config().port_path.as_deref().unwrap_or("auto"),
                link.config().baud_rate,
                link.current_state(),
                if link.relay_state() { "ON" } else { "OFF" },
                link.latest_telemetry()
            ),
            "connect" => {
                if let Err(e) = link.connect().await {
                    println!("connect failed: {}", e);
                }
            }
            "disconnect" => link.disconnect().await,
            "on" | "off" => report(link.set_relay(input == "on").await),
            "toggle" => report(link.toggle_relay().await),
            other => match other.parse::<SpotKind>() {
                Ok(kind) => println!("{:?}", link.get_spot_reading(kind).await),
                Err(_) => report(link.send_command(other).await),
            },
        }
    }

    if link.current_state() == ConnectionState::Connected {
        link.disconnect().await;
    }
    Ok(())
}

fn report(result: irrigation_link::Result<()>) {
    if let Err(e) = result {
        println!("command not sent: {}", e);
    }
}

fn spawn_printers(link: &DeviceLink) {
    let mut status = link.subscribe_status();
    tokio::spawn(async move {
        while let Some(state) = status.recv().await {
            let hint = match state {
                ConnectionState::Disconnected => "connect to a controller to get real-time sensor data",
                ConnectionState::Connecting => "opening serial port...",
                ConnectionState::Connected => "receiving real-time data from the device",
                ConnectionState::Error => {
                    "connection failed; check the device is plugged in and no other program holds the port"
                }
            };
            println!("[status] {} - {}", state, hint);
        }
    });

    let mut relay = link.subscribe_relay();
    tokio::spawn(async move {
        while let Some(on) = relay.recv().await {
            println!("[relay] {}", if on { "ON" } else { "OFF" });
        }
    });

    let mut telemetry = link.subscribe_telemetry();
    tokio::spawn(async move {
        while let Some(reading) = telemetry.recv().await {
            println!(
                "[tank] temp={:.1} hum={:.1} methane={:.2} moisture={:.1}",
                reading.temperature, reading.humidity, reading.methane_level, reading.moisture
            );
        }
    });
}
