use clap::{Args, Parser, Subcommand};
use serial_session::config::{Config, ConfigLoader, LogFormat, LoggingConfig};
use serial_session::{
    list_ports, DataBits, FlowControl, Parity, PartialSettings, PortDescriptor, SessionEvent,
    StopBits,
};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    name = "serial-session",
    version,
    about = "List serial ports and talk to them from the terminal.",
    long_about = "Lists attached serial ports, or opens one on a dedicated worker, \
                  prints what it sends and forwards stdin lines to it."
)]
struct Cli {
    /// Configuration file (skips the standard search).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List attached serial ports.
    List {
        /// Print JSON instead of one line per port.
        #[arg(long)]
        json: bool,
    },
    /// Open a port, print received data and send stdin lines.
    Monitor(MonitorArgs),
}

#[derive(Args, Debug)]
struct MonitorArgs {
    /// Device path or configured alias.
    port: String,

    #[arg(short, long)]
    baud: Option<i64>,

    /// Read timeout in milliseconds.
    #[arg(long)]
    timeout_ms: Option<i64>,

    #[arg(long)]
    data_bits: Option<DataBits>,

    #[arg(long)]
    parity: Option<Parity>,

    #[arg(long)]
    stop_bits: Option<StopBits>,

    #[arg(long)]
    flow_control: Option<FlowControl>,

    /// Request exclusive access to the TTY.
    #[arg(long)]
    exclusive: bool,

    /// Print received bytes as hex.
    #[arg(long)]
    hex: bool,

    /// Terminate sent lines with CR LF instead of LF.
    #[arg(long)]
    crlf: bool,
}

impl MonitorArgs {
    fn settings(&self) -> PartialSettings {
        PartialSettings {
            baud_rate: self.baud,
            timeout_ms: self.timeout_ms,
            data_bits: self.data_bits,
            parity: self.parity,
            stop_bits: self.stop_bits,
            flow_control: self.flow_control,
            exclusive: self.exclusive.then_some(true),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let loader = match &cli.config {
        Some(path) => ConfigLoader::load_from(path)?,
        None => ConfigLoader::load()?,
    };
    let config = loader.into_config();
    init_tracing(&config.logging);

    match cli.command {
        Command::List { json } => print_ports(json),
        Command::Monitor(args) => monitor(&config, args).await,
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
    }
}

fn print_ports(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let ports = list_ports()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&ports)?);
        return Ok(());
    }

    if ports.is_empty() {
        println!("No serial ports detected on this system");
    }
    for port in &ports {
        println!("{port}");
    }
    Ok(())
}

async fn monitor(config: &Config, args: MonitorArgs) -> Result<(), Box<dyn std::error::Error>> {
    let path = config.serial.resolve_port(&args.port);
    let settings = args.settings().or(&config.serial.defaults);

    let (events_tx, mut events) = mpsc::unbounded_channel::<SessionEvent>();
    let port = PortDescriptor::from_path(path.clone())
        .session()
        .settings(settings)
        .options(config.worker.clone())
        .spawn(events_tx)?;
    info!("Monitoring {} (Ctrl+C to exit)", path);

    let line_ending: &[u8] = if args.crlf { b"\r\n" } else { b"\n" };
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut stdout = tokio::io::stdout();

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(SessionEvent::Data(bytes)) => {
                    stdout.write_all(render(&bytes, args.hex).as_bytes()).await?;
                    stdout.flush().await?;
                }
                Some(SessionEvent::Error(err)) => {
                    error!("{}", err);
                    if err.is_terminal() {
                        break;
                    }
                }
                // Worker exited
                None => break,
            },
            line = stdin.next_line(), if stdin_open => match line? {
                Some(line) => {
                    let mut bytes = line.into_bytes();
                    bytes.extend_from_slice(line_ending);
                    port.write(bytes)?;
                }
                None => stdin_open = false,
            },
            _ = signal::ctrl_c() => break,
        }
    }

    // close() waits for the worker to release the device
    tokio::task::spawn_blocking(move || port.close()).await?;
    info!("Closed {}", path);
    Ok(())
}

fn render(bytes: &[u8], hex: bool) -> String {
    if hex {
        let mut out: String = bytes.iter().map(|b| format!("{b:02x} ")).collect();
        out.push('\n');
        out
    } else {
        String::from_utf8_lossy(bytes).into_owned()
    }
}
