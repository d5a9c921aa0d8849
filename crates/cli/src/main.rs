use std::io;
use std::net::SocketAddr;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use clap::{Parser, Subcommand};
use sensorcom::protocol::{answer, commands, request};
use sensorcom::{
    Acquisition, AcquisitionConfig, LinkConfig, StreamLink, TcpTransport, UdpTransport,
};

#[derive(Parser)]
#[command(name = "sensorcom", about = "Talk to element-protocol sensors")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Listen for RTP packets and print loss statistics
    Monitor {
        /// Local UDP port
        #[arg(long, short, default_value_t = 0)]
        port: u16,
        /// Socket receive timeout
        #[arg(long, default_value_t = 500)]
        timeout_ms: u64,
        /// Interval between statistics lines
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
    },
    /// Send an echo request to a configuration server
    Echo {
        /// Sensor address (host:port)
        #[arg(long, short)]
        addr: SocketAddr,
        /// Extra answer reads before giving up
        #[arg(long, default_value_t = 0)]
        retries: u32,
    },
    /// Query the device type of a configuration server
    DeviceType {
        #[arg(long, short)]
        addr: SocketAddr,
    },
}

fn main() {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let outcome = match args.command {
        Command::Monitor {
            port,
            timeout_ms,
            interval_ms,
        } => monitor(port, timeout_ms, interval_ms),
        Command::Echo { addr, retries } => echo(addr, retries),
        Command::DeviceType { addr } => device_type(addr),
    };

    if let Err(e) = outcome {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn connect(addr: SocketAddr) -> sensorcom::Result<StreamLink<TcpTransport>> {
    let config = LinkConfig::default();
    let mut link = StreamLink::new(TcpTransport::new(addr, config.connect_timeout), config);
    link.connect()?;
    Ok(link)
}

fn echo(addr: SocketAddr, retries: u32) -> sensorcom::Result<()> {
    let mut link = connect(addr)?;
    let outcome = commands::send_command(&mut link, request::ECHO, retries);
    let code = link.framer().answer_code();
    println!("answer {code:#06X} ({})", answer::name(code));
    link.disconnect();
    outcome
}

fn device_type(addr: SocketAddr) -> sensorcom::Result<()> {
    let mut link = connect(addr)?;
    match commands::query_device_type(&mut link)? {
        Some(device_type) => println!("device type {device_type:#06X}"),
        None => println!("device type not reported"),
    }
    link.disconnect();
    Ok(())
}

fn monitor(port: u16, timeout_ms: u64, interval_ms: u64) -> sensorcom::Result<()> {
    let config = AcquisitionConfig {
        port,
        receive_timeout: Duration::from_millis(timeout_ms),
        ..AcquisitionConfig::default()
    };
    let acq = Acquisition::new(UdpTransport::default(), config);
    acq.set_exception_callback(|e| tracing::warn!(error = %e, "acquisition"));
    acq.connect()?;
    acq.start()?;

    println!(
        "listening on UDP port {}, press Enter to stop",
        acq.port().unwrap_or(port)
    );
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut input = String::new();
        let _ = io::stdin().read_line(&mut input);
        let _ = tx.send(());
    });

    let interval = Duration::from_millis(interval_ms);
    while rx.recv_timeout(interval).is_err() {
        println!(
            "received {} lost {}",
            acq.packets_received(),
            acq.lost_packet_count()
        );
    }

    acq.disconnect()
}
