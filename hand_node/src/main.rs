//! # Hand Node
//!
//! The firmware process. Boot order: config, tracing, state store `init`,
//! command queue, outbound buffer, then one thread per task: telemetry
//! sweep, control loop, outbound drain, and a stdin command bridge standing
//! in for the network session layer until that layer is wired up.
//!
//! The store and queue are constructed here exactly once and handed to
//! every task as an `Arc`; there is no global instance anywhere in the
//! workspace.

use clap::Parser;
use hand::config::{ConfigLoader, HandConfig, LogLevel};
use hand_control::{ControlLoop, LoggingDriver};
use hand_core::{CommandQueue, StateStore, TelemetryPublisher};
use hand_link::ingress::{CommandIngress, IngressStats};
use hand_link::outbound::{OutboundBuffer, OutboundFrame};
use std::io::BufRead;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Hand Node — robotic hand firmware process
#[derive(Parser, Debug)]
#[command(name = "hand_node")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Robotic hand firmware: state store, command queue, telemetry")]
struct Args {
    /// Path to the node configuration TOML.
    #[arg(default_value = "config/hand.toml")]
    config: PathBuf,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();

    // Config first: its log_level feeds the subscriber.
    let config = match load_config(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: {e}");
            process::exit(1);
        }
    };
    setup_tracing(&args, &config);

    info!("Hand Node v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(config) {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Hand Node shutdown complete");
}

fn load_config(path: &PathBuf) -> Result<HandConfig, Box<dyn std::error::Error>> {
    let config = HandConfig::load(path)?;
    config.validate()?;
    Ok(config)
}

fn run(config: HandConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        "Config OK: node={}, {} store slots, telemetry every {} ms",
        config.shared.node_name,
        config.store.total(),
        config.telemetry.period_ms,
    );

    // The two shared resources, constructed once.
    let store = Arc::new(StateStore::new());
    store.init(&config.store);
    let queue = Arc::new(CommandQueue::new());

    let (outbound, drain) = OutboundBuffer::with_depth(config.link.outbound_depth);
    let outbound = Arc::new(outbound);

    let running = Arc::new(AtomicBool::new(true));
    {
        let r = running.clone();
        ctrlc::set_handler(move || {
            info!("Received shutdown signal");
            r.store(false, Ordering::SeqCst);
        })?;
    }

    // Telemetry sweep task.
    let telemetry_handle = {
        let publisher = TelemetryPublisher::new(
            store.clone(),
            outbound.clone(),
            config.telemetry.clone(),
        );
        let running = running.clone();
        std::thread::Builder::new()
            .name("telemetry".to_string())
            .spawn(move || publisher.run(&running))?
    };

    // Control loop task. LoggingDriver stands in for the servo hardware
    // until a real driver is selected at build time.
    let control_handle = {
        let mut control = ControlLoop::new(
            queue.clone(),
            store.clone(),
            Box::new(LoggingDriver),
            config.control,
        );
        let running = running.clone();
        std::thread::Builder::new()
            .name("control".to_string())
            .spawn(move || control.run(&running))?
    };

    // Outbound drain task: the external transport attaches here. Until the
    // session layer lands, frames are logged and discarded.
    let drain_handle = {
        let running = running.clone();
        std::thread::Builder::new()
            .name("outbound-drain".to_string())
            .spawn(move || drain_outbound(drain, &running))?
    };

    // Stdin command bridge: one `<topic> <json-payload>` pair per line.
    // Bench stand-in for the network session layer feeding the ingress.
    // Runs detached on its own thread: a read blocked on an idle terminal
    // must not hold up shutdown, so `run` waits on the flag, not on stdin.
    {
        let ingress = CommandIngress::new(queue.clone(), outbound.clone(), config.telemetry.qos);
        let running = running.clone();
        std::thread::Builder::new()
            .name("stdin-bridge".to_string())
            .spawn(move || {
                let stdin = std::io::stdin();
                let stats = bridge_lines(stdin.lock(), &ingress, &running);
                info!(
                    queued = stats.queued,
                    dropped = stats.dropped,
                    pings = stats.pings,
                    "stdin bridge closed"
                );
                // EOF on stdin ends the process too.
                running.store(false, Ordering::SeqCst);
            })?;
    }

    while running.load(Ordering::Relaxed) {
        std::thread::sleep(Duration::from_millis(100));
    }

    telemetry_handle.join().map_err(|_| "telemetry task panicked")?;
    control_handle.join().map_err(|_| "control task panicked")?;
    drain_handle.join().map_err(|_| "drain task panicked")?;

    Ok(())
}

/// Drain outbound frames until shutdown.
fn drain_outbound(drain: Receiver<OutboundFrame>, running: &AtomicBool) {
    while running.load(Ordering::Relaxed) {
        match drain.recv_timeout(Duration::from_millis(100)) {
            Ok(frame) => {
                debug!(
                    id = frame.id.0,
                    topic = %frame.topic,
                    bytes = frame.payload.len(),
                    qos = frame.options.qos,
                    "outbound frame (no transport attached, discarded)"
                );
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

/// Feed `<topic> <payload>` lines into the command ingress until EOF, a
/// read error, or a cleared `running` flag. Returns the traffic counters.
fn bridge_lines(
    reader: impl BufRead,
    ingress: &CommandIngress,
    running: &AtomicBool,
) -> IngressStats {
    let mut stats = IngressStats::default();
    for line in reader.lines() {
        if !running.load(Ordering::Relaxed) {
            break;
        }
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "stdin read failed, bridge stopping");
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (topic, payload) = line.split_once(' ').unwrap_or((line, ""));
        ingress.ingest(topic, payload.as_bytes(), &mut stats);
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn bridge_parts() -> (
        Arc<CommandQueue>,
        Receiver<OutboundFrame>,
        CommandIngress,
    ) {
        let queue = Arc::new(CommandQueue::new());
        let (outbound, drain) = OutboundBuffer::with_depth(4);
        let ingress = CommandIngress::new(queue.clone(), Arc::new(outbound), 1);
        (queue, drain, ingress)
    }

    #[test]
    fn bridge_feeds_lines_to_ingress() {
        let (queue, _drain, ingress) = bridge_parts();
        let running = AtomicBool::new(true);

        let input = Cursor::new("hand/control/lock {\"servo\":1}\nbad/topic {}\n\n");
        let stats = bridge_lines(input, &ingress, &running);

        assert_eq!(stats.queued, 1);
        assert_eq!(stats.dropped, 1);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn bridge_stops_on_cleared_flag_without_consuming_input() {
        let (queue, _drain, ingress) = bridge_parts();
        let running = AtomicBool::new(false);

        let input = Cursor::new("hand/control/lock {\"servo\":1}\n");
        let stats = bridge_lines(input, &ingress, &running);

        assert_eq!(stats, IngressStats::default());
        assert!(queue.is_empty());
    }
}

fn setup_tracing(args: &Args, config: &HandConfig) {
    // --verbose overrides the config file's log_level.
    let level = if args.verbose {
        Level::DEBUG
    } else {
        match config.shared.log_level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
