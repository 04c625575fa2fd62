use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "framewatch",
    version,
    about = "Ingress IPv4 traffic monitor: per-source packet and byte accounting"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Capture continuously and print a report every interval (default)
    Watch(WatchArgs),
    /// Capture for a fixed duration, then print one report and exit
    Snapshot(SnapshotArgs),
}

/// Arguments shared by both capture modes.
#[derive(Args, Debug, Clone)]
pub struct CaptureArgs {
    /// Interface to capture on (default: first active non-loopback)
    #[arg(long)]
    pub interface: Option<String>,

    /// Socket receive buffer size in bytes [default: 262144]
    #[arg(long, default_value_t = 262_144, value_parser = validate_buffer)]
    pub buffer: u32,

    /// Enable promiscuous mode on the capture interface
    #[arg(long)]
    pub promiscuous: bool,
}

impl Default for CaptureArgs {
    fn default() -> Self {
        Self {
            interface: None,
            buffer: 262_144,
            promiscuous: false,
        }
    }
}

/// Arguments specific to watch mode.
#[derive(Args, Debug, Clone)]
pub struct WatchArgs {
    #[command(flatten)]
    pub capture: CaptureArgs,

    /// Seconds between reports [default: 5.0]
    #[arg(long, default_value_t = 5.0, value_parser = validate_interval)]
    pub interval: f64,
}

/// Arguments specific to snapshot mode.
#[derive(Args, Debug, Clone)]
pub struct SnapshotArgs {
    #[command(flatten)]
    pub capture: CaptureArgs,

    /// Output format [default: pretty]
    #[arg(long, default_value = "pretty")]
    pub format: OutputFormat,

    /// How long to capture before producing output, in seconds [default: 5.0]
    #[arg(long, default_value_t = 5.0, value_parser = validate_duration)]
    pub duration: f64,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Pretty,
    Json,
}

fn validate_interval(s: &str) -> Result<f64, String> {
    let val: f64 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if val < 0.5 {
        Err("interval must be at least 0.5 seconds".to_string())
    } else if val > 300.0 {
        Err("interval must be at most 300 seconds".to_string())
    } else {
        Ok(val)
    }
}

fn validate_duration(s: &str) -> Result<f64, String> {
    let val: f64 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if val < 1.0 {
        Err("duration must be at least 1.0 seconds".to_string())
    } else if val > 600.0 {
        Err("duration must be at most 600 seconds".to_string())
    } else {
        Ok(val)
    }
}

fn validate_buffer(s: &str) -> Result<u32, String> {
    let val: u32 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid integer"))?;
    if val < 4096 {
        Err("buffer must be at least 4096 bytes".to_string())
    } else if val > 16_777_216 {
        Err("buffer must be at most 16777216 bytes".to_string())
    } else {
        Ok(val)
    }
}

/// Flattened configuration after resolving subcommand variants.
pub struct ResolvedCli {
    pub interface: Option<String>,
    pub buffer: u32,
    pub promiscuous: bool,
    pub interval: f64,
    pub format: OutputFormat,
    pub duration: f64,
    snapshot: bool,
}

impl ResolvedCli {
    pub fn is_watch(&self) -> bool {
        !self.snapshot
    }
}

impl Cli {
    /// Resolve subcommand variants into a flat configuration struct.
    pub fn resolve(self) -> ResolvedCli {
        match self.command {
            Some(Command::Snapshot(s)) => ResolvedCli {
                interface: s.capture.interface,
                buffer: s.capture.buffer,
                promiscuous: s.capture.promiscuous,
                interval: 5.0,
                format: s.format,
                duration: s.duration,
                snapshot: true,
            },
            Some(Command::Watch(w)) => ResolvedCli {
                interface: w.capture.interface,
                buffer: w.capture.buffer,
                promiscuous: w.capture.promiscuous,
                interval: w.interval,
                format: OutputFormat::Pretty,
                duration: 0.0,
                snapshot: false,
            },
            None => ResolvedCli {
                interface: None,
                buffer: 262_144,
                promiscuous: false,
                interval: 5.0,
                format: OutputFormat::Pretty,
                duration: 0.0,
                snapshot: false,
            },
        }
    }
}
