use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};

use framewatch::capture::{self, AfPacketCapture};
use framewatch::classify::FrameSummary;
use framewatch::cli::{Cli, OutputFormat, ResolvedCli};
use framewatch::error::FramewatchError;
use framewatch::model::traffic::{RateTracker, TrafficAccumulator};
use framewatch::output;
use framewatch::system;

/// Global shutdown flag, set by signal handlers.
static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

extern "C" fn signal_handler(_sig: libc::c_int) {
    SHUTDOWN_REQUESTED.store(true, Ordering::Relaxed);
}

fn install_signal_handlers() {
    unsafe {
        libc::signal(
            libc::SIGTERM,
            signal_handler as *const () as libc::sighandler_t,
        );
        libc::signal(
            libc::SIGINT,
            signal_handler as *const () as libc::sighandler_t,
        );
    }
}

fn exit_code(err: &FramewatchError) -> i32 {
    match err {
        FramewatchError::InsufficientPermission(_) => 1,
        FramewatchError::CaptureDevice(_) => 2,
        FramewatchError::Interface(_) => 3,
        _ => 4,
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    match run(cli.resolve()) {
        Ok(()) => {}
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(exit_code(&e));
        }
    }
}

fn run(cli: ResolvedCli) -> Result<(), FramewatchError> {
    install_signal_handlers();

    capture::check_capture_access()?;

    // Determine the capture interface.
    let interface = match cli.interface.clone() {
        Some(name) => name,
        None => system::interface::default_interface()?,
    };
    log::info!("Monitoring interface: {interface}");

    let cap = AfPacketCapture::new(&interface, cli.buffer, cli.promiscuous)?;

    // Capacity 8: each batch fills during a 500ms socket read timeout, so
    // 8 batches of headroom before backpressure starts.
    let (frame_tx, frame_rx) = bounded::<Vec<FrameSummary>>(8);

    let capture_handle = thread::Builder::new()
        .name("framewatch-capture".into())
        .spawn(move || capture_loop(cap, frame_tx))
        .map_err(|e| FramewatchError::Fatal(format!("spawn capture thread: {e}")))?;

    let result = if cli.is_watch() {
        run_watch(&cli, &interface, &frame_rx)
    } else {
        run_snapshot(&cli, &interface, &frame_rx)
    };

    SHUTDOWN_REQUESTED.store(true, Ordering::Relaxed);
    let _ = capture_handle.join();

    result
}

// ---------------------------------------------------------------------------
// Capture thread
// ---------------------------------------------------------------------------

/// Read classified frames from the device and ship them in batches until
/// shutdown is requested or the receiver goes away.
fn capture_loop(mut cap: AfPacketCapture, tx: crossbeam_channel::Sender<Vec<FrameSummary>>) {
    let mut batch = Vec::new();
    loop {
        if SHUTDOWN_REQUESTED.load(Ordering::Relaxed) {
            break;
        }
        match cap.read_frames(&mut batch) {
            Ok(()) => {
                if batch.is_empty() {
                    continue;
                }
                if tx.send(std::mem::take(&mut batch)).is_err() {
                    break;
                }
            }
            Err(e) => {
                log::error!("capture on {} failed: {}", cap.interface(), e);
                break;
            }
        }
    }
    log::info!(
        "capture on {} stopped ({} unclassified frames skipped)",
        cap.interface(),
        cap.skipped()
    );
}

// ---------------------------------------------------------------------------
// Watch mode
// ---------------------------------------------------------------------------

/// Accumulate continuously and print a report every interval until a signal
/// arrives.
fn run_watch(
    cli: &ResolvedCli,
    interface: &str,
    frame_rx: &Receiver<Vec<FrameSummary>>,
) -> Result<(), FramewatchError> {
    let interval = Duration::from_secs_f64(cli.interval);
    let start = Instant::now();
    let mut acc = TrafficAccumulator::default();
    let mut tracker = RateTracker::new();
    let mut last_report = Instant::now();

    loop {
        if SHUTDOWN_REQUESTED.load(Ordering::Relaxed) {
            break;
        }
        match frame_rx.recv_timeout(Duration::from_millis(100)) {
            Ok(batch) => {
                for summary in &batch {
                    acc.record(summary);
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        if last_report.elapsed() >= interval {
            let rates = tracker.update(acc.by_source());
            let report = acc.to_report(interface, start.elapsed(), &rates);
            output::write_report(&report, OutputFormat::Pretty, &mut io::stdout().lock())?;
            last_report = Instant::now();
        }
    }

    // Final report with whatever is still queued.
    drain_remaining(frame_rx, &mut acc);
    let rates = tracker.update(acc.by_source());
    let report = acc.to_report(interface, start.elapsed(), &rates);
    output::write_report(&report, OutputFormat::Pretty, &mut io::stdout().lock())
}

// ---------------------------------------------------------------------------
// Snapshot mode
// ---------------------------------------------------------------------------

/// Accumulate for the configured duration, then write one report.
fn run_snapshot(
    cli: &ResolvedCli,
    interface: &str,
    frame_rx: &Receiver<Vec<FrameSummary>>,
) -> Result<(), FramewatchError> {
    let duration = Duration::from_secs_f64(cli.duration);
    let start = Instant::now();
    let mut acc = TrafficAccumulator::default();
    let mut batch_count: u64 = 0;

    while start.elapsed() < duration {
        if SHUTDOWN_REQUESTED.load(Ordering::Relaxed) {
            break;
        }
        match frame_rx.recv_timeout(Duration::from_millis(100)) {
            Ok(batch) => {
                batch_count += 1;
                for summary in &batch {
                    acc.record(summary);
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    drain_remaining(frame_rx, &mut acc);

    log::info!(
        "Accumulation: {} batches, {} frames, {} sources in {:.1}s",
        batch_count,
        acc.frames(),
        acc.by_source().len(),
        start.elapsed().as_secs_f64()
    );

    let report = acc.to_report(interface, start.elapsed(), &Default::default());
    output::write_report(&report, cli.format, &mut io::stdout().lock())
}

/// Fold any batches still sitting in the channel into the accumulator.
fn drain_remaining(frame_rx: &Receiver<Vec<FrameSummary>>, acc: &mut TrafficAccumulator) {
    while let Ok(batch) = frame_rx.try_recv() {
        for summary in &batch {
            acc.record(summary);
        }
    }
}
