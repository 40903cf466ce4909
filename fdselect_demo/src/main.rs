//! Demonstration driver for the interruptible reader.
//!
//! 1. Load the reader configuration (defaults when the file is absent).
//! 2. Block in a reader thread on an idle pipe.
//! 3. Interrupt it twice from the main thread, one second apart.
//! 4. Send one payload, close the pipe and wait for the reader to see EOF.

use fdselect_core::config::{ConfigError, ReaderConfig};
use fdselect_core::os::Pipe;
use fdselect_core::{logger, InterruptibleReader};
use log::{debug, error, info};
use std::env;
use std::io::{ErrorKind, Write};
use std::thread;
use std::time::Duration;

const DEFAULT_CONFIG: &str = "fdselect.conf";

fn load_config(path: &str) -> Result<ReaderConfig, ConfigError> {
    match ReaderConfig::load_from_file(path) {
        Err(ConfigError::Io(e)) if e.kind() == ErrorKind::NotFound => Ok(ReaderConfig::default()),
        other => other,
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cfg_path = env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let config = load_config(&cfg_path)?;
    logger::init(config.log_level);
    info!("config {:?} from {}", config, cfg_path);

    let pipe = Pipe::new()?;
    let mut reader = InterruptibleReader::with_config(pipe.read, &config)?;
    let interrupter = reader.interrupter();
    let mut write = pipe.write;

    let worker = thread::Builder::new()
        .name("reader".to_string())
        .spawn(move || {
            let mut buf = [0u8; 1024];
            loop {
                debug!("before read");
                match reader.read_interruptible(&mut buf) {
                    Ok(0) => {
                        info!("end of stream");
                        break;
                    }
                    Ok(n) => info!("read {} byte(s): {:?}", n, String::from_utf8_lossy(&buf[..n])),
                    Err(e) if e.is_cancelled() => info!("read interrupted"),
                    Err(e) if e.is_timed_out() => debug!("read timed out"),
                    Err(e) => {
                        error!("read failed: {}", e);
                        break;
                    }
                }
            }
        })?;

    for _ in 0..2 {
        thread::sleep(Duration::from_secs(1));
        info!("interrupt");
        interrupter.interrupt();
    }

    thread::sleep(Duration::from_secs(1));
    write.write_all(b"hello from main")?;
    drop(write);

    if worker.join().is_err() {
        return Err("reader thread panicked".into());
    }
    Ok(())
}

fn main() {
    // The logger may not be installed yet when configuration fails.
    if let Err(e) = run() {
        eprintln!("fdselect_demo: {}", e);
        std::process::exit(1);
    }
}
