use std::{io, thread};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, warn};

use crate::common::config::VsyncSettings;

/// Receives the frame timestamp in nanoseconds.
pub type VsyncCallback = Box<dyn FnOnce(i64) + Send>;

pub trait VsyncSource: Send + Sync {
    /// Runs `callback` once, at the next frame boundary.
    fn request_vsync(&self, callback: VsyncCallback);
}

/// Software frame clock. Requests are batched and released together on the
/// next frame boundary; the clock thread exits once the clock is dropped.
pub struct FrameClock {
    tx: Sender<VsyncCallback>,
    interval: Duration,
}

impl FrameClock {
    pub fn spawn(settings: &VsyncSettings) -> std::io::Result<FrameClock> {
        let interval = settings.frame_interval().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid vsync refresh rate {}", settings.refresh_rate),
            )
        })?;
        let (tx, rx) = crossbeam_channel::unbounded();
        thread::Builder::new()
            .name("vsync".to_string())
            .spawn(move || run_clock(rx, interval))?;
        Ok(FrameClock { tx, interval })
    }

    pub fn interval(&self) -> Duration { self.interval }
}

impl VsyncSource for FrameClock {
    fn request_vsync(&self, callback: VsyncCallback) {
        if self.tx.send(callback).is_err() {
            warn!("vsync clock is gone, dropping frame request");
        }
    }
}

fn run_clock(rx: Receiver<VsyncCallback>, interval: Duration) {
    let epoch = Instant::now();
    let interval_ns = interval.as_nanos().max(1);
    while let Ok(first) = rx.recv() {
        let now_ns = epoch.elapsed().as_nanos();
        let next_ns = (now_ns / interval_ns + 1) * interval_ns;
        thread::sleep(Duration::from_nanos((next_ns - now_ns) as u64));

        let mut batch = vec![first];
        batch.extend(rx.try_iter());
        let timestamp = next_ns as i64;
        for callback in batch {
            callback(timestamp);
        }
    }
    debug!("vsync clock stopped");
}
