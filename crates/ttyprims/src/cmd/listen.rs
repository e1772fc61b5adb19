use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::info;
use ttyprims_device::{DeviceError, ReadOutcome};

use crate::cmd::{device_closed, open_device, parse_duration, ByteSource, ListenArgs};
use crate::exit::{device_error, CliError, CliResult, SUCCESS};
use crate::output::{print_received, OutputFormat};

const READ_CHUNK: usize = 4096;

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let poll_interval = parse_duration(&args.poll_interval)?;
    let mut handle = open_device(&args.serial, &args.device)?;
    let device = handle.address().to_string();

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;
    info!(%device, "listening");

    let stop = listen(
        &mut handle,
        &running,
        args.count,
        poll_interval,
        |data| print_received(data, &device, format),
    )
    .map_err(|err| device_error("receive failed", err))?;

    handle
        .close()
        .map_err(|err| device_error("close failed", err))?;

    match stop {
        Stop::Closed => Err(device_closed(&device)),
        Stop::Count | Stop::Interrupted => Ok(SUCCESS),
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Stop {
    Count,
    Interrupted,
    Closed,
}

fn listen<S: ByteSource>(
    source: &mut S,
    running: &AtomicBool,
    count: Option<usize>,
    poll_interval: Duration,
    mut sink: impl FnMut(&[u8]),
) -> Result<Stop, DeviceError> {
    let mut printed = 0usize;

    while running.load(Ordering::SeqCst) {
        match source.poll_bytes(READ_CHUNK)? {
            ReadOutcome::Data(data) => {
                sink(&data);
                printed = printed.saturating_add(1);
                if count.is_some_and(|count| printed >= count) {
                    return Ok(Stop::Count);
                }
            }
            ReadOutcome::WouldBlock => thread::sleep(poll_interval),
            ReadOutcome::Eof => return Ok(Stop::Closed),
        }
    }

    Ok(Stop::Interrupted)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    struct Chatty {
        remaining: usize,
        running: Option<Arc<AtomicBool>>,
    }

    impl ByteSource for Chatty {
        fn poll_bytes(&mut self, _max: usize) -> Result<ReadOutcome, DeviceError> {
            if self.remaining == 0 {
                if let Some(running) = &self.running {
                    running.store(false, Ordering::SeqCst);
                    return Ok(ReadOutcome::WouldBlock);
                }
                return Ok(ReadOutcome::Eof);
            }
            self.remaining -= 1;
            Ok(ReadOutcome::Data(Bytes::from_static(b"tick\n")))
        }
    }

    #[test]
    fn stops_after_count() {
        let running = AtomicBool::new(true);
        let mut source = Chatty {
            remaining: 10,
            running: None,
        };
        let mut seen = Vec::new();

        let stop = listen(&mut source, &running, Some(3), Duration::ZERO, |data| {
            seen.push(data.to_vec())
        })
        .unwrap();

        assert_eq!(stop, Stop::Count);
        assert_eq!(seen.len(), 3);
        assert_eq!(source.remaining, 7);
    }

    #[test]
    fn stops_when_interrupted() {
        let running = Arc::new(AtomicBool::new(true));
        let mut source = Chatty {
            remaining: 2,
            running: Some(running.clone()),
        };
        let mut seen = 0;

        let stop = listen(&mut source, &running, None, Duration::ZERO, |_| seen += 1).unwrap();
        assert_eq!(stop, Stop::Interrupted);
        assert_eq!(seen, 2);
    }

    #[test]
    fn reports_end_of_stream() {
        let running = AtomicBool::new(true);
        let mut source = Chatty {
            remaining: 1,
            running: None,
        };
        let stop = listen(&mut source, &running, None, Duration::ZERO, |_| {}).unwrap();
        assert_eq!(stop, Stop::Closed);
    }
}
