use std::fs;
use std::thread;
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use tracing::debug;
use ttyprims_device::{DeviceError, ReadOutcome};

use crate::cmd::{device_closed, open_device, parse_duration, ByteSource, SendArgs};
use crate::exit::{device_error, io_error, CliError, CliResult, DATA_INVALID, SUCCESS, TIMEOUT};
use crate::output::{print_received, OutputFormat};

const READ_CHUNK: usize = 4096;

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let wait_timeout = parse_duration(&args.wait_timeout)?;
    let poll_interval = parse_duration(&args.poll_interval)?;
    let payload = resolve_payload(&args)?;

    let mut handle = open_device(&args.serial, &args.device)?;
    let device = handle.address().to_string();

    write_all(&mut handle, &payload, poll_interval, wait_timeout)
        .map_err(|err| device_error("send failed", err))?;
    handle
        .flush()
        .map_err(|err| device_error("send failed", err))?;
    debug!(%device, bytes = payload.len(), "payload sent");

    if args.wait {
        let reply = wait_for_reply(&mut handle, wait_timeout, poll_interval)
            .map_err(|err| device_error("receive failed", err))?;
        match reply {
            Reply::Data(data) => print_received(&data, &device, format),
            Reply::TimedOut => {
                return Err(CliError::new(
                    TIMEOUT,
                    format!("no reply from {device} within {wait_timeout:?}"),
                ))
            }
            Reply::Closed => return Err(device_closed(&device)),
        }
    }

    handle
        .close()
        .map_err(|err| device_error("close failed", err))?;
    Ok(SUCCESS)
}

fn resolve_payload(args: &SendArgs) -> CliResult<Vec<u8>> {
    let mut payload = if let Some(data) = &args.data {
        data.as_bytes().to_vec()
    } else if let Some(values) = &args.bytes {
        ttyprims::pack(values)
            .ok_or_else(|| CliError::new(DATA_INVALID, "--bytes values must be in 0..=255"))?
            .to_vec()
    } else if let Some(path) = &args.file {
        fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?
    } else {
        Vec::new()
    };

    if args.newline {
        payload.push(b'\n');
    }
    Ok(payload)
}

/// Write all of `payload` to a non-blocking handle, retrying while it is full.
fn write_all(
    handle: &mut ttyprims_device::DeviceHandle,
    mut payload: &[u8],
    poll_interval: Duration,
    timeout: Duration,
) -> Result<(), DeviceError> {
    let deadline = Instant::now() + timeout;
    while !payload.is_empty() {
        match handle.write(payload)? {
            0 if Instant::now() >= deadline => {
                return Err(std::io::Error::from(std::io::ErrorKind::TimedOut).into())
            }
            0 => thread::sleep(poll_interval),
            written => payload = &payload[written..],
        }
    }
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum Reply {
    Data(Bytes),
    TimedOut,
    Closed,
}

/// Poll until the device sends something, then drain what is immediately available.
fn wait_for_reply<S: ByteSource>(
    source: &mut S,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<Reply, DeviceError> {
    let deadline = Instant::now() + timeout;
    let mut reply = BytesMut::new();

    loop {
        match source.poll_bytes(READ_CHUNK)? {
            ReadOutcome::Data(data) => reply.extend_from_slice(&data),
            ReadOutcome::WouldBlock if !reply.is_empty() => return Ok(Reply::Data(reply.freeze())),
            ReadOutcome::Eof if !reply.is_empty() => return Ok(Reply::Data(reply.freeze())),
            ReadOutcome::Eof => return Ok(Reply::Closed),
            ReadOutcome::WouldBlock if Instant::now() >= deadline => return Ok(Reply::TimedOut),
            ReadOutcome::WouldBlock => thread::sleep(poll_interval),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;

    struct ScriptedSource {
        outcomes: VecDeque<ReadOutcome>,
        polls: usize,
    }

    impl ScriptedSource {
        fn new(outcomes: impl IntoIterator<Item = ReadOutcome>) -> Self {
            Self {
                outcomes: outcomes.into_iter().collect(),
                polls: 0,
            }
        }
    }

    impl ByteSource for ScriptedSource {
        fn poll_bytes(&mut self, _max: usize) -> Result<ReadOutcome, DeviceError> {
            self.polls += 1;
            Ok(self.outcomes.pop_front().unwrap_or(ReadOutcome::WouldBlock))
        }
    }

    const TICK: Duration = Duration::from_millis(1);

    #[test]
    fn reply_collects_chunks_until_quiet() {
        let mut source = ScriptedSource::new([
            ReadOutcome::WouldBlock,
            ReadOutcome::Data(Bytes::from_static(b"po")),
            ReadOutcome::Data(Bytes::from_static(b"ng\n")),
            ReadOutcome::WouldBlock,
            ReadOutcome::Data(Bytes::from_static(b"late")),
        ]);

        let reply = wait_for_reply(&mut source, Duration::from_secs(5), TICK).unwrap();
        assert_eq!(reply, Reply::Data(Bytes::from_static(b"pong\n")));
        assert_eq!(source.polls, 4);
    }

    #[test]
    fn silent_device_times_out() {
        let mut source = ScriptedSource::new([]);
        let reply = wait_for_reply(&mut source, Duration::from_millis(10), TICK).unwrap();
        assert_eq!(reply, Reply::TimedOut);
        assert!(source.polls >= 2);
    }

    #[test]
    fn end_of_stream_before_reply_is_closed() {
        let mut source = ScriptedSource::new([ReadOutcome::WouldBlock, ReadOutcome::Eof]);
        let reply = wait_for_reply(&mut source, Duration::from_secs(5), TICK).unwrap();
        assert_eq!(reply, Reply::Closed);
    }
}
