//! CPAL audio output sink

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{SampleFormat, SupportedStreamConfig};
use dasp_graph::Buffer;
use rtrb::{Consumer, Producer, RingBuffer};

use crate::context::{StreamState, StreamTransport};
use crate::error::EngineError;
use crate::graph::{Inputs, Port};
use crate::node::{AudioNode, ProcessContext};

/// How long to wait for the stream thread to acknowledge a command.
const REPLY_TIMEOUT: Duration = Duration::from_millis(500);

/// Replies carry the number of the request they answer; 0 is the build.
type Reply = (u64, Result<(), String>);

enum StreamCommand {
    Play,
    Pause,
    Close,
}

/// A sink that outputs audio to a CPAL device
///
/// The CPAL stream runs on its own thread; this node feeds samples
/// into a ring buffer that the stream consumes. The stream itself is
/// started, paused and closed through the paired [`CpalTransport`].
pub struct CpalSink {
    buffer: Producer<f32>,
    channels: usize,
    mixes: Vec<Buffer>,
    /// Set by the stream callback when it ran out of samples
    had_underrun: Arc<AtomicBool>,
}

/// Controls the stream thread behind a [`CpalSink`].
pub struct CpalTransport {
    commands: Sender<(u64, StreamCommand)>,
    replies: Receiver<Reply>,
    last_request: u64,
    thread: Option<JoinHandle<()>>,
}

impl CpalSink {
    /// Open an output stream on `device` and return the sink node together
    /// with its transport. The stream is built paused.
    pub fn open(device: &cpal::Device, config: &SupportedStreamConfig) -> Result<(Self, CpalTransport), EngineError> {
        let channels = config.channels() as usize;
        let sample_format = config.sample_format();
        let stream_config = config.config();
        let sample_rate = stream_config.sample_rate.0;

        // Ring buffer sized for ~100ms of audio to handle scheduling jitter
        let buffer_samples = ((sample_rate as f32 * 0.1) as usize) * channels;
        let buffer_size = buffer_samples.next_power_of_two().max(8192);
        let (producer, consumer) = RingBuffer::<f32>::new(buffer_size);

        let had_underrun = Arc::new(AtomicBool::new(false));
        let had_underrun_clone = had_underrun.clone();

        let (command_tx, command_rx) = mpsc::channel::<(u64, StreamCommand)>();
        let (reply_tx, reply_rx) = mpsc::channel::<Reply>();

        // Streams are not Send on every platform; the stream lives and dies on this thread
        let device = device.clone();
        let thread = std::thread::Builder::new()
            .name("entrain-output".into())
            .spawn(move || {
                let stream = match build_stream(
                    &device,
                    sample_format,
                    &stream_config,
                    consumer,
                    had_underrun_clone,
                ) {
                    Ok(stream) => stream,
                    Err(err) => {
                        let _ = reply_tx.send((0, Err(err.to_string())));
                        return;
                    }
                };
                let _ = reply_tx.send((0, Ok(())));

                while let Ok((id, command)) = command_rx.recv() {
                    let result = match command {
                        StreamCommand::Play => stream.play().map_err(|e| e.to_string()),
                        StreamCommand::Pause => stream.pause().map_err(|e| e.to_string()),
                        StreamCommand::Close => break,
                    };
                    let _ = reply_tx.send((id, result));
                }
                tracing::debug!("output stream closed");
            })
            .map_err(|e| EngineError::EngineUnavailable(format!("cannot spawn output thread: {}", e)))?;

        match reply_rx.recv_timeout(REPLY_TIMEOUT) {
            Ok((_, Ok(()))) => {}
            Ok((_, Err(reason))) => return Err(EngineError::EngineUnavailable(reason)),
            Err(_) => return Err(EngineError::EngineUnavailable("output thread did not respond".into())),
        }

        let sink = Self {
            buffer: producer,
            channels,
            mixes: vec![Buffer::default(); channels],
            had_underrun,
        };
        let transport = CpalTransport {
            commands: command_tx,
            replies: reply_rx,
            last_request: 0,
            thread: Some(thread),
        };
        Ok((sink, transport))
    }
}

impl CpalTransport {
    fn request(&mut self, command: StreamCommand) -> Result<(), String> {
        self.last_request += 1;
        let id = self.last_request;
        self.commands.send((id, command)).map_err(|_| "output thread has exited".to_string())?;

        let deadline = Instant::now() + REPLY_TIMEOUT;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.replies.recv_timeout(remaining) {
                Ok((reply, result)) if reply == id => return result,
                // late answer to a request that already timed out
                Ok(_) => continue,
                Err(_) => return Err("output thread did not respond".to_string()),
            }
        }
    }
}

impl StreamTransport for CpalTransport {
    fn play(&mut self) -> StreamState {
        match self.request(StreamCommand::Play) {
            Ok(()) => StreamState::Playing,
            Err(reason) => {
                tracing::warn!(%reason, "output stream refused to start");
                StreamState::Blocked
            }
        }
    }

    fn pause(&mut self) {
        if let Err(reason) = self.request(StreamCommand::Pause) {
            tracing::warn!(%reason, "output stream refused to pause");
        }
    }

    fn close(&mut self) {
        if let Some(thread) = self.thread.take() {
            self.last_request += 1;
            let _ = self.commands.send((self.last_request, StreamCommand::Close));
            if thread.join().is_err() {
                tracing::warn!("output thread panicked");
            }
        }
    }
}

impl Drop for CpalTransport {
    fn drop(&mut self) {
        self.close();
    }
}

fn build_stream(
    device: &cpal::Device,
    sample_format: SampleFormat,
    stream_config: &cpal::StreamConfig,
    mut consumer: Consumer<f32>,
    had_underrun: Arc<AtomicBool>,
) -> Result<cpal::Stream, cpal::BuildStreamError> {
    let stream = match sample_format {
        SampleFormat::F32 => device.build_output_stream(
            stream_config,
            move |data: &mut [f32], _| {
                let mut underrun = false;
                for sample in data.iter_mut() {
                    *sample = consumer.pop().unwrap_or_else(|_| {
                        underrun = true;
                        0.0
                    });
                }
                if underrun {
                    had_underrun.store(true, Ordering::Relaxed);
                }
            },
            |err| tracing::warn!(%err, "output stream error"),
            None,
        )?,
        SampleFormat::I16 => device.build_output_stream(
            stream_config,
            move |data: &mut [i16], _| {
                let mut underrun = false;
                for sample in data.iter_mut() {
                    let s = consumer.pop().unwrap_or_else(|_| {
                        underrun = true;
                        0.0
                    });
                    *sample = (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                }
                if underrun {
                    had_underrun.store(true, Ordering::Relaxed);
                }
            },
            |err| tracing::warn!(%err, "output stream error"),
            None,
        )?,
        SampleFormat::U16 => device.build_output_stream(
            stream_config,
            move |data: &mut [u16], _| {
                let mut underrun = false;
                for sample in data.iter_mut() {
                    let s = consumer.pop().unwrap_or_else(|_| {
                        underrun = true;
                        0.0
                    });
                    *sample = ((s.clamp(-1.0, 1.0) + 1.0) * 0.5 * u16::MAX as f32) as u16;
                }
                if underrun {
                    had_underrun.store(true, Ordering::Relaxed);
                }
            },
            |err| tracing::warn!(%err, "output stream error"),
            None,
        )?,
        _ => return Err(cpal::BuildStreamError::StreamConfigNotSupported),
    };
    // cpal starts some backends immediately; the transport decides when to play
    let _ = stream.pause();
    Ok(stream)
}

impl AudioNode for CpalSink {
    type Message = (); // No control messages

    fn process(&mut self, _ctx: &ProcessContext, inputs: &Inputs, _outputs: &mut [Buffer]) {
        if self.had_underrun.swap(false, Ordering::Relaxed) {
            tracing::warn!("output underrun, device played silence");
        }

        let samples_needed = Buffer::LEN * self.channels;

        // Check for overrun (generating faster than consuming)
        if self.buffer.slots() < samples_needed {
            // Skip this block rather than partially write
            return;
        }

        // Map output channels to the stereo bus (duplicate mono if needed)
        for (ch, mix) in self.mixes.iter_mut().enumerate() {
            inputs.sum_into(Port::Signal, ch, mix);
        }

        // Interleave channels into ring buffer
        for i in 0..Buffer::LEN {
            for mix in self.mixes.iter() {
                // Safety: we verified slots above
                let _ = self.buffer.push(mix[i]);
            }
        }
    }

    #[inline]
    fn num_outputs(&self) -> usize { 0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Stream thread stand-in that answers its first command too late.
    fn stalling_transport() -> CpalTransport {
        let (command_tx, command_rx) = mpsc::channel::<(u64, StreamCommand)>();
        let (reply_tx, reply_rx) = mpsc::channel::<Reply>();
        let thread = std::thread::spawn(move || {
            let mut first = true;
            while let Ok((id, command)) = command_rx.recv() {
                if let StreamCommand::Close = command {
                    break;
                }
                if first {
                    first = false;
                    std::thread::sleep(REPLY_TIMEOUT + Duration::from_millis(100));
                    let _ = reply_tx.send((id, Err("stalled".to_string())));
                } else {
                    let _ = reply_tx.send((id, Ok(())));
                }
            }
        });
        CpalTransport {
            commands: command_tx,
            replies: reply_rx,
            last_request: 0,
            thread: Some(thread),
        }
    }

    #[test]
    fn late_reply_is_not_taken_for_the_next_answer() {
        let mut transport = stalling_transport();
        assert_eq!(transport.play(), StreamState::Blocked);
        assert_eq!(transport.play(), StreamState::Playing);
        transport.close();
        assert!(transport.thread.is_none());
    }
}
