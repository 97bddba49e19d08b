use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;

use crate::config::Config;
use crate::decode;
use crate::error::{StreamError, WrapperError};
use crate::events::{EventSink, LogSink, MetadataEvent};
use crate::frame::{Frame, FrameReader};
use crate::machine::StateMachine;
use crate::state::{self, SharedState};
use crate::types::{NowPlaying, ReaderStatus};

/// Follows a metadata pipe and keeps the shared now-playing state current.
///
/// Cloning gives another handle to the same reader, e.g. for a signal handler.
#[derive(Clone)]
pub struct MetadataReader {
    config: Arc<Config>,
    state: SharedState,
    sink: Arc<dyn EventSink>,
    stop_requested: Arc<AtomicBool>,
    worker: Arc<Mutex<Option<JoinHandle<Result<(), StreamError>>>>>,
}

enum Outcome {
    EndOfStream,
    Stopped,
}

impl MetadataReader {
    pub fn new(config: Config, state: SharedState) -> Self {
        Self {
            config: Arc::new(config),
            state,
            sink: Arc::new(LogSink),
            stop_requested: Arc::new(AtomicBool::new(false)),
            worker: Arc::new(Mutex::new(None)),
        }
    }

    /// Replace the default [`LogSink`].
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> SharedState {
        self.state.clone()
    }

    /// Copy of the current snapshot.
    pub fn snapshot(&self) -> NowPlaying {
        self.state.read().now_playing.clone()
    }

    /// Open the configured source and read it until end of stream, stop or failure.
    ///
    /// Blocks the calling thread. Opening a FIFO blocks until a writer appears.
    pub fn start(&self) -> Result<(), StreamError> {
        let path = &self.config.source;
        log::info!("Opening metadata source {}", path.display());

        let file = match File::open(path) {
            Ok(file) => file,
            Err(source) => {
                let err = StreamError::Open {
                    path: path.clone(),
                    source,
                };
                self.set_status(ReaderStatus::Failed(err.to_string()));
                return Err(err);
            }
        };

        self.run(BufReader::new(file))
    }

    /// Consume items from any buffered source.
    pub fn run<R: BufRead>(&self, mut source: R) -> Result<(), StreamError> {
        self.set_status(ReaderStatus::Reading);

        let mut frames = FrameReader::new(self.config.max_record_bytes);
        let mut machine = StateMachine::new(self.config.fingerprint);
        let result = self.pump(&mut source, &mut frames, &mut machine);

        let dropped = frames.discard();
        if dropped > 0 {
            log::debug!("Discarded {} bytes of an incomplete item", dropped);
        }

        match result {
            Ok(Outcome::EndOfStream) => {
                log::info!("Metadata source reached end of stream");
                self.set_status(ReaderStatus::Finished);
                Ok(())
            }
            Ok(Outcome::Stopped) => {
                log::info!("Metadata reader stopped");
                self.set_status(ReaderStatus::Stopped);
                Ok(())
            }
            Err(e) => {
                log::error!("Metadata reader failed: {}", e);
                self.set_status(ReaderStatus::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    fn pump<R: BufRead>(
        &self,
        source: &mut R,
        frames: &mut FrameReader,
        machine: &mut StateMachine,
    ) -> Result<Outcome, StreamError> {
        // One byte past the limit so an overlong line still trips the frame reader
        let line_limit = self.config.max_record_bytes as u64 + 1;
        let mut line = Vec::new();

        loop {
            if self.stop_requested.load(Ordering::SeqCst) {
                return Ok(Outcome::Stopped);
            }

            line.clear();
            let read = source.by_ref().take(line_limit).read_until(b'\n', &mut line)?;
            if read == 0 {
                return Ok(Outcome::EndOfStream);
            }

            while matches!(line.last(), Some(b'\n' | b'\r')) {
                line.pop();
            }
            for frame in frames.push(&line)? {
                match frame {
                    Frame::Record(record) => self.handle_record(machine, &record),
                    Frame::Interrupted { bytes } => {
                        self.handle_malformed(WrapperError::Interrupted { bytes })
                    }
                }
            }
        }
    }

    fn handle_record(&self, machine: &mut StateMachine, record: &str) {
        let item = match decode::decode(record) {
            Ok(item) => item,
            Err(error) => return self.handle_malformed(error),
        };

        let events = machine.apply(&item);
        state::publish(&self.state, machine.now_playing(), &events);

        // Lock released: sinks are free to read the state
        for event in &events {
            self.sink.emit(event);
        }
    }

    fn handle_malformed(&self, error: WrapperError) {
        let event = MetadataEvent::Malformed(error);
        state::reject(&self.state, &event);
        self.sink.emit(&event);
    }

    /// Run [`start`](Self::start) on a dedicated thread.
    pub fn spawn(&self) -> Result<(), StreamError> {
        let mut worker = self.worker.lock();
        if worker.as_ref().is_some_and(|handle| !handle.is_finished()) {
            log::warn!("Metadata reader already running");
            return Ok(());
        }

        let reader = self.clone();
        let handle = thread::Builder::new()
            .name("metadata-reader".to_string())
            .spawn(move || reader.start())?;
        *worker = Some(handle);

        log::info!("Metadata reader thread started");
        Ok(())
    }

    /// Ask the reader to stop before its next read.
    ///
    /// A read already blocked on the pipe returns only when the writer sends
    /// more data or closes it.
    pub fn stop(&self) {
        log::info!("Stopping metadata reader...");
        self.stop_requested.store(true, Ordering::SeqCst);
    }

    /// Check if the spawned reader thread is still alive
    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Wait for the spawned reader to finish and return how it ended.
    pub fn wait(&self) -> Result<(), StreamError> {
        let handle = self.worker.lock().take();
        match handle {
            Some(handle) => handle.join().unwrap_or_else(|_| {
                self.set_status(ReaderStatus::Failed("reader thread panicked".to_string()));
                Err(StreamError::ReaderPanicked)
            }),
            None => Ok(()),
        }
    }

    fn set_status(&self, status: ReaderStatus) {
        state::set_status(&self.state, status);
    }
}
