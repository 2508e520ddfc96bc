//! The main tick loop (§4.7): one cooperative frame per mode period,
//! driving readers, the FIC carousel, the ETI assembler and the EDI
//! encoder in lockstep. Mutable state is confined exactly as the data
//! model describes: the scheduler owns FCT/CIF/carousel cursors and
//! TIST sampling; each reader owns its own buffer; each sink owns its
//! own socket.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{error, warn};

use crate::allocator::{allocate, Allocation, AllocationError};
use crate::clock::{MonotonicClock, UtcClock};
use crate::edi::transport::{EdiSink, SinkError};
use crate::edi::{self, EdiContext};
use crate::eti::{self, EtiFrame, FrameCounter};
use crate::fic;
use crate::fic::carousel::Carousel;
use crate::fic::dynamic_label::DynamicLabelState;
use crate::input::{ReaderError, SubchannelReader};
use crate::model::Ensemble;
use crate::msc::{self, MscError};
use crate::stats::MuxStats;

/// Where assembled output goes. ETI and EDI are mutually exclusive per
/// run: the core never needs to fan one ensemble out to both at once,
/// and keeping them as one enum (rather than a list of sinks) matches
/// the "closed variant set, full inventory known at compile time"
/// design note.
pub enum Output {
    /// Raw ETI octets, written verbatim, one frame after another.
    EtiFile(Box<dyn EtiWriter>),
    Edi {
        ctx: EdiContext,
        sink: Box<dyn EdiSink>,
    },
}

/// Narrow sink interface for the ETI-file output, kept as a trait (not
/// a concrete `tokio::fs::File`) so tests can substitute an in-memory
/// buffer.
#[async_trait::async_trait]
pub trait EtiWriter: Send {
    async fn write_frame(&mut self, bytes: &[u8]) -> std::io::Result<()>;
}

pub struct Scheduler {
    ensemble: Ensemble,
    allocation: Allocation,
    readers: Vec<Box<dyn SubchannelReader>>,
    carousel: Carousel,
    dynamic_labels: DynamicLabelState,
    frame_counter: FrameCounter,
    clock: MonotonicClock,
    utc_clock: UtcClock,
    cif_count: u16,
    frame_phase: u8,
    output: Output,
    pub stats: MuxStats,
    stop: Arc<AtomicBool>,
}

impl Scheduler {
    pub fn new(
        ensemble: Ensemble,
        readers: Vec<Box<dyn SubchannelReader>>,
        output: Output,
    ) -> Result<Self, AllocationError> {
        let allocation = allocate(&ensemble)?;
        let period_ms = ensemble.mode.frame_period_ms();
        Ok(Self {
            carousel: Carousel::new(period_ms),
            dynamic_labels: DynamicLabelState::new(&ensemble),
            frame_counter: FrameCounter::default(),
            clock: MonotonicClock::new(std::time::Duration::from_millis(period_ms as u64)),
            utc_clock: UtcClock,
            cif_count: 0,
            frame_phase: 0,
            output,
            stats: MuxStats::default(),
            stop: Arc::new(AtomicBool::new(false)),
            ensemble,
            allocation,
            readers,
        })
    }

    /// A clone-able handle a host can use to request a graceful stop.
    /// The in-flight frame (or fragment) always finishes first; no
    /// partial frame is ever emitted.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// A clone-able handle for pushing dynamic label text to the
    /// `subchid`'s component, picked up at its next FIG 2/x carousel
    /// slot. `None` if that component has no dynamic label configured.
    pub fn dynamic_label_handle(&self, subchid: u8) -> Option<Arc<std::sync::Mutex<String>>> {
        self.dynamic_labels.handle(subchid)
    }

    /// Opens every reader. Call once before `run`.
    pub async fn open_readers(&mut self) -> Result<(), ReaderError> {
        for reader in &mut self.readers {
            reader.open().await?;
        }
        Ok(())
    }

    /// Runs ticks until `stop_handle()` is set, logging and recovering
    /// from every error category except configuration (checked before
    /// this ever starts) and invariant violations (which this method
    /// propagates).
    pub async fn run(&mut self) -> Result<(), crate::error::MuxError> {
        loop {
            if self.stop.load(Ordering::Relaxed) {
                return Ok(());
            }
            let lateness = self.clock.tick().await;
            if lateness > std::time::Duration::from_millis(1) {
                warn!("scheduler tick ran {lateness:?} late");
            }

            let period = std::time::Duration::from_millis(self.ensemble.mode.frame_period_ms() as u64);
            if lateness > period {
                // More than one period behind: catch `fct`/`cif_count` up
                // to where they'd be had we kept pace, instead of
                // emitting a burst of frames for time that has already
                // passed. The next tick_once() emits the current frame.
                let missed = (lateness.as_nanos() / period.as_nanos()) as u32;
                for _ in 0..missed {
                    self.frame_counter.next();
                }
                self.cif_count = self.cif_count.wrapping_add(missed as u16);
                warn!("scheduler skipped {missed} frame period(s) to catch up after {lateness:?} of lateness");
            }

            self.tick_once().await?;
        }
    }

    /// Executes exactly one frame: reads each subchannel, builds
    /// FIC/MST, assembles the ETI frame, and forwards it to the
    /// configured output.
    pub async fn tick_once(&mut self) -> Result<(), crate::error::MuxError> {
        let mut payloads = Vec::with_capacity(self.allocation.subchannels.len());
        for sc in &self.allocation.subchannels {
            let reader = self
                .readers
                .iter_mut()
                .find(|r| r.subchid() == sc.subchid);
            let payload = match reader {
                Some(reader) => match reader.read_logical_frame(sc.size_cu as usize * 8).await {
                    Ok(Some(bytes)) => Some(bytes),
                    Ok(None) => {
                        self.stats.record_underrun();
                        None
                    }
                    Err(_) => {
                        self.stats.record_reader_fault();
                        None
                    }
                },
                None => None,
            };
            payloads.push(payload);
        }

        let now = self.utc_clock.now();
        let fic = fic::encode_tick(
            &self.ensemble,
            &self.allocation.subchannels,
            &mut self.carousel,
            &mut self.dynamic_labels,
            self.cif_count,
            now,
        );
        let mst = msc::build_mst(self.ensemble.mode, &self.allocation.subchannels, &payloads)
            .map_err(msc_to_invariant)?;

        let fct = self.frame_counter.next();
        let atstf = self
            .ensemble
            .tist_enabled
            .then(|| self.utc_clock.atstf(self.ensemble.tist_offset_ms));
        let tist = atstf.map(|(_, ticks)| ticks);

        let frame = eti::assemble_frame(
            self.ensemble.mode,
            &self.allocation.subchannels,
            &fic,
            &mst,
            fct,
            self.frame_phase,
            tist,
        );
        self.frame_phase = (self.frame_phase + 1) % 8;
        self.cif_count = self.cif_count.wrapping_add(1);

        self.emit(&frame, &fic, &mst, atstf).await;
        self.stats.record_frame_emitted();
        Ok(())
    }

    async fn emit(&mut self, frame: &EtiFrame, fic: &[u8], mst: &[u8], atstf: Option<(u32, u32)>) {
        match &mut self.output {
            Output::EtiFile(writer) => {
                if let Err(e) = writer.write_frame(&frame.bytes).await {
                    error!("eti file sink fault: {e}");
                    self.stats.record_sink_fault();
                }
            }
            Output::Edi { ctx, sink } => {
                match edi::encode_frame(ctx, &self.allocation.subchannels, fic, mst, 0, atstf) {
                    Ok(fragments) => {
                        for fragment in fragments {
                            if let Err(e) = sink.send_fragment(&fragment.bytes).await {
                                log_sink_error(&e);
                                self.stats.record_sink_fault();
                            }
                        }
                    }
                    Err(e) => {
                        error!("pft fragmentation failed: {e}");
                        self.stats.record_sink_fault();
                    }
                }
            }
        }
    }
}

fn log_sink_error(e: &SinkError) {
    error!("edi sink fault: {e}");
}

fn msc_to_invariant(e: MscError) -> crate::error::MuxError {
    let MscError::WrongFrameSize {
        subchid,
        got,
        expected,
    } = e;
    crate::error::InvariantViolation::MscOverrun {
        subchid,
        offset: 0,
        len: got,
        mst_len: expected,
    }
    .into()
}

/// Validates configuration and allocates capacity, the two checks that
/// must pass before a [`Scheduler`] can be constructed.
pub fn validate(ensemble: &Ensemble) -> Result<Allocation, crate::error::InvalidConfiguration> {
    ensemble.validate_structure()?;
    Ok(allocate(ensemble)?)
}
