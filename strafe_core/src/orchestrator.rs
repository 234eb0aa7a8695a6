use crate::buffer::{CrashCorrelationBuffer, CrashRecord};
use crate::config::{BufferSettings, FuzzerSettings, TargetSettings};
use crate::events::CrashEvent;
use crate::mutation::FieldMutator;
use crate::population::PopulationManager;
use crate::report::CrashReportWriter;
use crate::sender::PacketSender;
use chrono::Utc;
use rand::Rng;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Glue between the evolutionary loop, the packet sender, and the crash
/// correlation buffer.
///
/// `run` drives three concurrent activities: the send/record loop on the
/// calling thread, a periodic eviction sweep, and a crash listener blocked
/// on the event feed. The first crash event matching the configured target
/// freezes the buffer, resolves the causal packet, appends the crash report,
/// and stops the run.
pub struct Orchestrator {
    fuzzer: FuzzerSettings,
    target: TargetSettings,
    buffer_settings: BufferSettings,
}

impl Orchestrator {
    pub fn new(fuzzer: FuzzerSettings, target: TargetSettings, buffer_settings: BufferSettings) -> Self {
        Self {
            fuzzer,
            target,
            buffer_settings,
        }
    }

    /// Runs the fuzzing loop until a crash is resolved, the generation budget
    /// is exhausted, or `stop` is raised externally.
    ///
    /// Returns the crash record when a matching crash event was correlated.
    pub fn run<R: Rng>(
        &self,
        sender: &dyn PacketSender,
        events: Receiver<CrashEvent>,
        stop: Arc<AtomicBool>,
        rng: &mut R,
    ) -> Result<Option<CrashRecord>, anyhow::Error> {
        let buffer = Arc::new(CrashCorrelationBuffer::new(self.buffer_settings.capacity));
        let retention = chrono::Duration::seconds(self.buffer_settings.retention_window_secs);
        let poll_interval = Duration::from_millis(self.buffer_settings.poll_interval_ms);
        let report_writer = CrashReportWriter::new(self.buffer_settings.report_path.clone());

        let manager = PopulationManager::new(self.fuzzer.population_size);
        let mutator = FieldMutator::new();
        let target_request = self.fuzzer.target_request.as_bytes().to_vec();

        let mut crash_record: Option<CrashRecord> = None;

        std::thread::scope(|scope| -> Result<(), anyhow::Error> {
            let sweeper = {
                let buffer = Arc::clone(&buffer);
                let stop = Arc::clone(&stop);
                scope.spawn(move || {
                    while !stop.load(Ordering::SeqCst) && !buffer.is_frozen() {
                        buffer.evict_expired(Utc::now(), retention);
                        std::thread::sleep(poll_interval);
                    }
                })
            };

            let listener = {
                let buffer = Arc::clone(&buffer);
                let stop = Arc::clone(&stop);
                let target_name = self.target.name.clone();
                let report_writer = &report_writer;
                scope.spawn(move || -> Option<CrashRecord> {
                    loop {
                        match events.recv_timeout(poll_interval) {
                            Ok(event) => {
                                if event.target != target_name {
                                    debug!(target = %event.target, "ignoring crash event for other target");
                                    continue;
                                }
                                info!(target = %event.target, timestamp = %event.timestamp, "crash event received, freezing buffer");
                                buffer.freeze();
                                let record = buffer.resolve_crash(event.timestamp);
                                if let Err(e) = report_writer.append(&record) {
                                    error!(error = %e, "failed to append crash report");
                                }
                                stop.store(true, Ordering::SeqCst);
                                return Some(record);
                            }
                            Err(RecvTimeoutError::Timeout) => {
                                if stop.load(Ordering::SeqCst) {
                                    return None;
                                }
                            }
                            Err(RecvTimeoutError::Disconnected) => {
                                // Fatal to attribution only; sending continues
                                // best-effort until the operator stops the run.
                                error!("crash-event feed disconnected, attribution unavailable");
                                return None;
                            }
                        }
                    }
                })
            };

            let mut population = manager.init_population(rng)?;
            info!(
                population = population.len(),
                address = %self.target.address,
                port = self.target.port,
                "starting fuzzing loop"
            );

            'generations: for generation in 0..self.fuzzer.max_generations {
                for payload in &population {
                    if stop.load(Ordering::SeqCst) {
                        break 'generations;
                    }
                    let wire = payload.to_wire();
                    match sender.send(&self.target.address, self.target.port, &wire) {
                        Ok(()) => buffer.record(wire),
                        Err(e) => {
                            // Transient: skip the payload, no correlation entry.
                            warn!(error = %e, "send failed, skipping payload");
                        }
                    }
                }
                debug!(generation, "advancing generation");
                population = manager.advance_generation(&population, &target_request, &mutator, rng);
                if population.is_empty() {
                    warn!(generation, "population collapsed, stopping");
                    break;
                }
            }

            stop.store(true, Ordering::SeqCst);
            sweeper.join().expect("eviction sweeper panicked");
            crash_record = listener.join().expect("crash listener panicked");
            Ok(())
        })?;

        if crash_record.is_none() {
            info!("fuzzing loop finished without a correlated crash");
        }
        Ok(crash_record)
    }
}
