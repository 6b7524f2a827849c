//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing each application event as one tagged
//! line through the `log` facade. `env_logger` in the binary sends it to
//! stderr, which systemd captures into the journal.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::app::state::ShutdownCause;

/// Adapter that logs every [`AppEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started { listeners } => {
                info!("START | listeners={listeners}");
            }
            AppEvent::Fired { trigger } => {
                info!("FIRE | trigger={trigger}");
            }
            AppEvent::FireIgnored { trigger, reason } => {
                info!("FIRE | trigger={trigger} ignored ({reason:?})");
            }
            AppEvent::PulseComplete(pulse) => {
                info!(
                    "FIRE | pulse done, {} ms",
                    pulse.ended_ms.saturating_sub(pulse.started_ms)
                );
            }
            AppEvent::ListenerLost {
                source,
                name,
                error,
            } => match error {
                Some(e) => warn!("LISTEN | #{source} '{name}' lost: {e}"),
                None => warn!("LISTEN | #{source} '{name}' ended"),
            },
            AppEvent::IndicatorFault(fault) => {
                warn!("LED | {fault}");
            }
            AppEvent::ShutdownRequested(cause) => match cause {
                ShutdownCause::Button => info!("STATE | Running -> ShuttingDown (button)"),
                ShutdownCause::HardwareFault(fault) => {
                    warn!("STATE | Running -> ShuttingDown ({fault})");
                }
            },
            AppEvent::Stopped(report) => {
                info!(
                    "STOP | pulses={} lines_released={} listeners_closed={}",
                    report.pulses_fired, report.ports_released, report.listeners_closed
                );
            }
        }
    }
}
