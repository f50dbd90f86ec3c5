//! Router Advertisement processing pipeline
//!
//! Frames flow through the duplicate window, the option decoder, the ULA
//! filter and the route state tracker. Bindings that are new or have a new
//! router are handed to the [`RouteMutator`]. The pipeline is driven by a
//! single capture loop, so none of its state needs locking.

use super::applier::{ApplyOutput, RouteMutator};
use super::decoder::{self, NotAnRa, OptionKind, RouterAdvertisementEvent};
use super::dedup::DuplicateSuppressor;
use super::route_state::{Binding, Decision, RouteKey, RouteStateTracker};
use super::ula::is_ula;
use crate::capture::Capture;
use crate::error::ApplyError;
use crate::telemetry::ListenerStats;
use crate::{Error, Result};
use std::net::Ipv6Addr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

/// Large enough for any frame the capture socket can deliver
const RECV_BUFFER_SIZE: usize = 65536;

/// Listener behaviour knobs
#[derive(Debug, Clone)]
pub struct ListenerSettings {
    /// Interface RAs are captured on; becomes the binding's interface
    pub interface: String,
    pub dedup_window: Duration,
    /// Log non-ULA prefixes at info rather than debug
    pub log_ignored: bool,
    /// Forget bindings whose application failed so the next RA retries them
    pub retry_failed: bool,
}

impl ListenerSettings {
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            dedup_window: super::dedup::DEFAULT_WINDOW,
            log_ignored: false,
            retry_failed: false,
        }
    }
}

/// What happened to one advertised prefix
#[derive(Debug)]
pub enum OptionOutcome {
    /// Outside the ULA range
    Ignored {
        kind: OptionKind,
        prefix: Ipv6Addr,
        prefix_length: u8,
    },
    /// Already applied with the same router
    Unchanged { kind: OptionKind, binding: Binding },
    /// Handed to the route mutator
    Applied {
        kind: OptionKind,
        binding: Binding,
        decision: Decision,
        result: std::result::Result<ApplyOutput, ApplyError>,
    },
}

/// Result of processing one decoded advertisement
#[derive(Debug)]
pub struct ProcessReport {
    pub source: Ipv6Addr,
    pub outcomes: Vec<OptionOutcome>,
    /// Options the decoder skipped
    pub malformed: usize,
}

impl ProcessReport {
    /// Bindings handed to the mutator, in order
    pub fn applied(&self) -> impl Iterator<Item = (&Binding, Decision)> {
        self.outcomes.iter().filter_map(|o| match o {
            OptionOutcome::Applied {
                binding, decision, ..
            } => Some((binding, *decision)),
            _ => None,
        })
    }

    /// Every tracker decision, in order
    pub fn decisions(&self) -> Vec<Decision> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                OptionOutcome::Unchanged { .. } => Some(Decision::Unchanged),
                OptionOutcome::Applied { decision, .. } => Some(*decision),
                OptionOutcome::Ignored { .. } => None,
            })
            .collect()
    }
}

/// Fate of one captured frame
#[derive(Debug)]
pub enum FrameOutcome {
    NotAnRa(NotAnRa),
    Suppressed { source: Ipv6Addr },
    Processed(ProcessReport),
}

/// Owns the pipeline state for one interface
pub struct RaListener<M> {
    settings: ListenerSettings,
    suppressor: DuplicateSuppressor,
    tracker: RouteStateTracker,
    mutator: M,
    stats: Arc<ListenerStats>,
}

impl<M: RouteMutator> RaListener<M> {
    pub fn new(settings: ListenerSettings, mutator: M, stats: Arc<ListenerStats>) -> Self {
        Self {
            suppressor: DuplicateSuppressor::new(settings.dedup_window),
            tracker: RouteStateTracker::new(),
            settings,
            mutator,
            stats,
        }
    }

    pub fn settings(&self) -> &ListenerSettings {
        &self.settings
    }

    pub fn tracker(&self) -> &RouteStateTracker {
        &self.tracker
    }

    pub fn mutator(&self) -> &M {
        &self.mutator
    }

    pub fn stats(&self) -> &Arc<ListenerStats> {
        &self.stats
    }

    /// Run one captured frame through the pipeline.
    ///
    /// The duplicate window is consulted before any option is decoded.
    pub async fn handle_frame(&mut self, frame: &[u8], now: Instant) -> FrameOutcome {
        self.stats.record_frame(frame.len());

        let ra = match decoder::classify(frame) {
            Ok(ra) => ra,
            Err(reason) => {
                self.stats.not_router_advertisement.inc();
                trace!(reason = %reason, "dropping frame");
                return FrameOutcome::NotAnRa(reason);
            }
        };

        let source = ra.source();
        if !self.suppressor.should_process(source, now) {
            self.stats.ra_suppressed.inc();
            debug!(router = %source, "suppressing repeated router advertisement");
            return FrameOutcome::Suppressed { source };
        }

        let event = ra.decode(now);
        FrameOutcome::Processed(self.process_event(&event).await)
    }

    /// Filter, decide and apply every prefix carried by `event`.
    pub async fn process_event(&mut self, event: &RouterAdvertisementEvent) -> ProcessReport {
        self.stats.ra_processed.inc();
        debug!(
            router = %event.source,
            prefixes = event.prefixes.len(),
            routes = event.routes.len(),
            "processing router advertisement"
        );

        for skipped in &event.skipped {
            self.stats.options_malformed.inc();
            warn!(
                router = %event.source,
                option_type = ?skipped.option_type,
                error = %skipped.error,
                "skipping malformed option"
            );
        }

        let mut outcomes = Vec::new();
        // Forgotten only after the whole event so a repeated option in the
        // same RA is not applied twice
        let mut failed: Vec<RouteKey> = Vec::new();

        for (kind, prefix, prefix_length) in event.advertised() {
            if !is_ula(&prefix) {
                self.stats.non_ula_ignored.inc();
                if self.settings.log_ignored {
                    info!(%kind, prefix = %prefix, prefix_length, router = %event.source, "ignoring non-ULA prefix");
                } else {
                    debug!(%kind, prefix = %prefix, prefix_length, router = %event.source, "ignoring non-ULA prefix");
                }
                outcomes.push(OptionOutcome::Ignored {
                    kind,
                    prefix,
                    prefix_length,
                });
                continue;
            }

            let binding = Binding::new(
                prefix,
                prefix_length,
                event.source,
                self.settings.interface.as_str(),
            );
            let decision = self.tracker.decide(&binding);

            match decision {
                Decision::Unchanged => {
                    self.stats.routes_unchanged.inc();
                    debug!(%kind, route = %binding, "route unchanged");
                }
                Decision::New => {
                    self.stats.routes_new.inc();
                    info!(%kind, route = %binding, "new route");
                }
                Decision::RouterChanged { previous } => {
                    self.stats.routes_router_changed.inc();
                    info!(%kind, route = %binding, previous = %previous, "router changed");
                }
            }

            if !decision.needs_apply() {
                outcomes.push(OptionOutcome::Unchanged { kind, binding });
                continue;
            }

            let result = self.mutator.apply(&binding).await;
            match &result {
                Ok(output) => {
                    self.stats.apply_succeeded.inc();
                    info!(route = %binding, output = %output.stdout.trim(), "route applied");
                }
                Err(e) => {
                    self.stats.apply_failed.inc();
                    error!(route = %binding, error = %e, "failed to apply route");
                    if self.settings.retry_failed {
                        failed.push(binding.key());
                    }
                }
            }

            outcomes.push(OptionOutcome::Applied {
                kind,
                binding,
                decision,
                result,
            });
        }

        for key in &failed {
            self.tracker.forget(key);
        }

        ProcessReport {
            source: event.source,
            outcomes,
            malformed: event.skipped.len(),
        }
    }

    /// Receive and process frames until cancelled.
    ///
    /// A receive error ends the loop and is returned as [`Error::Capture`].
    pub async fn run<S: Capture>(&mut self, socket: &mut S, cancel: CancellationToken) -> Result<()> {
        let mut buf = vec![0u8; RECV_BUFFER_SIZE];

        info!(interface = %self.settings.interface, "listening for router advertisements");

        loop {
            let rx = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                rx = socket.recv(&mut buf) => rx,
            };

            let len = match rx {
                Ok(rx) => rx.len,
                Err(Error::Io(source)) => {
                    return Err(Error::Capture {
                        interface: self.settings.interface.clone(),
                        source,
                    });
                }
                Err(e) => return Err(e),
            };

            self.handle_frame(&buf[..len], Instant::now()).await;
        }

        debug!(interface = %self.settings.interface, "capture loop stopped");
        Ok(())
    }
}
