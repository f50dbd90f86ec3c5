//! Router Advertisement handling
//!
//! Decodes captured RAs, decides which ULA routes need applying and runs
//! the periodic Router Solicitation task.

mod applier;
mod decoder;
mod dedup;
mod pipeline;
mod route_state;
mod soliciter;
mod ula;

pub use applier::{ApplyOutput, RouteMutator, ScriptMutator};
pub use decoder::{
    NotAnRa, OptionKind, PrefixOption, RaFrame, RouteOption, RouterAdvertisementEvent,
    SkippedOption, classify, decode,
};
pub use dedup::{DEFAULT_WINDOW as DEFAULT_DEDUP_WINDOW, DuplicateSuppressor};
pub use pipeline::{FrameOutcome, ListenerSettings, OptionOutcome, ProcessReport, RaListener};
pub use route_state::{Binding, Decision, Route, RouteKey, RouteStateTracker};
pub use soliciter::{DEFAULT_INTERVAL as DEFAULT_SOLICIT_INTERVAL, Soliciter, build_solicitation};
pub use ula::is_ula;
