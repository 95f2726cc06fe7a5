//! Controller, scheduler daemon and socket protocol for siteblock.
//!
//! The daemon listens on a Unix domain socket and only exists on Unix. Elsewhere
//! the socket client reports the daemon as not running, so callers fall back
//! to an in-process [`Controller`].

pub mod controller;
mod error;
mod logging;
pub mod paths;
pub mod protocol;
#[cfg(unix)]
mod runtime;
pub mod settings;

pub use controller::{ActivationSource, Controller, ImportSummary, ScheduleEntry, Status, Transition};
pub use error::{ControllerError, DaemonError};
pub use logging::init_tracing;
pub use protocol::{
    request, request_status, request_stop, send_request, DaemonInfo, DaemonRequest, DaemonResponse,
};
#[cfg(unix)]
pub use runtime::{local_clock, run, serve, start_blocking, Clock};
pub use settings::Settings;
