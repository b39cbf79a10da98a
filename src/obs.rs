//! Optional observability helpers for installer flows.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit spans named `oauth2_installer.flow` with `flow` and `stage`
//!   fields, plus `warn` events for failures that do not abort the caller.
//! - Enable `metrics` to increment the `oauth2_installer_flow_total` counter for every
//!   attempt/success/failure, labeled by `flow` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Flows observed by the installer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Install URL generation.
	InstallUrl,
	/// Redirect callback handling.
	Callback,
	/// Request-time authorization.
	Authorize,
	/// Token rotation inside authorization.
	Rotation,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::InstallUrl => "install_url",
			FlowKind::Callback => "callback",
			FlowKind::Authorize => "authorize",
			FlowKind::Rotation => "rotation",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to an installer flow.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure reported back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
