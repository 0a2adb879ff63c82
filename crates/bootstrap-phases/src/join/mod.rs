//! The join workflow.

use bootstrap_workflow::{Error, Runner};

use crate::data::JoinData;

mod control_plane_prepare;

pub use control_plane_prepare::*;

/// Builds the runner of the join workflow for the run context `D`.
pub fn join_runner<D: JoinData + 'static>(
    control_plane_prepare: ControlPlanePrepare,
) -> Result<Runner, Error> {
    Runner::new(vec![control_plane_prepare.into_phase::<D>()])
}
