//! A small engine executing trees of bootstrap phases.
//!
//! A workflow is described by a tree of [`Phase`]s, built bottom-up and handed
//! to a [`Runner`]. The runner validates the tree once, then executes any
//! selection of it depth-first, in declared order, against a caller-supplied
//! [`RunData`] context.
//!
//! ```
//! use bootstrap_workflow::{Phase, RunData, RunOptions, Runner, downcast_data_mut};
//!
//! #[derive(Default)]
//! struct Steps(Vec<&'static str>);
//!
//! let runner = Runner::new(vec![
//!     Phase::new("prepare")
//!         .with_child(Phase::new("all").with_run_all_siblings())
//!         .with_child(Phase::new("certs").with_run(|data: &mut dyn RunData| {
//!             downcast_data_mut::<Steps>(data)?.0.push("certs");
//!             Ok(())
//!         }))
//!         .with_child(Phase::new("manifests").with_run(|data: &mut dyn RunData| {
//!             downcast_data_mut::<Steps>(data)?.0.push("manifests");
//!             Ok(())
//!         })),
//! ])
//! .expect("phase tree must be valid");
//!
//! let mut steps = Steps::default();
//! runner
//!     .run(&RunOptions::select(["prepare/all"]), &mut steps)
//!     .expect("workflow must succeed");
//!
//! assert_eq!(steps.0, ["certs", "manifests"]);
//! ```

mod data;
mod phase;
mod runner;

pub use data::*;
pub use phase::*;
pub use runner::*;
