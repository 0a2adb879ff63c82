use std::fmt;

use crate::data::{PhaseError, RunData};

/// The function executing a phase.
pub type RunFn = Box<dyn Fn(&mut dyn RunData) -> Result<(), PhaseError>>;

/// A condition deciding whether a phase and its children execute.
pub type RunIfFn = Box<dyn Fn(&dyn RunData) -> Result<bool, PhaseError>>;

/// One node of a workflow tree.
///
/// Phases are built bottom-up: leaves first, then grouped into their parents
/// with [`Phase::with_child`]. A phase without a run function only groups its
/// children.
#[derive(Default)]
pub struct Phase {
    pub(crate) name: String,
    pub(crate) short: String,
    pub(crate) long: String,
    pub(crate) children: Vec<Phase>,
    pub(crate) run: Option<RunFn>,
    pub(crate) run_if: Option<RunIfFn>,
    pub(crate) inherit_flags: Vec<String>,
    pub(crate) run_all_siblings: bool,
    pub(crate) hidden: bool,
}

impl Phase {
    /// Creates a phase named `name`. The name must be unique among its
    /// siblings and must not contain `/`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the one-line description shown in help listings.
    pub fn with_short(mut self, short: impl Into<String>) -> Self {
        self.short = short.into();
        self
    }

    pub fn with_long(mut self, long: impl Into<String>) -> Self {
        self.long = long.into();
        self
    }

    pub fn with_run(
        mut self,
        run: impl Fn(&mut dyn RunData) -> Result<(), PhaseError> + 'static,
    ) -> Self {
        self.run = Some(Box::new(run));
        self
    }

    /// Makes the phase, together with its children, conditional.
    pub fn with_run_if(
        mut self,
        run_if: impl Fn(&dyn RunData) -> Result<bool, PhaseError> + 'static,
    ) -> Self {
        self.run_if = Some(Box::new(run_if));
        self
    }

    /// Declares flags the phase reads. Descendants inherit them.
    pub fn with_inherit_flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inherit_flags.extend(flags.into_iter().map(Into::into));
        self
    }

    pub fn with_child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = Self>) -> Self {
        self.children.extend(children);
        self
    }

    /// Turns the phase into an aggregator. Selecting it selects all of its
    /// siblings, in declared order.
    ///
    /// Aggregators must not have a run function, a run condition or children.
    pub fn with_run_all_siblings(mut self) -> Self {
        self.run_all_siblings = true;
        self
    }

    /// Excludes the phase and its children from help listings. Hidden phases
    /// still execute.
    pub fn with_hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn short(&self) -> &str {
        &self.short
    }

    pub fn long(&self) -> &str {
        &self.long
    }

    pub fn children(&self) -> &[Self] {
        &self.children
    }

    pub fn inherit_flags(&self) -> &[String] {
        &self.inherit_flags
    }

    pub fn is_run_all_siblings(&self) -> bool {
        self.run_all_siblings
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn has_run(&self) -> bool {
        self.run.is_some()
    }
}

impl fmt::Debug for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Phase")
            .field("name", &self.name)
            .field("short", &self.short)
            .field("children", &self.children)
            .field("run", &self.run.is_some())
            .field("run_if", &self.run_if.is_some())
            .field("inherit_flags", &self.inherit_flags)
            .field("run_all_siblings", &self.run_all_siblings)
            .field("hidden", &self.hidden)
            .finish_non_exhaustive()
    }
}
