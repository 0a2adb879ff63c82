use std::collections::{BTreeSet, HashSet};

use snafu::{OptionExt, ResultExt, Snafu, ensure};
use tracing::{debug, info, info_span};

use crate::{
    data::{PhaseError, RunData},
    phase::{Phase, RunFn, RunIfFn},
};

type Result<T, E = Error> = std::result::Result<T, E>;

/// Separator between the names of a phase path, e.g. `control-plane-prepare/certs`.
pub const PHASE_PATH_SEPARATOR: char = '/';

const HELP_COLUMN_GAP: usize = 2;
const HELP_INDENT: usize = 2;

#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum TreeError {
    #[snafu(display("a child phase of {parent:?} has an empty name"))]
    EmptyPhaseName { parent: String },

    #[snafu(display("phase name {name:?} must not contain {PHASE_PATH_SEPARATOR:?}"))]
    InvalidPhaseName { name: String },

    #[snafu(display("phase {path:?} is declared more than once"))]
    DuplicatePhaseName { path: String },

    #[snafu(display(
        "phase {path:?} runs all of its siblings and must not have a run function, a run condition or children"
    ))]
    InvalidAggregator { path: String },
}

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("invalid phase tree"))]
    InvalidPhaseTree { source: TreeError },

    #[snafu(display("unknown phase {path:?}"))]
    UnknownPhase { path: String },

    #[snafu(display("failed to evaluate the run condition of phase {phase:?}"))]
    RunCondition { source: PhaseError, phase: String },

    #[snafu(display("phase {phase:?} failed"))]
    PhaseExecutionFailure { source: PhaseError, phase: String },

    #[snafu(display("flag {flag:?} is not used by any of the selected phases"))]
    UnsupportedFlag { flag: String },
}

impl Error {
    /// Returns `true` if a phase was handed a context it cannot work with.
    pub fn is_invalid_context(&self) -> bool {
        matches!(
            self,
            Self::PhaseExecutionFailure {
                source: PhaseError::InvalidContext { .. },
                ..
            } | Self::RunCondition {
                source: PhaseError::InvalidContext { .. },
                ..
            }
        )
    }
}

/// Which parts of the tree one run executes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Paths of the selected phases. Empty selects the whole tree.
    pub phases: Vec<String>,

    /// Paths of phases excluded together with their children.
    pub skip_phases: Vec<String>,
}

impl RunOptions {
    pub fn select<I, S>(phases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            phases: phases.into_iter().map(Into::into).collect(),
            skip_phases: Vec::new(),
        }
    }

    pub fn with_skip_phases<I, S>(mut self, phases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip_phases.extend(phases.into_iter().map(Into::into));
        self
    }
}

/// What happened to one phase during a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhaseState {
    NotSelected,

    /// The run condition of the phase or one of its ancestors was false.
    Skipped,

    /// The phase was visited and its run function, if any, succeeded.
    Ran,
}

/// The outcome of a successful run, listing every phase in traversal order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Execution {
    states: Vec<(String, PhaseState)>,
}

impl Execution {
    pub fn state(&self, path: &str) -> Option<PhaseState> {
        self.states
            .iter()
            .find(|(candidate, _)| candidate == path)
            .map(|(_, state)| *state)
    }

    /// The paths of all phases that ran, in order.
    pub fn ran(&self) -> impl Iterator<Item = &str> {
        self.states
            .iter()
            .filter(|(_, state)| *state == PhaseState::Ran)
            .map(|(path, _)| path.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, PhaseState)> {
        self.states.iter().map(|(path, state)| (path.as_str(), *state))
    }
}

/// A flattened phase. Nodes are stored in depth-first order, so the subtree of
/// node `i` is exactly `i..end`.
struct Node {
    path: String,
    name: String,
    short: String,
    depth: usize,
    parent: Option<usize>,
    end: usize,
    run: Option<RunFn>,
    run_if: Option<RunIfFn>,
    inherit_flags: Vec<String>,
    run_all_siblings: bool,
    hidden: bool,
}

/// Executes a validated phase tree.
///
/// The runner itself is the implicit root of the tree. It never runs phases in
/// parallel: phases execute one at a time, depth-first in declared order, and
/// the first failure aborts the traversal. Phases that already completed are
/// not rolled back.
pub struct Runner {
    nodes: Vec<Node>,
}

impl Runner {
    /// Validates and flattens the tree whose top-level phases are `phases`.
    pub fn new(phases: Vec<Phase>) -> Result<Self> {
        let mut nodes = Vec::new();
        flatten_siblings(&mut nodes, phases, None).context(InvalidPhaseTreeSnafu)?;
        Ok(Self { nodes })
    }

    /// The paths of all phases in traversal order.
    pub fn phase_paths(&self) -> Vec<&str> {
        self.nodes.iter().map(|node| node.path.as_str()).collect()
    }

    /// Returns the flags `path` may read: its own inherited flags and those of
    /// all of its ancestors.
    pub fn effective_flags(&self, path: &str) -> Result<BTreeSet<&str>> {
        let index = self.find(path)?;
        Ok(self.effective_flags_of(index))
    }

    /// Checks that every flag in `set_flags` is inherited by at least one of
    /// the phases `options` selects.
    pub fn check_flags<'a>(
        &self,
        options: &RunOptions,
        set_flags: impl IntoIterator<Item = &'a str>,
    ) -> Result<()> {
        let selected = self.selection(options)?;
        let allowed: BTreeSet<&str> = selected
            .iter()
            .enumerate()
            .filter(|(_, selected)| **selected)
            .flat_map(|(index, _)| self.effective_flags_of(index))
            .collect();

        for flag in set_flags {
            ensure!(allowed.contains(flag), UnsupportedFlagSnafu { flag });
        }

        Ok(())
    }

    /// Renders the list of visible phases for the help text of `command`.
    pub fn help(&self, command: &str) -> String {
        let visible = self.visible();
        let label = |node: &Node| match node.depth {
            0 => node.name.clone(),
            _ => format!("{PHASE_PATH_SEPARATOR}{}", node.name),
        };

        let column = visible
            .iter()
            .map(|node| node.depth * HELP_INDENT + label(node).len())
            .max()
            .unwrap_or_default()
            + HELP_COLUMN_GAP;

        let mut help = format!("The {command:?} command executes the following phases:\n```\n");
        for node in visible {
            let indent = node.depth * HELP_INDENT;
            let line = format!(
                "{:indent$}{label:<width$}{short}",
                "",
                label = label(node),
                width = column - indent,
                short = node.short,
            );
            help.push_str(line.trim_end());
            help.push('\n');
        }
        help.push_str("```");

        help
    }

    /// Executes the phases `options` selects against `data`.
    pub fn run(&self, options: &RunOptions, data: &mut dyn RunData) -> Result<Execution> {
        let selected = self.selection(options)?;
        let mut states = vec![PhaseState::NotSelected; self.nodes.len()];

        let mut index = 0;
        while index < self.nodes.len() {
            let node = &self.nodes[index];

            if !selected[index..node.end].contains(&true) {
                index = node.end;
                continue;
            }

            let span = info_span!("phase", phase = %node.path);
            let _enter = span.enter();

            if let Some(run_if) = &node.run_if {
                let run = run_if(&*data).context(RunConditionSnafu { phase: &node.path })?;
                if !run {
                    debug!("run condition not met, skipping the phase and its children");
                    for skipped in index..node.end {
                        if selected[skipped] {
                            states[skipped] = PhaseState::Skipped;
                        }
                    }
                    index = node.end;
                    continue;
                }
            }

            if selected[index] {
                if let Some(run) = &node.run {
                    info!("running phase");
                    run(data).context(PhaseExecutionFailureSnafu { phase: &node.path })?;
                }
                states[index] = PhaseState::Ran;
            }

            index += 1;
        }

        Ok(Execution {
            states: self
                .nodes
                .iter()
                .map(|node| node.path.clone())
                .zip(states)
                .collect(),
        })
    }

    fn find(&self, path: &str) -> Result<usize> {
        let path = path.trim_matches(PHASE_PATH_SEPARATOR);
        self.nodes
            .iter()
            .position(|node| node.path == path)
            .context(UnknownPhaseSnafu { path })
    }

    /// Marks the phases `options` selects.
    fn selection(&self, options: &RunOptions) -> Result<Vec<bool>> {
        let mut selected = vec![options.phases.is_empty(); self.nodes.len()];

        for path in &options.phases {
            let index = self.find(path)?;
            let node = &self.nodes[index];

            let range = if node.run_all_siblings {
                match node.parent {
                    Some(parent) => parent + 1..self.nodes[parent].end,
                    None => 0..self.nodes.len(),
                }
            } else {
                index..node.end
            };
            selected[range].fill(true);
        }

        for path in &options.skip_phases {
            let index = self.find(path)?;
            selected[index..self.nodes[index].end].fill(false);
        }

        Ok(selected)
    }

    fn effective_flags_of(&self, index: usize) -> BTreeSet<&str> {
        let mut flags = BTreeSet::new();
        let mut current = Some(index);

        while let Some(index) = current {
            let node = &self.nodes[index];
            flags.extend(node.inherit_flags.iter().map(String::as_str));
            current = node.parent;
        }

        flags
    }

    fn visible(&self) -> Vec<&Node> {
        let mut visible = Vec::new();
        let mut index = 0;

        while index < self.nodes.len() {
            let node = &self.nodes[index];
            if node.hidden {
                index = node.end;
                continue;
            }

            visible.push(node);
            index += 1;
        }

        visible
    }
}

fn flatten_siblings(
    nodes: &mut Vec<Node>,
    phases: Vec<Phase>,
    parent: Option<usize>,
) -> Result<(), TreeError> {
    let mut names = HashSet::new();

    for phase in phases {
        let parent_path = parent.map(|parent| nodes[parent].path.clone());

        ensure!(
            !phase.name.is_empty(),
            EmptyPhaseNameSnafu {
                parent: parent_path.as_deref().unwrap_or("<root>"),
            }
        );
        ensure!(
            !phase.name.contains(PHASE_PATH_SEPARATOR),
            InvalidPhaseNameSnafu { name: &phase.name }
        );

        let path = match &parent_path {
            Some(parent_path) => format!("{parent_path}{PHASE_PATH_SEPARATOR}{}", phase.name),
            None => phase.name.clone(),
        };

        ensure!(
            names.insert(phase.name.clone()),
            DuplicatePhaseNameSnafu { path }
        );
        ensure!(
            !phase.run_all_siblings
                || (phase.run.is_none() && phase.run_if.is_none() && phase.children.is_empty()),
            InvalidAggregatorSnafu { path }
        );

        let index = nodes.len();
        let depth = parent.map_or(0, |parent| nodes[parent].depth + 1);
        nodes.push(Node {
            path,
            name: phase.name,
            short: phase.short,
            depth,
            parent,
            end: index + 1,
            run: phase.run,
            run_if: phase.run_if,
            inherit_flags: phase.inherit_flags,
            run_all_siblings: phase.run_all_siblings,
            hidden: phase.hidden,
        });

        flatten_siblings(nodes, phase.children, Some(index))?;
        nodes[index].end = nodes.len();
    }

    Ok(())
}
