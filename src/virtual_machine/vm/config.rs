/// How `ifz` and `ifnz` treat the instruction that follows them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SkipSense {
    /// The next instruction is skipped when the condition holds.
    #[default]
    SkipWhenTrue,
    /// The next instruction runs only when the condition holds.
    ExecuteWhenTrue,
}

impl SkipSense {
    /// Parses the command-line spelling: `skip` or `execute`.
    pub fn from_flag(flag: &str) -> Option<SkipSense> {
        match flag {
            "skip" => Some(SkipSense::SkipWhenTrue),
            "execute" => Some(SkipSense::ExecuteWhenTrue),
            _ => None,
        }
    }

    /// Returns true if a branch whose condition evaluated to `cond` skips.
    pub const fn skips(self, cond: bool) -> bool {
        match self {
            SkipSense::SkipWhenTrue => cond,
            SkipSense::ExecuteWhenTrue => !cond,
        }
    }
}

/// Default bound on addressable memory, in cells.
pub const DEFAULT_MAX_MEMORY_CELLS: usize = 1 << 20;

/// Interpreter settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VmConfig {
    pub skip_sense: SkipSense,
    /// Maximum number of steps a single `run` may take; `None` is unbounded.
    pub step_limit: Option<u64>,
    pub max_memory_cells: usize,
    /// Log every executed instruction at trace level, whatever the logger's
    /// minimum level is.
    pub trace: bool,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            skip_sense: SkipSense::default(),
            step_limit: None,
            max_memory_cells: DEFAULT_MAX_MEMORY_CELLS,
            trace: false,
        }
    }
}

impl VmConfig {
    pub fn with_skip_sense(mut self, skip_sense: SkipSense) -> Self {
        self.skip_sense = skip_sense;
        self
    }

    pub fn with_step_limit(mut self, limit: u64) -> Self {
        self.step_limit = Some(limit);
        self
    }

    pub fn with_max_memory_cells(mut self, cells: usize) -> Self {
        self.max_memory_cells = cells;
        self
    }

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }
}
