use std::collections::HashMap;

use indexmap::IndexMap;

use crate::blocks::BlockMap;

/// Per-depth forelse bookkeeping.
#[derive(Debug, Clone)]
pub(crate) struct ForElse {
    /// Variable prefix of the loop, `<unique prefix><depth>`.
    pub prefix: String,
    /// The loop body is wrapped in an `if` guard that the `elsefor` must close.
    pub guarded: bool,
}

/// Mutable state of one compilation. Created fresh for every outer compile
/// and every sub-compile spawned for `extends`/`include`.
#[derive(Debug, Default)]
pub(crate) struct CompileState {
    pub autoescape: bool,
    pub level: usize,
    pub block_level: usize,
    pub foreach_level: usize,
    pub expr_level: usize,
    pub blocks: BlockMap,
    pub current_block: Option<String>,
    pub extended: bool,
    pub extended_blocks: Option<BlockMap>,
    /// Macro name to the generated closure reference.
    pub macros: IndexMap<String, String>,
    /// Foreach depths whose body references `loop`.
    pub loop_pointers: HashMap<usize, usize>,
    pub for_else_pointers: HashMap<usize, ForElse>,
    pub unique_prefix: Option<String>,
}

impl CompileState {
    pub fn new(autoescape: bool) -> Self {
        Self {
            autoescape,
            ..Default::default()
        }
    }

    /// All nesting counters are back at rest.
    pub fn is_balanced(&self) -> bool {
        self.level == 0 && self.block_level == 0 && self.foreach_level == 0 && self.expr_level == 0
    }
}
