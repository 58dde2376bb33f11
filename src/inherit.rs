//! Merging a child template's blocks into its parent's block map.

use std::mem;

use tracing::debug;

use crate::blocks::{BlockBody, BlockKey};
use crate::compiler::Generator;
use crate::error::Result;

impl<'c> Generator<'c> {
    /// Walk the parent's entries in order, substituting the child's
    /// override for each named block it redefines.
    ///
    /// Blocks the child defines that the parent lacks have nowhere to go and
    /// are dropped. Block bodies are compiled with inheritance switched off,
    /// so blocks nested inside them render in place.
    pub(crate) fn merge_extended(&mut self) -> Result<Vec<(BlockKey, String)>> {
        let parent = self.state.extended_blocks.clone().unwrap_or_default();
        let local = mem::take(&mut self.state.blocks);

        let dropped: Vec<&str> = local.names().filter(|name| parent.get_named(name).is_none()).collect();
        if !dropped.is_empty() {
            debug!(blocks = ?dropped, "child blocks missing from parent are dropped");
        }

        self.state.extended = false;
        let mut merged = Vec::with_capacity(parent.len());
        let mut result = Ok(());
        for (key, inherited) in parent.iter() {
            let body = match key {
                BlockKey::Name(name) => match local.get_named(name) {
                    Some(own) => {
                        self.state.current_block = Some(name.clone());
                        own
                    }
                    None => {
                        self.state.current_block = None;
                        inherited
                    }
                },
                BlockKey::Position(_) => {
                    self.state.current_block = None;
                    inherited
                }
            };
            match self.block_code(body) {
                Ok(code) => merged.push((key.clone(), code)),
                Err(err) => {
                    result = Err(err);
                    break;
                }
            }
        }
        self.state.current_block = None;
        self.state.extended = true;

        result.map(|()| merged)
    }

    fn block_code(&mut self, body: &BlockBody) -> Result<String> {
        match body {
            BlockBody::Code(code) => Ok(code.clone()),
            BlockBody::Nodes(nodes) => self.compile_list(nodes, false),
        }
    }
}
