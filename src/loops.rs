//! `for` loops, loop metadata and `elsefor`.
//!
//! Loop metadata (`loop.index`, `loop.first`, ...) is only emitted for a
//! loop whose own body or guard references `loop`.

use crate::ast::{Expr, Node, NodeKind};
use crate::compiler::Generator;
use crate::error::Result;
use crate::state::ForElse;

impl<'c> Generator<'c> {
    pub(crate) fn compile_for(
        &mut self,
        target: &str,
        key: Option<&str>,
        iterable: Option<&Expr>,
        guard: Option<&Expr>,
        body: &[Node],
        extends_mode: bool,
    ) -> Result<String> {
        let iterable = self.required(iterable, "iterable")?;

        self.state.foreach_level += 1;
        let code = self.compile_loop(target, key, iterable, guard, body, extends_mode);
        self.state.foreach_level -= 1;
        code
    }

    fn compile_loop(
        &mut self,
        target: &str,
        key: Option<&str>,
        iterable: &Expr,
        guard: Option<&Expr>,
        body: &[Node],
        extends_mode: bool,
    ) -> Result<String> {
        let level = self.state.foreach_level;
        let p = format!("{}{}", self.unique_prefix()?, level);
        let source = self.compile_expr(iterable)?;

        self.state.loop_pointers.remove(&level);
        self.state.for_else_pointers.remove(&level);

        let mut code = String::new();

        // Only direct children can close this loop early.
        if body.iter().any(|node| matches!(node.kind, NodeKind::ElseFor)) {
            code.push_str(&format!("<?php ${}iterated = false; ?>", p));
            self.state.for_else_pointers.insert(
                level,
                ForElse {
                    prefix: p.clone(),
                    guarded: guard.is_some(),
                },
            );
        }

        // The guard goes first so a `loop` reference in it is seen by `elsefor`.
        let guard_code = guard.map(|guard| self.compile_expr(guard)).transpose()?;
        let body_code = self.compile_list(body, extends_mode)?;

        let uses_loop = self.state.loop_pointers.remove(&level).is_some();
        let for_else = self.state.for_else_pointers.remove(&level);

        let iterator = if uses_loop {
            code.push_str(&format!(
                "<?php ${p}iterator = {source}; ${p}incr = 0; ${p}loop = new stdClass(); \
                 ${p}loop->self = &${p}loop; ${p}loop->length = count(${p}iterator); \
                 ${p}loop->index = 1; ${p}loop->index0 = 0; \
                 ${p}loop->revindex = ${p}loop->length; ${p}loop->revindex0 = ${p}loop->length - 1; ?>",
                p = p,
                source = source
            ));
            format!("${}iterator", p)
        } else {
            source
        };

        match key {
            Some(key) => code.push_str(&format!("<?php foreach ({} as ${} => ${}) {{ ?>", iterator, key, target)),
            None => code.push_str(&format!("<?php foreach ({} as ${}) {{ ?>", iterator, target)),
        }

        // Refreshed ahead of the guard, which may read it.
        if uses_loop {
            code.push_str(&format!(
                "<?php ${p}loop->first = (${p}incr == 0); ${p}loop->index = ${p}incr + 1; \
                 ${p}loop->index0 = ${p}incr; ${p}loop->revindex = ${p}loop->length - ${p}incr; \
                 ${p}loop->revindex0 = ${p}loop->length - (${p}incr + 1); \
                 ${p}loop->last = (${p}incr == (${p}loop->length - 1)); ?>",
                p = p
            ));
        }
        if let Some(guard) = &guard_code {
            code.push_str(&format!("<?php if ({}) {{ ?>", guard));
        }
        if let Some(for_else) = &for_else {
            code.push_str(&format!("<?php ${}iterated = true; ?>", for_else.prefix));
        }

        code.push_str(&body_code);

        if for_else.is_some() {
            // `elsefor` already closed the guard and the loop.
            code.push_str("<?php } ?>");
        } else {
            if guard_code.is_some() {
                code.push_str("<?php } ?>");
            }
            if uses_loop {
                code.push_str(&format!("<?php ${}incr++; }} ?>", p));
            } else {
                code.push_str("<?php } ?>");
            }
        }

        Ok(code)
    }

    /// Close the current loop and open the branch taken when it never iterated.
    pub(crate) fn compile_else_for(&self) -> String {
        let level = self.state.foreach_level;
        let Some(for_else) = self.state.for_else_pointers.get(&level) else {
            return String::new();
        };

        let mut code = String::from("<?php ");
        if for_else.guarded {
            code.push_str("} ");
        }
        if self.state.loop_pointers.contains_key(&level) {
            code.push_str(&format!("${}incr++; ", for_else.prefix));
        }
        code.push_str(&format!("}} if (!${}iterated) {{ ?>", for_else.prefix));
        code
    }
}
