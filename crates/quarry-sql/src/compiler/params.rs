//! Parameter collection for compiled statements.
//!
//! Fragments are emitted out of textual order (a derived table is rendered
//! before the statement around it), so a literal is written as a marker
//! naming its slot in emission order. [`ParamCollector::finish`] rewrites
//! the markers in one left-to-right pass, numbering placeholders and
//! ordering parameters as they appear in the final text. A fragment that
//! is pasted twice yields two placeholders and two parameters.

use super::dialect::PlaceholderStyle;
use super::{CompileError, CompileResult};
use crate::types::Literal;

const MARKER_START: &str = "\u{0}P";
const MARKER_END: char = '\u{0}';

/// Literals captured during emission.
#[derive(Debug, Default)]
pub(crate) struct ParamCollector {
    slots: Vec<Literal>,
}

impl ParamCollector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Stores `literal` and returns its marker.
    pub(crate) fn push(&mut self, literal: Literal) -> String {
        let slot = self.slots.len();
        self.slots.push(literal);
        format!("{MARKER_START}{slot}{MARKER_END}")
    }

    /// Replaces every marker in `sql` with a placeholder and returns the
    /// parameters in textual order.
    pub(crate) fn finish(
        self,
        sql: &str,
        style: PlaceholderStyle,
    ) -> CompileResult<(String, Vec<Literal>)> {
        let mut out = String::with_capacity(sql.len());
        let mut params = Vec::new();
        let mut rest = sql;

        while let Some(start) = rest.find(MARKER_START) {
            out.push_str(&rest[..start]);
            let after = &rest[start + MARKER_START.len()..];
            let end = after
                .find(MARKER_END)
                .ok_or_else(|| CompileError::internal("unterminated parameter marker"))?;
            let slot: usize = after[..end]
                .parse()
                .map_err(|_| CompileError::internal("malformed parameter marker"))?;
            let literal = self
                .slots
                .get(slot)
                .ok_or_else(|| CompileError::internal(format!("unknown parameter slot {slot}")))?;
            params.push(literal.clone());
            out.push_str(&style.render(params.len()));
            rest = &after[end + MARKER_END.len_utf8()..];
        }
        out.push_str(rest);
        Ok((out, params))
    }
}
