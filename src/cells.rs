//! Comma cell splitting with per-cell dispatch
//!
//! Purely mechanical: the splitter carries no domain knowledge. Header,
//! metadata, and data-row semantics live entirely in `CellHandler`
//! implementations in the profile store.

use crate::error::Result;

/// Receives the cells of one raw profile line, in column order.
pub trait CellHandler {
    /// Called once per cell with its 0-based column index. Returning an
    /// error stops the line immediately.
    fn on_cell(&mut self, cell: &str, column: usize) -> Result<()>;
}

/// Split `line` on commas and feed each cell to `handler`.
///
/// The line terminator, when present, stays attached to the final cell;
/// handlers strip it where it matters. A line with no delimiter still
/// dispatches once with the whole line.
pub fn parse_cells<H: CellHandler>(line: &str, handler: &mut H) -> Result<()> {
    for (column, cell) in line.split(',').enumerate() {
        handler.on_cell(cell, column)?;
    }
    Ok(())
}

/// Strip one trailing line terminator (`\n` or `\r\n`) from a cell.
pub(crate) fn trim_terminator(cell: &str) -> &str {
    match cell.strip_suffix('\n') {
        Some(rest) => rest.strip_suffix('\r').unwrap_or(rest),
        None => cell,
    }
}
