//! Aggregate method profile parsing and storage
//!
//! Parses the aggregated per-method, per-interaction statistics file in a
//! single forward pass and owns the result:
//! - One stats map per interaction, keyed by resolved method id
//! - Appearance counts from the optional metadata blocks
//! - A backlog of rows whose method name did not resolve yet, retried once
//!   the symbol table has stabilized
//!
//! The file alternates zero or more `interaction,appear#` metadata blocks
//! with exactly one main table. Which shape the next line must take is an
//! explicit [`ParseMode`] value threaded through the read loop.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

use tracing::debug;

use crate::cells::{parse_cells, trim_terminator, CellHandler};
use crate::error::{ProfileError, Result};
use crate::symbols::{MethodId, SymbolTable};

/// Canonical cold-start interaction id.
///
/// Older profile files had no interaction column and covered only cold
/// start; they recorded it under the empty string. Lookups for `COLD_START`
/// fall back to the empty string for those files.
pub const COLD_START: &str = "ColdStart";

/// Per (method, interaction) statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Stats {
    /// Fraction of cold-start-like runs where the method appears, 0-100.
    pub appear_percent: f64,
    /// Average number of invocations.
    pub call_count: f64,
    /// Average relative execution-order percentile, 0-100.
    pub order_percent: f64,
    /// Lowest API level the method was observed on.
    pub min_api_level: i16,
}

/// Statistics for every resolved method of one interaction.
pub type StatsMap = HashMap<MethodId, Stats>;

// Fixed main-table schema, column index to meaning.
const INDEX: usize = 0;
const NAME: usize = 1;
const APPEAR100: usize = 2;
const APPEAR_NUMBER: usize = 3;
const AVG_CALL: usize = 4;
const AVG_ORDER: usize = 5;
const AVG_RANK100: usize = 6;
const MIN_API_LEVEL: usize = 7;

/// What the next line of the file must be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseMode {
    /// Expecting a header line (initial state, and again after each
    /// metadata line, which is how metadata blocks stack).
    Header,
    /// Expecting exactly one `<interaction_id>,<count>` line.
    Metadata,
    /// Expecting data rows until end of input.
    Main,
}

/// Parsed method profiles for one stats file.
#[derive(Debug, Default)]
pub struct MethodProfiles {
    method_stats: HashMap<String, StatsMap>,
    interaction_counts: HashMap<String, u32>,
    unresolved_lines: HashMap<String, Vec<String>>,
    optional_columns: HashMap<usize, String>,
    /// Interaction id from the most recent metadata block; data rows without
    /// a per-row override land here.
    interaction_id: String,
}

impl MethodProfiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse one aggregated stats file in a single forward pass.
    ///
    /// On failure the whole parse is reported failed, but rows committed
    /// before the failing line stay in memory.
    pub fn parse_file(&mut self, path: &Path, symbols: &dyn SymbolTable) -> Result<()> {
        debug!("parsing method profile {}", path.display());
        let file = File::open(path).map_err(|source| ProfileError::FileOpen {
            path: path.to_path_buf(),
            source,
        })?;
        let mut reader = BufReader::new(file);

        let mut mode = ParseMode::Header;
        let mut line = String::new();
        let mut line_no = 0usize;
        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                break;
            }
            line_no += 1;
            mode = self
                .parse_line(mode, &line, symbols)
                .map_err(|source| ProfileError::AtLine {
                    path: path.display().to_string(),
                    line: line_no,
                    source: Box::new(source),
                })?;
        }

        debug!(
            "parsed {} rows across {} interactions; {} unresolved lines",
            self.total_rows(),
            self.method_stats.len(),
            self.unresolved_len()
        );
        Ok(())
    }

    /// Dispatch one line according to the current mode and return the mode
    /// for the next line.
    fn parse_line(
        &mut self,
        mode: ParseMode,
        line: &str,
        symbols: &dyn SymbolTable,
    ) -> Result<ParseMode> {
        match mode {
            ParseMode::Header => self.parse_header(line),
            ParseMode::Metadata => {
                self.parse_metadata(line)?;
                Ok(ParseMode::Header)
            }
            ParseMode::Main => {
                self.parse_main(line, symbols)?;
                Ok(ParseMode::Main)
            }
        }
    }

    /// Classify and validate a header line. A metadata block announces
    /// itself with a literal `interaction` first column; anything else must
    /// be the fixed main-table header, possibly with extra named columns.
    fn parse_header(&mut self, line: &str) -> Result<ParseMode> {
        if line.starts_with("interaction") {
            parse_cells(line, &mut MetadataHeaderHandler)?;
            Ok(ParseMode::Metadata)
        } else {
            let mut handler = MainHeaderHandler {
                optional_columns: HashMap::new(),
            };
            parse_cells(line, &mut handler)?;
            self.optional_columns.extend(handler.optional_columns);
            Ok(ParseMode::Main)
        }
    }

    /// Consume the single `<interaction_id>,<count>` line of a metadata
    /// block and make that interaction the active one.
    fn parse_metadata(&mut self, line: &str) -> Result<()> {
        let mut handler = MetadataRowHandler::default();
        parse_cells(line, &mut handler)?;
        let count = handler.count.ok_or_else(|| {
            ProfileError::Schema("metadata line is missing the appear# count".to_string())
        })?;
        self.interaction_id = handler.interaction_id;
        self.interaction_counts
            .insert(self.interaction_id.clone(), count);
        Ok(())
    }

    /// Parse one data row. Every parseable row has exactly one outcome: its
    /// stats land in the row's interaction map, or the raw line joins the
    /// unresolved backlog for a later retry. Returns whether the name
    /// resolved.
    fn parse_main(&mut self, line: &str, symbols: &dyn SymbolTable) -> Result<bool> {
        let mut handler = MainRowHandler {
            symbols,
            optional_columns: &self.optional_columns,
            stats: Stats::default(),
            interaction_id: None,
            method: None,
        };
        parse_cells(line, &mut handler)?;

        // A non-empty per-row interaction cell overrides the id from the
        // metadata block at the top of the file.
        let interaction_id = match handler.interaction_id {
            Some(id) if !id.is_empty() => id,
            _ => self.interaction_id.clone(),
        };
        match handler.method {
            Some(method) => {
                // Last write wins on duplicate (method, interaction) rows.
                self.method_stats
                    .entry(interaction_id)
                    .or_default()
                    .insert(method, handler.stats);
                Ok(true)
            }
            None => {
                self.unresolved_lines
                    .entry(interaction_id)
                    .or_default()
                    .push(line.to_string());
                Ok(false)
            }
        }
    }

    /// Re-parse every backlogged line using its originally recorded
    /// interaction as the active context.
    ///
    /// Intended to run once, after the symbol table is fully populated. A
    /// line that still fails to parse or resolve at that point means the
    /// backlog was corrupted or the retry ran too early; both are invariant
    /// violations, not recoverable errors.
    pub fn process_unresolved_lines(&mut self, symbols: &dyn SymbolTable) {
        let unresolved = std::mem::take(&mut self.unresolved_lines);
        for (interaction_id, lines) in unresolved {
            self.interaction_id = interaction_id;
            for line in lines {
                match self.parse_main(&line, symbols) {
                    Ok(true) => {}
                    Ok(false) => panic!("still unresolved after retry: {}", line.trim_end()),
                    Err(e) => panic!("backlogged line failed to re-parse: {e}"),
                }
            }
        }
        debug!(
            "after retry: {} rows parsed; {} unresolved lines",
            self.total_rows(),
            self.unresolved_len()
        );
    }

    /// Stats for one interaction. Requests for [`COLD_START`] fall back to
    /// the empty-string id recorded by legacy files without an interaction
    /// column. `None` when the interaction has no resolved rows.
    pub fn method_stats(&self, interaction_id: &str) -> Option<&StatsMap> {
        if let Some(map) = self.method_stats.get(interaction_id) {
            return Some(map);
        }
        if interaction_id == COLD_START {
            return self.method_stats.get("");
        }
        None
    }

    /// Appearance count from the metadata block, when one was present.
    pub fn interaction_count(&self, interaction_id: &str) -> Option<u32> {
        self.interaction_counts.get(interaction_id).copied()
    }

    /// Every interaction ever seen in the file, with its optional metadata
    /// count: the union of the stats maps and the metadata blocks.
    pub fn all_interactions(&self) -> impl Iterator<Item = (&str, Option<u32>)> + '_ {
        let counted = self
            .interaction_counts
            .iter()
            .map(|(id, &count)| (id.as_str(), Some(count)));
        let uncounted = self
            .method_stats
            .keys()
            .filter(|id| !self.interaction_counts.contains_key(id.as_str()))
            .map(|id| (id.as_str(), None));
        counted.chain(uncounted)
    }

    /// Entries summed across all stats maps.
    pub fn total_rows(&self) -> usize {
        self.method_stats.values().map(|map| map.len()).sum()
    }

    /// Raw lines waiting for a retry.
    pub fn unresolved_len(&self) -> usize {
        self.unresolved_lines.values().map(|lines| lines.len()).sum()
    }
}

/// Parse a numeric cell, tolerating one trailing line terminator. Range
/// enforcement comes from the target type itself (`u32` counts, `i16` api
/// levels).
fn parse_number<T: FromStr>(cell: &str, expected: &'static str) -> Result<T> {
    trim_terminator(cell)
        .parse()
        .map_err(|_| ProfileError::NumericParse {
            cell: trim_terminator(cell).to_string(),
            expected,
        })
}

fn check_header_cell(expected: &str, cell: &str, column: usize) -> Result<()> {
    if trim_terminator(cell) == expected {
        Ok(())
    } else {
        Err(ProfileError::Schema(format!(
            "unexpected header (column {column}): {:?} != {expected:?}",
            trim_terminator(cell)
        )))
    }
}

/// Validates the two-column `interaction,appear#` metadata header. Columns
/// beyond the schema must be empty.
struct MetadataHeaderHandler;

impl CellHandler for MetadataHeaderHandler {
    fn on_cell(&mut self, cell: &str, column: usize) -> Result<()> {
        match column {
            0 => check_header_cell("interaction", cell, column),
            1 => check_header_cell("appear#", cell, column),
            _ if trim_terminator(cell).is_empty() => Ok(()),
            _ => Err(ProfileError::Schema(format!(
                "unexpected metadata column: {:?}",
                trim_terminator(cell)
            ))),
        }
    }
}

/// Validates the fixed main-table header and records any extra columns
/// under their header text.
struct MainHeaderHandler {
    optional_columns: HashMap<usize, String>,
}

impl CellHandler for MainHeaderHandler {
    fn on_cell(&mut self, cell: &str, column: usize) -> Result<()> {
        match column {
            INDEX => check_header_cell("index", cell, column),
            NAME => check_header_cell("name", cell, column),
            APPEAR100 => check_header_cell("appear100", cell, column),
            APPEAR_NUMBER => check_header_cell("appear#", cell, column),
            AVG_CALL => check_header_cell("avg_call", cell, column),
            AVG_ORDER => check_header_cell("avg_order", cell, column),
            AVG_RANK100 => check_header_cell("avg_rank100", cell, column),
            MIN_API_LEVEL => check_header_cell("min_api_level", cell, column),
            _ => {
                self.optional_columns
                    .insert(column, trim_terminator(cell).to_string());
                Ok(())
            }
        }
    }
}

/// Collects one `<interaction_id>,<count>` metadata line.
#[derive(Default)]
struct MetadataRowHandler {
    interaction_id: String,
    count: Option<u32>,
}

impl CellHandler for MetadataRowHandler {
    fn on_cell(&mut self, cell: &str, column: usize) -> Result<()> {
        match column {
            0 => {
                self.interaction_id = trim_terminator(cell).to_string();
                Ok(())
            }
            1 => {
                self.count = Some(parse_number(cell, "u32")?);
                Ok(())
            }
            _ => Err(ProfileError::Schema(
                "too many columns on a metadata line".to_string(),
            )),
        }
    }
}

/// Builds a `Stats` record from one data row, resolving the name cell
/// through the symbol table as it streams past.
struct MainRowHandler<'a> {
    symbols: &'a dyn SymbolTable,
    optional_columns: &'a HashMap<usize, String>,
    stats: Stats,
    interaction_id: Option<String>,
    method: Option<MethodId>,
}

impl CellHandler for MainRowHandler<'_> {
    fn on_cell(&mut self, cell: &str, column: usize) -> Result<()> {
        match column {
            // Arbitrary row number; not needed.
            INDEX => Ok(()),
            NAME => {
                self.method = self.symbols.resolve(cell);
                if self.method.is_none() {
                    debug!("failed to resolve {}", cell.trim_end());
                }
                Ok(())
            }
            APPEAR100 => {
                self.stats.appear_percent = parse_number(cell, "f64")?;
                Ok(())
            }
            // appear_percent is the same thing but normalized.
            APPEAR_NUMBER => Ok(()),
            AVG_CALL => {
                self.stats.call_count = parse_number(cell, "f64")?;
                Ok(())
            }
            // order_percent is the same thing but normalized.
            AVG_ORDER => Ok(()),
            AVG_RANK100 => {
                self.stats.order_percent = parse_number(cell, "f64")?;
                Ok(())
            }
            MIN_API_LEVEL => {
                self.stats.min_api_level = parse_number(cell, "i16")?;
                Ok(())
            }
            _ => match self.optional_columns.get(&column).map(String::as_str) {
                Some("interaction") => {
                    self.interaction_id = Some(trim_terminator(cell).to_string());
                    Ok(())
                }
                _ => Err(ProfileError::Schema(format!(
                    "unknown extra column {column}"
                ))),
            },
        }
    }
}
