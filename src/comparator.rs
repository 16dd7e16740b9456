//! Profile-guided method ordering
//!
//! Turns the per-interaction statistics of a parsed [`MethodProfiles`] into
//! a single real-valued sort key per method, then into a strict total order
//! suitable for driving a layout sort. Each interaction owns a disjoint
//! sub-range of the sort-key line; a method lands in the first interaction
//! whose stats place it, and methods no interaction places go after
//! everything (subject to the whitelist override).

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use tracing::debug;

use crate::profiles::{MethodProfiles, COLD_START};
use crate::symbols::{IdentityOrder, MethodId, SymbolTable};

/// Width of the sub-range actually assigned within each interaction.
///
/// Each interaction in the comparator's ordered list owns `RANGE_STRIDE`
/// units of the sort-key line, allocated contiguously from
/// [`COLD_START_RANGE_BEGIN`]; only the first `RANGE_SIZE` units are
/// assigned, leaving headroom for the cold-start markers before the next
/// range begins. Any finite values keep the ordering invariants as long as
/// `RANGE_SIZE <= RANGE_STRIDE` and `VERY_END` exceeds every allocated
/// range.
pub const RANGE_SIZE: f64 = 1.0;

/// Distance between the starts of consecutive interaction ranges.
pub const RANGE_STRIDE: f64 = 2.0;

/// Start of the first range. Cold start always sorts first, so this is
/// where its range begins.
pub const COLD_START_RANGE_BEGIN: f64 = 0.0;

/// Sort key for methods placed by no interaction: after everything.
pub const VERY_END: f64 = 1e15;

/// Well-known markers bracketing the cold-start section of the binary, when
/// the target defines them.
pub const COLD_START_BEGIN_MARKER: &str = "Lorden/markers/ColdStart;.begin:()V";
pub const COLD_START_END_MARKER: &str = "Lorden/markers/ColdStart;.end:()V";

// Placement thresholds on appear_percent.
const LEGACY_MIN_APPEAR: f64 = 95.0;
const MIN_APPEAR: f64 = 90.0;

/// Sort keys already computed for one layout pass.
///
/// Externally owned so independently constructed comparators can share one
/// cache. Single-threaded; concurrent use requires outside synchronization.
pub type SortKeyCache = Rc<RefCell<HashMap<MethodId, f64>>>;

/// Comparison function over method references for a layout sort.
pub struct ProfiledComparator<'a> {
    profiles: &'a MethodProfiles,
    symbols: &'a dyn SymbolTable,
    identity: &'a dyn IdentityOrder,
    whitelisted_substrings: &'a HashSet<String>,
    cache: SortKeyCache,
    legacy_order: bool,
    coldstart_begin_marker: Option<MethodId>,
    coldstart_end_marker: Option<MethodId>,
    interactions: Vec<String>,
}

impl<'a> ProfiledComparator<'a> {
    /// Build a comparator over a finalized profile store.
    ///
    /// `legacy_order` restricts placement to the cold-start interaction and
    /// switches to the coarser midpoint heuristic. The cache may be shared
    /// with other comparator instances; keys survive for its lifetime.
    pub fn new(
        profiles: &'a MethodProfiles,
        symbols: &'a dyn SymbolTable,
        identity: &'a dyn IdentityOrder,
        whitelisted_substrings: &'a HashSet<String>,
        cache: SortKeyCache,
        legacy_order: bool,
    ) -> Self {
        let coldstart_begin_marker = symbols.resolve(COLD_START_BEGIN_MARKER);
        let coldstart_end_marker = symbols.resolve(COLD_START_END_MARKER);
        if coldstart_begin_marker.is_none() || coldstart_end_marker.is_none() {
            debug!("cold start markers not present in the symbol table");
        }

        let mut interactions: Vec<String> = profiles
            .all_interactions()
            // Older profiles recorded cold start under the empty string.
            .map(|(id, _)| if id.is_empty() { COLD_START } else { id })
            .filter(|id| !legacy_order || *id == COLD_START)
            .map(str::to_string)
            .collect();
        // Cold start always first, the rest lexicographic by id.
        // TODO: order the rest by interaction prevalence (appear# metadata).
        interactions.sort_by(|a, b| match (a == COLD_START, b == COLD_START) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => a.cmp(b),
        });
        interactions.dedup();

        Self {
            profiles,
            symbols,
            identity,
            whitelisted_substrings,
            cache,
            legacy_order,
            coldstart_begin_marker,
            coldstart_end_marker,
            interactions,
        }
    }

    /// The interactions considered for placement, cold start first.
    pub fn interactions(&self) -> &[String] {
        &self.interactions
    }

    /// Primary placement: the first interaction whose stats place the
    /// method wins its sub-range.
    fn method_sort_num(&self, method: MethodId) -> f64 {
        let mut range_begin = COLD_START_RANGE_BEGIN;
        for interaction_id in &self.interactions {
            if interaction_id == COLD_START {
                if let (Some(begin), Some(end)) =
                    (self.coldstart_begin_marker, self.coldstart_end_marker)
                {
                    if method == begin {
                        return range_begin;
                    }
                    if method == end {
                        return range_begin + RANGE_SIZE;
                    }
                }
            }
            if let Some(stats) = self
                .profiles
                .method_stats(interaction_id)
                .and_then(|map| map.get(&method))
            {
                if self.legacy_order && stats.appear_percent >= LEGACY_MIN_APPEAR {
                    return range_begin + RANGE_SIZE / 2.0;
                }
                if !self.legacy_order && stats.appear_percent >= MIN_APPEAR {
                    return range_begin + stats.order_percent * RANGE_SIZE / 100.0;
                }
            }
            range_begin += RANGE_STRIDE;
        }

        // Not present in the profiled order file: end of the code section.
        VERY_END
    }

    /// Whitelist override for methods the profile data did not place: treat
    /// them as hot anyway and park them mid cold-start range.
    fn method_sort_num_override(&self, method: MethodId) -> f64 {
        let deobfuscated = self.symbols.display_name(method);
        for substring in self.whitelisted_substrings {
            if deobfuscated.contains(substring.as_str()) {
                return COLD_START_RANGE_BEGIN + RANGE_SIZE / 2.0;
            }
        }
        VERY_END
    }

    /// Sort key for one method, computed at most once per cache lifetime.
    pub fn sort_key(&self, method: MethodId) -> f64 {
        if let Some(&key) = self.cache.borrow().get(&method) {
            return key;
        }

        let mut key = self.method_sort_num(method);
        if key == VERY_END {
            key = self.method_sort_num_override(method);
        }

        self.cache.borrow_mut().insert(method, key);
        key
    }

    /// Total order used to drive a layout sort. Absent methods sort first
    /// and compare equal to each other; equal sort keys fall back to the
    /// identity order so the result stays strict and deterministic.
    pub fn compare(&self, a: Option<MethodId>, b: Option<MethodId>) -> Ordering {
        let (a, b) = match (a, b) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(a), Some(b)) => (a, b),
        };

        let key_a = self.sort_key(a);
        let key_b = self.sort_key(b);
        match key_a.partial_cmp(&key_b) {
            Some(Ordering::Equal) | None => self.identity.compare(a, b),
            Some(ordering) => ordering,
        }
    }
}
