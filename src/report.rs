//! Summary and layout reports for the orden CLI
//!
//! Rolls a parsed profile up into per-interaction summaries, and renders
//! either report as text or JSON. The core store stays serialization-free;
//! only these CLI-facing structs derive `Serialize`.

use serde::Serialize;

use crate::profiles::MethodProfiles;

/// Per-interaction roll-up of a parsed profile.
#[derive(Debug, Clone, Serialize)]
pub struct InteractionSummary {
    pub interaction_id: String,
    /// Appearance count from the metadata block, when present.
    pub appear_count: Option<u32>,
    /// Resolved methods recorded for this interaction.
    pub methods: usize,
    pub mean_appear_percent: f64,
    pub mean_call_count: f64,
}

/// Whole-file roll-up.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileSummary {
    pub total_rows: usize,
    pub unresolved_lines: usize,
    pub interactions: Vec<InteractionSummary>,
}

impl ProfileSummary {
    pub fn from_profiles(profiles: &MethodProfiles) -> Self {
        let mut interactions: Vec<InteractionSummary> = profiles
            .all_interactions()
            .map(|(id, count)| summarize_interaction(profiles, id, count))
            .collect();
        interactions.sort_by(|a, b| a.interaction_id.cmp(&b.interaction_id));

        Self {
            total_rows: profiles.total_rows(),
            unresolved_lines: profiles.unresolved_len(),
            interactions,
        }
    }

    /// Render the summary table as text.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "{:<24} {:>9} {:>9} {:>12} {:>10}\n",
            "interaction", "appear#", "methods", "mean_appear", "mean_call"
        ));
        out.push_str(&format!(
            "{:-<24} {:->9} {:->9} {:->12} {:->10}\n",
            "", "", "", "", ""
        ));
        for summary in &self.interactions {
            let appear_count = summary
                .appear_count
                .map_or_else(String::new, |count| count.to_string());
            out.push_str(&format!(
                "{:<24} {:>9} {:>9} {:>12.2} {:>10.2}\n",
                display_id(&summary.interaction_id),
                appear_count,
                summary.methods,
                summary.mean_appear_percent,
                summary.mean_call_count
            ));
        }
        out.push_str(&format!(
            "{} rows; {} unresolved lines\n",
            self.total_rows, self.unresolved_lines
        ));
        out
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn summarize_interaction(
    profiles: &MethodProfiles,
    id: &str,
    count: Option<u32>,
) -> InteractionSummary {
    let stats = profiles.method_stats(id);
    let methods = stats.map_or(0, |map| map.len());
    let mut appear = 0.0;
    let mut calls = 0.0;
    if let Some(map) = stats {
        for row in map.values() {
            appear += row.appear_percent;
            calls += row.call_count;
        }
    }
    let denominator = methods.max(1) as f64;
    InteractionSummary {
        interaction_id: id.to_string(),
        appear_count: count,
        methods,
        mean_appear_percent: appear / denominator,
        mean_call_count: calls / denominator,
    }
}

/// Legacy files record cold start under the empty string; show it as such.
fn display_id(id: &str) -> &str {
    if id.is_empty() {
        "(cold start)"
    } else {
        id
    }
}

/// One method in computed layout order.
#[derive(Debug, Clone, Serialize)]
pub struct LayoutEntry {
    pub name: String,
    pub sort_key: f64,
}

/// Render the layout listing as text, one method per line.
pub fn layout_to_text(entries: &[LayoutEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&format!("{:>20.4}  {}\n", entry.sort_key, entry.name));
    }
    out
}

pub fn layout_to_json(entries: &[LayoutEntry]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(entries)
}
