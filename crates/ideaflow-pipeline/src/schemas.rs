//! Minimum output shapes for the analysis stages.
//!
//! Each schema guarantees downstream prompts a usable object even when
//! the model returns prose, refusals, or half an answer. Substitutions
//! surface as a degraded stage status, never silently.

use serde_json::{json, Value};

use ideaflow_workflow::{plausible, FieldSchema};

pub fn parsed_idea() -> FieldSchema {
    FieldSchema::new()
        .field("theme", plausible::non_empty_string, json!("general"))
        .field("domain", plausible::non_empty_string, json!("unknown"))
        .field(
            "value_proposition",
            plausible::non_empty_string,
            json!("not stated"),
        )
        .field(
            "target_audience",
            plausible::non_empty_string,
            json!("general consumers"),
        )
}

pub fn market_signals() -> FieldSchema {
    FieldSchema::new()
        .field("trend_score", plausible::number_in_range(0.0, 100.0), json!(50))
        .field(
            "funding_activity",
            plausible::non_empty_string,
            json!("Moderate"),
        )
        .field("search_volume", plausible::non_empty_string, json!("Stable"))
        .field("related_startups", plausible::array, json!([]))
}

pub fn benchmark() -> FieldSchema {
    FieldSchema::new()
        .field_with(
            "direct_competitors",
            plausible::non_empty_array,
            synthetic_competitors,
        )
        .field(
            "benchmark_score",
            plausible::number_in_range(1.0, 100.0),
            json!(65),
        )
        .field(
            "competitive_intensity",
            plausible::non_empty_string,
            json!("Moderate"),
        )
        .field("market_gaps", plausible::array, json!([]))
}

pub fn novelty() -> FieldSchema {
    FieldSchema::new()
        .field(
            "novelty_score",
            plausible::number_in_range(0.0, 100.0),
            json!(50),
        )
        .field("differentiation_factors", plausible::array, json!([]))
        .field(
            "innovation_level",
            plausible::non_empty_string,
            json!("Medium"),
        )
}

pub fn report() -> FieldSchema {
    FieldSchema::new()
        .field(
            "marketability_index",
            plausible::number_in_range(0.0, 100.0),
            json!(50),
        )
        .field(
            "opportunity",
            plausible::non_empty_string,
            json!("Opportunity could not be assessed from the available signals."),
        )
        .field(
            "timing",
            plausible::non_empty_string,
            json!("Timing could not be assessed from the available signals."),
        )
        .field(
            "risk",
            plausible::non_empty_string,
            json!("Risk could not be assessed from the available signals."),
        )
        .field(
            "recommendation",
            plausible::non_empty_string,
            json!("Gather more market data before committing."),
        )
}

/// Plausible stand-in competitors for when retrieval and the model both
/// come up empty. Clearly generic names; the degraded status tells the
/// caller these are synthesized.
fn synthetic_competitors() -> Value {
    json!([
        {
            "name": "Brightpath Labs",
            "description": "Established player with a broad product suite in the same domain."
        },
        {
            "name": "NovaReach",
            "description": "Venture-backed entrant targeting the same customer segment."
        },
        {
            "name": "Mintline",
            "description": "Regional incumbent with strong distribution reach."
        }
    ])
}
