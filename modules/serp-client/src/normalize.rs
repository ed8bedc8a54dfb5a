//! Organic-listing extraction from the provider's nested result tree.
//!
//! The provider's shape is not stable across API versions, so extraction is a
//! chain of small functions over `serde_json::Value`, each returning `Option`.
//! Any missing step yields an empty list rather than an error.

use serde_json::Value;

use crate::types::{ResultRecord, UpstreamResponse};

const ORGANIC: &str = "organic";

/// Organic listings from the first task, in provider order.
pub fn extract_organic_results(response: &UpstreamResponse) -> Vec<ResultRecord> {
    organic_items(response)
        .into_iter()
        .map(ResultRecord::from_item)
        .collect()
}

/// Raw items behind [`extract_organic_results`]. Falls back to every candidate
/// when none carries an organic marker.
pub fn organic_items(response: &UpstreamResponse) -> Vec<&Value> {
    let Some(result_object) = response
        .first_task()
        .and_then(|task| task.result.as_ref())
        .and_then(first_result_object)
    else {
        return Vec::new();
    };

    let pool = candidate_pool(result_object);
    organic_only(&pool).unwrap_or(pool)
}

/// First element of a non-empty result array.
fn first_result_object(result: &Value) -> Option<&Value> {
    result
        .as_array()
        .filter(|items| !items.is_empty())
        .and_then(|items| items.first())
        .filter(|first| first.is_object())
}

/// Direct `items`, followed by one level of nested `items` found inside them.
fn candidate_pool(result_object: &Value) -> Vec<&Value> {
    let direct: &[Value] = result_object
        .get("items")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let nested = direct
        .iter()
        .filter_map(|item| item.get("items").and_then(Value::as_array))
        .flatten();

    direct.iter().chain(nested).collect()
}

fn organic_only<'a>(pool: &[&'a Value]) -> Option<Vec<&'a Value>> {
    let organic: Vec<&Value> = pool.iter().copied().filter(|item| is_organic(item)).collect();
    (!organic.is_empty()).then_some(organic)
}

/// The marker field name differs between response shapes: `type`, `item_type`, or `item_types`.
fn is_organic(item: &Value) -> bool {
    let markers: [fn(&Value) -> Option<bool>; 3] = [
        |item| Some(item.get("type")?.as_str()? == ORGANIC),
        |item| Some(item.get("item_type")?.as_str()? == ORGANIC),
        |item| {
            Some(
                item.get("item_types")?
                    .as_array()?
                    .iter()
                    .any(|t| t.as_str() == Some(ORGANIC)),
            )
        },
    ];

    markers.iter().any(|marker| marker(item).unwrap_or(false))
}
