//! Type-directed merging of enrichment results into document front-matter.
//!
//! The merge is a pure function over YAML values and it never fails: any
//! combination of shapes produces a merged value, with unrecognized
//! combinations falling through to "new value wins". This is what makes the
//! pipeline safe to re-run against partially-enriched documents.

use serde_yaml::{Mapping, Value};

/// Merges `new_fields` into `front_matter`, key by key.
///
/// Rules per key present in `new_fields`:
/// - absent (or null) in the document: set directly;
/// - both sequences of keyed records (`person` + `role`): merge
///   record-by-record, unioning nested `relationships` lists;
/// - both sequences otherwise: union, deduplicated by equality (existing
///   order kept, new unseen elements appended);
/// - both mappings: shallow key-wise overwrite, new keys win;
/// - anything else: overwrite with the new value.
pub fn merge_fields(front_matter: &mut Mapping, new_fields: Mapping) {
    for (key, new_value) in new_fields {
        let has_existing = matches!(front_matter.get(&key), Some(v) if !v.is_null());
        if has_existing {
            if let Some(existing) = front_matter.get_mut(&key) {
                let old_value = std::mem::replace(existing, Value::Null);
                *existing = merge_value(old_value, new_value);
            }
        } else {
            front_matter.insert(key, new_value);
        }
    }
}

fn merge_value(existing: Value, new: Value) -> Value {
    match (existing, new) {
        (Value::Sequence(old_items), Value::Sequence(new_items)) => {
            if is_keyed_record_list(&old_items) && is_keyed_record_list(&new_items) {
                Value::Sequence(merge_keyed_records(old_items, new_items))
            } else {
                Value::Sequence(union_by_equality(old_items, new_items))
            }
        }
        (Value::Mapping(mut old_map), Value::Mapping(new_map)) => {
            for (k, v) in new_map {
                old_map.insert(k, v);
            }
            Value::Mapping(old_map)
        }
        // Scalars and incompatible shape pairs: the new value overwrites.
        (_, new) => new,
    }
}

fn union_by_equality(mut base: Vec<Value>, additions: Vec<Value>) -> Vec<Value> {
    for item in additions {
        if !base.contains(&item) {
            base.push(item);
        }
    }
    base
}

/// A list qualifies for record-wise merging only when every element is a
/// mapping carrying the composite natural key. Mixed or partial lists fall
/// back to plain union so the merge can never fail on odd shapes.
fn is_keyed_record_list(items: &[Value]) -> bool {
    !items.is_empty() && items.iter().all(|item| record_key(item).is_some())
}

fn record_key(item: &Value) -> Option<(String, String)> {
    let map = item.as_mapping()?;
    let person = map.get(Value::String("person".into()))?.as_str()?;
    let role = map.get(Value::String("role".into()))?.as_str()?;
    Some((person.to_string(), role.to_string()))
}

fn merge_keyed_records(base: Vec<Value>, additions: Vec<Value>) -> Vec<Value> {
    let mut merged = base;
    for new_item in additions {
        let key = record_key(&new_item);
        let position = merged
            .iter()
            .position(|existing| record_key(existing) == key);
        match position {
            Some(idx) => {
                let relationships_key = Value::String("relationships".into());
                let new_relationships = new_item
                    .as_mapping()
                    .and_then(|m| m.get(&relationships_key))
                    .cloned();
                if let (Some(existing_map), Some(Value::Sequence(new_rels))) =
                    (merged[idx].as_mapping_mut(), new_relationships)
                {
                    let old_rels = match existing_map.get_mut(&relationships_key) {
                        Some(Value::Sequence(old)) => std::mem::take(old),
                        _ => Vec::new(),
                    };
                    existing_map.insert(
                        relationships_key,
                        Value::Sequence(union_by_equality(old_rels, new_rels)),
                    );
                }
            }
            None => merged.push(new_item),
        }
    }
    merged
}
