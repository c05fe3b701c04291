use std::collections::{BTreeMap, BTreeSet};

use super::definition::IdentifiedObject;

/// Catalog lookup keyed by id, holding display names.
pub type IdMap = BTreeMap<String, String>;

pub fn to_id_map<'a, I>(objects: I) -> IdMap
where
    I: IntoIterator<Item = &'a IdentifiedObject>,
{
    objects
        .into_iter()
        .map(|object| (object.id.clone(), object.name.clone()))
        .collect()
}

/// Catalog entries whose id appears in `ids`, in catalog order.
pub fn extract_identified_objects(
    objects: &[IdentifiedObject],
    ids: &[String],
) -> Vec<IdentifiedObject> {
    let wanted: BTreeSet<&str> = ids.iter().map(String::as_str).collect();
    objects
        .iter()
        .filter(|object| wanted.contains(object.id.as_str()))
        .cloned()
        .collect()
}

/// Entries present in both maps, keeping the names from `left`.
pub fn intersect_id_maps(left: &IdMap, right: &IdMap) -> IdMap {
    left.iter()
        .filter(|(id, _)| right.contains_key(*id))
        .map(|(id, name)| (id.clone(), name.clone()))
        .collect()
}

pub fn filter_id_map(map: &IdMap, ids: &[String]) -> IdMap {
    ids.iter()
        .filter_map(|id| map.get(id).map(|name| (id.clone(), name.clone())))
        .collect()
}

/// First id that occurs more than once.
pub fn find_duplicate_id<'a, I>(ids: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = BTreeSet::new();
    ids.into_iter().find(|id| !seen.insert(*id))
}
