use crate::adapters::{ParentRecord, PassageRecord, PassageStore};
use crate::error::{Result, SearchError};
use passage_protocol::{Candidate, RankedPassage};
use std::collections::{HashMap, HashSet};

/// Resolve candidate ids into full passages with two batched lookups.
///
/// Output keeps candidate order. A candidate is dropped when its passage or
/// parent record is missing, or when `owner_id` is set and the parent belongs
/// to someone else. Parents without an owner are never filtered. Drops are
/// index/store drift and are not errors.
pub async fn hydrate(
    store: &dyn PassageStore,
    candidates: &[Candidate],
    owner_id: Option<&str>,
) -> Result<Vec<RankedPassage>> {
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<String> = unique(candidates.iter().map(|c| c.id.as_str()));
    let passages = store
        .find_passages(&ids)
        .await
        .map_err(SearchError::store)?;

    let parent_ids: Vec<String> = unique(passages.values().map(|p| p.parent_id.as_str()));
    let parents = if parent_ids.is_empty() {
        HashMap::new()
    } else {
        store
            .find_parents(&parent_ids)
            .await
            .map_err(SearchError::store)?
    };

    let hydrated: Vec<RankedPassage> = candidates
        .iter()
        .filter_map(|candidate| resolve(candidate, &passages, &parents, owner_id))
        .collect();

    if hydrated.len() < candidates.len() {
        log::debug!(
            "Hydration kept {}/{} candidates",
            hydrated.len(),
            candidates.len()
        );
    }

    Ok(hydrated)
}

fn resolve(
    candidate: &Candidate,
    passages: &HashMap<String, PassageRecord>,
    parents: &HashMap<String, ParentRecord>,
    owner_id: Option<&str>,
) -> Option<RankedPassage> {
    let Some(passage) = passages.get(&candidate.id) else {
        log::debug!("Dropping candidate {}: passage not found", candidate.id);
        return None;
    };
    let Some(parent) = parents.get(&passage.parent_id) else {
        log::debug!(
            "Dropping candidate {}: parent {} not found",
            candidate.id,
            passage.parent_id
        );
        return None;
    };

    if let (Some(caller), Some(owner)) = (owner_id, parent.owner_id.as_deref()) {
        if caller != owner {
            log::debug!(
                "Dropping candidate {}: parent {} is owned by another user",
                candidate.id,
                parent.id
            );
            return None;
        }
    }

    Some(RankedPassage {
        id: passage.id.clone(),
        parent_id: parent.id.clone(),
        parent_title: parent.title.clone(),
        content: passage.content.clone(),
        similarity: candidate.score,
    })
}

fn unique<'a>(ids: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.filter(|id| seen.insert(*id))
        .map(str::to_string)
        .collect()
}
