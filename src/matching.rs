//! Creator matching
//!
//! Ranks verified, available creators by how many of a request's required
//! skills they cover. Read-only.

use std::cmp::Ordering;
use std::collections::HashSet;

use serde::Serialize;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Creator, Request};
use crate::store::Store;

/// A creator together with the number of required skills they cover
#[derive(Debug, Clone, Serialize)]
pub struct CreatorMatch {
    #[serde(flatten)]
    pub creator: Creator,
    pub skill_overlap: usize,
}

/// Skills a request asks for, lowercased.
///
/// Falls back to the service type when the requirement set names no skills.
pub fn required_skills(request: &Request) -> HashSet<String> {
    let skills: HashSet<String> = request
        .requirements
        .skills
        .iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();

    if skills.is_empty() {
        HashSet::from([request.service_type.trim().to_lowercase()])
    } else {
        skills
    }
}

/// Rank candidates for a request.
///
/// Unverified or unavailable creators and creators with no overlapping skill
/// are dropped. Order: overlap desc, rating desc, completed projects desc,
/// name asc.
pub fn rank_creators(request: &Request, candidates: Vec<Creator>) -> Vec<CreatorMatch> {
    let required = required_skills(request);

    let mut matches: Vec<CreatorMatch> = candidates
        .into_iter()
        .filter(|c| c.is_verified && c.is_available)
        .filter_map(|creator| {
            let skill_overlap = creator
                .skills
                .iter()
                .map(|s| s.trim().to_lowercase())
                .collect::<HashSet<_>>()
                .intersection(&required)
                .count();
            (skill_overlap > 0).then_some(CreatorMatch {
                creator,
                skill_overlap,
            })
        })
        .collect();

    matches.sort_by(|a, b| {
        b.skill_overlap
            .cmp(&a.skill_overlap)
            .then_with(|| {
                b.creator
                    .rating
                    .partial_cmp(&a.creator.rating)
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| b.creator.completed_projects.cmp(&a.creator.completed_projects))
            .then_with(|| a.creator.name.cmp(&b.creator.name))
    });

    matches
}

/// Ranked matches for a stored request
pub async fn find_matches(store: &Store, request_id: Uuid) -> Result<Vec<CreatorMatch>> {
    let request = store.get_request(request_id).await?;
    let candidates = store.list_matchable_creators().await?;
    let matches = rank_creators(&request, candidates);

    tracing::debug!(request_id = %request_id, matches = matches.len(), "Ranked creators");
    Ok(matches)
}
