//! Merging of local and server copies of the user's collections.
//!
//! Id-keyed collections take the server's version of any id both sides hold.
//! The output keeps local order and appends server-only entries in server
//! order. Ids the user deleted locally are remembered as tombstones and
//! filtered from the server side until the server stops returning them.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use cheheom_shared::types::Identified;

use crate::error::SyncError;

/// Locally deleted ids per collection, persisted until the server agrees.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tombstones {
    #[serde(default)]
    pub applications: BTreeSet<String>,
    #[serde(default)]
    pub favorites: BTreeSet<String>,
}

/// The collections reconciled on session start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Applications,
    Favorites,
    Reviews,
    Notifications,
    BusinessProducts,
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Collection::Applications => "applications",
            Collection::Favorites => "favorites",
            Collection::Reviews => "reviews",
            Collection::Notifications => "notifications",
            Collection::BusinessProducts => "businessProducts",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Default)]
pub struct ReconcileReport {
    pub succeeded: Vec<Collection>,
    pub failed: Vec<(Collection, SyncError)>,
}

impl ReconcileReport {
    pub fn data_loaded(&self) -> bool {
        !self.succeeded.is_empty()
    }

    pub fn record<T>(&mut self, collection: Collection, result: &Result<T, SyncError>) {
        match result {
            Ok(_) => self.succeeded.push(collection),
            Err(e) => {
                tracing::warn!(collection = %collection, error = %e, "remote fetch failed; keeping local copy");
                self.failed.push((collection, e.clone()));
            }
        }
    }
}

/// Merge entities by id, the server winning on shared ids.
pub fn merge_by_id<T>(local: &[T], remote: &[T], tombstones: &BTreeSet<String>) -> Vec<T>
where
    T: Identified + Clone,
{
    let mut merged: Vec<T> = local.to_vec();
    let mut positions: HashMap<String, usize> = merged
        .iter()
        .enumerate()
        .map(|(i, item)| (item.id().to_string(), i))
        .collect();

    for item in remote {
        if tombstones.contains(item.id()) {
            continue;
        }
        match positions.get(item.id()) {
            Some(&i) => merged[i] = item.clone(),
            None => {
                positions.insert(item.id().to_string(), merged.len());
                merged.push(item.clone());
            }
        }
    }
    merged
}

/// Union of id sets, local order first.
pub fn merge_ids(local: &[String], remote: &[String], tombstones: &BTreeSet<String>) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(local.len() + remote.len());
    let mut merged = Vec::with_capacity(local.len() + remote.len());

    for id in local {
        if seen.insert(id) {
            merged.push(id.clone());
        }
    }
    for id in remote {
        if !tombstones.contains(id) && seen.insert(id) {
            merged.push(id.clone());
        }
    }
    merged
}

/// Forget tombstones for ids the server no longer returns.
pub fn prune_tombstones<'a>(tombstones: &mut BTreeSet<String>, remote_ids: impl IntoIterator<Item = &'a str>) {
    if tombstones.is_empty() {
        return;
    }
    let remote: HashSet<&str> = remote_ids.into_iter().collect();
    tombstones.retain(|id| remote.contains(id.as_str()));
}

/// Apply one fetched collection to the local copy.
///
/// Returns true when the local copy changed. A failed or empty fetch leaves it untouched.
pub fn absorb<T>(
    local: &mut Vec<T>,
    fetched: &Result<Vec<T>, SyncError>,
    tombstones: Option<&mut BTreeSet<String>>,
) -> bool
where
    T: Identified + Clone + PartialEq,
{
    let Ok(remote) = fetched else {
        return false;
    };

    let empty = BTreeSet::new();
    let tombstones: &BTreeSet<String> = match tombstones {
        Some(set) => {
            prune_tombstones(set, remote.iter().map(|item| item.id()));
            &*set
        }
        None => &empty,
    };

    if remote.is_empty() {
        return false;
    }

    let merged = merge_by_id(local, remote, tombstones);
    let changed = merged != *local;
    *local = merged;
    changed
}
