//! Collapse repeated mentions of an object into its final action

use std::collections::HashSet;

use crate::model::ObjectIdentity;

/// Reduce occurrences to one identity per object, keeping the last one.
///
/// Walks the list backwards so the most recent mention of each full name is
/// seen first, keeps that one, then restores the original relative order. The
/// last mention wins whether it creates or drops, since only the final state of
/// each object needs to be scripted.
pub fn reconcile(occurrences: Vec<ObjectIdentity>) -> Vec<ObjectIdentity> {
    let mut seen = HashSet::with_capacity(occurrences.len());
    let mut kept: Vec<ObjectIdentity> = occurrences
        .into_iter()
        .rev()
        .filter(|identity| seen.insert(identity.dedup_key()))
        .collect();
    kept.reverse();
    kept
}
