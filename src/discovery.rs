//! Discovery of plugin candidates from declared manifests and manual
//! instances.
//!
//! Discovery is a pure, local pass: no network, no filesystem. Manifest
//! entries that fail to parse are skipped and reported, never fatal to the
//! pass as a whole.

use crate::descriptor::{ManifestEntry, PluginDescriptor, PluginId};
use crate::error::FailureReason;
use std::collections::HashSet;

/// A declared manifest entry that could not be turned into a candidate.
#[derive(Debug, Clone)]
pub struct SkippedManifest {
    /// Position of the entry in the declared manifest list
    pub index: usize,
    /// Why the entry was skipped
    pub reason: String,
}

/// A manual candidate rejected before reaching the registry.
#[derive(Debug, Clone)]
pub struct RejectedCandidate {
    /// Plugin id of the rejected candidate
    pub id: PluginId,
    /// Failure classification (currently always `DuplicateId`)
    pub reason: FailureReason,
}

/// Outcome of one discovery pass.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryReport {
    /// Accepted candidates: manual instances first (given order), then
    /// declared manifest entries (manifest order)
    pub descriptors: Vec<PluginDescriptor>,
    /// Declared entries skipped because they failed to parse or validate
    pub skipped: Vec<SkippedManifest>,
    /// Manual candidates rejected for duplicate ids
    pub rejected: Vec<RejectedCandidate>,
    /// Declared ids superseded by a manual instance with the same id
    pub overridden: Vec<PluginId>,
}

/// Produces the candidate set for an initialization pass.
#[derive(Debug, Default)]
pub struct DiscoveryService;

impl DiscoveryService {
    /// Merge declared manifest entries and manual descriptors into one
    /// candidate set.
    ///
    /// Manual descriptors take precedence over a declared manifest entry
    /// with the same id, never the reverse. Duplicate ids across manual
    /// descriptors are rejected here, before they can reach the registry.
    /// Duplicate declared ids keep the first occurrence.
    pub fn discover(
        declared: &[serde_json::Value],
        manual: &[PluginDescriptor],
    ) -> DiscoveryReport {
        let mut report = DiscoveryReport::default();
        let mut seen: HashSet<PluginId> = HashSet::new();

        for descriptor in manual {
            if !seen.insert(descriptor.id.clone()) {
                tracing::warn!(
                    plugin_id = %descriptor.id,
                    "Duplicate manual plugin instance rejected"
                );
                report.rejected.push(RejectedCandidate {
                    id: descriptor.id.clone(),
                    reason: FailureReason::DuplicateId,
                });
                continue;
            }
            report.descriptors.push(descriptor.clone());
        }

        let manual_count = report.descriptors.len();

        for (index, value) in declared.iter().enumerate() {
            let entry: ManifestEntry = match serde_json::from_value(value.clone()) {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(manifest_index = index, "Skipping unparseable manifest entry: {e}");
                    report.skipped.push(SkippedManifest {
                        index,
                        reason: format!("parse error: {e}"),
                    });
                    continue;
                },
            };

            let descriptor = entry.into_descriptor();
            if let Err(e) = descriptor.validate() {
                tracing::warn!(
                    manifest_index = index,
                    plugin_id = %descriptor.id,
                    "Skipping invalid manifest entry: {e}"
                );
                report.skipped.push(SkippedManifest {
                    index,
                    reason: e.to_string(),
                });
                continue;
            }

            if seen.contains(&descriptor.id) {
                // Manual wins; a repeated declared id keeps its first
                // occurrence.
                if report.descriptors[..manual_count]
                    .iter()
                    .any(|d| d.id == descriptor.id)
                {
                    tracing::debug!(
                        plugin_id = %descriptor.id,
                        "Declared manifest entry overridden by manual instance"
                    );
                    report.overridden.push(descriptor.id.clone());
                } else {
                    report.skipped.push(SkippedManifest {
                        index,
                        reason: format!("duplicate declared id: {}", descriptor.id),
                    });
                }
                continue;
            }

            seen.insert(descriptor.id.clone());
            report.descriptors.push(descriptor);
        }

        tracing::debug!(
            candidates = report.descriptors.len(),
            skipped = report.skipped.len(),
            rejected = report.rejected.len(),
            "Discovery pass complete"
        );
        report
    }
}
