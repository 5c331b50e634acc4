use super::job::{Job, JobResponse, JobStatus};
use serde::Serialize;
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// Folder-grouped view over Completed jobs.
///
/// Never persisted: always recomputed from the job collection, so it carries
/// no invariants of its own.
#[derive(Debug, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LibraryView {
    /// Completed jobs without a folder.
    pub root: Vec<JobResponse>,
    /// Completed jobs grouped by folder name.
    pub folders: BTreeMap<String, Vec<JobResponse>>,
}

impl LibraryView {
    /// Group completed jobs into root/folder buckets, newest first within a
    /// bucket. When `folder_filter` is set, only that folder's bucket is
    /// produced and the root bucket stays empty.
    pub fn build(jobs: Vec<Job>, folder_filter: Option<&str>) -> Self {
        let mut view = LibraryView::default();

        let mut completed: Vec<Job> = jobs
            .into_iter()
            .filter(|job| job.status == JobStatus::Completed)
            .collect();
        completed.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        for job in completed {
            match (&job.folder, folder_filter) {
                (Some(folder), Some(filter)) if folder == filter => {
                    view.folders
                        .entry(folder.clone())
                        .or_default()
                        .push(job.into());
                }
                (_, Some(_)) => {}
                (Some(folder), None) => {
                    view.folders
                        .entry(folder.clone())
                        .or_default()
                        .push(job.into());
                }
                (None, None) => view.root.push(job.into()),
            }
        }

        view
    }
}

/// One row of the folder listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FolderSummary {
    pub name: String,
    pub file_count: usize,
}

impl FolderSummary {
    /// Count completed jobs per folder, sorted case-insensitively by name.
    pub fn summarize(jobs: &[Job]) -> Vec<FolderSummary> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for job in jobs {
            if job.status != JobStatus::Completed {
                continue;
            }
            if let Some(folder) = job.folder.as_deref() {
                *counts.entry(folder).or_default() += 1;
            }
        }

        let mut summaries: Vec<FolderSummary> = counts
            .into_iter()
            .map(|(name, file_count)| FolderSummary {
                name: name.to_string(),
                file_count,
            })
            .collect();
        summaries.sort_by_key(|s| s.name.to_lowercase());
        summaries
    }
}

/// Whole-library counters for the stats endpoint.
#[derive(Debug, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LibraryStats {
    pub total_jobs: usize,
    pub completed_jobs: usize,
    pub failed_jobs: usize,
    pub total_size_bytes: i64,
    pub folder_count: usize,
}

impl LibraryStats {
    pub fn collect(jobs: &[Job]) -> Self {
        let mut stats = LibraryStats {
            total_jobs: jobs.len(),
            ..Default::default()
        };
        let mut folders: Vec<&str> = Vec::new();

        for job in jobs {
            match job.status {
                JobStatus::Completed => {
                    stats.completed_jobs += 1;
                    stats.total_size_bytes += job.file_size_bytes.unwrap_or(0);
                    if let Some(folder) = job.folder.as_deref() {
                        if !folders.contains(&folder) {
                            folders.push(folder);
                        }
                    }
                }
                JobStatus::Error => stats.failed_jobs += 1,
                _ => {}
            }
        }

        stats.folder_count = folders.len();
        stats
    }
}
