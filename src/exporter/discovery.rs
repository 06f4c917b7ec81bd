//! Work hierarchy discovery
//!
//! Walks team → spaces → (direct lists, folders → lists) and returns every
//! list exactly once, annotated with its space and folder. Requests within a
//! level run concurrently without a cap; the hierarchy is small next to the
//! per-list work.

use futures::future::try_join_all;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::fetcher::{ClickUpApi, FetcherResult};
use crate::{EntityRef, Space, WorkList};

/// Result of a discovery pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Discovery {
    /// Distinct lists, direct lists of every space first, then folder lists
    pub lists: Vec<WorkList>,
    /// Distinct member ids of all spaces, in first-seen order
    pub member_ids: Vec<String>,
}

/// Space/folder/list walker
pub struct TreeDiscoverer {
    api: Arc<dyn ClickUpApi>,
}

impl TreeDiscoverer {
    /// Create a discoverer over `api`
    pub fn new(api: Arc<dyn ClickUpApi>) -> Self {
        Self { api }
    }

    /// Discover every list of a team
    ///
    /// # Errors
    /// The first failing request fails the whole discovery.
    pub async fn discover(&self, team_id: &str) -> FetcherResult<Discovery> {
        let spaces = self.api.get_spaces(team_id).await?;
        debug!(team_id = team_id, spaces = spaces.len(), "Fetched spaces");

        let member_ids = distinct(spaces.iter().flat_map(|s| s.member_ids.iter().cloned()));

        let (direct, nested) = futures::try_join!(
            try_join_all(spaces.iter().map(|space| self.direct_lists(space))),
            try_join_all(spaces.iter().map(|space| self.folder_lists(space))),
        )?;

        let found = direct.iter().map(Vec::len).sum::<usize>() + nested.iter().map(Vec::len).sum::<usize>();
        let lists = dedup_lists(direct.into_iter().flatten().chain(nested.into_iter().flatten()));

        info!(
            team_id = team_id,
            spaces = spaces.len(),
            lists = lists.len(),
            duplicates = found - lists.len(),
            members = member_ids.len(),
            "Discovery complete"
        );

        Ok(Discovery { lists, member_ids })
    }

    async fn direct_lists(&self, space: &Space) -> FetcherResult<Vec<WorkList>> {
        let lists = self.api.get_space_lists(&space.id).await?;
        Ok(lists
            .into_iter()
            .map(|list| WorkList::new(list, space.entity(), None))
            .collect())
    }

    async fn folder_lists(&self, space: &Space) -> FetcherResult<Vec<WorkList>> {
        let folders = self.api.get_folders(&space.id).await?;

        let per_folder = try_join_all(folders.iter().map(|folder| async move {
            let lists = self.api.get_folder_lists(&folder.id).await?;
            let folder_ref = EntityRef::new(&folder.id, &folder.name);
            Ok::<_, crate::fetcher::FetcherError>(
                lists
                    .into_iter()
                    .map(|list| WorkList::new(list, space.entity(), Some(folder_ref.clone())))
                    .collect::<Vec<_>>(),
            )
        }))
        .await?;

        Ok(per_folder.into_iter().flatten().collect())
    }
}

/// Keep the first occurrence of every list id
pub fn dedup_lists(lists: impl IntoIterator<Item = WorkList>) -> Vec<WorkList> {
    let mut seen = HashSet::new();
    lists
        .into_iter()
        .filter(|list| seen.insert(list.id.clone()))
        .collect()
}

fn distinct(ids: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.filter(|id| seen.insert(id.clone())).collect()
}
