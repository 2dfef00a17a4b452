use std::future::Future;

use tracing::debug;

/// Bounds for [`auto_paginate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageOptions {
    pub page_size: usize,
    pub max_records: usize,
    /// Hard stop against runaway loops.
    pub max_pages: usize,
}

/// Fetches pages at increasing offsets and concatenates them.
///
/// Stops on a short page, once `max_records` rows are collected, or after
/// `max_pages` requests. The result never exceeds `max_records`.
///
/// # Errors
/// Returns the first error produced by `fetch_page`.
pub async fn auto_paginate<T, E, F, Fut>(options: PageOptions, mut fetch_page: F) -> Result<Vec<T>, E>
where
    F: FnMut(usize, usize) -> Fut,
    Fut: Future<Output = Result<Vec<T>, E>>,
{
    let page_size = options.page_size.max(1);
    let mut records = Vec::new();
    let mut offset = 0;

    for page in 0..options.max_pages {
        if records.len() >= options.max_records {
            break;
        }
        let batch = fetch_page(offset, page_size).await?;
        let received = batch.len();
        records.extend(batch);
        offset += page_size;
        debug!(page, received, total = records.len(), "fetched page");
        if received < page_size {
            break;
        }
    }

    records.truncate(options.max_records);
    Ok(records)
}
