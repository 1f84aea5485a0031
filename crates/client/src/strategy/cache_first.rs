use rinkorea_core::{Error, PartitionKind, WorkerRequest};

use super::{Handled, StrategyContext, offline};

/// Serve from cache; on a miss fetch, store 2xx responses and return.
pub async fn cache_first(ctx: &StrategyContext, partition: PartitionKind, request: &WorkerRequest) -> Result<Handled, Error> {
    if let Some(cached) = ctx.lookup(partition, request).await? {
        return Ok(Handled::cached(cached));
    }

    match ctx.network.fetch(request).await {
        Ok(response) => {
            if response.is_success() {
                ctx.partition(partition).put(request, &response).await?;
            }
            Ok(Handled::network(response))
        }
        Err(e) => {
            tracing::warn!(url = %request.url, error = %e, "cache-first fetch failed with nothing cached");
            Ok(Handled::offline(offline::offline_text()))
        }
    }
}
