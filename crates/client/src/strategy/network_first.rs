use rinkorea_core::{Error, PartitionKind, WorkerRequest};

use super::{Handled, StrategyContext, offline};

/// Fetch first and store 2xx responses before returning them. The cache is
/// consulted only when the fetch fails or resolves outside 2xx.
pub async fn network_first(
    ctx: &StrategyContext, partition: PartitionKind, request: &WorkerRequest,
) -> Result<Handled, Error> {
    let upstream = match ctx.network.fetch(request).await {
        Ok(response) if response.is_success() => {
            ctx.partition(partition).put(request, &response).await?;
            return Ok(Handled::network(response));
        }
        Ok(response) => {
            tracing::debug!(url = %request.url, status = response.status.as_u16(), "network-first got unsuccessful response");
            Some(response)
        }
        Err(e) => {
            tracing::warn!(url = %request.url, error = %e, "network-first fetch failed, trying cache");
            None
        }
    };

    if let Some(cached) = ctx.lookup(partition, request).await? {
        return Ok(Handled::cached(cached));
    }

    Ok(match upstream {
        Some(response) => Handled::network(response),
        None => Handled::offline(offline::offline_json()),
    })
}
