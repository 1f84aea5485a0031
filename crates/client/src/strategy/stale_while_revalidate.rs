use rinkorea_core::{Error, PartitionKind, StoredResponse, WorkerRequest};

use super::{Handled, StrategyContext};

/// Serve the cached entry immediately and refresh it in the background.
/// With nothing cached the caller waits for that same fetch.
pub async fn stale_while_revalidate(
    ctx: &StrategyContext, partition: PartitionKind, request: &WorkerRequest,
) -> Result<Handled, Error> {
    let cached = ctx.lookup(partition, request).await?;

    if let Some(cached) = cached {
        let ctx = ctx.clone();
        let request = request.clone();
        let revalidation = tokio::spawn(async move {
            if let Err(e) = revalidate(&ctx, partition, &request).await {
                tracing::warn!(url = %request.url, error = %e, "background revalidation could not update cache");
            }
        });

        let mut handled = Handled::cached(cached);
        handled.revalidation = Some(revalidation);
        return Ok(handled);
    }

    Ok(match revalidate(ctx, partition, request).await? {
        Some(response) => Handled::network(response),
        None => Handled::none(),
    })
}

/// Fetch and store a 2xx result. `Ok(None)` means the network failed.
async fn revalidate(
    ctx: &StrategyContext, partition: PartitionKind, request: &WorkerRequest,
) -> Result<Option<StoredResponse>, Error> {
    match ctx.network.fetch(request).await {
        Ok(response) => {
            if response.is_success() {
                ctx.partition(partition).put(request, &response).await?;
            }
            Ok(Some(response))
        }
        Err(e) => {
            tracing::debug!(url = %request.url, error = %e, "revalidation fetch failed");
            Ok(None)
        }
    }
}
