//! Cooperative cancellation helpers.

use std::future::Future;

use game_advisor_core::{AdvisorError, AdvisorResult};
use tokio_util::sync::CancellationToken;

/// Race `fut` against `token`. A token that is already cancelled wins
/// without polling the future.
pub async fn cancellable<F, T>(token: &CancellationToken, fut: F) -> AdvisorResult<T>
where
    F: Future<Output = AdvisorResult<T>>,
{
    if token.is_cancelled() {
        return Err(AdvisorError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(AdvisorError::Cancelled),
        result = fut => result,
    }
}

/// Fail fast between stages.
pub fn check_cancelled(token: &CancellationToken) -> AdvisorResult<()> {
    if token.is_cancelled() {
        Err(AdvisorError::Cancelled)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_completes_when_not_cancelled() {
        let token = CancellationToken::new();
        let value = cancellable(&token, async { Ok::<_, AdvisorError>(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_precancelled_token_short_circuits() {
        let token = CancellationToken::new();
        token.cancel();
        let result = cancellable(&token, async { Ok::<_, AdvisorError>(()) }).await;
        assert!(matches!(result, Err(AdvisorError::Cancelled)));
        assert!(check_cancelled(&token).is_err());
    }

    #[tokio::test]
    async fn test_cancel_interrupts_pending_future() {
        let token = CancellationToken::new();
        let child = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            child.cancel();
        });
        let result = cancellable(&token, async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok::<_, AdvisorError>(())
        })
        .await;
        assert!(result.unwrap_err().is_cancelled());
    }
}
