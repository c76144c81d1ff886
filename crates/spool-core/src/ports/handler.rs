//! Callback ports: the caller-supplied `onProcess` / `onFailure` pair.

use std::future::Future;

use async_trait::async_trait;

use crate::domain::ProcessError;
use crate::error::BoxError;
use crate::queue::Record;

/// Processes one record.
///
/// Return `Ok(())` on success, [`skip`](crate::domain::skip) to defer,
/// [`fail`](crate::domain::fail) to give up immediately, or any other error to
/// retry with backoff.
///
/// # 使用例
/// ```ignore
/// struct Upload;
///
/// #[async_trait]
/// impl RecordProcessor<Payload> for Upload {
///     async fn process(&self, record: &Record<Payload>) -> Result<(), ProcessError> {
///         client.post(&record.data).await?;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait RecordProcessor<T: Sync>: Send + Sync {
    async fn process(&self, record: &Record<T>) -> Result<(), ProcessError>;
}

/// Told once about a record that will not be processed any further.
///
/// An error here is recorded on the record (`notifyFailure`) and never
/// stops the batch.
#[async_trait]
pub trait FailureNotifier<T: Sync>: Send + Sync {
    async fn notify(&self, record: &Record<T>) -> Result<(), BoxError>;
}

/// Notifier used when none is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl<T: Sync> FailureNotifier<T> for NoopNotifier {
    async fn notify(&self, _record: &Record<T>) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Adapter turning an async closure into a [`RecordProcessor`].
///
/// The closure receives an owned copy of the record.
pub struct FnProcessor<F>(F);

pub fn fn_processor<T, F, Fut>(f: F) -> FnProcessor<F>
where
    F: Fn(Record<T>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), ProcessError>> + Send,
{
    FnProcessor(f)
}

#[async_trait]
impl<T, F, Fut> RecordProcessor<T> for FnProcessor<F>
where
    T: Clone + Send + Sync + 'static,
    F: Fn(Record<T>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), ProcessError>> + Send,
{
    async fn process(&self, record: &Record<T>) -> Result<(), ProcessError> {
        (self.0)(record.clone()).await
    }
}

/// Adapter turning an async closure into a [`FailureNotifier`].
pub struct FnNotifier<F>(F);

pub fn fn_notifier<T, F, Fut>(f: F) -> FnNotifier<F>
where
    F: Fn(Record<T>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), BoxError>> + Send,
{
    FnNotifier(f)
}

#[async_trait]
impl<T, F, Fut> FailureNotifier<T> for FnNotifier<F>
where
    T: Clone + Send + Sync + 'static,
    F: Fn(Record<T>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), BoxError>> + Send,
{
    async fn notify(&self, record: &Record<T>) -> Result<(), BoxError> {
        (self.0)(record.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RecordId, fail};
    use crate::queue::NewRecord;
    use chrono::Utc;
    use ulid::Ulid;

    fn record(data: u32) -> Record<u32> {
        NewRecord::received(data, Utc::now()).with_id(RecordId::from_ulid(Ulid::new()))
    }

    #[tokio::test]
    async fn closure_processor_sees_payload() {
        let processor = fn_processor(|record: Record<u32>| async move {
            if record.data % 2 == 0 {
                Ok(())
            } else {
                Err(fail("odd payload"))
            }
        });

        assert!(processor.process(&record(2)).await.is_ok());
        assert!(matches!(
            processor.process(&record(3)).await,
            Err(ProcessError::Fail { .. })
        ));
    }

    #[tokio::test]
    async fn closure_notifier_errors_are_returned() {
        let notifier = fn_notifier(|_record: Record<u32>| async move {
            Err::<(), BoxError>("mailer down".into())
        });
        let err = notifier.notify(&record(1)).await.unwrap_err();
        assert_eq!(err.to_string(), "mailer down");

        assert!(FailureNotifier::<u32>::notify(&NoopNotifier, &record(1)).await.is_ok());
    }
}
