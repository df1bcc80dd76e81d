use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionError, TransactionTrait};
use std::future::Future;
use std::pin::Pin;

use crate::errors::ServiceError;

/// Type alias for boxed future used in transactions
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Runs `f` inside a database transaction.
///
/// The transaction commits when `f` returns `Ok` and rolls back otherwise.
/// Unlike a plain `DbErr` round-trip, the `ServiceError` produced by `f`
/// comes back unchanged, so a rejected gallery update is still an
/// `InvalidGallery` after the rollback.
///
/// ```rust,ignore
/// let photo = in_transaction(&db, |txn| {
///     Box::pin(async move {
///         let photo = product_photo::Entity::find_by_id(id).one(txn).await?;
///         Ok(photo)
///     })
/// })
/// .await?;
/// ```
pub async fn in_transaction<F, T>(db: &DatabaseConnection, f: F) -> Result<T, ServiceError>
where
    F: for<'a> FnOnce(&'a DatabaseTransaction) -> BoxFuture<'a, Result<T, ServiceError>> + Send,
    T: Send,
{
    db.transaction::<_, T, ServiceError>(f)
        .await
        .map_err(|e| match e {
            TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
            TransactionError::Transaction(err) => err,
        })
}
