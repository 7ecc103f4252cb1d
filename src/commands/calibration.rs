use crate::error::ModelRunError;
use crate::storage::repository::{AreaRepository, ModelRunRepository};
use log::info;
use sea_orm::{DatabaseConnection, TransactionTrait};

/// Moves every run from `old_set_id` to `new_set_id`, requeues them and
/// deletes the old set. Both sets must belong to the same model area.
pub async fn replace(
    db: &DatabaseConnection,
    old_set_id: i32,
    new_set_id: i32,
) -> Result<u64, ModelRunError> {
    if old_set_id == new_set_id {
        return Err(ModelRunError::Internal(
            "old and new calibration sets are the same".to_string(),
        ));
    }
    let old = AreaRepository::calibration_set(db, old_set_id)
        .await?
        .ok_or(ModelRunError::UnresolvedReference {
            entity: "calibration set",
            id: old_set_id,
        })?;
    let new = AreaRepository::calibration_set(db, new_set_id)
        .await?
        .ok_or(ModelRunError::UnresolvedReference {
            entity: "calibration set",
            id: new_set_id,
        })?;
    if old.model_area_id != new.model_area_id {
        return Err(ModelRunError::Internal(format!(
            "calibration set {} belongs to model area {}, set {} to {}",
            old.id, old.model_area_id, new.id, new.model_area_id
        )));
    }

    let txn = db.begin().await?;
    let moved = ModelRunRepository::repoint_calibration_set(&txn, old.id, new.id).await?;
    AreaRepository::delete_calibration_set(&txn, old.id).await?;
    txn.commit().await?;

    info!(
        "Replaced calibration set {} with {}: {} model runs requeued",
        old.id, new.id, moved
    );
    Ok(moved)
}
