use crate::scheduler::RunStats;
use crate::storage::entity::model_run::{self, Entity as ModelRun};
use crate::storage::entity::calibration_set;
use chrono::Utc;
use log::warn;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DatabaseBackend, DbErr, EntityTrait,
    FromQueryResult, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Statement,
};
use std::collections::HashMap;

#[derive(Debug, FromQueryResult)]
struct RankedRun {
    id: i32,
}

#[derive(Debug, FromQueryResult)]
struct SqliteVersion {
    version: String,
}

pub struct ModelRunRepository;

impl ModelRunRepository {
    pub async fn find<C: ConnectionTrait>(
        db: &C,
        id: i32,
    ) -> Result<Option<model_run::Model>, DbErr> {
        ModelRun::find_by_id(id).one(db).await
    }

    pub async fn exists<C: ConnectionTrait>(db: &C, id: i32) -> Result<bool, DbErr> {
        Ok(ModelRun::find()
            .filter(model_run::Column::Id.eq(id))
            .count(db)
            .await?
            > 0)
    }

    fn eligible() -> Condition {
        Condition::all()
            .add(model_run::Column::Ready.eq(true))
            .add(model_run::Column::Running.eq(false))
            .add(model_run::Column::Complete.eq(false))
    }

    /// Whether the store can answer the per-user RANK() query.
    /// SQLite gained window functions in 3.25.
    pub async fn supports_windowed_ranking<C: ConnectionTrait>(db: &C) -> bool {
        match db.get_database_backend() {
            DatabaseBackend::Postgres => true,
            DatabaseBackend::Sqlite => {
                let row = SqliteVersion::find_by_statement(Statement::from_string(
                    DatabaseBackend::Sqlite,
                    "SELECT sqlite_version() AS version".to_string(),
                ))
                .one(db)
                .await;
                match row {
                    Ok(Some(v)) => sqlite_has_window_functions(&v.version),
                    Ok(None) => false,
                    Err(e) => {
                        warn!("Could not read SQLite version, assuming no window functions: {}", e);
                        false
                    }
                }
            }
            DatabaseBackend::MySql => false,
        }
    }

    /// Eligible runs ranked inside each user's own queue (rank 1 = that user's
    /// oldest), then ordered by rank and submission time. At most `window` runs.
    pub async fn ready_runs_ranked<C: ConnectionTrait>(
        db: &C,
        window: u64,
    ) -> Result<Vec<model_run::Model>, DbErr> {
        let sql = format!(
            "SELECT id FROM (\
                SELECT id, date_submitted, \
                       RANK() OVER (PARTITION BY user_id ORDER BY date_submitted ASC, id ASC) AS user_rank \
                FROM model_runs \
                WHERE ready = TRUE AND running = FALSE AND complete = FALSE\
             ) ranked \
             ORDER BY user_rank ASC, date_submitted ASC, id ASC \
             LIMIT {}",
            window
        );
        let ranked = RankedRun::find_by_statement(Statement::from_string(
            db.get_database_backend(),
            sql,
        ))
        .all(db)
        .await?;
        let order: Vec<i32> = ranked.into_iter().map(|r| r.id).collect();
        if order.is_empty() {
            return Ok(Vec::new());
        }

        let mut by_id: HashMap<i32, model_run::Model> = ModelRun::find()
            .filter(model_run::Column::Id.is_in(order.clone()))
            .all(db)
            .await?
            .into_iter()
            .map(|m| (m.id, m))
            .collect();
        Ok(order.into_iter().filter_map(|id| by_id.remove(&id)).collect())
    }

    /// Plain submission order, uncapped. Used when ranking is unavailable.
    pub async fn ready_runs_fifo<C: ConnectionTrait>(
        db: &C,
    ) -> Result<Vec<model_run::Model>, DbErr> {
        ModelRun::find()
            .filter(Self::eligible())
            .order_by_asc(model_run::Column::DateSubmitted)
            .order_by_asc(model_run::Column::Id)
            .all(db)
            .await
    }

    /// Marks the run running only if it is still eligible. Returns false when
    /// some other pass got there first (or the run was reset/deleted).
    pub async fn claim<C: ConnectionTrait>(db: &C, id: i32) -> Result<bool, DbErr> {
        let res = ModelRun::update_many()
            .col_expr(model_run::Column::Running, Expr::value(true))
            .col_expr(
                model_run::Column::StatusMessage,
                Expr::value(Some("running".to_string())),
            )
            .filter(model_run::Column::Id.eq(id))
            .filter(Self::eligible())
            .exec(db)
            .await?;
        Ok(res.rows_affected == 1)
    }

    /// Clears the running flag after a failed or discarded attempt. The run
    /// stays ready and incomplete, so the next poll picks it up again.
    pub async fn release<C: ConnectionTrait>(
        db: &C,
        id: i32,
        status_message: Option<String>,
    ) -> Result<(), DbErr> {
        let mut update = ModelRun::update_many()
            .col_expr(model_run::Column::Running, Expr::value(false));
        if let Some(msg) = status_message {
            update = update.col_expr(model_run::Column::StatusMessage, Expr::value(Some(msg)));
        }
        update
            .filter(model_run::Column::Id.eq(id))
            .exec(db)
            .await?;
        Ok(())
    }

    /// Completes a run this process still holds. Returns false when the run
    /// was reset or deleted while it was running; nothing is changed then.
    pub async fn mark_complete<C: ConnectionTrait>(db: &C, id: i32) -> Result<bool, DbErr> {
        let now = Utc::now().timestamp_millis();
        let res = ModelRun::update_many()
            .col_expr(model_run::Column::Running, Expr::value(false))
            .col_expr(model_run::Column::Complete, Expr::value(true))
            .col_expr(model_run::Column::DateCompleted, Expr::value(Some(now)))
            .col_expr(
                model_run::Column::StatusMessage,
                Expr::value(Some("complete".to_string())),
            )
            .filter(model_run::Column::Id.eq(id))
            .filter(model_run::Column::Running.eq(true))
            .exec(db)
            .await?;
        Ok(res.rows_affected == 1)
    }

    fn reset_update() -> sea_orm::UpdateMany<ModelRun> {
        ModelRun::update_many()
            .col_expr(model_run::Column::Ready, Expr::value(true))
            .col_expr(model_run::Column::Running, Expr::value(false))
            .col_expr(model_run::Column::Complete, Expr::value(false))
            .col_expr(
                model_run::Column::StatusMessage,
                Expr::value(Some("queued".to_string())),
            )
    }

    pub async fn reset_to_ready<C: ConnectionTrait>(db: &C, id: i32) -> Result<u64, DbErr> {
        let res = Self::reset_update()
            .filter(model_run::Column::Id.eq(id))
            .exec(db)
            .await?;
        Ok(res.rows_affected)
    }

    pub async fn reset_model_area<C: ConnectionTrait>(
        db: &C,
        model_area_id: i32,
    ) -> Result<u64, DbErr> {
        let set_ids: Vec<i32> = calibration_set::Entity::find()
            .filter(calibration_set::Column::ModelAreaId.eq(model_area_id))
            .select_only()
            .column(calibration_set::Column::Id)
            .into_tuple()
            .all(db)
            .await?;
        if set_ids.is_empty() {
            return Ok(0);
        }
        let res = Self::reset_update()
            .filter(model_run::Column::CalibrationSetId.is_in(set_ids))
            .exec(db)
            .await?;
        Ok(res.rows_affected)
    }

    pub async fn reset_all<C: ConnectionTrait>(db: &C) -> Result<u64, DbErr> {
        let res = Self::reset_update().exec(db).await?;
        Ok(res.rows_affected)
    }

    /// Runs left marked running by a process that died mid-run.
    pub async fn reset_stale_running<C: ConnectionTrait>(db: &C) -> Result<u64, DbErr> {
        let res = ModelRun::update_many()
            .col_expr(model_run::Column::Running, Expr::value(false))
            .col_expr(
                model_run::Column::StatusMessage,
                Expr::value(Some("queued".to_string())),
            )
            .filter(model_run::Column::Running.eq(true))
            .exec(db)
            .await?;
        Ok(res.rows_affected)
    }

    /// Points every run on `old_set_id` at `new_set_id` and queues it again.
    pub async fn repoint_calibration_set<C: ConnectionTrait>(
        db: &C,
        old_set_id: i32,
        new_set_id: i32,
    ) -> Result<u64, DbErr> {
        let res = Self::reset_update()
            .col_expr(model_run::Column::CalibrationSetId, Expr::value(new_set_id))
            .filter(model_run::Column::CalibrationSetId.eq(old_set_id))
            .exec(db)
            .await?;
        Ok(res.rows_affected)
    }

    /// The run's explicit base run, or else the organization's designated
    /// base run inside the same model area.
    pub async fn find_base_run<C: ConnectionTrait>(
        db: &C,
        run: &model_run::Model,
        model_area_id: i32,
    ) -> Result<Option<model_run::Model>, DbErr> {
        if let Some(base_id) = run.base_model_run_id {
            return ModelRun::find_by_id(base_id).one(db).await;
        }
        let set_ids: Vec<i32> = calibration_set::Entity::find()
            .filter(calibration_set::Column::ModelAreaId.eq(model_area_id))
            .select_only()
            .column(calibration_set::Column::Id)
            .into_tuple()
            .all(db)
            .await?;
        ModelRun::find()
            .filter(model_run::Column::IsBase.eq(true))
            .filter(model_run::Column::OrganizationId.eq(run.organization_id))
            .filter(model_run::Column::CalibrationSetId.is_in(set_ids))
            .filter(model_run::Column::Id.ne(run.id))
            .order_by_desc(model_run::Column::Id)
            .one(db)
            .await
    }

    pub async fn get_stats<C: ConnectionTrait>(db: &C) -> Result<RunStats, DbErr> {
        let total = ModelRun::find().count(db).await? as usize;
        let pending = ModelRun::find()
            .filter(model_run::Column::Ready.eq(false))
            .count(db)
            .await? as usize;
        let ready = ModelRun::find()
            .filter(Self::eligible())
            .count(db)
            .await? as usize;
        let running = ModelRun::find()
            .filter(model_run::Column::Running.eq(true))
            .count(db)
            .await? as usize;
        let complete = ModelRun::find()
            .filter(model_run::Column::Complete.eq(true))
            .count(db)
            .await? as usize;
        Ok(RunStats {
            total,
            pending,
            ready,
            running,
            complete,
        })
    }
}

fn sqlite_has_window_functions(version: &str) -> bool {
    let mut parts = version.split('.').map(|p| p.parse::<u32>().unwrap_or(0));
    let major = parts.next().unwrap_or(0);
    let minor = parts.next().unwrap_or(0);
    (major, minor) >= (3, 25)
}
