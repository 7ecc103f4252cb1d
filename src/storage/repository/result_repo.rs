use crate::storage::entity::{infeasibility, rainfall_result, result, result_set};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder,
};

const INSERT_CHUNK: usize = 500;

pub struct ResultRepository;

impl ResultRepository {
    pub async fn create_set<C: ConnectionTrait>(
        db: &C,
        model_run_id: i32,
        engine_version: &str,
    ) -> Result<result_set::Model, DbErr> {
        result_set::ActiveModel {
            model_run_id: Set(model_run_id),
            created_at: Set(Utc::now().timestamp_millis()),
            in_calibration: Set(true),
            engine_version: Set(engine_version.to_string()),
            infeasibilities_text: Set(String::new()),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    pub async fn insert_results<C: ConnectionTrait>(
        db: &C,
        rows: Vec<result::ActiveModel>,
    ) -> Result<(), DbErr> {
        let mut rows = rows.into_iter().peekable();
        while rows.peek().is_some() {
            let chunk: Vec<_> = rows.by_ref().take(INSERT_CHUNK).collect();
            result::Entity::insert_many(chunk).exec(db).await?;
        }
        Ok(())
    }

    pub async fn insert_rainfall_results<C: ConnectionTrait>(
        db: &C,
        rows: Vec<rainfall_result::ActiveModel>,
    ) -> Result<(), DbErr> {
        let mut rows = rows.into_iter().peekable();
        while rows.peek().is_some() {
            let chunk: Vec<_> = rows.by_ref().take(INSERT_CHUNK).collect();
            rainfall_result::Entity::insert_many(chunk).exec(db).await?;
        }
        Ok(())
    }

    pub async fn insert_infeasibilities<C: ConnectionTrait>(
        db: &C,
        rows: Vec<infeasibility::ActiveModel>,
    ) -> Result<(), DbErr> {
        let mut rows = rows.into_iter().peekable();
        while rows.peek().is_some() {
            let chunk: Vec<_> = rows.by_ref().take(INSERT_CHUNK).collect();
            infeasibility::Entity::insert_many(chunk).exec(db).await?;
        }
        Ok(())
    }

    pub async fn finish_set<C: ConnectionTrait>(
        db: &C,
        result_set_id: i32,
        in_calibration: bool,
        infeasibilities_text: String,
    ) -> Result<(), DbErr> {
        result_set::Entity::update_many()
            .col_expr(result_set::Column::InCalibration, Expr::value(in_calibration))
            .col_expr(
                result_set::Column::InfeasibilitiesText,
                Expr::value(infeasibilities_text),
            )
            .filter(result_set::Column::Id.eq(result_set_id))
            .exec(db)
            .await?;
        Ok(())
    }

    pub async fn find_set<C: ConnectionTrait>(
        db: &C,
        id: i32,
    ) -> Result<Option<result_set::Model>, DbErr> {
        result_set::Entity::find_by_id(id).one(db).await
    }

    pub async fn latest_for_run<C: ConnectionTrait>(
        db: &C,
        model_run_id: i32,
    ) -> Result<Option<result_set::Model>, DbErr> {
        result_set::Entity::find()
            .filter(result_set::Column::ModelRunId.eq(model_run_id))
            .order_by_desc(result_set::Column::CreatedAt)
            .order_by_desc(result_set::Column::Id)
            .one(db)
            .await
    }

    pub async fn results_for_set<C: ConnectionTrait>(
        db: &C,
        result_set_id: i32,
    ) -> Result<Vec<result::Model>, DbErr> {
        result::Entity::find()
            .filter(result::Column::ResultSetId.eq(result_set_id))
            .order_by_asc(result::Column::Id)
            .all(db)
            .await
    }

    pub async fn infeasibilities_for_set<C: ConnectionTrait>(
        db: &C,
        result_set_id: i32,
    ) -> Result<Vec<infeasibility::Model>, DbErr> {
        infeasibility::Entity::find()
            .filter(infeasibility::Column::ResultSetId.eq(result_set_id))
            .order_by_asc(infeasibility::Column::Id)
            .all(db)
            .await
    }

    pub async fn count_sets_for_run<C: ConnectionTrait>(
        db: &C,
        model_run_id: i32,
    ) -> Result<u64, DbErr> {
        result_set::Entity::find()
            .filter(result_set::Column::ModelRunId.eq(model_run_id))
            .count(db)
            .await
    }

    /// Deletes a result set and every row hanging off it.
    pub async fn delete_set<C: ConnectionTrait>(db: &C, result_set_id: i32) -> Result<(), DbErr> {
        result::Entity::delete_many()
            .filter(result::Column::ResultSetId.eq(result_set_id))
            .exec(db)
            .await?;
        rainfall_result::Entity::delete_many()
            .filter(rainfall_result::Column::ResultSetId.eq(result_set_id))
            .exec(db)
            .await?;
        infeasibility::Entity::delete_many()
            .filter(infeasibility::Column::ResultSetId.eq(result_set_id))
            .exec(db)
            .await?;
        result_set::Entity::delete_by_id(result_set_id)
            .exec(db)
            .await?;
        Ok(())
    }

    /// Keeps only `keep_id` among the run's result sets.
    pub async fn delete_other_sets<C: ConnectionTrait>(
        db: &C,
        model_run_id: i32,
        keep_id: i32,
    ) -> Result<usize, DbErr> {
        let stale = result_set::Entity::find()
            .filter(result_set::Column::ModelRunId.eq(model_run_id))
            .filter(result_set::Column::Id.ne(keep_id))
            .all(db)
            .await?;
        for set in &stale {
            Self::delete_set(db, set.id).await?;
        }
        Ok(stale.len())
    }
}
