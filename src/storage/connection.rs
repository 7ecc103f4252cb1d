use crate::storage::entity::{
    calibrated_parameter, calibration_set, crop, crop_group, crop_modification, infeasibility,
    input_data_item, input_data_set, model_area, model_run, organization, rainfall_parameter,
    rainfall_result, rainfall_set, region, region_group, region_modification, result, result_set,
};
use log::info;
use sea_orm::sea_query::TableCreateStatement;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, DbErr,
    EntityTrait, Schema, Statement,
};
use std::time::Duration;

pub async fn establish_connection(db_url: &str) -> Result<DatabaseConnection, DbErr> {
    let in_memory = db_url.contains(":memory:");
    let mut opt = ConnectOptions::new(db_url.to_owned());
    if in_memory {
        // every pooled connection would otherwise open its own empty database
        opt.max_connections(1).min_connections(1);
    } else {
        opt.max_connections(10)
            .min_connections(2)
            .connect_timeout(Duration::from_secs(8))
            .acquire_timeout(Duration::from_secs(8))
            .idle_timeout(Duration::from_secs(60))
            .max_lifetime(Duration::from_secs(600));
    }
    opt.sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Debug);

    let db = Database::connect(opt).await?;

    if db.get_database_backend() == DatabaseBackend::Sqlite && !in_memory {
        db.execute(Statement::from_string(
            DatabaseBackend::Sqlite,
            "PRAGMA journal_mode=WAL;".to_string(),
        ))
        .await?;
    }

    create_tables(&db).await?;

    info!("Database connection established and tables initialized.");
    Ok(db)
}

async fn create_tables(db: &DatabaseConnection) -> Result<(), DbErr> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let statements: Vec<TableCreateStatement> = vec![
        create_stmt(&schema, organization::Entity),
        create_stmt(&schema, model_area::Entity),
        create_stmt(&schema, region_group::Entity),
        create_stmt(&schema, region::Entity),
        create_stmt(&schema, crop_group::Entity),
        create_stmt(&schema, crop::Entity),
        create_stmt(&schema, calibration_set::Entity),
        create_stmt(&schema, calibrated_parameter::Entity),
        create_stmt(&schema, input_data_set::Entity),
        create_stmt(&schema, input_data_item::Entity),
        create_stmt(&schema, rainfall_set::Entity),
        create_stmt(&schema, rainfall_parameter::Entity),
        create_stmt(&schema, model_run::Entity),
        create_stmt(&schema, region_modification::Entity),
        create_stmt(&schema, crop_modification::Entity),
        create_stmt(&schema, result_set::Entity),
        create_stmt(&schema, result::Entity),
        create_stmt(&schema, rainfall_result::Entity),
        create_stmt(&schema, infeasibility::Entity),
    ];
    for stmt in statements {
        db.execute(builder.build(&stmt)).await?;
    }

    // the scheduler polls on these three flags every few seconds
    db.execute(Statement::from_string(
        builder,
        "CREATE INDEX IF NOT EXISTS idx_model_runs_state ON model_runs(ready, running, complete);"
            .to_string(),
    ))
    .await?;
    db.execute(Statement::from_string(
        builder,
        "CREATE INDEX IF NOT EXISTS idx_results_set_region ON results(result_set_id, region_id, year);"
            .to_string(),
    ))
    .await?;

    Ok(())
}

fn create_stmt<E: EntityTrait>(schema: &Schema, entity: E) -> TableCreateStatement {
    schema
        .create_table_from_entity(entity)
        .if_not_exists()
        .to_owned()
}
