use super::app_command::RerunTarget;
use crate::error::ModelRunError;
use crate::storage::repository::{AreaRepository, ModelRunRepository};
use log::info;
use sea_orm::ConnectionTrait;

/// Puts runs back in the queue. Returns how many rows were reset.
pub async fn run<C: ConnectionTrait>(db: &C, target: &RerunTarget) -> Result<u64, ModelRunError> {
    let n = match target {
        RerunTarget::Run(id) => {
            let n = ModelRunRepository::reset_to_ready(db, *id).await?;
            if n == 0 {
                return Err(ModelRunError::UnresolvedReference {
                    entity: "model run",
                    id: *id,
                });
            }
            n
        }
        RerunTarget::Area(name) => {
            let area = AreaRepository::find_by_name(db, name).await?.ok_or_else(|| {
                ModelRunError::Internal(format!("no model area named '{}'", name))
            })?;
            ModelRunRepository::reset_model_area(db, area.id).await?
        }
        RerunTarget::All => ModelRunRepository::reset_all(db).await?,
    };
    info!("Requeued {} model runs ({:?})", n, target);
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Fixture, RunSpec};

    #[tokio::test]
    async fn rerun_by_area_name_and_id() {
        let fx = Fixture::seed().await;
        let run = fx.create_run(RunSpec::new(1, 10)).await;
        ModelRunRepository::claim(&fx.db, run.id).await.unwrap();
        ModelRunRepository::mark_complete(&fx.db, run.id).await.unwrap();

        assert_eq!(run_target(&fx, RerunTarget::Run(run.id)).await, 1);
        let reloaded = ModelRunRepository::find(&fx.db, run.id).await.unwrap().unwrap();
        assert!(reloaded.ready && !reloaded.complete);

        assert_eq!(
            run_target(&fx, RerunTarget::Area("Central Valley".into())).await,
            2
        );
        assert_eq!(run_target(&fx, RerunTarget::All).await, 2);
    }

    async fn run_target(fx: &Fixture, target: RerunTarget) -> u64 {
        run(&fx.db, &target).await.unwrap()
    }

    #[tokio::test]
    async fn unknown_targets_are_errors() {
        let fx = Fixture::seed().await;
        assert!(run(&fx.db, &RerunTarget::Run(4040)).await.is_err());
        assert!(run(&fx.db, &RerunTarget::Area("Nowhere".into())).await.is_err());
    }
}
