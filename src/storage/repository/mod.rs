pub mod area_repo;
pub mod model_run_repo;
pub mod modification_repo;
pub mod result_repo;

pub use area_repo::{AreaCatalog, AreaRepository};
pub use model_run_repo::ModelRunRepository;
pub use modification_repo::ModificationRepository;
pub use result_repo::ResultRepository;
