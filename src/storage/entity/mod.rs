pub mod calibrated_parameter;
pub mod calibration_set;
pub mod crop;
pub mod crop_group;
pub mod crop_modification;
pub mod infeasibility;
pub mod input_data_item;
pub mod input_data_set;
pub mod model_area;
pub mod model_run;
pub mod organization;
pub mod rainfall_parameter;
pub mod rainfall_result;
pub mod rainfall_set;
pub mod region;
pub mod region_group;
pub mod region_modification;
pub mod result;
pub mod result_set;

pub use model_run::Entity as ModelRun;
pub use region_modification::ModeledType;
pub use result_set::Entity as ResultSet;
