pub mod data_folder;
pub mod domain;
pub mod infrastructure;
pub mod model_trainer;
