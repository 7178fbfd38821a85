pub mod frame_annotator;
pub mod frame_orchestrator;
pub mod infrastructure;
pub mod model_slot;
pub mod pipeline_executor;
pub mod pipeline_logger;
pub mod retrain_worker;
pub mod tracking_ledger;
