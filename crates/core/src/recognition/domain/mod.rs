pub mod face_classifier;
pub mod face_sample;
pub mod label_catalog;
pub mod recognition_gate;
pub mod recognition_model;
