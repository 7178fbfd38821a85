pub mod lbph_classifier;
