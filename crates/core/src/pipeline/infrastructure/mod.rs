pub mod blocking_pipeline_executor;
pub mod threaded_pipeline_executor;

#[cfg(test)]
mod test_support;
