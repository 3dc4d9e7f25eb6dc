pub mod consolidation;
pub mod engine;
pub mod join;
pub mod layouts;
pub mod models;

#[cfg(test)]
mod tests;
