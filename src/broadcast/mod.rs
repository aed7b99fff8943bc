pub mod coordinator;
pub mod dispatcher;
pub mod pool;
pub mod recipients;
pub mod suppression;
