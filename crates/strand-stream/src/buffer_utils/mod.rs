mod batching;

pub use batching::PartBatcher;
