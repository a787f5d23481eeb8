pub mod dynamo_store;

pub use dynamo_store::DynamoStore;
