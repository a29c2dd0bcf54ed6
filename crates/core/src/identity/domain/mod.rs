pub mod identity_store;
pub mod model_repository;
