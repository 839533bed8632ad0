// Services - operations exposed to the HTTP layer
pub mod mutation_service;

pub use mutation_service::MutationService;
