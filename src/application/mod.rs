// Application layer - Use cases and the collaborator seams they drive
pub mod contribution_fetcher;
pub mod contribution_repository;
pub mod geometry_kernel;
pub mod import_service;
pub mod model_assembler;
pub mod model_service;

#[cfg(test)]
pub mod testing;
