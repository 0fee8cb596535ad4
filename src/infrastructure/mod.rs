// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod github_fetcher;
pub mod http_response;
pub mod label_font;
pub mod mesh_kernel;
pub mod sqlite_repository;
