// Application state for HTTP handlers
use crate::application::import_service::ImportService;
use crate::application::model_service::ModelService;

#[derive(Clone)]
pub struct AppState {
    pub import_service: ImportService,
    pub model_service: ModelService,
}
