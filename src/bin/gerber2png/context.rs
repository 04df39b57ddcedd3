use std::sync::Arc;

use gerber2png_client::{
    application::{
        error::AppError,
        orchestrator::{Orchestrator, OrchestratorDeps},
        ports::PreferenceStore,
        preferences::Preferences,
        presenter::ResultPresenter,
    },
    config::Settings,
    infra::{
        http::{ApiClient, HttpConversionTransport, HttpProfileCatalog},
        preferences::FilePreferenceStore,
    },
};

/// Resolved settings plus the process-wide preference store.
pub struct Context {
    pub settings: Settings,
    store: Arc<dyn PreferenceStore>,
}

impl Context {
    pub fn new(settings: Settings) -> Self {
        let store = Arc::new(FilePreferenceStore::open(&settings.preferences.path));
        Self { settings, store }
    }

    pub fn preferences(&self) -> Preferences {
        Preferences::new(Arc::clone(&self.store))
    }

    /// Assemble an orchestrator; this fetches the profile catalog.
    pub async fn orchestrator(&self) -> Result<Orchestrator, AppError> {
        let api = ApiClient::from_settings(&self.settings.api)?;
        let deps = OrchestratorDeps {
            preferences: Arc::clone(&self.store),
            catalog: Arc::new(HttpProfileCatalog::new(api.clone())),
            transport: Arc::new(HttpConversionTransport::new(api)),
            presenter: ResultPresenter::new(),
        };
        Ok(Orchestrator::initialize(deps).await)
    }
}
