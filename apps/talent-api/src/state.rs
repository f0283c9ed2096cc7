use std::sync::Arc;

use talent_service::TalentService;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<TalentService>,
}
impl AppState {
	/// Opens the configured store, making sure its collection exists before serving.
	pub async fn new(config: talent_config::Config) -> color_eyre::Result<Self> {
		let store = talent_storage::open(&config.storage)?;

		store.ensure_collection().await?;

		let service = TalentService::new(config, store)?;

		Ok(Self::from_service(service))
	}

	pub fn from_service(service: TalentService) -> Self {
		Self { service: Arc::new(service) }
	}
}
