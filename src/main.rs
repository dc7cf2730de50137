use std::sync::Arc;

use schemachat::app::{AppState, app_router};
use schemachat::core::config::Config;
use schemachat::core::{
    API_KEY_CREDENTIAL, AiConfig, AiSchemaProposer, Conversation, CredentialStore,
    FileCredentialStore,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file (if exists)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load application config from environment variables
    let config = Config::from_env();
    let ai_config = AiConfig::from_env();

    // Log config status (without revealing secrets)
    tracing::info!(
        "Config loaded: credentials={}, api_key_seed={}, model={}",
        config.credentials_path.display(),
        config.has_api_key(),
        ai_config.model
    );

    let credentials: Arc<dyn CredentialStore> =
        Arc::new(FileCredentialStore::new(&config.credentials_path));

    // Seed the store from the environment unless a key was saved earlier
    if let Some(api_key) = &config.api_key
        && !credentials.contains(API_KEY_CREDENTIAL)
    {
        credentials.set(API_KEY_CREDENTIAL, api_key)?;
    }

    let proposer = Arc::new(AiSchemaProposer::new(ai_config, credentials.clone()));
    let conversation = Arc::new(Conversation::new(proposer));
    let app = app_router(AppState::new(conversation, credentials));

    let listener = tokio::net::TcpListener::bind(&config.site_addr).await?;
    tracing::info!("listening on http://{}", &config.site_addr);

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
