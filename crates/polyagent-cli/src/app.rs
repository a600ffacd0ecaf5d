//! Wires the client together from configuration.

use anyhow::Result;
use polyagent_application::dispatcher::TurnRunner;
use polyagent_application::{
    ActionMediator, PaymentBridgeOrchestrator, ResponseDispatcher, UiEvent, UiNotifier,
    WalletService,
};
use polyagent_core::agent::AgentRouter;
use polyagent_core::config::RootConfig;
use polyagent_core::conversation::{ConversationManager, KeyValueStore};
use polyagent_core::wallet::DisconnectedWallet;
use polyagent_infrastructure::{
    ConfigService, FileKeyValueStore, MemoryKeyValueStore, PolyAgentPaths,
};
use polyagent_interaction::HttpAgentTransport;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Global options shared by every command.
#[derive(Debug, Clone, Default)]
pub struct BootstrapOptions {
    pub backend_url: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub ephemeral: bool,
}

pub struct AppContext {
    pub config: RootConfig,
    pub config_path: PathBuf,
    pub router: AgentRouter,
    pub manager: Arc<ConversationManager>,
    pub dispatcher: Arc<ResponseDispatcher>,
    pub mediator: Arc<ActionMediator>,
    pub wallet: Arc<WalletService>,
    pub events: mpsc::UnboundedReceiver<UiEvent>,
}

/// Loads configuration, restores conversations and builds the services.
pub async fn bootstrap(options: BootstrapOptions) -> Result<AppContext> {
    let paths = PolyAgentPaths::new(options.data_dir.clone());
    let config_path = paths.config_file()?;
    let mut config = ConfigService::new(config_path.clone()).get_config();
    if let Some(url) = options.backend_url {
        config.backend_base_url = url;
    }

    let store: Arc<dyn KeyValueStore> = if options.ephemeral {
        Arc::new(MemoryKeyValueStore::new())
    } else {
        Arc::new(FileKeyValueStore::new(
            paths.store_dir(&config.storage_namespace)?,
        ))
    };
    let manager = Arc::new(ConversationManager::new(store));
    manager.load_all().await;

    let router = config.router();
    let (notifier, events) = UiNotifier::channel();
    let runner = Arc::new(TurnRunner::new(
        manager.clone(),
        router.clone(),
        Arc::new(HttpAgentTransport::new()),
        notifier.clone(),
        config.turn_binding,
    ));
    let payments = Arc::new(PaymentBridgeOrchestrator::new(
        runner.clone(),
        notifier,
        config.turn_binding,
        &config.guard,
    )?);

    tracing::info!(
        "[Bootstrap] Backend {} ({} agent route(s), binding {:?})",
        config.backend_base_url,
        router.routes().len(),
        config.turn_binding
    );

    Ok(AppContext {
        dispatcher: Arc::new(ResponseDispatcher::new(runner, payments.clone())),
        mediator: Arc::new(ActionMediator::new(payments)),
        wallet: Arc::new(WalletService::new(Arc::new(DisconnectedWallet))),
        config,
        config_path,
        router,
        manager,
        events,
    })
}
