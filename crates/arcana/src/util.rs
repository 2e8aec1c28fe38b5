#[cfg(test)]
use sea_orm::{Database, DatabaseConnection};
#[cfg(test)]
use sea_orm_migration::MigratorTrait;
#[cfg(test)]
use std::path::Path;
#[cfg(test)]
use std::sync::Arc;

#[cfg(test)]
use crate::channels::memory::MemoryChannel;
#[cfg(test)]
use crate::config::{GatewaySettings, Settings};
#[cfg(test)]
use crate::context::AppContext;
#[cfg(test)]
use crate::conversation::ContextStore;
#[cfg(test)]
use crate::db;
#[cfg(test)]
use crate::gateway::PaymentGateway;
#[cfg(test)]
use crate::messages::MessageCatalog;

#[cfg(test)]
pub async fn get_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    db::migration::Migrator::refresh(&db).await.unwrap();
    db
}

#[cfg(test)]
pub async fn create_test_plans(db: &DatabaseConnection) {
    crate::bootstrap::ensure_plans(db).await.unwrap();
}

#[cfg(test)]
pub fn get_test_gateway_settings() -> GatewaySettings {
    GatewaySettings {
        secret_key: "test_secret_key".to_owned(),
        test_mode: false,
        ..Default::default()
    }
}

#[cfg(test)]
pub async fn get_test_context() -> (AppContext, MemoryChannel) {
    let db = get_test_db().await;
    create_test_plans(&db).await;

    let media_root = std::env::temp_dir().join(format!("arcana-test-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&media_root).unwrap();

    let settings = Settings {
        media_root,
        gateway: get_test_gateway_settings(),
        ..Default::default()
    };

    let channel = MemoryChannel::new();
    let ctx = AppContext {
        db,
        channel: Arc::new(channel.clone()),
        gateway: PaymentGateway::new(&settings.gateway),
        settings,
        messages: MessageCatalog::default(),
        contexts: ContextStore::new(),
    };
    (ctx, channel)
}

#[cfg(test)]
pub fn seed_deck(media_root: &Path, category: &str, count: u32) {
    let folder = media_root.join(category);
    std::fs::create_dir_all(&folder).unwrap();
    for index in 1..=count {
        std::fs::write(
            folder.join(crate::cards::card_filename(index)),
            b"jpg",
        )
        .unwrap();
    }
}
