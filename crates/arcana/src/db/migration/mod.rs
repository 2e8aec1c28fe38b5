use sea_orm::DatabaseConnection;
pub use sea_orm_migration::prelude::*;

use arcana_common::error::Result;

mod m20250301_000001_create_profile;
mod m20250301_000002_create_plan;
mod m20250301_000003_create_session;
mod m20250301_000004_create_payment;
mod m20250301_000005_create_state_log;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_profile::Migration),
            Box::new(m20250301_000002_create_plan::Migration),
            Box::new(m20250301_000003_create_session::Migration),
            Box::new(m20250301_000004_create_payment::Migration),
            Box::new(m20250301_000005_create_state_log::Migration),
        ]
    }
}

pub async fn migrate(db: &DatabaseConnection) -> Result<()> {
    Migrator::up(db, None).await?;
    Ok(())
}
