use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(StateLog::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(StateLog::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(StateLog::ProfileId).uuid().not_null())
                    .col(ColumnDef::new(StateLog::StateName).string().not_null())
                    .col(ColumnDef::new(StateLog::Description).string())
                    .col(
                        ColumnDef::new(StateLog::CreatedAt)
                            .date_time()
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        let db = manager.get_connection();

        db.execute_unprepared(
            "CREATE INDEX ix_state_log_profile_state
            ON state_log (profile_id, state_name);",
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(StateLog::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum StateLog {
    Table,
    Id,
    ProfileId,
    StateName,
    Description,
    CreatedAt,
}
