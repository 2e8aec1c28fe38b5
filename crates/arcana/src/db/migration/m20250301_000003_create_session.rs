use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Session::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Session::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Session::ProfileId).uuid().not_null())
                    .col(ColumnDef::new(Session::RequestText).string().not_null())
                    .col(ColumnDef::new(Session::RequestCategory).string().not_null())
                    .col(ColumnDef::new(Session::CardCategory).string().not_null())
                    .col(ColumnDef::new(Session::CardIndex).integer().not_null())
                    .col(
                        ColumnDef::new(Session::StartedAt)
                            .date_time()
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .col(ColumnDef::new(Session::CompletedAt).date_time())
                    .to_owned(),
            )
            .await?;

        let db = manager.get_connection();

        db.execute_unprepared(
            "CREATE INDEX ix_session_profile_started
            ON session (profile_id, started_at);",
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Session::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Session {
    Table,
    Id,
    ProfileId,
    RequestText,
    RequestCategory,
    CardCategory,
    CardIndex,
    StartedAt,
    CompletedAt,
}
