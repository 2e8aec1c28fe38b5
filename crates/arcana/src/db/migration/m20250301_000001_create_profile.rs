use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Profile::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Profile::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Profile::ChatId)
                            .big_integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Profile::Username).string())
                    .col(
                        ColumnDef::new(Profile::FirstName)
                            .string()
                            .default("")
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Profile::Locale)
                            .string()
                            .default("ru")
                            .not_null(),
                    )
                    .col(ColumnDef::new(Profile::PlanId).uuid())
                    .col(ColumnDef::new(Profile::SubscriptionExpiresAt).date_time())
                    .col(
                        ColumnDef::new(Profile::IsBlocked)
                            .boolean()
                            .default(false)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Profile::IsStaff)
                            .boolean()
                            .default(false)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Profile::CreatedAt)
                            .date_time()
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Profile::UpdatedAt)
                            .date_time()
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .col(ColumnDef::new(Profile::LastSeenAt).date_time())
                    .to_owned(),
            )
            .await?;

        let db = manager.get_connection();

        db.execute_unprepared(
            "CREATE TRIGGER profile_updated_at
            AFTER UPDATE ON profile
            FOR EACH ROW
            BEGIN
                UPDATE profile
                SET updated_at = (datetime('now','localtime'))
                WHERE id = NEW.id;
            END;",
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Profile::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Profile {
    Table,
    Id,
    ChatId,
    Username,
    FirstName,
    Locale,
    PlanId,
    SubscriptionExpiresAt,
    IsBlocked,
    IsStaff,
    CreatedAt,
    UpdatedAt,
    LastSeenAt,
}
