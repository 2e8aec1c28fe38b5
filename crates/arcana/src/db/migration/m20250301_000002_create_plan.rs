use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Plan::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Plan::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Plan::Code).string().not_null().unique_key())
                    .col(ColumnDef::new(Plan::Name).string().not_null())
                    .col(ColumnDef::new(Plan::Price).big_integer().not_null())
                    .col(ColumnDef::new(Plan::DurationDays).integer().not_null())
                    .col(ColumnDef::new(Plan::DailySessionsLimit).integer().not_null())
                    .col(ColumnDef::new(Plan::CardsLimit).integer())
                    .col(ColumnDef::new(Plan::GatewaySubscriptionId).string())
                    .col(ColumnDef::new(Plan::Description).string())
                    .col(
                        ColumnDef::new(Plan::IsActive)
                            .boolean()
                            .default(true)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Plan::CreatedAt)
                            .date_time()
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Plan::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Plan {
    Table,
    Id,
    Code,
    Name,
    Price,
    DurationDays,
    DailySessionsLimit,
    CardsLimit,
    GatewaySubscriptionId,
    Description,
    IsActive,
    CreatedAt,
}
