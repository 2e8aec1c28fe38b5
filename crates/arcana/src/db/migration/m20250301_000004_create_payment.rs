use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Payment::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Payment::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Payment::OrderId)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Payment::ProfileId).uuid().not_null())
                    .col(ColumnDef::new(Payment::PlanId).uuid())
                    .col(ColumnDef::new(Payment::Amount).big_integer().not_null())
                    .col(
                        ColumnDef::new(Payment::Currency)
                            .string()
                            .default("RUB")
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Payment::Status)
                            .string()
                            .default("pending")
                            .not_null(),
                    )
                    .col(ColumnDef::new(Payment::PaymentId).string())
                    .col(ColumnDef::new(Payment::SubscriptionId).string())
                    .col(ColumnDef::new(Payment::WebhookPayload).string())
                    .col(
                        ColumnDef::new(Payment::CreatedAt)
                            .date_time()
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Payment::UpdatedAt)
                            .date_time()
                            .default(Expr::current_timestamp())
                            .not_null(),
                    )
                    .col(ColumnDef::new(Payment::PaidAt).date_time())
                    .to_owned(),
            )
            .await?;

        let db = manager.get_connection();

        db.execute_unprepared(
            "CREATE TRIGGER payment_updated_at
            AFTER UPDATE ON payment
            FOR EACH ROW
            BEGIN
                UPDATE payment
                SET updated_at = (datetime('now','localtime'))
                WHERE id = NEW.id;
            END;",
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Payment::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Payment {
    Table,
    Id,
    OrderId,
    ProfileId,
    PlanId,
    Amount,
    Currency,
    Status,
    PaymentId,
    SubscriptionId,
    WebhookPayload,
    CreatedAt,
    UpdatedAt,
    PaidAt,
}
