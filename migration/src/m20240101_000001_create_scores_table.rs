use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Scores::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Scores::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Scores::Name).string().not_null())
                    .col(ColumnDef::new(Scores::Attempts).integer().not_null())
                    .col(ColumnDef::new(Scores::Difficulty).string().not_null())
                    .col(ColumnDef::new(Scores::RangeLow).integer().not_null())
                    .col(ColumnDef::new(Scores::RangeHigh).integer().not_null())
                    .col(
                        ColumnDef::new(Scores::RecordedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Leaderboard reads filter by difficulty and order by attempts, then time
        manager
            .create_index(
                Index::create()
                    .name("idx_scores_ranking")
                    .table(Scores::Table)
                    .col(Scores::Difficulty)
                    .col(Scores::Attempts)
                    .col(Scores::RecordedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Scores::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Scores {
    Table,
    Id,
    Name,
    Attempts,
    Difficulty,
    RangeLow,
    RangeHigh,
    RecordedAt,
}
