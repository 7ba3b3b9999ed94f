use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_query::Expr;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Polls::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Polls::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Polls::Title).string_len(255).not_null())
                    .col(ColumnDef::new(Polls::Description).text())
                    .col(ColumnDef::new(Polls::ImageData).binary())
                    .col(ColumnDef::new(Polls::ImageType).string_len(64))
                    .col(
                        ColumnDef::new(Polls::Visibility)
                            .string_len(16)
                            .not_null()
                            .default("PUBLIC"),
                    )
                    .col(
                        ColumnDef::new(Polls::Status)
                            .string_len(16)
                            .not_null()
                            .default("OPEN"),
                    )
                    .col(
                        ColumnDef::new(Polls::StartAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Polls::EndAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Polls::ExpectedVotes).integer())
                    .col(ColumnDef::new(Polls::CreatorId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Polls::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Polls::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    // Index for creator-scoped listings
                    .index(
                        Index::create()
                            .name("idx_polls_creator")
                            .col(Polls::CreatorId)
                            .col(Polls::CreatedAt),
                    )
                    // Index for status-filtered listings
                    .index(
                        Index::create()
                            .name("idx_polls_status_created")
                            .col(Polls::Status)
                            .col(Polls::CreatedAt),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PollOptions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PollOptions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PollOptions::PollId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PollOptions::Text)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(PollOptions::ImageData).binary())
                    .col(ColumnDef::new(PollOptions::ImageType).string_len(64))
                    .col(ColumnDef::new(PollOptions::Position).integer().not_null())
                    .col(
                        ColumnDef::new(PollOptions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_poll_options_poll")
                            .from(PollOptions::Table, PollOptions::PollId)
                            .to(Polls::Table, Polls::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .index(
                        Index::create()
                            .name("idx_poll_options_poll_position")
                            .col(PollOptions::PollId)
                            .col(PollOptions::Position),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Votes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Votes::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Votes::UserId).big_integer().not_null())
                    .col(ColumnDef::new(Votes::PollId).big_integer().not_null())
                    .col(ColumnDef::new(Votes::OptionId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Votes::VotedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_votes_poll")
                            .from(Votes::Table, Votes::PollId)
                            .to(Polls::Table, Polls::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_votes_option")
                            .from(Votes::Table, Votes::OptionId)
                            .to(PollOptions::Table, PollOptions::Id),
                    )
                    // Authoritative guard against concurrent double votes
                    .index(
                        Index::create()
                            .name("uq_votes_user_poll")
                            .col(Votes::UserId)
                            .col(Votes::PollId)
                            .unique(),
                    )
                    // Index for per-option tallies
                    .index(
                        Index::create()
                            .name("idx_votes_option")
                            .col(Votes::OptionId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Categories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Categories::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Categories::Name)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Categories::Slug)
                            .string_len(128)
                            .not_null()
                            .unique_key(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PollCategories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PollCategories::PollId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PollCategories::CategoryId)
                            .big_integer()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(PollCategories::PollId)
                            .col(PollCategories::CategoryId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_poll_categories_poll")
                            .from(PollCategories::Table, PollCategories::PollId)
                            .to(Polls::Table, Polls::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_poll_categories_category")
                            .from(PollCategories::Table, PollCategories::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PollCategories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Categories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Votes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PollOptions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Polls::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Polls {
    Table,
    Id,
    Title,
    Description,
    ImageData,
    ImageType,
    Visibility,
    Status,
    StartAt,
    EndAt,
    ExpectedVotes,
    CreatorId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PollOptions {
    Table,
    Id,
    PollId,
    Text,
    ImageData,
    ImageType,
    Position,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Votes {
    Table,
    Id,
    UserId,
    PollId,
    OptionId,
    VotedAt,
}

#[derive(DeriveIden)]
enum Categories {
    Table,
    Id,
    Name,
    Slug,
}

#[derive(DeriveIden)]
enum PollCategories {
    Table,
    PollId,
    CategoryId,
}
