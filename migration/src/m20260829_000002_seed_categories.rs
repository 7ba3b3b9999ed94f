use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_query::OnConflict;

#[derive(DeriveMigrationName)]
pub struct Migration;

const SEED_CATEGORIES: &[(&str, &str)] = &[
    ("Technology", "technology"),
    ("Sports", "sports"),
    ("Music", "music"),
    ("Movies", "movies"),
    ("Food", "food"),
    ("Science", "science"),
    ("Gaming", "gaming"),
    ("Politics", "politics"),
    ("Education", "education"),
    ("Travel", "travel"),
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let mut insert = Query::insert()
            .into_table(Categories::Table)
            .columns([Categories::Name, Categories::Slug])
            .on_conflict(
                OnConflict::column(Categories::Slug)
                    .do_nothing()
                    .to_owned(),
            )
            .to_owned();

        for (name, slug) in SEED_CATEGORIES {
            insert.values_panic([(*name).into(), (*slug).into()]);
        }

        manager.exec_stmt(insert).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let slugs: Vec<Value> = SEED_CATEGORIES
            .iter()
            .map(|(_, slug)| (*slug).into())
            .collect();

        manager
            .exec_stmt(
                Query::delete()
                    .from_table(Categories::Table)
                    .and_where(Expr::col(Categories::Slug).is_in(slugs))
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum Categories {
    Table,
    Name,
    Slug,
}
