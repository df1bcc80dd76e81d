use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250901_000001_create_products_table::Migration),
            Box::new(m20250904_000002_create_product_photos_table::Migration),
        ]
    }
}

mod m20250901_000001_create_products_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250901_000001_create_products_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Products::BrandId).uuid().null())
                        .col(ColumnDef::new(Products::Name).string_len(255).not_null())
                        .col(ColumnDef::new(Products::Description).text().null())
                        .col(
                            ColumnDef::new(Products::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Products::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Products::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_active")
                        .table(Products::Table)
                        .col(Products::Active)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum Products {
        Table,
        Id,
        BrandId,
        Name,
        Description,
        Active,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250904_000002_create_product_photos_table {
    use super::m20250901_000001_create_products_table::Products;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250904_000002_create_product_photos_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ProductPhotos::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductPhotos::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(ProductPhotos::ProductId).uuid().not_null())
                        .col(
                            ColumnDef::new(ProductPhotos::Path)
                                .string_len(500)
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProductPhotos::Description).text().null())
                        .col(
                            ColumnDef::new(ProductPhotos::IsPrimary)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(ProductPhotos::Position)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(
                            ColumnDef::new(ProductPhotos::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductPhotos::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_product_photos_product_id")
                                .from(ProductPhotos::Table, ProductPhotos::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            // Not unique: a gallery sync rewrites positions row by row inside
            // one transaction, so uniqueness is checked before the writes.
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_product_photos_product_position")
                        .table(ProductPhotos::Table)
                        .col(ProductPhotos::ProductId)
                        .col(ProductPhotos::Position)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_product_photos_product_primary")
                        .table(ProductPhotos::Table)
                        .col(ProductPhotos::ProductId)
                        .col(ProductPhotos::IsPrimary)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ProductPhotos::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum ProductPhotos {
        Table,
        Id,
        ProductId,
        Path,
        Description,
        IsPrimary,
        Position,
        CreatedAt,
        UpdatedAt,
    }
}
