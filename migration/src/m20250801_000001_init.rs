use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
#[sea_orm(iden = "employee")]
enum Employee {
    Table,
    Id,
    SrNo,
    Name,
    Salary,
    Department,
    Joindate,
    ProfilePic,
}

#[derive(DeriveIden)]
#[sea_orm(iden = "user")]
enum User {
    Table,
    Id,
    Username,
    PasswordHash,
    Role,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Employee::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Employee::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Employee::SrNo).integer().not_null())
                    .col(ColumnDef::new(Employee::Name).string_len(50).not_null())
                    .col(ColumnDef::new(Employee::Salary).integer().not_null())
                    .col(
                        ColumnDef::new(Employee::Department)
                            .string_len(50)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Employee::Joindate).string_len(50))
                    .col(ColumnDef::new(Employee::ProfilePic).string_len(355))
                    .to_owned(),
            )
            .await?;

        // (name, department) uniqueness is checked by the insert path, not
        // a constraint; this index only keeps the duplicate probe cheap.
        manager
            .create_index(
                Index::create()
                    .name("idx_employee_name_department")
                    .table(Employee::Table)
                    .col(Employee::Name)
                    .col(Employee::Department)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(User::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(User::Username)
                            .string_len(50)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(User::PasswordHash).string_len(255).not_null())
                    .col(ColumnDef::new(User::Role).string_len(32).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(User::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Employee::Table).to_owned())
            .await
    }
}
