use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize)]
#[sea_orm(table_name = "employee")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Dense 1..N display rank, recomputed after every insert/delete.
    /// Rows are written with 0 inside the mutation transaction and
    /// corrected by the renumbering pass before commit.
    pub sr_no: i32,
    pub name: String,
    pub salary: i32,
    pub department: String,
    pub joindate: Option<String>,
    pub profile_pic: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
