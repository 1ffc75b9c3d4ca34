use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub currency: String,
    pub stock: i32,
    pub low_stock_threshold: i32,
    pub stock_id: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::inventory_stocks::Entity",
        from = "Column::StockId",
        to = "super::inventory_stocks::Column::Id"
    )]
    InventoryStock,
}

impl Related<super::inventory_stocks::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryStock.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
