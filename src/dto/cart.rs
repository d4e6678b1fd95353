use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{models::Product, pricing::Totals};

#[derive(Debug, Serialize, ToSchema)]
pub struct CartLineDto {
    pub id: Uuid,
    pub product: Product,
    pub quantity: i32,
    /// `quantity * product.current_price`.
    pub amount: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartView {
    pub items: Vec<CartLineDto>,
    pub totals: Totals,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateQuantityRequest {
    pub quantity: i32,
}

/// Result of a quantity change. `applied` is false when the requested
/// quantity was not positive and the item was left untouched.
#[derive(Debug, Serialize, ToSchema)]
pub struct QuantityUpdate {
    pub item_id: Uuid,
    pub quantity: i32,
    pub applied: bool,
    pub totals: Totals,
}
