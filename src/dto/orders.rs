use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::cart::CartLineDto,
    models::{Address, Order, OrderItem, OrderStatus, PaymentMethod},
    pricing::TaxedTotals,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreditCardInput {
    pub number: String,
    pub cvv: String,
    pub expire_date: NaiveDate,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub address_id: Uuid,
    pub payment_method: PaymentMethod,
    pub credit_card: Option<CreditCardInput>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderItemLine {
    pub item: OrderItem,
    pub product_name: String,
    /// Live discounted unit price.
    pub unit_price: i64,
    pub shipping_cost: i64,
    /// `quantity * unit_price`.
    pub amount: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderSummary {
    pub order: Order,
    pub totals: TaxedTotals,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<OrderSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderDetail {
    pub order: Order,
    pub address: Address,
    pub items: Vec<OrderItemLine>,
    pub totals: TaxedTotals,
    pub card_last_four: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutView {
    pub items: Vec<CartLineDto>,
    pub totals: TaxedTotals,
    pub addresses: Vec<Address>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}
