use std::{fmt, str::FromStr};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::validation::ValidationError;

/// Products younger than this are flagged as new.
pub const NEW_PRODUCT_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub role: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub price: i64,
    pub discount: i32,
    /// Price after discount.
    pub current_price: i64,
    pub quantity: i32,
    pub in_stock: bool,
    pub is_new: bool,
    pub shipping_cost: i64,
    pub category_id: Uuid,
    pub info: String,
    pub descriptions: String,
    #[schema(value_type = Object)]
    pub specification: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn is_new_at(created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        created_at >= now - Duration::days(NEW_PRODUCT_WINDOW_DAYS)
    }

    /// First five specification values in stored order.
    pub fn first_five(&self) -> Vec<Value> {
        match &self.specification {
            Value::Object(map) => map.values().take(5).cloned().collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct CartItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Address {
    pub id: Uuid,
    pub user_id: Uuid,
    pub full_name: String,
    pub street: String,
    pub zip_code: i32,
    pub city: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Processing,
    OnHold,
    Pending,
    Completed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Processing => "processing",
            OrderStatus::OnHold => "on_hold",
            OrderStatus::Pending => "pending",
            OrderStatus::Completed => "completed",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(OrderStatus::Processing),
            "on_hold" => Ok(OrderStatus::OnHold),
            "pending" => Ok(OrderStatus::Pending),
            "completed" => Ok(OrderStatus::Completed),
            other => Err(ValidationError::UnknownStatus(other.to_string())),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Paypal,
    CreditCard,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Paypal => "paypal",
            PaymentMethod::CreditCard => "credit_card",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "paypal" => Ok(PaymentMethod::Paypal),
            "credit_card" => Ok(PaymentMethod::CreditCard),
            other => Err(ValidationError::UnknownPaymentMethod(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub address_id: Uuid,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn status_round_trips_through_its_column_value() {
        for status in [
            OrderStatus::Processing,
            OrderStatus::OnHold,
            OrderStatus::Pending,
            OrderStatus::Completed,
        ] {
            assert_eq!(status.as_str().parse::<OrderStatus>(), Ok(status));
        }
        assert_eq!(
            "shipped".parse::<OrderStatus>(),
            Err(ValidationError::UnknownStatus("shipped".into()))
        );
        assert_eq!(OrderStatus::default(), OrderStatus::Processing);
    }

    #[test]
    fn unknown_payment_method_is_rejected() {
        assert_eq!("paypal".parse::<PaymentMethod>(), Ok(PaymentMethod::Paypal));
        assert_eq!(
            "cash".parse::<PaymentMethod>(),
            Err(ValidationError::UnknownPaymentMethod("cash".into()))
        );
    }

    #[test]
    fn product_is_new_for_seven_days() {
        let now = Utc::now();
        assert!(Product::is_new_at(now - Duration::days(6), now));
        assert!(Product::is_new_at(now - Duration::days(7), now));
        assert!(!Product::is_new_at(now - Duration::days(8), now));
    }

    #[test]
    fn first_five_takes_specification_values_in_order() {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4(),
            name: "Laptop".into(),
            price: 1000,
            discount: 0,
            current_price: 1000,
            quantity: 1,
            in_stock: true,
            is_new: true,
            shipping_cost: 0,
            category_id: Uuid::new_v4(),
            info: String::new(),
            descriptions: String::new(),
            specification: json!({
                "cpu": "8 cores",
                "ram": "16 GB",
                "disk": "512 GB",
                "screen": "14\"",
                "weight": "1.3 kg",
                "color": "silver"
            }),
            created_at: now,
            updated_at: now,
        };

        assert_eq!(
            product.first_five(),
            vec![
                json!("8 cores"),
                json!("16 GB"),
                json!("512 GB"),
                json!("14\""),
                json!("1.3 kg")
            ]
        );
    }
}
