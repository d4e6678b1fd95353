use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Category, Product, Tag};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    pub price: i64,
    #[serde(default)]
    pub discount: i32,
    #[serde(default)]
    pub quantity: i32,
    #[serde(default)]
    pub shipping_cost: i64,
    pub category_id: Uuid,
    #[serde(default)]
    pub info: String,
    #[serde(default)]
    pub descriptions: String,
    #[schema(value_type = Option<Object>)]
    pub specification: Option<Value>,
    #[serde(default)]
    pub tag_ids: Vec<Uuid>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub price: Option<i64>,
    pub discount: Option<i32>,
    pub quantity: Option<i32>,
    pub shipping_cost: Option<i64>,
    pub category_id: Option<Uuid>,
    pub info: Option<String>,
    pub descriptions: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub specification: Option<Value>,
    pub tag_ids: Option<Vec<Uuid>>,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<Product>)]
    pub items: Vec<Product>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductDetail {
    pub product: Product,
    pub category: Category,
    pub tags: Vec<Tag>,
    /// First five specification values, for the summary table.
    #[schema(value_type = Vec<Object>)]
    pub first_five: Vec<Value>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct CategoryList {
    #[schema(value_type = Vec<Category>)]
    pub items: Vec<Category>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTagRequest {
    pub name: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct TagList {
    #[schema(value_type = Vec<Tag>)]
    pub items: Vec<Tag>,
}
