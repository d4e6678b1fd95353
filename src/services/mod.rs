use chrono::Utc;

use crate::{
    entity::{addresses, categories, order_items, orders, products, tags},
    error::AppResult,
    models::{Address, Category, Order, OrderItem, Product, Tag},
    pricing::{Discount, current_price},
};

pub mod account_service;
pub mod address_service;
pub mod admin_service;
pub mod auth_service;
pub mod cart_service;
pub mod catalog_service;
pub mod order_service;

pub(crate) fn product_from_entity(model: products::Model) -> AppResult<Product> {
    let discount = Discount::new(model.discount)?;
    let created_at = model.created_at.with_timezone(&Utc);
    Ok(Product {
        id: model.id,
        name: model.name,
        price: model.price,
        discount: model.discount,
        current_price: current_price(model.price, discount)?,
        quantity: model.quantity,
        in_stock: model.quantity > 0,
        is_new: Product::is_new_at(created_at, Utc::now()),
        shipping_cost: model.shipping_cost,
        category_id: model.category_id,
        info: model.info,
        descriptions: model.descriptions,
        specification: model.specification,
        created_at,
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

pub(crate) fn category_from_entity(model: categories::Model) -> Category {
    Category {
        id: model.id,
        name: model.name,
        slug: model.slug,
        parent_id: model.parent_id,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

pub(crate) fn tag_from_entity(model: tags::Model) -> Tag {
    Tag {
        id: model.id,
        name: model.name,
        slug: model.slug,
    }
}

pub(crate) fn address_from_entity(model: addresses::Model) -> Address {
    Address {
        id: model.id,
        user_id: model.user_id,
        full_name: model.full_name,
        street: model.street,
        zip_code: model.zip_code,
        city: model.city,
        phone: model.phone,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

pub(crate) fn order_from_entity(model: orders::Model) -> AppResult<Order> {
    Ok(Order {
        id: model.id,
        owner_id: model.owner_id,
        address_id: model.address_id,
        status: model.status.parse()?,
        payment_method: model.payment_method.parse()?,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

pub(crate) fn order_item_from_entity(model: order_items::Model) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        product_id: model.product_id,
        quantity: model.quantity,
    }
}
