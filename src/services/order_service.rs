use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, FromQueryResult,
    JoinType, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait,
    Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::orders::{
        CheckoutView, CreateOrderRequest, CreditCardInput, OrderDetail, OrderItemLine, OrderList,
        OrderSummary,
    },
    entity::{
        addresses::{Column as AddressCol, Entity as Addresses},
        cart_items::{Column as CartCol, Entity as CartItems},
        credit_cards::{ActiveModel as CreditCardActive, Column as CardCol, Entity as CreditCards},
        order_items::{self, ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Order, OrderItem, OrderStatus, PaymentMethod},
    notify::{self, Notification},
    pricing::{PriceLine, TaxedTotals, Totals},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    services::{
        address_from_entity, cart_service, order_from_entity, order_item_from_entity,
    },
    settings::SiteSettings,
    state::AppState,
    validation::ValidationError,
};

/// What an order line is built from: a product and how many of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartLine {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, FromQueryResult)]
struct OrderPricingRow {
    order_id: Uuid,
    quantity: i32,
    price: i64,
    discount: i32,
    shipping_cost: i64,
}

/// Checks card data against the chosen payment method.
///
/// Card details are only kept for credit card payments; with PayPal they are
/// dropped.
pub fn validate_card(
    payment_method: PaymentMethod,
    card: Option<CreditCardInput>,
    today: NaiveDate,
) -> Result<Option<CreditCardInput>, ValidationError> {
    match (payment_method, card) {
        (PaymentMethod::Paypal, _) => Ok(None),
        (PaymentMethod::CreditCard, None) => Err(ValidationError::MissingCreditCard),
        (PaymentMethod::CreditCard, Some(card)) => {
            let digits = |s: &str, len: usize| s.len() == len && s.bytes().all(|b| b.is_ascii_digit());
            if !digits(&card.number, 16) {
                return Err(ValidationError::InvalidCreditCard("number must be 16 digits"));
            }
            if !digits(&card.cvv, 3) {
                return Err(ValidationError::InvalidCreditCard("cvv must be 3 digits"));
            }
            if card.expire_date < today {
                return Err(ValidationError::InvalidCreditCard("card has expired"));
            }
            Ok(Some(card))
        }
    }
}

/// Cart lines of the user, row-locked until the surrounding transaction ends.
pub async fn locked_cart_lines<C: ConnectionTrait>(conn: &C, user_id: Uuid) -> AppResult<Vec<CartLine>> {
    let lines = CartItems::find()
        .filter(CartCol::UserId.eq(user_id))
        .order_by_asc(CartCol::CreatedAt)
        .lock(LockType::Update)
        .all(conn)
        .await?
        .into_iter()
        .map(|item| CartLine {
            product_id: item.product_id,
            quantity: item.quantity,
        })
        .collect();
    Ok(lines)
}

/// Creates an order with one item per cart line.
///
/// Only product and quantity are copied; prices stay live. The cart itself is
/// left untouched, clearing it is up to the caller.
pub async fn create_order<C: ConnectionTrait>(
    conn: &C,
    owner_id: Uuid,
    address_id: Uuid,
    payment_method: PaymentMethod,
    lines: &[CartLine],
) -> AppResult<(Order, Vec<OrderItem>)> {
    if lines.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".into()));
    }
    if lines.iter().any(|line| line.quantity <= 0) {
        return Err(AppError::BadRequest("Cart has invalid quantity".into()));
    }

    Addresses::find()
        .filter(
            Condition::all()
                .add(AddressCol::Id.eq(address_id))
                .add(AddressCol::UserId.eq(owner_id)),
        )
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)?;

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        owner_id: Set(owner_id),
        address_id: Set(address_id),
        status: Set(OrderStatus::default().as_str().to_string()),
        payment_method: Set(payment_method.as_str().to_string()),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(conn)
    .await?;

    let mut items = Vec::with_capacity(lines.len());
    for line in lines {
        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(line.product_id),
            quantity: Set(line.quantity),
        }
        .insert(conn)
        .await?;
        items.push(order_item_from_entity(item));
    }

    Ok((order_from_entity(order)?, items))
}

/// Live totals for a batch of orders, keyed by order id. Orders without items
/// are absent from the map.
async fn totals_by_order<C: ConnectionTrait>(
    conn: &C,
    order_ids: Vec<Uuid>,
) -> AppResult<HashMap<Uuid, Totals>> {
    let rows = OrderItems::find()
        .select_only()
        .column(OrderItemCol::OrderId)
        .column(OrderItemCol::Quantity)
        .column(ProdCol::Price)
        .column(ProdCol::Discount)
        .column(ProdCol::ShippingCost)
        .join(JoinType::InnerJoin, order_items::Relation::Products.def())
        .filter(OrderItemCol::OrderId.is_in(order_ids))
        .into_model::<OrderPricingRow>()
        .all(conn)
        .await?;

    let mut totals: HashMap<Uuid, Totals> = HashMap::new();
    for row in rows {
        let line = PriceLine::new(row.price, row.discount, row.shipping_cost, row.quantity)?;
        totals.entry(row.order_id).or_default().push(&line)?;
    }
    Ok(totals)
}

/// Subtotal, shipping, total and tax of an order, priced from current
/// product data.
pub async fn order_totals<C: ConnectionTrait>(
    conn: &C,
    settings: &SiteSettings,
    order_id: Uuid,
) -> AppResult<TaxedTotals> {
    Orders::find_by_id(order_id)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)?;

    let totals = totals_by_order(conn, vec![order_id])
        .await?
        .remove(&order_id)
        .unwrap_or_default();
    Ok(totals.with_tax(settings)?)
}

pub async fn checkout_summary(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<CheckoutView>> {
    let (items, totals) = cart_service::cart_lines(&state.orm, user.user_id).await?;
    let addresses = Addresses::find()
        .filter(AddressCol::UserId.eq(user.user_id))
        .order_by_desc(AddressCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(address_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Checkout",
        CheckoutView {
            items,
            totals: totals.with_tax(&state.settings)?,
            addresses,
        },
        Some(Meta::empty()),
    ))
}

/// Turns the user's cart into an order and empties the cart, atomically.
pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<OrderDetail>> {
    let card = validate_card(
        payload.payment_method,
        payload.credit_card,
        Utc::now().date_naive(),
    )?;

    let txn = state.orm.begin().await?;

    let lines = locked_cart_lines(&txn, user.user_id).await?;
    let (order, items) = create_order(
        &txn,
        user.user_id,
        payload.address_id,
        payload.payment_method,
        &lines,
    )
    .await?;

    if let Some(card) = card {
        CreditCardActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            owner_id: Set(user.user_id),
            number: Set(card.number),
            cvv: Set(card.cvv),
            expire_date: Set(card.expire_date),
            created_at: NotSet,
            updated_at: NotSet,
        }
        .insert(&txn)
        .await?;
    }

    let cleared = cart_service::clear_cart(&txn, user.user_id).await?;
    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        owner_id = %user.user_id,
        items = items.len(),
        cleared,
        "order created"
    );

    audit::record(
        &state.pool,
        Some(user.user_id),
        "checkout",
        "orders",
        serde_json::json!({ "order_id": order.id }),
    )
    .await;

    notify::dispatch(
        &state.notifier,
        Notification::OrderPlaced {
            order_id: order.id,
            owner_id: user.user_id,
        },
    );

    let detail = order_detail(state, user, order.id).await?;
    Ok(ApiResponse::success(
        "Order created",
        detail,
        Some(Meta::empty()),
    ))
}

/// Own orders newest first; admins see every order.
pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = pagination.normalize();

    let mut finder = Orders::find();
    if !user.is_admin() {
        finder = finder.filter(OrderCol::OwnerId.eq(user.user_id));
    }
    let finder = finder.order_by_desc(OrderCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let mut totals = totals_by_order(&state.orm, orders.iter().map(|o| o.id).collect()).await?;
    let items = orders
        .into_iter()
        .map(|model| -> AppResult<OrderSummary> {
            let order_totals = totals.remove(&model.id).unwrap_or_default();
            Ok(OrderSummary {
                order: order_from_entity(model)?,
                totals: order_totals.with_tax(&state.settings)?,
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Ok", OrderList { items }, Some(meta)))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderDetail>> {
    let detail = order_detail(state, user, id).await?;
    Ok(ApiResponse::success("OK", detail, Some(Meta::empty())))
}

async fn order_detail(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<OrderDetail> {
    let mut condition = Condition::all().add(OrderCol::Id.eq(id));
    if !user.is_admin() {
        condition = condition.add(OrderCol::OwnerId.eq(user.user_id));
    }
    let order = Orders::find()
        .filter(condition)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let address = order
        .find_related(Addresses)
        .one(&state.orm)
        .await?
        .map(address_from_entity)
        .ok_or(AppError::NotFound)?;

    let rows = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .find_also_related(Products)
        .all(&state.orm)
        .await?;

    let mut totals = Totals::default();
    let mut items = Vec::with_capacity(rows.len());
    for (item, product) in rows {
        let Some(product) = product else {
            continue;
        };
        let line = PriceLine::new(
            product.price,
            product.discount,
            product.shipping_cost,
            item.quantity,
        )?;
        totals.push(&line)?;
        items.push(OrderItemLine {
            item: order_item_from_entity(item),
            product_name: product.name,
            unit_price: line.unit_price()?,
            shipping_cost: line.shipping_cost,
            amount: line.amount()?,
        });
    }

    let card_last_four = CreditCards::find()
        .filter(CardCol::OrderId.eq(order.id))
        .one(&state.orm)
        .await?
        .map(|card| card.number.chars().skip(12).collect::<String>());

    Ok(OrderDetail {
        order: order_from_entity(order)?,
        address,
        items,
        totals: totals.with_tax(&state.settings)?,
        card_last_four,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(number: &str, cvv: &str, expire_date: NaiveDate) -> CreditCardInput {
        CreditCardInput {
            number: number.into(),
            cvv: cvv.into(),
            expire_date,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn credit_card_payment_requires_card() {
        let today = date(2026, 1, 1);
        assert_eq!(
            validate_card(PaymentMethod::CreditCard, None, today).unwrap_err(),
            ValidationError::MissingCreditCard
        );
    }

    #[test]
    fn malformed_or_expired_cards_are_rejected() {
        let today = date(2026, 1, 1);
        let next_year = date(2027, 1, 1);

        assert!(validate_card(
            PaymentMethod::CreditCard,
            Some(card("4111", "123", next_year)),
            today
        )
        .is_err());
        assert!(validate_card(
            PaymentMethod::CreditCard,
            Some(card("4111111111111111", "12a", next_year)),
            today
        )
        .is_err());
        assert_eq!(
            validate_card(
                PaymentMethod::CreditCard,
                Some(card("4111111111111111", "123", date(2025, 12, 31))),
                today
            )
            .unwrap_err(),
            ValidationError::InvalidCreditCard("card has expired")
        );

        let accepted = validate_card(
            PaymentMethod::CreditCard,
            Some(card("4111111111111111", "123", next_year)),
            today,
        )
        .unwrap();
        assert_eq!(accepted.map(|c| c.number), Some("4111111111111111".to_string()));
    }

    #[test]
    fn paypal_drops_card_details() {
        let today = date(2026, 1, 1);
        let result = validate_card(
            PaymentMethod::Paypal,
            Some(card("4111111111111111", "123", date(2027, 1, 1))),
            today,
        )
        .unwrap();
        assert!(result.is_none());
    }
}
