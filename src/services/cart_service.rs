use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    audit,
    db::DbPool,
    dto::cart::{CartLineDto, CartView, QuantityUpdate},
    entity::{
        cart_items::{Column as CartCol, Entity as CartItems},
        products::Entity as Products,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::CartItem,
    pricing::{MAX_LINE_QUANTITY, PriceLine, Totals},
    response::{ApiResponse, Meta},
    services::product_from_entity,
    state::AppState,
    validation::ValidationError,
};

#[derive(Debug, FromRow)]
struct PricingRow {
    quantity: i32,
    price: i64,
    discount: i32,
    shipping_cost: i64,
}

/// Live totals over every line in the user's cart.
pub async fn cart_totals(pool: &DbPool, user_id: Uuid) -> AppResult<Totals> {
    let rows = sqlx::query_as::<_, PricingRow>(
        r#"
        SELECT ci.quantity, p.price, p.discount, p.shipping_cost
        FROM cart_items ci
        JOIN products p ON p.id = ci.product_id
        WHERE ci.user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let lines = rows
        .into_iter()
        .map(|row| PriceLine::new(row.price, row.discount, row.shipping_cost, row.quantity))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Totals::from_lines(&lines)?)
}

/// Number of lines in the user's cart.
pub async fn cart_count(pool: &DbPool, user_id: Uuid) -> AppResult<i64> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM cart_items WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    Ok(count.0)
}

/// Cart lines joined with their products, oldest first, plus totals.
pub async fn cart_lines<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
) -> AppResult<(Vec<CartLineDto>, Totals)> {
    let rows = CartItems::find()
        .filter(CartCol::UserId.eq(user_id))
        .order_by_asc(CartCol::CreatedAt)
        .find_also_related(Products)
        .all(conn)
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
        items.push(CartLineDto {
            id: item.id,
            product: product_from_entity(product)?,
            quantity: item.quantity,
            amount: line.amount()?,
        });
    }
    Ok((items, totals))
}

pub async fn list_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartView>> {
    let (items, totals) = cart_lines(&state.orm, user.user_id).await?;
    let meta = Meta::single_page(items.len());
    Ok(ApiResponse::success("OK", CartView { items, totals }, Some(meta)))
}

/// Adds one unit of the product, creating the line on first add.
///
/// A single upsert against the `(user_id, product_id)` unique index, so
/// concurrent adds never produce duplicate lines.
pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<ApiResponse<CartItem>> {
    let product_exist: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_optional(&state.pool)
        .await?;
    if product_exist.is_none() {
        return Err(AppError::NotFound);
    }

    let cart_item = sqlx::query_as::<_, CartItem>(
        r#"
        INSERT INTO cart_items (id, user_id, product_id, quantity)
        VALUES ($1, $2, $3, 1)
        ON CONFLICT (user_id, product_id)
        DO UPDATE SET quantity = cart_items.quantity + 1
        WHERE cart_items.quantity < $4
        RETURNING id, user_id, product_id, quantity, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.user_id)
    .bind(product_id)
    .bind(MAX_LINE_QUANTITY)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(ValidationError::TooLarge(
        "quantity",
        i64::from(MAX_LINE_QUANTITY),
    ))?;

    tracing::debug!(
        user_id = %user.user_id,
        %product_id,
        quantity = cart_item.quantity,
        "cart line upserted"
    );

    audit::record(
        &state.pool,
        Some(user.user_id),
        "cart_add",
        "cart_items",
        serde_json::json!({ "product_id": product_id, "quantity": cart_item.quantity }),
    )
    .await;

    Ok(ApiResponse::success("Added to cart", cart_item, None))
}

/// Sets the quantity of a cart line. Non-positive quantities are ignored and
/// the current state is returned unchanged.
pub async fn update_quantity(
    state: &AppState,
    user: &AuthUser,
    item_id: Uuid,
    new_quantity: i32,
) -> AppResult<ApiResponse<QuantityUpdate>> {
    if new_quantity > MAX_LINE_QUANTITY {
        return Err(
            ValidationError::TooLarge("quantity", i64::from(MAX_LINE_QUANTITY)).into(),
        );
    }

    let applied = new_quantity > 0;
    let quantity = if applied {
        let (quantity,): (i32,) = sqlx::query_as(
            "UPDATE cart_items SET quantity = $3 WHERE id = $1 AND user_id = $2 RETURNING quantity",
        )
        .bind(item_id)
        .bind(user.user_id)
        .bind(new_quantity)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(AppError::NotFound)?;

        audit::record(
            &state.pool,
            Some(user.user_id),
            "cart_update",
            "cart_items",
            serde_json::json!({ "cart_item_id": item_id, "quantity": quantity }),
        )
        .await;
        quantity
    } else {
        let (quantity,): (i32,) =
            sqlx::query_as("SELECT quantity FROM cart_items WHERE id = $1 AND user_id = $2")
                .bind(item_id)
                .bind(user.user_id)
                .fetch_optional(&state.pool)
                .await?
                .ok_or(AppError::NotFound)?;
        tracing::debug!(%item_id, new_quantity, "ignoring non-positive cart quantity");
        quantity
    };

    let totals = cart_totals(&state.pool, user.user_id).await?;

    Ok(ApiResponse::success(
        "OK",
        QuantityUpdate {
            item_id,
            quantity,
            applied,
            totals,
        },
        None,
    ))
}

pub async fn remove_from_cart(
    state: &AppState,
    user: &AuthUser,
    item_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
        .bind(item_id)
        .bind(user.user_id)
        .execute(&state.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.pool,
        Some(user.user_id),
        "cart_remove",
        "cart_items",
        serde_json::json!({ "cart_item_id": item_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Removed from cart",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// Deletes every line of the user's cart. Runs on whatever connection or
/// transaction the caller passes in.
pub async fn clear_cart<C: ConnectionTrait>(conn: &C, user_id: Uuid) -> AppResult<u64> {
    let result = CartItems::delete_many()
        .filter(CartCol::UserId.eq(user_id))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}
