use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, Set};
use uuid::Uuid;

use crate::{
    audit,
    dto::addresses::{AddressList, CreateAddressRequest, UpdateAddressRequest},
    entity::addresses::{ActiveModel as AddressActive, Column as AddressCol, Entity as Addresses},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Address,
    response::{ApiResponse, Meta},
    services::address_from_entity,
    state::AppState,
    validation::{non_negative, not_blank},
};

pub async fn list_addresses(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<AddressList>> {
    let items = Addresses::find()
        .filter(AddressCol::UserId.eq(user.user_id))
        .order_by_desc(AddressCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(address_from_entity)
        .collect();
    Ok(ApiResponse::success("Addresses", AddressList { items }, None))
}

pub async fn create_address(
    state: &AppState,
    user: &AuthUser,
    payload: CreateAddressRequest,
) -> AppResult<ApiResponse<Address>> {
    let address = AddressActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        full_name: Set(not_blank("full_name", payload.full_name)?),
        street: Set(not_blank("street", payload.street)?),
        zip_code: Set(non_negative("zip_code", payload.zip_code)?),
        city: Set(not_blank("city", payload.city)?),
        phone: Set(not_blank("phone", payload.phone)?),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "address_create",
        "addresses",
        serde_json::json!({ "address_id": address.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Address created",
        address_from_entity(address),
        Some(Meta::empty()),
    ))
}

pub async fn update_address(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateAddressRequest,
) -> AppResult<ApiResponse<Address>> {
    let existing = Addresses::find()
        .filter(
            Condition::all()
                .add(AddressCol::Id.eq(id))
                .add(AddressCol::UserId.eq(user.user_id)),
        )
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: AddressActive = existing.into();
    if let Some(full_name) = payload.full_name {
        active.full_name = Set(not_blank("full_name", full_name)?);
    }
    if let Some(street) = payload.street {
        active.street = Set(not_blank("street", street)?);
    }
    if let Some(zip_code) = payload.zip_code {
        active.zip_code = Set(non_negative("zip_code", zip_code)?);
    }
    if let Some(city) = payload.city {
        active.city = Set(not_blank("city", city)?);
    }
    if let Some(phone) = payload.phone {
        active.phone = Set(not_blank("phone", phone)?);
    }
    active.updated_at = Set(Utc::now().into());

    let address = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Updated",
        address_from_entity(address),
        Some(Meta::empty()),
    ))
}
