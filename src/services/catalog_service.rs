use std::collections::HashSet;

use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, JoinType, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, SqlErr,
    TransactionTrait,
};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    audit,
    db::DbPool,
    dto::catalog::{
        CategoryList, CreateCategoryRequest, CreateProductRequest, CreateTagRequest,
        ProductDetail, ProductList, TagList, UpdateProductRequest,
    },
    entity::{
        categories::{self, ActiveModel as CategoryActive, Column as CatCol, Entity as Categories},
        product_tags::{ActiveModel as ProductTagActive, Column as ProductTagCol, Entity as ProductTags},
        products::{self, ActiveModel as ProductActive, Column as ProdCol, Entity as Products},
        tags::{ActiveModel as TagActive, Column as TagCol, Entity as Tags},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Category, Product, Tag},
    pricing::{Discount, price_in_range},
    response::{ApiResponse, Meta},
    routes::params::ProductQuery,
    services::{category_from_entity, product_from_entity, tag_from_entity},
    slug::{slugify, unique_slug},
    state::AppState,
    validation::{ValidationError, non_negative, not_blank},
};

/// Inserts retried when a concurrent writer takes the generated slug first.
const SLUG_ATTEMPTS: usize = 3;

/// Tables whose rows carry a generated, unique slug.
#[derive(Debug, Clone, Copy)]
pub enum SlugTable {
    Categories,
    Tags,
}

impl SlugTable {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SlugTable::Categories => "categories",
            SlugTable::Tags => "tags",
        }
    }
}

/// Derive a slug for `name` that does not collide with any row in `table`.
pub async fn generate_slug(pool: &DbPool, table: SlugTable, name: &str) -> AppResult<String> {
    let base = slugify(name);
    if base.is_empty() {
        return Err(ValidationError::EmptySlug(name.to_string()).into());
    }

    let sql = format!("SELECT slug FROM {} WHERE slug LIKE $1", table.as_sql());
    let rows: Vec<(String,)> = sqlx::query_as(&sql)
        .bind(format!("{base}%"))
        .fetch_all(pool)
        .await?;
    let taken: HashSet<String> = rows.into_iter().map(|(slug,)| slug).collect();

    let slug = unique_slug(name, |candidate| taken.contains(candidate))?;
    if slug != base {
        tracing::debug!(table = table.as_sql(), %base, %slug, "slug collision resolved");
    }
    Ok(slug)
}

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination().normalize();

    let mut finder = Products::find();
    if let Some(slug) = query.category.as_ref().filter(|s| !s.is_empty()) {
        finder = finder
            .join(JoinType::InnerJoin, products::Relation::Categories.def())
            .filter(CatCol::Slug.eq(slug.clone()));
    }
    let finder = finder.order_by_desc(ProdCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(product_from_entity)
        .collect::<AppResult<Vec<Product>>>()?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Products", ProductList { items }, Some(meta)))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<ProductDetail>> {
    let detail = product_detail(state, id).await?;
    Ok(ApiResponse::success("Product", detail, None))
}

async fn product_detail(state: &AppState, id: Uuid) -> AppResult<ProductDetail> {
    let model = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let category = model
        .find_related(Categories)
        .one(&state.orm)
        .await?
        .map(category_from_entity)
        .ok_or(AppError::NotFound)?;

    let tags = model
        .find_related(Tags)
        .order_by_asc(TagCol::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(tag_from_entity)
        .collect();

    let product = product_from_entity(model)?;
    let first_five = product.first_five();
    Ok(ProductDetail {
        product,
        category,
        tags,
        first_five,
    })
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<ProductDetail>> {
    ensure_admin(user)?;

    let name = not_blank("name", payload.name)?;
    let price = price_in_range("price", payload.price)?;
    let discount = Discount::new(payload.discount)?;
    let quantity = non_negative("quantity", payload.quantity)?;
    let shipping_cost = price_in_range("shipping_cost", payload.shipping_cost)?;
    let specification = specification_object(payload.specification)?;
    ensure_category_exists(&state.orm, payload.category_id).await?;
    let tag_ids = existing_tag_ids(&state.orm, payload.tag_ids).await?;

    let txn = state.orm.begin().await?;
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        price: Set(price),
        discount: Set(discount.percent()),
        quantity: Set(quantity),
        shipping_cost: Set(shipping_cost),
        category_id: Set(payload.category_id),
        info: Set(payload.info),
        descriptions: Set(payload.descriptions),
        specification: Set(specification),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;
    replace_tags(&txn, product.id, &tag_ids).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "product_create",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    let detail = product_detail(state, product.id).await?;
    Ok(ApiResponse::success("Product created", detail, Some(Meta::empty())))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<ProductDetail>> {
    ensure_admin(user)?;
    let existing = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: ProductActive = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(not_blank("name", name)?);
    }
    if let Some(price) = payload.price {
        active.price = Set(price_in_range("price", price)?);
    }
    if let Some(discount) = payload.discount {
        active.discount = Set(Discount::new(discount)?.percent());
    }
    if let Some(quantity) = payload.quantity {
        active.quantity = Set(non_negative("quantity", quantity)?);
    }
    if let Some(shipping_cost) = payload.shipping_cost {
        active.shipping_cost = Set(price_in_range("shipping_cost", shipping_cost)?);
    }
    if let Some(category_id) = payload.category_id {
        ensure_category_exists(&state.orm, category_id).await?;
        active.category_id = Set(category_id);
    }
    if let Some(info) = payload.info {
        active.info = Set(info);
    }
    if let Some(descriptions) = payload.descriptions {
        active.descriptions = Set(descriptions);
    }
    if let Some(specification) = payload.specification {
        active.specification = Set(specification_object(Some(specification))?);
    }
    let tag_ids = match payload.tag_ids {
        Some(ids) => Some(existing_tag_ids(&state.orm, ids).await?),
        None => None,
    };
    active.updated_at = Set(Utc::now().into());

    let txn = state.orm.begin().await?;
    let product = active.update(&txn).await?;
    if let Some(tag_ids) = tag_ids {
        replace_tags(&txn, product.id, &tag_ids).await?;
    }
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "product_update",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    let detail = product_detail(state, product.id).await?;
    Ok(ApiResponse::success("Updated", detail, Some(Meta::empty())))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = Products::delete_by_id(id).exec(&state.orm).await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.pool,
        Some(user.user_id),
        "product_delete",
        "products",
        serde_json::json!({ "product_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn list_categories(state: &AppState) -> AppResult<ApiResponse<CategoryList>> {
    let items = Categories::find()
        .order_by_asc(CatCol::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(category_from_entity)
        .collect();
    Ok(ApiResponse::success("Categories", CategoryList { items }, None))
}

pub async fn create_category(
    state: &AppState,
    user: &AuthUser,
    payload: CreateCategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    ensure_admin(user)?;
    let name = not_blank("name", payload.name)?;
    if let Some(parent_id) = payload.parent_id {
        ensure_category_exists(&state.orm, parent_id).await?;
    }

    let mut attempt = 0;
    let category = loop {
        attempt += 1;
        let slug = generate_slug(&state.pool, SlugTable::Categories, &name).await?;
        let inserted = CategoryActive {
            id: Set(Uuid::new_v4()),
            name: Set(name.clone()),
            slug: Set(slug),
            parent_id: Set(payload.parent_id),
            created_at: NotSet,
        }
        .insert(&state.orm)
        .await;

        match inserted {
            Ok(category) => break category,
            Err(err) if is_unique_violation(&err) && attempt < SLUG_ATTEMPTS => {
                tracing::debug!(attempt, %name, "category slug taken concurrently, retrying");
            }
            Err(err) if is_unique_violation(&err) => {
                return Err(AppError::BadRequest("category slug is taken".into()));
            }
            Err(err) => return Err(err.into()),
        }
    };

    audit::record(
        &state.pool,
        Some(user.user_id),
        "category_create",
        "categories",
        serde_json::json!({ "category_id": category.id, "slug": category.slug }),
    )
    .await;

    Ok(ApiResponse::success(
        "Category created",
        category_from_entity(category),
        Some(Meta::empty()),
    ))
}

pub async fn list_tags(state: &AppState) -> AppResult<ApiResponse<TagList>> {
    let items = Tags::find()
        .order_by_asc(TagCol::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(tag_from_entity)
        .collect();
    Ok(ApiResponse::success("Tags", TagList { items }, None))
}

pub async fn create_tag(
    state: &AppState,
    user: &AuthUser,
    payload: CreateTagRequest,
) -> AppResult<ApiResponse<Tag>> {
    ensure_admin(user)?;
    let name = not_blank("name", payload.name)?;
    let exists = Tags::find()
        .filter(TagCol::Name.eq(name.clone()))
        .one(&state.orm)
        .await?;
    if exists.is_some() {
        return Err(AppError::BadRequest("Tag already exists".into()));
    }

    let mut attempt = 0;
    let tag = loop {
        attempt += 1;
        let slug = generate_slug(&state.pool, SlugTable::Tags, &name).await?;
        let inserted = TagActive {
            id: Set(Uuid::new_v4()),
            name: Set(name.clone()),
            slug: Set(slug),
            created_at: NotSet,
        }
        .insert(&state.orm)
        .await;

        match inserted {
            Ok(tag) => break tag,
            Err(err) if is_unique_violation(&err) => {
                let name_taken = Tags::find()
                    .filter(TagCol::Name.eq(name.clone()))
                    .one(&state.orm)
                    .await?
                    .is_some();
                if name_taken {
                    return Err(AppError::BadRequest("Tag already exists".into()));
                }
                if attempt >= SLUG_ATTEMPTS {
                    return Err(AppError::BadRequest("tag slug is taken".into()));
                }
                tracing::debug!(attempt, %name, "tag slug taken concurrently, retrying");
            }
            Err(err) => return Err(err.into()),
        }
    };

    audit::record(
        &state.pool,
        Some(user.user_id),
        "tag_create",
        "tags",
        serde_json::json!({ "tag_id": tag.id, "slug": tag.slug }),
    )
    .await;

    Ok(ApiResponse::success(
        "Tag created",
        tag_from_entity(tag),
        Some(Meta::empty()),
    ))
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

async fn ensure_category_exists<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<categories::Model> {
    Categories::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::BadRequest("category not found".into()))
}

async fn existing_tag_ids<C: ConnectionTrait>(conn: &C, ids: Vec<Uuid>) -> AppResult<Vec<Uuid>> {
    let wanted: HashSet<Uuid> = ids.into_iter().collect();
    if wanted.is_empty() {
        return Ok(Vec::new());
    }
    let found: Vec<Uuid> = Tags::find()
        .filter(TagCol::Id.is_in(wanted.iter().copied()))
        .all(conn)
        .await?
        .into_iter()
        .map(|tag| tag.id)
        .collect();
    if found.len() != wanted.len() {
        return Err(AppError::BadRequest("tag not found".into()));
    }
    Ok(found)
}

async fn replace_tags<C: ConnectionTrait>(conn: &C, product_id: Uuid, tag_ids: &[Uuid]) -> AppResult<()> {
    ProductTags::delete_many()
        .filter(ProductTagCol::ProductId.eq(product_id))
        .exec(conn)
        .await?;
    for tag_id in tag_ids {
        ProductTagActive {
            product_id: Set(product_id),
            tag_id: Set(*tag_id),
        }
        .insert(conn)
        .await?;
    }
    Ok(())
}

fn specification_object(value: Option<Value>) -> AppResult<Value> {
    match value {
        None | Some(Value::Null) => Ok(Value::Object(Default::default())),
        Some(Value::Object(map)) => Ok(Value::Object(map)),
        Some(_) => Err(AppError::BadRequest(
            "specification must be a JSON object".into(),
        )),
    }
}
