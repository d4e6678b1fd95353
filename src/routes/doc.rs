use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        account::{Profile, UpdateProfileRequest},
        addresses::{AddressList, CreateAddressRequest, UpdateAddressRequest},
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        cart::{CartLineDto, CartView, QuantityUpdate, UpdateQuantityRequest},
        catalog::{
            CategoryList, CreateCategoryRequest, CreateProductRequest, CreateTagRequest,
            ProductDetail, ProductList, TagList, UpdateProductRequest,
        },
        orders::{
            CheckoutView, CreateOrderRequest, CreditCardInput, OrderDetail, OrderItemLine,
            OrderList, OrderSummary, UpdateOrderStatusRequest,
        },
    },
    models::{
        Address, CartItem, Category, Order, OrderItem, OrderStatus, PaymentMethod, Product, Tag,
        User,
    },
    pricing::{TaxedTotals, Totals},
    response::{ApiResponse, Meta},
    routes::{account, addresses, admin, auth, cart, catalog, health, orders, params},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::login,
        auth::register,
        account::get_profile,
        account::update_profile,
        catalog::list_products,
        catalog::get_product,
        catalog::create_product,
        catalog::update_product,
        catalog::delete_product,
        catalog::list_categories,
        catalog::create_category,
        catalog::list_tags,
        catalog::create_tag,
        cart::cart_list,
        cart::add_to_cart,
        cart::update_quantity,
        cart::remove_from_cart,
        addresses::list_addresses,
        addresses::create_address,
        addresses::update_address,
        orders::list_orders,
        orders::checkout_summary,
        orders::checkout,
        orders::get_order,
        admin::update_order_status,
        admin::delete_order
    ),
    components(
        schemas(
            User,
            Product,
            Category,
            Tag,
            CartItem,
            Address,
            Order,
            OrderItem,
            OrderStatus,
            PaymentMethod,
            Totals,
            TaxedTotals,
            health::HealthData,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            Profile,
            UpdateProfileRequest,
            CreateProductRequest,
            UpdateProductRequest,
            ProductList,
            ProductDetail,
            CreateCategoryRequest,
            CategoryList,
            CreateTagRequest,
            TagList,
            CartLineDto,
            CartView,
            UpdateQuantityRequest,
            QuantityUpdate,
            CreateAddressRequest,
            UpdateAddressRequest,
            AddressList,
            CreditCardInput,
            CreateOrderRequest,
            OrderItemLine,
            OrderSummary,
            OrderList,
            OrderDetail,
            CheckoutView,
            UpdateOrderStatusRequest,
            params::Pagination,
            params::ProductQuery,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<ProductDetail>,
            ApiResponse<CartView>,
            ApiResponse<OrderDetail>,
            ApiResponse<OrderList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Account", description = "Profile endpoints"),
        (name = "Products", description = "Product endpoints"),
        (name = "Categories", description = "Category endpoints"),
        (name = "Tags", description = "Tag endpoints"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Addresses", description = "Shipping address endpoints"),
        (name = "Orders", description = "Checkout and order endpoints"),
        (name = "Admin", description = "Admin endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/api/products",
            "/api/products/{id}",
            "/api/cart/{product_id}",
            "/api/cart/items/{id}",
            "/api/orders/checkout",
            "/api/admin/orders/{id}/status",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
