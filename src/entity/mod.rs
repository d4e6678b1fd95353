pub mod addresses;
pub mod audit_logs;
pub mod cart_items;
pub mod categories;
pub mod credit_cards;
pub mod order_items;
pub mod orders;
pub mod product_tags;
pub mod products;
pub mod tags;
pub mod users;

pub use addresses::Entity as Addresses;
pub use audit_logs::Entity as AuditLogs;
pub use cart_items::Entity as CartItems;
pub use categories::Entity as Categories;
pub use credit_cards::Entity as CreditCards;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use product_tags::Entity as ProductTags;
pub use products::Entity as Products;
pub use tags::Entity as Tags;
pub use users::Entity as Users;
