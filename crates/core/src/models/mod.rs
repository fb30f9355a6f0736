//! Domain models shared by the storefront server and the CLI.
//!
//! These are validated domain objects, independent of how a collaborator
//! stores or transmits them.

pub mod cart;
pub mod identity;
pub mod order;
pub mod product;
pub mod subscriber;

pub use cart::{Cart, CartError, CartItem, MAX_LINE_ITEMS, order_total, validate_items};
pub use identity::{IdentityId, IdentitySummary};
pub use order::{CustomerInfo, CustomerInfoError, NewOrder, Order};
pub use product::{
    Product, ProductDraft, ProductError, ProductFacets, ProductQuery, ProductSort, parse_tag_list,
};
pub use subscriber::Subscriber;
