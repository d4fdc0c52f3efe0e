//! 集成测试公共夹具

#![allow(dead_code)]

use shared::models::{OrderCreate, OrderItemInput, Product, ProductCreate, ShippingAddress, User, UserCreate};
use store_server::InventoryLedger;
use store_server::db::repository::user as user_repo;
use sqlx::SqlitePool;

pub async fn user(pool: &SqlitePool, name: &str, role: Option<&str>) -> User {
    user_repo::create(
        pool,
        UserCreate {
            name: name.into(),
            email: format!("{}@example.com", name.to_lowercase()),
            role: role.map(str::to_string),
        },
    )
    .await
    .unwrap()
}

pub async fn product(ledger: &InventoryLedger, sku: &str, price: f64, stock: i64) -> Product {
    ledger
        .create_product(ProductCreate {
            sku: sku.into(),
            name: format!("Product {sku}"),
            price,
            image: None,
            stock: Some(stock),
            min_stock: Some(2),
        })
        .await
        .unwrap()
}

pub fn order_input(lines: &[(i64, i64)]) -> OrderCreate {
    OrderCreate {
        items: lines
            .iter()
            .map(|&(product_id, quantity)| OrderItemInput {
                product_id,
                quantity,
            })
            .collect(),
        shipping_address: ShippingAddress {
            full_name: "Linus Pauling".into(),
            street: "12 Bond St".into(),
            city: "Portland".into(),
            state: Some("OR".into()),
            postal_code: "97201".into(),
            country: "US".into(),
            phone: None,
        },
        payment_method: "card".into(),
        tax: None,
        shipping_cost: None,
        notes: Some("leave at the door".into()),
    }
}
