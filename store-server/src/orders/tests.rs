use super::*;
use crate::db::DbService;
use crate::db::repository::user as user_repo;
use crate::inventory::InventoryLedger;
use shared::models::{
    OrderCreate, OrderFilter, OrderItemInput, OrderStatus, PageRequest, PaymentStatus, Product,
    ProductCreate, ShippingAddress, StatusUpdate, UserCreate,
};

struct Fixture {
    engine: OrderEngine,
    ledger: InventoryLedger,
    db: DbService,
    customer: Actor,
    admin: Actor,
}

async fn setup() -> Fixture {
    let db = DbService::in_memory().await.unwrap();
    let customer = user_repo::create(
        &db.pool,
        UserCreate {
            name: "Grace".into(),
            email: "grace@example.com".into(),
            role: None,
        },
    )
    .await
    .unwrap();
    let admin = user_repo::create(
        &db.pool,
        UserCreate {
            name: "Root".into(),
            email: "root@example.com".into(),
            role: Some("admin".into()),
        },
    )
    .await
    .unwrap();

    Fixture {
        engine: OrderEngine::new(db.pool.clone(), DEFAULT_RETRY_ATTEMPTS),
        ledger: InventoryLedger::new(db.pool.clone()),
        customer: Actor::customer(customer.id),
        admin: Actor::admin(admin.id),
        db,
    }
}

async fn product(f: &Fixture, sku: &str, price: f64, stock: i64) -> Product {
    f.ledger
        .create_product(ProductCreate {
            sku: sku.into(),
            name: format!("Product {sku}"),
            price,
            image: Some(format!("/img/{sku}.png")),
            stock: Some(stock),
            min_stock: Some(0),
        })
        .await
        .unwrap()
}

fn address() -> ShippingAddress {
    ShippingAddress {
        full_name: "Grace Hopper".into(),
        street: "1 Compiler Rd".into(),
        city: "Arlington".into(),
        state: Some("VA".into()),
        postal_code: "22201".into(),
        country: "US".into(),
        phone: None,
    }
}

fn order_input(lines: &[(i64, i64)]) -> OrderCreate {
    OrderCreate {
        items: lines
            .iter()
            .map(|&(product_id, quantity)| OrderItemInput {
                product_id,
                quantity,
            })
            .collect(),
        shipping_address: address(),
        payment_method: "card".into(),
        tax: Some(1.5),
        shipping_cost: Some(5.0),
        notes: None,
    }
}

async fn stock_of(f: &Fixture, product_id: i64) -> (i64, i64) {
    let p = f.ledger.get_product(product_id).await.unwrap();
    (p.stock, p.sold_count)
}

// ========================================================================
// createOrder
// ========================================================================

#[tokio::test]
async fn test_create_order_snapshots_and_totals() {
    let f = setup().await;
    let a = product(&f, "A", 12.5, 10).await;
    let b = product(&f, "B", 0.1, 10).await;

    let order = f
        .engine
        .create_order(&f.customer, order_input(&[(a.id, 2), (b.id, 3)]))
        .await
        .unwrap();

    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    assert_eq!(order.user_id, f.customer.user_id);
    assert_eq!(order.items.len(), 2);
    assert_eq!(order.items[0].sku, "A");
    assert_eq!(order.items[0].image, "/img/A.png");
    assert_eq!(order.subtotal, 25.3);
    assert_eq!(order.total, 31.8);

    assert_eq!(stock_of(&f, a.id).await, (8, 2));
    assert_eq!(stock_of(&f, b.id).await, (7, 3));

    let user = user_repo::find_by_id(&f.db.pool, f.customer.user_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.total_orders, 1);
    assert_eq!(user.total_spent, 31.8);

    // stored copy matches what was returned
    let stored = f.engine.get_order(&f.customer, order.id).await.unwrap();
    assert_eq!(stored.items, order.items);
    assert_eq!(stored.total, order.total);
}

#[tokio::test]
async fn test_snapshot_survives_price_change() {
    let f = setup().await;
    let a = product(&f, "A", 10.0, 5).await;
    let order = f
        .engine
        .create_order(&f.customer, order_input(&[(a.id, 1)]))
        .await
        .unwrap();

    sqlx::query("UPDATE product SET price = 99.0, name = 'Renamed' WHERE id = ?")
        .bind(a.id)
        .execute(&f.db.pool)
        .await
        .unwrap();

    let stored = f.engine.get_order(&f.admin, order.id).await.unwrap();
    assert_eq!(stored.items[0].price, 10.0);
    assert_eq!(stored.items[0].name, "Product A");
}

#[tokio::test]
async fn test_create_order_is_all_or_nothing() {
    let f = setup().await;
    let a = product(&f, "A", 1.0, 10).await;
    let b = product(&f, "B", 1.0, 2).await;

    let err = f
        .engine
        .create_order(&f.customer, order_input(&[(a.id, 5), (b.id, 3)]))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        OrderError::InsufficientStock { product_id, requested: 3, available: 2 } if product_id == b.id
    ));

    // the earlier line's decrement did not survive
    assert_eq!(stock_of(&f, a.id).await, (10, 0));
    assert_eq!(stock_of(&f, b.id).await, (2, 0));
    let user = user_repo::find_by_id(&f.db.pool, f.customer.user_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.total_orders, 0);
    let page = f
        .engine
        .list_orders_admin(&f.admin, &OrderFilter::default(), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn test_create_order_unknown_product_or_user() {
    let f = setup().await;
    let a = product(&f, "A", 1.0, 10).await;

    let err = f
        .engine
        .create_order(&f.customer, order_input(&[(a.id, 1), (404, 1)]))
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::ProductNotFound(404)));

    let ghost = Actor::customer(777);
    let err = f
        .engine
        .create_order(&ghost, order_input(&[(a.id, 1)]))
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::UserNotFound(777)));
    assert_eq!(stock_of(&f, a.id).await, (10, 0));
}

#[tokio::test]
async fn test_duplicate_lines_merge_into_one_snapshot() {
    let f = setup().await;
    let a = product(&f, "A", 2.0, 10).await;
    let order = f
        .engine
        .create_order(&f.customer, order_input(&[(a.id, 2), (a.id, 3)]))
        .await
        .unwrap();
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].quantity, 5);
    assert_eq!(stock_of(&f, a.id).await, (5, 5));
}

// ========================================================================
// transitionStatus
// ========================================================================

#[tokio::test]
async fn test_cancel_restocks_exactly_once() {
    let f = setup().await;
    let p = product(&f, "P", 4.0, 10).await;
    let order = f
        .engine
        .create_order(&f.customer, order_input(&[(p.id, 3)]))
        .await
        .unwrap();
    assert_eq!(stock_of(&f, p.id).await, (7, 3));

    let cancelled = f
        .engine
        .transition_status(&f.customer, order.id, StatusUpdate::to(OrderStatus::Cancelled))
        .await
        .unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(cancelled.payment_status, PaymentStatus::Failed);
    assert_eq!(stock_of(&f, p.id).await, (10, 0));

    let again = f
        .engine
        .transition_status(&f.admin, order.id, StatusUpdate::to(OrderStatus::Cancelled))
        .await
        .unwrap();
    assert_eq!(again.version, cancelled.version);
    assert_eq!(stock_of(&f, p.id).await, (10, 0));

    // cancelled is terminal
    let err = f
        .engine
        .transition_status(&f.admin, order.id, StatusUpdate::to(OrderStatus::Returned))
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::InvalidTransition { .. }));
    assert_eq!(stock_of(&f, p.id).await, (10, 0));
}

#[tokio::test]
async fn test_return_restocks_once_and_refunds() {
    let f = setup().await;
    let p = product(&f, "P", 4.0, 10).await;
    let order = f
        .engine
        .create_order(&f.customer, order_input(&[(p.id, 2)]))
        .await
        .unwrap();
    f.engine
        .transition_payment_status(&f.admin, order.id, PaymentStatus::Paid)
        .await
        .unwrap();
    f.engine
        .transition_status(&f.admin, order.id, StatusUpdate::to(OrderStatus::Delivered))
        .await
        .unwrap();

    let returned = f
        .engine
        .transition_status(
            &f.admin,
            order.id,
            StatusUpdate {
                status: OrderStatus::Returned,
                tracking_number: None,
                return_reason: Some("wrong size".into()),
            },
        )
        .await
        .unwrap();
    assert!(returned.is_returned);
    assert!(returned.return_date.is_some());
    assert_eq!(returned.return_reason.as_deref(), Some("wrong size"));
    assert_eq!(returned.payment_status, PaymentStatus::Refunded);
    assert_eq!(stock_of(&f, p.id).await, (10, 0));

    let again = f
        .engine
        .transition_status(&f.admin, order.id, StatusUpdate::to(OrderStatus::Returned))
        .await
        .unwrap();
    assert_eq!(again.return_date, returned.return_date);
    assert_eq!(stock_of(&f, p.id).await, (10, 0));
}

#[tokio::test]
async fn test_delivered_at_is_set_once() {
    let f = setup().await;
    let p = product(&f, "P", 4.0, 10).await;
    let order = f
        .engine
        .create_order(&f.customer, order_input(&[(p.id, 1)]))
        .await
        .unwrap();

    let shipped = f
        .engine
        .transition_status(
            &f.admin,
            order.id,
            StatusUpdate {
                status: OrderStatus::Shipped,
                tracking_number: Some("TRACK-1".into()),
                return_reason: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(shipped.tracking_number.as_deref(), Some("TRACK-1"));

    let delivered = f
        .engine
        .transition_status(&f.admin, order.id, StatusUpdate::to(OrderStatus::Delivered))
        .await
        .unwrap();
    let first = delivered.delivered_at.expect("delivered_at set");

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let again = f
        .engine
        .transition_status(&f.admin, order.id, StatusUpdate::to(OrderStatus::Delivered))
        .await
        .unwrap();
    assert_eq!(again.delivered_at, Some(first));

    // delivery never touches stock
    assert_eq!(stock_of(&f, p.id).await, (9, 1));
}

#[tokio::test]
async fn test_transition_unknown_order() {
    let f = setup().await;
    let err = f
        .engine
        .transition_status(&f.admin, 404, StatusUpdate::to(OrderStatus::Shipped))
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::OrderNotFound(404)));
}

// ========================================================================
// Authorization
// ========================================================================

#[tokio::test]
async fn test_customer_permissions() {
    let f = setup().await;
    let p = product(&f, "P", 4.0, 10).await;
    let order = f
        .engine
        .create_order(&f.customer, order_input(&[(p.id, 1)]))
        .await
        .unwrap();
    let stranger = Actor::customer(f.customer.user_id + 1);

    assert!(matches!(
        f.engine.get_order(&stranger, order.id).await,
        Err(OrderError::NotOrderOwner(_))
    ));
    assert!(matches!(
        f.engine
            .transition_status(&stranger, order.id, StatusUpdate::to(OrderStatus::Cancelled))
            .await,
        Err(OrderError::NotOrderOwner(_))
    ));
    assert!(matches!(
        f.engine
            .transition_status(&f.customer, order.id, StatusUpdate::to(OrderStatus::Shipped))
            .await,
        Err(OrderError::Unauthorized(_))
    ));
    assert!(matches!(
        f.engine
            .transition_payment_status(&f.customer, order.id, PaymentStatus::Paid)
            .await,
        Err(OrderError::Unauthorized(_))
    ));
    assert!(matches!(
        f.engine.delete_order(&f.customer, order.id).await,
        Err(OrderError::Unauthorized(_))
    ));

    // once processing, the customer can no longer cancel
    f.engine
        .transition_status(&f.admin, order.id, StatusUpdate::to(OrderStatus::Processing))
        .await
        .unwrap();
    assert!(matches!(
        f.engine
            .transition_status(&f.customer, order.id, StatusUpdate::to(OrderStatus::Cancelled))
            .await,
        Err(OrderError::Unauthorized(_))
    ));
    assert_eq!(stock_of(&f, p.id).await, (9, 1));
}

// ========================================================================
// transitionPaymentStatus / deleteOrder
// ========================================================================

#[tokio::test]
async fn test_payment_transitions() {
    let f = setup().await;
    let p = product(&f, "P", 4.0, 10).await;
    let order = f
        .engine
        .create_order(&f.customer, order_input(&[(p.id, 1)]))
        .await
        .unwrap();

    let paid = f
        .engine
        .transition_payment_status(&f.admin, order.id, PaymentStatus::Paid)
        .await
        .unwrap();
    assert_eq!(paid.payment_status, PaymentStatus::Paid);
    assert_eq!(paid.status, OrderStatus::Pending);

    let cancelled = f
        .engine
        .transition_status(&f.admin, order.id, StatusUpdate::to(OrderStatus::Cancelled))
        .await
        .unwrap();
    assert_eq!(cancelled.payment_status, PaymentStatus::Refunded);

    let err = f
        .engine
        .transition_payment_status(&f.admin, order.id, PaymentStatus::Paid)
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::InvalidPaymentTransition { .. }));
    assert_eq!(stock_of(&f, p.id).await, (10, 0));
}

#[tokio::test]
async fn test_delete_open_order_restocks() {
    let f = setup().await;
    let p = product(&f, "P", 4.0, 10).await;
    let open = f
        .engine
        .create_order(&f.customer, order_input(&[(p.id, 4)]))
        .await
        .unwrap();
    let delivered = f
        .engine
        .create_order(&f.customer, order_input(&[(p.id, 1)]))
        .await
        .unwrap();
    f.engine
        .transition_status(&f.admin, delivered.id, StatusUpdate::to(OrderStatus::Delivered))
        .await
        .unwrap();
    assert_eq!(stock_of(&f, p.id).await, (5, 5));

    f.engine.delete_order(&f.admin, open.id).await.unwrap();
    assert_eq!(stock_of(&f, p.id).await, (9, 1));

    // delivered goods stay sold
    f.engine.delete_order(&f.admin, delivered.id).await.unwrap();
    assert_eq!(stock_of(&f, p.id).await, (9, 1));

    assert!(matches!(
        f.engine.get_order(&f.admin, open.id).await,
        Err(OrderError::OrderNotFound(_))
    ));
    assert!(matches!(
        f.engine.delete_order(&f.admin, open.id).await,
        Err(OrderError::OrderNotFound(_))
    ));

    // user aggregates are never reversed
    let user = user_repo::find_by_id(&f.db.pool, f.customer.user_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.total_orders, 2);
}

// ========================================================================
// Read paths
// ========================================================================

#[tokio::test]
async fn test_list_orders_filters_and_pages() {
    let f = setup().await;
    let p = product(&f, "P", 1.0, 100).await;
    let mut ids = Vec::new();
    for _ in 0..5 {
        let order = f
            .engine
            .create_order(&f.customer, order_input(&[(p.id, 1)]))
            .await
            .unwrap();
        ids.push(order.id);
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }
    let admin_order = f
        .engine
        .create_order(&f.admin, order_input(&[(p.id, 1)]))
        .await
        .unwrap();
    f.engine
        .transition_status(&f.admin, ids[0], StatusUpdate::to(OrderStatus::Cancelled))
        .await
        .unwrap();

    let mine = f
        .engine
        .list_orders_for_user(&f.customer, PageRequest::new(1, 2))
        .await
        .unwrap();
    assert_eq!(mine.total, 5);
    assert_eq!(mine.total_pages, 3);
    assert_eq!(mine.items.len(), 2);
    // newest first
    assert_eq!(mine.items[0].id, ids[4]);
    assert_eq!(mine.items[1].id, ids[3]);
    assert!(mine.items.iter().all(|o| o.items.len() == 1));

    let cancelled = f
        .engine
        .list_orders_admin(
            &f.admin,
            &OrderFilter {
                status: Some(OrderStatus::Cancelled),
                ..Default::default()
            },
            PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(cancelled.total, 1);
    assert_eq!(cancelled.items[0].id, ids[0]);

    let by_user = f
        .engine
        .list_orders_admin(
            &f.admin,
            &OrderFilter {
                user_id: Some(f.admin.user_id),
                ..Default::default()
            },
            PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(by_user.total, 1);
    assert_eq!(by_user.items[0].id, admin_order.id);

    assert!(matches!(
        f.engine
            .list_orders_admin(&f.customer, &OrderFilter::default(), PageRequest::default())
            .await,
        Err(OrderError::Unauthorized(_))
    ));
}
