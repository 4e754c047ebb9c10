use sqlinq::prelude::*;
use sqlinq::Row;

#[derive(Debug, PartialEq, Entity)]
#[entity(table = "orders", key = "order_no")]
struct Order {
    order_no: i64,
    customer: String,
    #[column(name = "amount_cents")]
    amount: i64,
    #[column(skip)]
    cached_label: String,
}

#[test]
fn test_derived_schema_through_facade() {
    assert_eq!(Order::table_name(), "orders");
    assert_eq!(Order::columns(), &["order_no", "customer", "amount_cents"]);
    assert_eq!(Order::key_column(), Some("order_no"));
    assert!(Order::generated_columns().is_empty());
}

#[test]
fn test_derived_row_mapping_through_facade() {
    let row = Row::from_pairs([
        ("order_no", Value::Int(9)),
        ("customer", Value::from("acme")),
        ("amount_cents", Value::Int(1250)),
    ]);
    let order = Order::from_row(&row).unwrap();
    assert_eq!(
        order,
        Order {
            order_no: 9,
            customer: "acme".into(),
            amount: 1250,
            cached_label: String::new(),
        }
    );
    assert_eq!(order.field_value("amount_cents"), Some(Value::Int(1250)));
    assert_eq!(order.field_value("cached_label"), None);
}
