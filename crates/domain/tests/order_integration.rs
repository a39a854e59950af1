//! Integration tests for the order model and credential resolution.

use chrono::Duration;
use domain::{
    AuthError, CreateOrder, JwtAuth, Order, OrderError, OrderStatus, Principal, Provider, Role,
};

fn request(total: serde_json::Value, products: serde_json::Value) -> Result<CreateOrder, OrderError> {
    let products = products.as_array().cloned();
    CreateOrder::from_request(Some(&total), products)
}

mod order_lifecycle {
    use super::*;

    #[test]
    fn request_to_paid_order() {
        let cmd = request(serde_json::json!(49.99), serde_json::json!(["sku-1", "sku-2"])).unwrap();
        let order_id = cmd.order_id;

        let mut order = Order::created(cmd, Provider::Stripe, "pi_123");
        assert_eq!(order.order_id, order_id);
        assert_eq!(order.status, OrderStatus::Created);
        assert_eq!(order.total_amount.cents(), 4999);
        assert_eq!(order.products.len(), 2);

        assert!(order.advance_to(OrderStatus::Paid).unwrap());
        assert!(order.is_paid());

        // Redelivered confirmation.
        assert!(!order.advance_to(OrderStatus::Paid).unwrap());
        assert!(order.is_paid());
    }

    #[test]
    fn paid_order_cannot_regress() {
        let cmd = request(serde_json::json!("10"), serde_json::json!([])).unwrap();
        let mut order = Order::created(cmd, Provider::PayPal, "PAYPAL-1");
        order.advance_to(OrderStatus::Paid).unwrap();

        let err = order.advance_to(OrderStatus::Created).unwrap_err();
        assert!(matches!(
            err,
            OrderError::InvalidStatusTransition {
                from: OrderStatus::Paid,
                to: OrderStatus::Created
            }
        ));
        assert!(order.is_paid());
    }

    #[test]
    fn each_command_gets_its_own_id() {
        let a = request(serde_json::json!(1), serde_json::json!([])).unwrap();
        let b = request(serde_json::json!(1), serde_json::json!([])).unwrap();
        assert_ne!(a.order_id, b.order_id);
    }

    #[test]
    fn order_serializes_in_camel_case() {
        let cmd = request(serde_json::json!(5), serde_json::json!(["sku-1"])).unwrap();
        let order = Order::created(cmd, Provider::PayPal, "PAYPAL-1");

        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["status"], "Created");
        assert_eq!(json["currency"], "USD");
        assert_eq!(json["provider"], "paypal");
        assert_eq!(json["providerReference"], "PAYPAL-1");

        let back: Order = serde_json::from_value(json).unwrap();
        assert_eq!(back, order);
    }
}

mod validation {
    use super::*;

    #[test]
    fn rejects_before_any_order_exists() {
        assert!(matches!(
            CreateOrder::from_request(None, Some(vec![])),
            Err(OrderError::MissingTotal)
        ));
        assert!(matches!(
            CreateOrder::from_request(Some(&serde_json::json!(10)), None),
            Err(OrderError::MissingProducts)
        ));
        assert!(matches!(
            request(serde_json::json!(0), serde_json::json!([])),
            Err(OrderError::NonPositiveAmount { .. })
        ));
        assert!(matches!(
            request(serde_json::json!(true), serde_json::json!([])),
            Err(OrderError::InvalidAmount { .. })
        ));
    }
}

mod credentials {
    use super::*;

    const SECRET: &[u8] = b"integration-secret";

    #[test]
    fn issued_tokens_resolve_to_their_principal() {
        let auth = JwtAuth::new(SECRET);

        for principal in [Principal::user("u-42"), Principal::vendor("v-7")] {
            let token = auth.issue(&principal, Duration::minutes(5)).unwrap();
            let resolved = auth.resolve(Some(&format!("Bearer {token}"))).unwrap();
            assert_eq!(resolved, principal);
        }
    }

    #[test]
    fn token_from_another_secret_is_unauthenticated() {
        let token = JwtAuth::new(b"other-secret")
            .issue(&Principal::user("u-1"), Duration::minutes(5))
            .unwrap();

        let err = JwtAuth::new(SECRET)
            .resolve(Some(&format!("Bearer {token}")))
            .unwrap_err();
        assert!(matches!(err, AuthError::Unauthenticated(_)));
    }

    #[test]
    fn vendor_role_scopes_to_vendor_id() {
        let auth = JwtAuth::new(SECRET);
        let token = auth
            .issue(&Principal::vendor("shop-1"), Duration::minutes(5))
            .unwrap();

        let principal = auth.verify(&token).unwrap();
        assert_eq!(principal.role, Role::Vendor);
        assert_eq!(principal.subject_id.as_str(), "shop-1");
    }
}
