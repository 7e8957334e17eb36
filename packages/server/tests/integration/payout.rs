use serde_json::json;

use crate::common::{TestApp, routes};

mod create {
    use super::*;

    #[tokio::test]
    async fn new_payout_is_pending_and_dated() {
        let app = TestApp::spawn().await;
        let token = app.create_registered_provider("uid-1", "Ada").await;

        let res = app
            .post_with_token(
                routes::PAYOUTS,
                &json!({"amount": "125.40", "method": "paypal"}),
                &token,
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["status"], "Pending");
        assert_eq!(res.body["amount"], "125.40");
        assert_eq!(res.body["method"], "paypal");
        assert!(res.body["date"].is_string());
        assert_eq!(res.body["id"].as_str().map(str::len), Some(20));
    }

    #[tokio::test]
    async fn non_positive_amount_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.create_registered_provider("uid-1", "Ada").await;

        for amount in ["0", "-3.50"] {
            let res = app
                .post_with_token(
                    routes::PAYOUTS,
                    &json!({"amount": amount, "method": "paypal"}),
                    &token,
                )
                .await;
            assert_eq!(res.status, 400, "{amount}");
            assert_eq!(res.body["code"], "VALIDATION_ERROR");
        }

        let list = app.get_with_token(routes::PAYOUTS, &token).await;
        assert_eq!(list.body, json!([]));
    }

    #[tokio::test]
    async fn blank_method_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.create_registered_provider("uid-1", "Ada").await;

        let res = app
            .post_with_token(routes::PAYOUTS, &json!({"amount": "5", "method": ""}), &token)
            .await;

        assert_eq!(res.status, 400);
    }
}

mod status {
    use super::*;

    #[tokio::test]
    async fn payout_moves_forward_only() {
        let app = TestApp::spawn().await;
        let token = app.create_registered_provider("uid-1", "Ada").await;
        let id = app.create_payout(&token, "10.00").await;

        let res = app
            .patch_with_token(&routes::payout_status(&id), &json!({"status": "Processing"}), &token)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["status"], "Processing");

        let res = app
            .patch_with_token(&routes::payout_status(&id), &json!({"status": "Completed"}), &token)
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["amount"], "10.00");

        let res = app
            .patch_with_token(&routes::payout_status(&id), &json!({"status": "Pending"}), &token)
            .await;
        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "CONFLICT");

        let loaded = app.get_with_token(&routes::payout(&id), &token).await;
        assert_eq!(loaded.body["status"], "Completed");
    }

    #[tokio::test]
    async fn repeating_the_current_status_succeeds() {
        let app = TestApp::spawn().await;
        let token = app.create_registered_provider("uid-1", "Ada").await;
        let id = app.create_payout(&token, "10.00").await;

        let res = app
            .patch_with_token(&routes::payout_status(&id), &json!({"status": "Pending"}), &token)
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["status"], "Pending");
    }

    #[tokio::test]
    async fn unknown_status_value_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.create_registered_provider("uid-1", "Ada").await;
        let id = app.create_payout(&token, "10.00").await;

        let res = app
            .patch_with_token(&routes::payout_status(&id), &json!({"status": "Refunded"}), &token)
            .await;

        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn status_of_unknown_payout_is_not_found() {
        let app = TestApp::spawn().await;
        let token = app.create_registered_provider("uid-1", "Ada").await;

        let res = app
            .patch_with_token(
                &routes::payout_status("ghost"),
                &json!({"status": "Completed"}),
                &token,
            )
            .await;

        assert_eq!(res.status, 404);
    }
}

mod listing {
    use super::*;

    #[tokio::test]
    async fn list_filters_by_status() {
        let app = TestApp::spawn().await;
        let token = app.create_registered_provider("uid-1", "Ada").await;
        let first = app.create_payout(&token, "10.00").await;
        app.create_payout(&token, "20.00").await;
        app.patch_with_token(
            &routes::payout_status(&first),
            &json!({"status": "Failed"}),
            &token,
        )
        .await;

        let all = app.get_with_token(routes::PAYOUTS, &token).await;
        assert_eq!(all.status, 200);
        assert_eq!(all.body.as_array().unwrap().len(), 2);

        let failed = app
            .get_with_token(&format!("{}?status=Failed", routes::PAYOUTS), &token)
            .await;
        let items = failed.body.as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["id"], first.as_str());
    }

    #[tokio::test]
    async fn delete_then_get_is_not_found() {
        let app = TestApp::spawn().await;
        let token = app.create_registered_provider("uid-1", "Ada").await;
        let id = app.create_payout(&token, "10.00").await;

        let res = app.delete_with_token(&routes::payout(&id), &token).await;
        assert_eq!(res.status, 204);

        let res = app.get_with_token(&routes::payout(&id), &token).await;
        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }
}
