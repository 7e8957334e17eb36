use serde_json::json;

use crate::common::{TestApp, routes, token_for};

mod registration {
    use super::*;

    #[tokio::test]
    async fn provider_can_register_with_a_valid_credential() {
        let app = TestApp::spawn().await;

        let res = app
            .post_with_token(routes::REGISTER, &json!({"name": "Ada's Rack"}), &token_for("uid-1"))
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["name"], "Ada's Rack");
        assert_eq!(res.body["subject_id"], "uid-1");
        assert_eq!(res.body["email"], "uid-1@idp.example");
        assert!(res.body["id"].as_str().is_some_and(|id| !id.is_empty()));
        assert_eq!(res.body["created_at"], res.body["last_login"]);
    }

    #[tokio::test]
    async fn explicit_email_overrides_the_identity_email() {
        let app = TestApp::spawn().await;

        let res = app
            .post_with_token(
                routes::REGISTER,
                &json!({"name": "Ada", "email": "ops@ada.example"}),
                &token_for("uid-1"),
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["email"], "ops@ada.example");
    }

    #[tokio::test]
    async fn cannot_register_the_same_subject_twice() {
        let app = TestApp::spawn().await;
        let token = app.create_registered_provider("uid-1", "Ada").await;

        let res = app
            .post_with_token(routes::REGISTER, &json!({"name": "Impostor"}), &token)
            .await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "CONFLICT");

        let me = app.get_with_token(routes::ME, &token).await;
        assert_eq!(me.body["name"], "Ada");
    }

    #[tokio::test]
    async fn cannot_register_without_a_name() {
        let app = TestApp::spawn().await;

        let res = app
            .post_with_token(routes::REGISTER, &json!({"name": "  "}), &token_for("uid-1"))
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn cannot_register_with_a_forged_credential() {
        let app = TestApp::spawn().await;

        let res = app
            .post_with_token(routes::REGISTER, &json!({"name": "Ada"}), "not-a-jwt")
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_INVALID");
    }

    #[tokio::test]
    async fn cannot_register_without_a_credential() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(routes::REGISTER, &json!({"name": "Ada"}))
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_MISSING");
    }
}

mod login {
    use super::*;

    #[tokio::test]
    async fn registered_provider_can_log_in() {
        let app = TestApp::spawn().await;
        let token = app.create_registered_provider("uid-1", "Ada").await;

        let res = app.post_with_token(routes::LOGIN, &json!({}), &token).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["subject_id"], "uid-1");
        assert_eq!(res.body["name"], "Ada");
    }

    #[tokio::test]
    async fn unregistered_subject_cannot_log_in() {
        let app = TestApp::spawn().await;

        let res = app
            .post_with_token(routes::LOGIN, &json!({}), &token_for("uid-2"))
            .await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
        assert!(res.body["message"].as_str().unwrap().contains("register"));
    }

    #[tokio::test]
    async fn token_signed_with_another_secret_is_rejected() {
        let app = TestApp::spawn().await;
        app.create_registered_provider("uid-1", "Ada").await;
        let forged =
            server::utils::jwt::sign("uid-1", None, "wrong-secret", chrono::Duration::hours(1))
                .unwrap();

        let res = app.post_with_token(routes::LOGIN, &json!({}), &forged).await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_INVALID");
    }
}

mod authenticated_access {
    use super::*;

    #[tokio::test]
    async fn me_returns_the_current_provider() {
        let app = TestApp::spawn().await;
        let token = app.create_registered_provider("uid-1", "Ada").await;

        let res = app.get_with_token(routes::ME, &token).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["subject_id"], "uid-1");
    }

    #[tokio::test]
    async fn me_requires_registration() {
        let app = TestApp::spawn().await;

        let res = app.get_with_token(routes::ME, &token_for("uid-9")).await;

        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn protected_routes_reject_missing_tokens() {
        let app = TestApp::spawn().await;

        for path in [routes::ME, routes::VMS, routes::PAYOUTS] {
            let res = app.get_without_token(path).await;
            assert_eq!(res.status, 401, "{path}");
            assert_eq!(res.body["code"], "TOKEN_MISSING", "{path}");
        }
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token("/api-docs/openapi.json").await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["info"]["title"], "ProviderHub API");
    }
}
