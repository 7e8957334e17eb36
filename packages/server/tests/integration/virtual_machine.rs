use serde_json::json;

use crate::common::{TestApp, routes};

mod crud {
    use super::*;

    #[tokio::test]
    async fn created_vm_has_defaults_and_empty_history() {
        let app = TestApp::spawn().await;
        let token = app.create_registered_provider("uid-1", "Ada").await;

        let res = app
            .post_with_token(
                routes::VMS,
                &json!({"name": "worker", "cpu_cores": 4, "ram_gb": 16}),
                &token,
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert!(res.body["vm_id"].as_str().is_some_and(|id| !id.is_empty()));
        assert_eq!(res.body["client"], "Unknown");
        assert_eq!(res.body["status"], "Stopped");
        assert_eq!(res.body["cpu_cores"], 4);
        assert_eq!(res.body["cpu_history"], json!([]));
    }

    #[tokio::test]
    async fn get_returns_the_created_vm() {
        let app = TestApp::spawn().await;
        let token = app.create_registered_provider("uid-1", "Ada").await;
        let id = app.create_vm(&token, "vm-1", "worker").await;

        let res = app.get_with_token(&routes::vm(&id), &token).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["vm_id"], "vm-1");
        assert_eq!(res.body["name"], "worker");
        assert_eq!(res.body["cost_per_hour"], "1.25");
    }

    #[tokio::test]
    async fn get_unknown_vm_is_not_found() {
        let app = TestApp::spawn().await;
        let token = app.create_registered_provider("uid-1", "Ada").await;

        let res = app.get_with_token(&routes::vm("ghost"), &token).await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn create_rejects_missing_fields() {
        let app = TestApp::spawn().await;
        let token = app.create_registered_provider("uid-1", "Ada").await;

        let res = app
            .post_with_token(routes::VMS, &json!({"name": "worker"}), &token)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn patch_changes_only_the_given_fields() {
        let app = TestApp::spawn().await;
        let token = app.create_registered_provider("uid-1", "Ada").await;
        let id = app.create_vm(&token, "vm-1", "worker").await;

        let res = app
            .patch_with_token(
                &routes::vm(&id),
                &json!({"status": "Running", "client": "Acme"}),
                &token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["status"], "Running");
        assert_eq!(res.body["client"], "Acme");
        assert_eq!(res.body["name"], "worker");
        assert_eq!(res.body["ram_gb"], 32);

        let loaded = app.get_with_token(&routes::vm(&id), &token).await;
        assert_eq!(loaded.body, res.body);
    }

    #[tokio::test]
    async fn patch_unknown_vm_does_not_create_it() {
        let app = TestApp::spawn().await;
        let token = app.create_registered_provider("uid-1", "Ada").await;

        let res = app
            .patch_with_token(&routes::vm("ghost"), &json!({"name": "x"}), &token)
            .await;
        assert_eq!(res.status, 404);

        let res = app.get_with_token(&routes::vm("ghost"), &token).await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn empty_patch_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.create_registered_provider("uid-1", "Ada").await;
        let id = app.create_vm(&token, "vm-1", "worker").await;

        let res = app.patch_with_token(&routes::vm(&id), &json!({}), &token).await;

        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn delete_removes_the_vm() {
        let app = TestApp::spawn().await;
        let token = app.create_registered_provider("uid-1", "Ada").await;
        let id = app.create_vm(&token, "vm-1", "worker").await;

        let res = app.delete_with_token(&routes::vm(&id), &token).await;
        assert_eq!(res.status, 204);

        let res = app.get_with_token(&routes::vm(&id), &token).await;
        assert_eq!(res.status, 404);

        let res = app.delete_with_token(&routes::vm(&id), &token).await;
        assert_eq!(res.status, 404);
    }
}

mod listing {
    use super::*;

    #[tokio::test]
    async fn list_filters_by_status() {
        let app = TestApp::spawn().await;
        let token = app.create_registered_provider("uid-1", "Ada").await;
        app.create_vm(&token, "vm-1", "a").await;
        app.create_vm(&token, "vm-2", "b").await;
        app.patch_with_token(&routes::vm("vm-2"), &json!({"status": "Running"}), &token)
            .await;

        let all = app.get_with_token(routes::VMS, &token).await;
        assert_eq!(all.status, 200);
        assert_eq!(all.body["items"].as_array().unwrap().len(), 2);
        assert!(all.body["next_cursor"].is_null());

        let running = app
            .get_with_token(&format!("{}?status=Running", routes::VMS), &token)
            .await;
        let items = running.body["items"].as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["vm_id"], "vm-2");
    }

    #[tokio::test]
    async fn unknown_status_is_a_validation_error() {
        let app = TestApp::spawn().await;
        let token = app.create_registered_provider("uid-1", "Ada").await;

        let res = app
            .get_with_token(&format!("{}?status=Exploded", routes::VMS), &token)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn pages_walk_every_vm_once() {
        let app = TestApp::spawn().await;
        let token = app.create_registered_provider("uid-1", "Ada").await;
        for i in 0..5 {
            app.create_vm(&token, &format!("vm-{i}"), "worker").await;
        }

        let mut seen = Vec::new();
        let mut path = format!("{}?limit=2", routes::VMS);
        loop {
            let res = app.get_with_token(&path, &token).await;
            assert_eq!(res.status, 200, "{}", res.text);
            for item in res.body["items"].as_array().unwrap() {
                seen.push(item["vm_id"].as_str().unwrap().to_string());
            }
            match res.body["next_cursor"].as_str() {
                Some(cursor) => path = format!("{}?limit=2&cursor={cursor}", routes::VMS),
                None => break,
            }
        }

        assert_eq!(seen, ["vm-0", "vm-1", "vm-2", "vm-3", "vm-4"]);
    }

    #[tokio::test]
    async fn garbage_cursor_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.create_registered_provider("uid-1", "Ada").await;

        let res = app
            .get_with_token(&format!("{}?cursor=zz-not-hex", routes::VMS), &token)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }
}

mod metrics {
    use super::*;

    #[tokio::test]
    async fn samples_update_gauges_and_history() {
        let app = TestApp::spawn().await;
        let token = app.create_registered_provider("uid-1", "Ada").await;
        let id = app.create_vm(&token, "vm-1", "worker").await;

        let res = app
            .post_with_token(
                &routes::vm_metrics(&id),
                &json!({"cpu": 10.0, "gpu": 20.0, "ram": 30.0}),
                &token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["current_cpu_usage"], 10.0);
        assert_eq!(res.body["gpu_history"], json!([20.0]));
        assert_eq!(res.body["ram_history"], json!([30.0]));
    }

    #[tokio::test]
    async fn history_keeps_only_the_last_twenty_samples() {
        let app = TestApp::spawn().await;
        let token = app.create_registered_provider("uid-1", "Ada").await;
        let id = app.create_vm(&token, "vm-1", "worker").await;

        for i in 0..25 {
            let res = app
                .post_with_token(
                    &routes::vm_metrics(&id),
                    &json!({"cpu": i as f64, "gpu": 0.0, "ram": 0.0}),
                    &token,
                )
                .await;
            assert_eq!(res.status, 200, "{}", res.text);
        }

        let res = app.get_with_token(&routes::vm(&id), &token).await;
        let history: Vec<f64> = res.body["cpu_history"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_f64().unwrap())
            .collect();
        let expected: Vec<f64> = (5..25).map(|i| i as f64).collect();
        assert_eq!(history, expected);
        assert_eq!(res.body["gpu_history"].as_array().unwrap().len(), 20);
    }

    #[tokio::test]
    async fn out_of_range_sample_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.create_registered_provider("uid-1", "Ada").await;
        let id = app.create_vm(&token, "vm-1", "worker").await;

        let res = app
            .post_with_token(
                &routes::vm_metrics(&id),
                &json!({"cpu": 101.0, "gpu": 0.0, "ram": 0.0}),
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn sample_for_unknown_vm_is_not_found() {
        let app = TestApp::spawn().await;
        let token = app.create_registered_provider("uid-1", "Ada").await;

        let res = app
            .post_with_token(
                &routes::vm_metrics("ghost"),
                &json!({"cpu": 1.0, "gpu": 1.0, "ram": 1.0}),
                &token,
            )
            .await;

        assert_eq!(res.status, 404);
    }
}
