use axum::{Router, routing::get};

use crate::{AppState, routes};

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(routes::config::router())
        .merge(routes::projects::router())
        .merge(routes::tasks::router())
        .merge(routes::versions::router())
        .merge(routes::commits::router())
        .merge(routes::notes::router());

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api", api_routes)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use chrono::Utc;
    use db::{
        DBService,
        models::{
            commit_cache::CommitInfo,
            project::{CreateProject, Project},
            task::{CreateTask, Task},
        },
    };
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;
    use services::services::config::Config;
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::AppState;

    async fn setup_state() -> AppState {
        let conn = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&conn, None).await.unwrap();
        AppState::new(DBService { conn }, Config::default())
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn health_check_is_ok() {
        let app = super::router(setup_state().await);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn project_crud_over_http() {
        let app = super::router(setup_state().await);

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/projects",
                serde_json::json!({ "name": "devdeck", "repo_url": null }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        let project_id = json["data"]["id"].as_str().unwrap().to_string();
        assert_eq!(json["data"]["status"], "idea");

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/api/projects/{project_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/api/projects/{}", Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn blank_project_name_is_rejected() {
        let app = super::router(setup_state().await);

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/projects",
                serde_json::json!({ "name": "   ", "repo_url": null }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn commit_cache_miss_returns_null_data() {
        let state = setup_state().await;
        let project_id = Uuid::new_v4();
        Project::create(
            &state.db().conn,
            &CreateProject {
                name: "p".to_string(),
                repo_url: Some("https://github.com/acme/app".to_string()),
            },
            project_id,
        )
        .await
        .unwrap();

        let app = super::router(state);
        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/api/projects/{project_id}/commits?branch=main"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert!(json["data"].is_null());
    }

    #[tokio::test]
    async fn relation_resolution_over_http() {
        let state = setup_state().await;
        let project_id = Uuid::new_v4();
        Project::create(
            &state.db().conn,
            &CreateProject {
                name: "p".to_string(),
                repo_url: Some("https://github.com/acme/app".to_string()),
            },
            project_id,
        )
        .await
        .unwrap();
        let mut data = CreateTask::from_title(project_id, "wired task".to_string());
        data.issue_number = Some(12);
        Task::create(&state.db().conn, &data, Uuid::new_v4())
            .await
            .unwrap();

        let commits = vec![CommitInfo {
            sha: "abc123".to_string(),
            message: "fixes #task-12".to_string(),
            author: Some("dev".to_string()),
            date: Utc::now(),
        }];

        let app = super::router(state);
        let response = app
            .oneshot(json_request(
                "POST",
                &format!("/api/projects/{project_id}/commits/relations"),
                serde_json::to_value(&commits).unwrap(),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["repo_full_name"], "acme/app");
        assert_eq!(
            json["data"]["tasks_by_sha"]["abc123"][0]["title"],
            "wired task"
        );
    }
}
