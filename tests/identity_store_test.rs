use checkpoint_telemetry::identity::{
    COMMENT_KEY, FileIdentityStore, IdentityStore, PROJECT_ID_KEY, USER_ID_COMMENT, USER_ID_KEY,
    get_or_create_identifier, project_identity_store, user_identity_store,
};
use serde_json::{Value, json};
use std::fs;
use tempfile::TempDir;
use uuid::Uuid;

fn read_json(path: &std::path::Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[tokio::test]
async fn test_missing_file_is_created_with_v4_uuid() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");

    let id = get_or_create_identifier(&path, "userId", None).await.unwrap();

    let parsed = Uuid::parse_str(&id).unwrap();
    assert_eq!(parsed.get_version_num(), 4);
    assert_eq!(read_json(&path), json!({ "userId": id }));
}

#[tokio::test]
async fn test_second_call_returns_same_identifier() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");

    let first = get_or_create_identifier(&path, "userId", Some("comment"))
        .await
        .unwrap();
    let contents_after_first = fs::read_to_string(&path).unwrap();
    let second = get_or_create_identifier(&path, "userId", Some("comment"))
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(&path).unwrap(), contents_after_first);
}

#[tokio::test]
async fn test_existing_key_leaves_file_untouched() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("cdktf.json");
    let original = r#"{"language": "typescript", "app": "npx ts-node main.ts", "projectId": "f7b1c1b6-4d38-4a38-9a4c-3f7f3c6f1a11"}"#;
    fs::write(&path, original).unwrap();

    let id = get_or_create_identifier(&path, PROJECT_ID_KEY, Some("ignored"))
        .await
        .unwrap();

    assert_eq!(id, "f7b1c1b6-4d38-4a38-9a4c-3f7f3c6f1a11");
    assert_eq!(fs::read_to_string(&path).unwrap(), original);
}

#[tokio::test]
async fn test_missing_key_is_merged_preserving_fields() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("cdktf.json");
    fs::write(
        &path,
        r#"{"language": "python", "app": "pipenv run python main.py", "terraformProviders": ["aws@~> 5.0"]}"#,
    )
    .unwrap();

    let id = get_or_create_identifier(&path, PROJECT_ID_KEY, Some("ignored"))
        .await
        .unwrap();

    let stored = read_json(&path);
    assert_eq!(stored["projectId"], id.as_str());
    assert_eq!(stored["language"], "python");
    assert_eq!(stored["app"], "pipenv run python main.py");
    assert_eq!(stored["terraformProviders"], json!(["aws@~> 5.0"]));
    assert!(stored.get(COMMENT_KEY).is_none());

    // Field order of the original file is kept, new key appended
    let keys: Vec<&str> = stored.as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(keys, ["language", "app", "terraformProviders", "projectId"]);
}

#[tokio::test]
async fn test_user_store_writes_single_line_comment() {
    let temp_dir = TempDir::new().unwrap();
    let store = user_identity_store(temp_dir.path());

    let id = store
        .get_or_create(USER_ID_KEY, Some(USER_ID_COMMENT))
        .await
        .unwrap();

    let path = temp_dir.path().join(".cdktf").join("config.json");
    assert_eq!(store.path(), path.as_path());
    let stored = read_json(&path);
    let comment = stored[COMMENT_KEY].as_str().unwrap();
    assert!(!comment.contains('\n'));
    assert!(comment.contains("opt-out"));
    assert_eq!(stored[USER_ID_KEY], id.as_str());

    let keys: Vec<&str> = stored.as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(keys, [COMMENT_KEY, USER_ID_KEY]);
}

#[tokio::test]
async fn test_project_store_uses_cdktf_json() {
    let temp_dir = TempDir::new().unwrap();
    let store = project_identity_store(temp_dir.path());

    let first = store.get_or_create(PROJECT_ID_KEY, None).await.unwrap();
    let again = FileIdentityStore::new(temp_dir.path().join("cdktf.json"))
        .get_or_create(PROJECT_ID_KEY, None)
        .await
        .unwrap();

    assert_eq!(first, again);
}

#[tokio::test]
async fn test_distinct_scopes_get_distinct_identifiers() {
    let home = TempDir::new().unwrap();
    let project = TempDir::new().unwrap();

    let user_id = user_identity_store(home.path())
        .get_or_create(USER_ID_KEY, Some(USER_ID_COMMENT))
        .await
        .unwrap();
    let project_id = project_identity_store(project.path())
        .get_or_create(PROJECT_ID_KEY, None)
        .await
        .unwrap();

    assert_ne!(user_id, project_id);
}
