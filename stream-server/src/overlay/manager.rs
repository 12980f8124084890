use crate::storage::{JsonFileCollection, Keyed};
use chrono::Utc;
use common::{Overlay, Result, StreamError};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

const COMMON_FIELDS: [&str; 7] = ["streamId", "type", "x", "y", "width", "height", "zIndex"];

impl Keyed for Overlay {
    fn key(&self) -> &str {
        &self.id
    }
}

/// 叠加层 CRUD
#[derive(Clone)]
pub struct OverlayManager {
    overlays: Arc<JsonFileCollection<Overlay>>,
}

impl OverlayManager {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            overlays: Arc::new(JsonFileCollection::open(path).await?),
        })
    }

    /// 按 zIndex 升序
    pub async fn list(&self, stream_id: Option<&str>) -> Vec<Overlay> {
        let mut overlays: Vec<Overlay> = self
            .overlays
            .all()
            .await
            .into_iter()
            .filter(|overlay| stream_id.map_or(true, |id| overlay.stream_id == id))
            .collect();
        overlays.sort_by(|a, b| a.z_index.total_cmp(&b.z_index));
        overlays
    }

    pub async fn create(&self, body: Value) -> Result<Overlay> {
        let Value::Object(mut fields) = body else {
            return Err(StreamError::Validation("request body must be a JSON object".to_string()));
        };
        validate(&fields)?;

        let id = match fields.get("id") {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            _ => Uuid::new_v4().to_string(),
        };
        let now = serde_json::to_value(Utc::now())?;
        fields.insert("id".to_string(), Value::String(id));
        fields.insert("createdAt".to_string(), now.clone());
        fields.insert("updatedAt".to_string(), now);

        let overlay = parse(fields)?;
        self.overlays.insert(overlay.clone()).await?;

        info!("Created {} overlay {} for stream {}", type_name(&overlay), overlay.id, overlay.stream_id);
        Ok(overlay)
    }

    /// 局部更新；id 与 streamId 不可修改
    pub async fn update(&self, overlay_id: &str, patch: Value) -> Result<Overlay> {
        let Value::Object(mut patch) = patch else {
            return Err(StreamError::Validation("request body must be a JSON object".to_string()));
        };
        patch.remove("id");
        patch.remove("streamId");
        patch.remove("createdAt");
        patch.insert("updatedAt".to_string(), serde_json::to_value(Utc::now())?);

        let updated = self
            .overlays
            .update(overlay_id, |overlay| {
                let Value::Object(mut fields) = serde_json::to_value(&*overlay)? else {
                    return Err(StreamError::Store("overlay is not a JSON object".to_string()));
                };
                fields.extend(patch);
                *overlay = parse(fields)?;
                Ok(())
            })
            .await?;

        updated.ok_or_else(|| StreamError::NotFound("overlay not found".to_string()))
    }

    pub async fn delete(&self, overlay_id: &str) -> Result<()> {
        match self.overlays.remove(overlay_id).await? {
            Some(_) => {
                info!("Deleted overlay {}", overlay_id);
                Ok(())
            }
            None => Err(StreamError::NotFound("overlay not found".to_string())),
        }
    }
}

fn validate(fields: &Map<String, Value>) -> Result<()> {
    let missing: Vec<&str> = COMMON_FIELDS
        .iter()
        .copied()
        .filter(|field| !fields.contains_key(*field))
        .collect();
    if !missing.is_empty() {
        return Err(StreamError::Validation(format!(
            "missing common fields: {}",
            missing.join(", ")
        )));
    }

    let has = |field: &str| fields.contains_key(field);
    match fields.get("type").and_then(Value::as_str) {
        Some("text") if !(has("text") && has("style")) => Err(StreamError::Validation(
            "missing 'text' or 'style' for text overlay".to_string(),
        )),
        Some("image") if !has("imageUrl") => Err(StreamError::Validation(
            "missing 'imageUrl' for image overlay".to_string(),
        )),
        Some("alert-card") if !has("data") => Err(StreamError::Validation(
            "missing 'data' for alert-card overlay".to_string(),
        )),
        Some("text") | Some("image") | Some("alert-card") => Ok(()),
        other => Err(StreamError::Validation(format!(
            "invalid overlay type: {}",
            other.map_or_else(|| fields["type"].to_string(), str::to_string)
        ))),
    }
}

fn parse(fields: Map<String, Value>) -> Result<Overlay> {
    serde_json::from_value(Value::Object(fields))
        .map_err(|e| StreamError::Validation(format!("invalid overlay: {}", e)))
}

fn type_name(overlay: &Overlay) -> &'static str {
    match overlay.kind {
        common::OverlayKind::Text { .. } => "text",
        common::OverlayKind::Image { .. } => "image",
        common::OverlayKind::AlertCard { .. } => "alert-card",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::OverlayKind;
    use serde_json::json;
    use tempfile::tempdir;

    fn text_overlay(stream_id: &str, z_index: i32) -> Value {
        json!({
            "streamId": stream_id,
            "type": "text",
            "text": "LIVE",
            "style": "live",
            "x": 10, "y": 10, "width": 120, "height": 40,
            "zIndex": z_index
        })
    }

    async fn open() -> (tempfile::TempDir, OverlayManager) {
        let dir = tempdir().unwrap();
        let manager = OverlayManager::open(dir.path().join("overlays.json")).await.unwrap();
        (dir, manager)
    }

    fn validation_message(err: StreamError) -> String {
        match err {
            StreamError::Validation(message) => message,
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_and_list_sorted() {
        let (_dir, manager) = open().await;

        manager.create(text_overlay("s1", 5)).await.unwrap();
        manager.create(text_overlay("s1", 1)).await.unwrap();
        manager.create(text_overlay("s2", 3)).await.unwrap();

        let s1 = manager.list(Some("s1")).await;
        assert_eq!(s1.iter().map(|o| o.z_index).collect::<Vec<_>>(), vec![1.0, 5.0]);
        assert_eq!(manager.list(None).await.len(), 3);
        assert!(manager.list(Some("none")).await.is_empty());
    }

    #[tokio::test]
    async fn test_fractional_z_index_sorts_between() {
        let (_dir, manager) = open().await;

        manager.create(text_overlay("s1", 3)).await.unwrap();
        manager.create(text_overlay("s1", 2)).await.unwrap();
        let mut body = text_overlay("s1", 0);
        body["zIndex"] = json!(2.5);
        manager.create(body).await.unwrap();

        let order: Vec<f64> = manager.list(Some("s1")).await.iter().map(|o| o.z_index).collect();
        assert_eq!(order, vec![2.0, 2.5, 3.0]);
    }

    #[tokio::test]
    async fn test_create_keeps_supplied_id() {
        let (_dir, manager) = open().await;
        let mut body = text_overlay("s1", 1);
        body["id"] = json!("custom-id");

        let overlay = manager.create(body).await.unwrap();
        assert_eq!(overlay.id, "custom-id");
        assert_eq!(overlay.created_at, overlay.updated_at);

        let generated = manager.create(text_overlay("s1", 2)).await.unwrap();
        assert!(Uuid::parse_str(&generated.id).is_ok());
    }

    #[tokio::test]
    async fn test_validation_messages() {
        let (_dir, manager) = open().await;

        let err = manager.create(json!({"streamId": "s1", "type": "text"})).await.unwrap_err();
        assert_eq!(validation_message(err), "missing common fields: x, y, width, height, zIndex");

        let mut body = text_overlay("s1", 1);
        body.as_object_mut().unwrap().remove("style");
        let err = manager.create(body).await.unwrap_err();
        assert_eq!(validation_message(err), "missing 'text' or 'style' for text overlay");

        let mut body = text_overlay("s1", 1);
        body["type"] = json!("image");
        let err = manager.create(body).await.unwrap_err();
        assert_eq!(validation_message(err), "missing 'imageUrl' for image overlay");

        let mut body = text_overlay("s1", 1);
        body["type"] = json!("alert-card");
        let err = manager.create(body).await.unwrap_err();
        assert_eq!(validation_message(err), "missing 'data' for alert-card overlay");

        let mut body = text_overlay("s1", 1);
        body["type"] = json!("video");
        let err = manager.create(body).await.unwrap_err();
        assert_eq!(validation_message(err), "invalid overlay type: video");

        assert!(manager.list(None).await.is_empty());
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let (_dir, manager) = open().await;
        let created = manager.create(text_overlay("s1", 1)).await.unwrap();

        let updated = manager
            .update(
                &created.id,
                json!({"x": 50, "text": "ALERT", "id": "hijack", "streamId": "other"}),
            )
            .await
            .unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.stream_id, "s1");
        assert_eq!(updated.x, 50.0);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(
            updated.kind,
            OverlayKind::Text { text: "ALERT".to_string(), style: "live".to_string() }
        );
    }

    #[tokio::test]
    async fn test_update_and_delete_missing() {
        let (_dir, manager) = open().await;

        let err = manager.update("missing", json!({"x": 1})).await.unwrap_err();
        assert!(matches!(err, StreamError::NotFound(ref m) if m == "overlay not found"));

        let err = manager.delete("missing").await.unwrap_err();
        assert!(matches!(err, StreamError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_invalid_update_is_rejected() {
        let (_dir, manager) = open().await;
        let created = manager.create(text_overlay("s1", 1)).await.unwrap();

        let err = manager.update(&created.id, json!({"type": "image"})).await.unwrap_err();
        assert!(matches!(err, StreamError::Validation(_)));
        assert_eq!(manager.list(None).await[0].kind, created.kind);
    }

    #[tokio::test]
    async fn test_delete() {
        let (_dir, manager) = open().await;
        let created = manager.create(text_overlay("s1", 1)).await.unwrap();

        manager.delete(&created.id).await.unwrap();
        assert!(manager.list(None).await.is_empty());
    }
}
