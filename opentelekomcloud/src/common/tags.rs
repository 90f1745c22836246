//! Key/value tags on ECS and RDS instances

use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use tfplug::context::Context;
use tfplug::retry::{retry_with_min_wait, RetryError, RetryableError};

use crate::api::ecs::ResourceTag;
use crate::api::{ApiError, Client};
use crate::provider_data::PollSettings;

const SET_TAGS_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Tags managed by the platform itself are never written or read back
pub fn tag_ignored(key: &str) -> bool {
    static IGNORED: OnceLock<Option<Regex>> = OnceLock::new();
    let ignored = IGNORED
        .get_or_init(|| Regex::new(r"^aws:").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(key));
    if ignored {
        tracing::debug!(key, "Ignoring platform tag");
    }
    ignored
}

/// Tags from a map, sorted by key
pub fn tags_from_map(tags: &HashMap<String, String>) -> Vec<ResourceTag> {
    let mut result: Vec<ResourceTag> = tags
        .iter()
        .filter(|(key, _)| !tag_ignored(key))
        .map(|(key, value)| ResourceTag {
            key: key.clone(),
            value: value.clone(),
        })
        .collect();
    result.sort();
    result
}

pub fn tags_to_map(tags: &[ResourceTag]) -> HashMap<String, String> {
    tags.iter()
        .filter(|tag| !tag_ignored(&tag.key))
        .map(|tag| (tag.key.clone(), tag.value.clone()))
        .collect()
}

/// Returns `(create, remove)`. Every new tag is (re)created; old tags whose
/// key disappeared or whose value changed are removed first.
pub fn diff_tags(
    old: &HashMap<String, String>,
    new: &HashMap<String, String>,
) -> (Vec<ResourceTag>, Vec<ResourceTag>) {
    let create = tags_from_map(new);

    let mut remove: Vec<ResourceTag> = old
        .iter()
        .filter(|(key, value)| new.get(*key) != Some(*value))
        .filter(|(key, _)| !tag_ignored(key))
        .map(|(key, value)| ResourceTag {
            key: key.clone(),
            value: value.clone(),
        })
        .collect();
    remove.sort();

    (create, remove)
}

/// Creates ECS tags, retrying while the freshly created server is not yet
/// visible to the tag service
pub async fn set_tags_for_instance(
    ctx: &Context,
    client: &Client,
    poll: PollSettings,
    server_id: &str,
    tags: &HashMap<String, String>,
) -> Result<(), RetryError<ApiError>> {
    let list = tags_from_map(tags);
    if list.is_empty() {
        return Ok(());
    }

    retry_with_min_wait(ctx, SET_TAGS_TIMEOUT, poll.retry_min_wait(), || async {
        match client.ecs_tags().create(server_id, &list).await {
            Ok(()) => Ok(()),
            Err(e) if e.error_code().is_some_and(|c| c.contains("NotFound")) => {
                tracing::debug!(server_id, "Server not visible to tag service yet");
                Err(RetryableError::retryable(e))
            }
            Err(e) => Err(RetryableError::non_retryable(e)),
        }
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::create_test_client;
    use mockito::Server;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn diff_removes_changed_and_missing_keys() {
        let old = map(&[("foo", "bar"), ("env", "dev"), ("keep", "same")]);
        let new = map(&[("env", "prod"), ("keep", "same"), ("new", "1")]);

        let (create, remove) = diff_tags(&old, &new);

        let created: Vec<&str> = create.iter().map(|t| t.key.as_str()).collect();
        assert_eq!(created, vec!["env", "keep", "new"]);

        let removed: Vec<(&str, &str)> = remove
            .iter()
            .map(|t| (t.key.as_str(), t.value.as_str()))
            .collect();
        assert_eq!(removed, vec![("env", "dev"), ("foo", "bar")]);
    }

    #[test]
    fn platform_tags_are_skipped() {
        let tags = map(&[("aws:cloudformation", "x"), ("owner", "me")]);
        let list = tags_from_map(&tags);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].key, "owner");

        let back = tags_to_map(&[
            ResourceTag {
                key: "aws:foo".to_string(),
                value: "1".to_string(),
            },
            ResourceTag {
                key: "team".to_string(),
                value: "db".to_string(),
            },
        ]);
        assert_eq!(back, map(&[("team", "db")]));
        assert!(!tag_ignored("notaws:foo"));
    }

    #[tokio::test]
    async fn set_tags_retries_until_server_is_visible() {
        let mut server = Server::new_async().await;
        let missing = server
            .mock("POST", "/cloudservers/srv-1/tags/action")
            .with_status(404)
            .with_body(r#"{"error":{"code":"Ecs.NotFound","message":"Instance not found"}}"#)
            .expect(1)
            .create_async()
            .await;
        let ok = server
            .mock("POST", "/cloudservers/srv-1/tags/action")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "action": "create",
                "tags": [{"key": "app", "value": "web"}]
            })))
            .with_status(204)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        set_tags_for_instance(
            &Context::new(),
            &client,
            PollSettings::fixed(Duration::from_millis(1)),
            "srv-1",
            &map(&[("app", "web")]),
        )
        .await
        .unwrap();

        ok.assert_async().await;
        missing.assert_async().await;
    }

    #[tokio::test]
    async fn set_tags_without_tags_is_a_no_op() {
        let client = create_test_client("http://127.0.0.1:9");
        set_tags_for_instance(
            &Context::new(),
            &client,
            PollSettings::default(),
            "srv-1",
            &HashMap::new(),
        )
        .await
        .unwrap();
    }
}
