use serde_json::{Value, json};
use tracing::info;

use super::{NotebookClient, ROOT_PATH};
use crate::error::{Error, Result};
use crate::nav;
use crate::rpc::ids;
use crate::types::{Collaborator, ShareRole, ShareStatus, notebook_url};

impl NotebookClient {
    pub async fn get_share_status(&self, notebook_id: &str) -> Result<ShareStatus> {
        let result = self
            .rpc(ids::GET_SHARE_STATUS, json!([notebook_id, [2]]), ROOT_PATH)
            .await?;
        Ok(parse_share_status(result.as_ref(), notebook_id))
    }

    /// Toggle link sharing. Returns the public link when sharing was turned on.
    pub async fn set_public_access(
        &self,
        notebook_id: &str,
        public: bool,
    ) -> Result<Option<String>> {
        let access = if public { 1 } else { 0 };
        let params = json!([[[notebook_id, null, [access], [0, ""]]], 1, null, [2]]);
        self.rpc(ids::SHARE_NOTEBOOK, params, ROOT_PATH).await?;
        info!(notebook_id, public, "notebook access changed");
        Ok(public.then(|| notebook_url(notebook_id)))
    }

    /// Invite `email`. Ownership cannot be granted this way.
    pub async fn add_collaborator(
        &self,
        notebook_id: &str,
        email: &str,
        role: ShareRole,
        notify: bool,
        message: &str,
    ) -> Result<bool> {
        if role == ShareRole::Owner {
            return Err(Error::InvalidArgument(
                "collaborators cannot be added as owner".to_string(),
            ));
        }
        let suppress_email = if notify { 0 } else { 1 };
        let params = json!([
            [[notebook_id, [[email, null, role.code()]], null, [suppress_email, message]]],
            1,
            null,
            [2]
        ]);
        let result = self.rpc(ids::SHARE_NOTEBOOK, params, ROOT_PATH).await?;
        info!(notebook_id, email, role = role.name(), "collaborator invited");
        Ok(result.is_some())
    }
}

/// Collaborator entries are `[email, role, ?, [display_name], pending]`; an
/// item whose head is `1` marks the notebook public.
pub(crate) fn parse_share_status(result: Option<&Value>, notebook_id: &str) -> ShareStatus {
    let items = result.and_then(Value::as_array).map(Vec::as_slice).unwrap_or_default();

    let mut collaborators = Vec::new();
    for entries in items.iter().filter_map(Value::as_array) {
        for entry in entries {
            let Some(fields) = entry.as_array().filter(|f| f.len() >= 2) else {
                continue;
            };
            let Some(email) = fields[0].as_str().filter(|e| e.contains('@')) else {
                continue;
            };
            collaborators.push(Collaborator {
                email: email.to_string(),
                role: fields[1]
                    .as_i64()
                    .and_then(ShareRole::from_code)
                    .unwrap_or(ShareRole::Viewer),
                is_pending: fields.get(4).and_then(Value::as_bool).unwrap_or(false),
                display_name: nav::text_at(entry, &[3, 0]).map(str::to_string),
            });
        }
    }

    let is_public = items.iter().any(|item| nav::i64_at(item, &[0]) == Some(1));
    ShareStatus {
        is_public,
        access_level: if is_public { "public" } else { "restricted" },
        collaborators,
        public_link: is_public.then(|| notebook_url(notebook_id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collaborators_and_public_flag() {
        let result = json!([
            [
                ["owner@example.com", 1, null, ["Ada"]],
                ["pending@example.com", 2, null, null, true],
                ["not-an-email", 3],
                ["short@example.com"]
            ],
            [1]
        ]);
        let status = parse_share_status(Some(&result), "nb1");
        assert!(status.is_public);
        assert_eq!(status.access_level, "public");
        assert_eq!(status.public_link.as_deref(), Some(notebook_url("nb1").as_str()));
        assert_eq!(status.collaborators.len(), 2);
        assert_eq!(status.collaborators[0].role, ShareRole::Owner);
        assert_eq!(status.collaborators[0].display_name.as_deref(), Some("Ada"));
        assert!(!status.collaborators[0].is_pending);
        assert!(status.collaborators[1].is_pending);
        assert_eq!(status.collaborators[1].role, ShareRole::Editor);
    }

    #[test]
    fn restricted_when_absent() {
        let status = parse_share_status(None, "nb1");
        assert!(!status.is_public);
        assert_eq!(status.access_level, "restricted");
        assert!(status.collaborators.is_empty());
        assert!(status.public_link.is_none());

        let status = parse_share_status(Some(&json!([[["x@y.z", 7]], [0]])), "nb1");
        assert!(!status.is_public);
        assert_eq!(status.collaborators[0].role, ShareRole::Viewer);
    }
}
