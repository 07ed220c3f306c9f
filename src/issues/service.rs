//! Issue Ownership Service
//! Mission: Every read and write of an issue goes through an ownership check
//!
//! Lookups by id answer NotFound when the issue is absent and Forbidden when it
//! exists but belongs to someone else.

use crate::auth::user_store::UserStore;
use crate::error::{AppError, AppResult};
use crate::issues::models::{
    CreateIssueRequest, Issue, IssueFilter, UpdateIssueRequest,
};
use crate::issues::store::IssueStore;
use crate::notify::Notifier;
use tracing::{info, warn};
use uuid::Uuid;

pub const ISSUE_NOT_FOUND: &str = "Issue not found";

#[derive(Debug, Clone, Copy)]
enum Access {
    View,
    Update,
    Delete,
}

impl Access {
    fn denied_message(self) -> &'static str {
        match self {
            Access::View => "You do not have permission to view this issue",
            Access::Update => "You do not have permission to update this issue",
            Access::Delete => "You do not have permission to delete this issue",
        }
    }
}

#[derive(Clone)]
pub struct IssueService {
    issues: IssueStore,
    users: UserStore,
    notifier: Notifier,
}

impl IssueService {
    pub fn new(issues: IssueStore, users: UserStore, notifier: Notifier) -> Self {
        Self {
            issues,
            users,
            notifier,
        }
    }

    /// Validate and store under `owner`, then queue a confirmation email.
    pub async fn create(&self, owner: &Uuid, req: CreateIssueRequest) -> AppResult<Issue> {
        let new = req.validate()?;
        let issue = self.issues.create(owner, new).await?;

        match self.users.get_user_by_id(owner).await {
            Ok(Some(user)) => self.notifier.issue_created(&user.email, &issue),
            Ok(None) => warn!(user_id = %owner, "Issue owner vanished, skipping notification"),
            Err(e) => warn!(user_id = %owner, "Owner lookup failed, skipping notification: {:#}", e),
        }

        info!(issue_id = %issue.id, user_id = %owner, issue_type = issue.issue_type.as_str(), "🛡️ Issue created");
        Ok(issue)
    }

    /// Caller's issues, newest first
    pub async fn list(&self, owner: &Uuid, filter: IssueFilter) -> AppResult<Vec<Issue>> {
        Ok(self.issues.find_by_owner(owner, filter).await?)
    }

    pub async fn get_by_id(&self, caller: &Uuid, issue_id: &str) -> AppResult<Issue> {
        self.load_owned(caller, issue_id, Access::View).await
    }

    pub async fn update(
        &self,
        caller: &Uuid,
        issue_id: &str,
        req: UpdateIssueRequest,
    ) -> AppResult<Issue> {
        let changes = req.validate()?;
        let existing = self.load_owned(caller, issue_id, Access::Update).await?;
        // Deleted between the ownership check and the write
        let updated = self
            .issues
            .update(&existing.id, changes)
            .await?
            .ok_or_else(|| AppError::not_found(ISSUE_NOT_FOUND))?;

        info!(issue_id = %updated.id, user_id = %caller, "Issue updated");
        Ok(updated)
    }

    /// Returns the deleted record
    pub async fn delete(&self, caller: &Uuid, issue_id: &str) -> AppResult<Issue> {
        let existing = self.load_owned(caller, issue_id, Access::Delete).await?;
        if !self.issues.delete(&existing.id).await? {
            return Err(AppError::not_found(ISSUE_NOT_FOUND));
        }

        info!(issue_id = %existing.id, user_id = %caller, "Issue deleted");
        Ok(existing)
    }

    async fn load_owned(&self, caller: &Uuid, issue_id: &str, access: Access) -> AppResult<Issue> {
        // A malformed id cannot name any stored issue
        let Ok(id) = Uuid::parse_str(issue_id) else {
            return Err(AppError::not_found(ISSUE_NOT_FOUND));
        };

        let issue = self
            .issues
            .find_by_id(&id)
            .await?
            .ok_or_else(|| AppError::not_found(ISSUE_NOT_FOUND))?;

        if issue.user_id != *caller {
            warn!(issue_id = %id, user_id = %caller, ?access, "❌ Ownership check failed");
            return Err(AppError::forbidden(access.denied_message()));
        }
        Ok(issue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::UserRole;
    use crate::db::Database;
    use crate::issues::models::{IssuePriority, IssueStatus, IssueType};
    use crate::notify::testing::{wait_for_attempts, wait_for_sent, FailingMailer, RecordingMailer};
    use crate::notify::{LogMailer, Mailer};
    use std::sync::Arc;

    struct Fixture {
        svc: IssueService,
        ann: Uuid,
        bob: Uuid,
    }

    async fn fixture() -> Fixture {
        fixture_with(Arc::new(LogMailer)).await
    }

    async fn fixture_with(mailer: Arc<dyn Mailer>) -> Fixture {
        let db = Database::in_memory().unwrap();
        let users = UserStore::new(db.clone());
        let ann = users
            .create_user("a@x.com", "h".into(), "Ann", UserRole::User)
            .await
            .unwrap()
            .id;
        let bob = users
            .create_user("b@x.com", "h".into(), "Bob", UserRole::User)
            .await
            .unwrap()
            .id;
        let notifier = Notifier::spawn(mailer, 8);
        Fixture {
            svc: IssueService::new(IssueStore::new(db), users, notifier),
            ann,
            bob,
        }
    }

    fn create_req(title: &str, issue_type: &str) -> CreateIssueRequest {
        CreateIssueRequest {
            title: title.to_string(),
            description: "Detailed description here".to_string(),
            issue_type: Some(issue_type.to_string()),
            priority: None,
            status: None,
        }
    }

    #[tokio::test]
    async fn test_create_applies_defaults() {
        let f = fixture().await;
        let issue = f.svc.create(&f.ann, create_req("Open S3", "VAPT")).await.unwrap();

        assert_eq!(issue.user_id, f.ann);
        assert_eq!(issue.priority, IssuePriority::Low);
        assert_eq!(issue.status, IssueStatus::Open);
    }

    #[tokio::test]
    async fn test_create_notifies_owner() {
        let mailer = Arc::new(RecordingMailer::default());
        let f = fixture_with(mailer.clone()).await;
        f.svc.create(&f.ann, create_req("Open S3", "VAPT")).await.unwrap();

        let sent = wait_for_sent(&mailer, 1).await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "a@x.com");
        assert_eq!(sent[0].subject, "New Issue Created: Open S3");
    }

    #[tokio::test]
    async fn test_create_succeeds_when_email_fails() {
        let mailer = Arc::new(FailingMailer::default());
        let f = fixture_with(mailer.clone()).await;
        let issue = f.svc.create(&f.ann, create_req("Open S3", "VAPT")).await.unwrap();

        wait_for_attempts(&mailer, 1).await;
        let stored = f.svc.get_by_id(&f.ann, &issue.id.to_string()).await.unwrap();
        assert_eq!(stored.title, "Open S3");
    }

    #[tokio::test]
    async fn test_update_of_deleted_issue_is_not_found() {
        let f = fixture().await;
        let issue = f.svc.create(&f.ann, create_req("Open S3", "VAPT")).await.unwrap();
        f.svc.issues.delete(&issue.id).await.unwrap();

        let err = f
            .svc
            .update(
                &f.ann,
                &issue.id.to_string(),
                UpdateIssueRequest {
                    status: Some("CLOSED".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref m) if m == ISSUE_NOT_FOUND));
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_payload() {
        let f = fixture().await;
        let err = f.svc.create(&f.ann, create_req("ab", "PHISHING")).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(f.svc.list(&f.ann, IssueFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_owner_is_forbidden() {
        let f = fixture().await;
        let issue = f.svc.create(&f.ann, create_req("Open S3", "VAPT")).await.unwrap();
        let id = issue.id.to_string();

        let view = f.svc.get_by_id(&f.bob, &id).await.unwrap_err();
        assert!(matches!(view, AppError::Forbidden(ref m) if m.contains("view")));

        let update = f
            .svc
            .update(
                &f.bob,
                &id,
                UpdateIssueRequest {
                    status: Some("CLOSED".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(update, AppError::Forbidden(ref m) if m.contains("update")));

        let delete = f.svc.delete(&f.bob, &id).await.unwrap_err();
        assert!(matches!(delete, AppError::Forbidden(ref m) if m.contains("delete")));

        // Untouched
        let still = f.svc.get_by_id(&f.ann, &id).await.unwrap();
        assert_eq!(still.status, IssueStatus::Open);
    }

    #[tokio::test]
    async fn test_missing_and_malformed_ids_are_not_found() {
        let f = fixture().await;
        for id in [Uuid::new_v4().to_string(), "not-a-uuid".to_string()] {
            let err = f.svc.get_by_id(&f.ann, &id).await.unwrap_err();
            assert!(matches!(err, AppError::NotFound(ref m) if m == ISSUE_NOT_FOUND));
        }
    }

    #[tokio::test]
    async fn test_owner_update_and_delete() {
        let f = fixture().await;
        let issue = f.svc.create(&f.ann, create_req("Open S3", "VAPT")).await.unwrap();
        let id = issue.id.to_string();

        let updated = f
            .svc
            .update(
                &f.ann,
                &id,
                UpdateIssueRequest {
                    priority: Some("HIGH".into()),
                    issue_type: Some("CLOUD_SECURITY".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.priority, IssuePriority::High);
        assert_eq!(updated.issue_type, IssueType::CloudSecurity);
        assert_eq!(updated.user_id, f.ann);

        let bad = f
            .svc
            .update(
                &f.ann,
                &id,
                UpdateIssueRequest {
                    status: Some("DONE".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(bad, AppError::BadRequest(_)));

        let deleted = f.svc.delete(&f.ann, &id).await.unwrap();
        assert_eq!(deleted.id, issue.id);
        let gone = f.svc.get_by_id(&f.ann, &id).await.unwrap_err();
        assert!(matches!(gone, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_filters_by_type() {
        let f = fixture().await;
        f.svc.create(&f.ann, create_req("One", "VAPT")).await.unwrap();
        let cloud = f
            .svc
            .create(&f.ann, create_req("Two", "CLOUD_SECURITY"))
            .await
            .unwrap();
        f.svc.create(&f.bob, create_req("Bob's", "CLOUD_SECURITY")).await.unwrap();

        let filtered = f
            .svc
            .list(&f.ann, IssueFilter::from_type_param(Some("CLOUD_SECURITY")))
            .await
            .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, cloud.id);

        let unfiltered = f
            .svc
            .list(&f.ann, IssueFilter::from_type_param(Some("bogus")))
            .await
            .unwrap();
        assert_eq!(unfiltered.len(), 2);
    }
}
