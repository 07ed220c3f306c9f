//! Issue Models
//! Mission: Security findings, their enumerations, and request payload validation

use crate::error::{AppError, AppResult};
use crate::validation::{has_min_chars, Violations};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const INVALID_TYPE: &str = "Invalid issue type. Must be CLOUD_SECURITY, RETEAM_ASSESSMENT, or VAPT";
const INVALID_PRIORITY: &str = "Invalid priority. Must be LOW, MEDIUM, or HIGH";
const INVALID_STATUS: &str = "Invalid status. Must be OPEN, IN_PROGRESS, or CLOSED";

/// Kind of security engagement an issue belongs to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueType {
    CloudSecurity,
    ReteamAssessment,
    Vapt,
}

impl IssueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueType::CloudSecurity => "CLOUD_SECURITY",
            IssueType::ReteamAssessment => "RETEAM_ASSESSMENT",
            IssueType::Vapt => "VAPT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CLOUD_SECURITY" => Some(IssueType::CloudSecurity),
            "RETEAM_ASSESSMENT" => Some(IssueType::ReteamAssessment),
            "VAPT" => Some(IssueType::Vapt),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssuePriority {
    #[default]
    Low,
    Medium,
    High,
}

impl IssuePriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssuePriority::Low => "LOW",
            IssuePriority::Medium => "MEDIUM",
            IssuePriority::High => "HIGH",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "LOW" => Some(IssuePriority::Low),
            "MEDIUM" => Some(IssuePriority::Medium),
            "HIGH" => Some(IssuePriority::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueStatus {
    #[default]
    Open,
    InProgress,
    Closed,
}

impl IssueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueStatus::Open => "OPEN",
            IssueStatus::InProgress => "IN_PROGRESS",
            IssueStatus::Closed => "CLOSED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "OPEN" => Some(IssueStatus::Open),
            "IN_PROGRESS" => Some(IssueStatus::InProgress),
            "CLOSED" => Some(IssueStatus::Closed),
            _ => None,
        }
    }
}

/// A stored security issue. `user_id` is the owner and never changes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub priority: IssuePriority,
    pub status: IssueStatus,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create payload as received. Enumerations stay raw strings until validated.
#[derive(Debug, Default, Deserialize)]
pub struct CreateIssueRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub issue_type: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
}

/// Partial update payload; absent fields are left untouched
#[derive(Debug, Default, Deserialize)]
pub struct UpdateIssueRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub issue_type: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
}

/// Validated create payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIssue {
    pub title: String,
    pub description: String,
    pub issue_type: IssueType,
    pub priority: IssuePriority,
    pub status: IssueStatus,
}

/// Validated partial update
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub issue_type: Option<IssueType>,
    pub priority: Option<IssuePriority>,
    pub status: Option<IssueStatus>,
}

impl IssueChanges {
    pub fn apply(self, issue: &mut Issue) {
        if let Some(title) = self.title {
            issue.title = title;
        }
        if let Some(description) = self.description {
            issue.description = description;
        }
        if let Some(issue_type) = self.issue_type {
            issue.issue_type = issue_type;
        }
        if let Some(priority) = self.priority {
            issue.priority = priority;
        }
        if let Some(status) = self.status {
            issue.status = status;
        }
    }
}

/// Optional narrowing for `list`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IssueFilter {
    pub issue_type: Option<IssueType>,
}

impl IssueFilter {
    /// Unrecognized type values are ignored rather than rejected
    pub fn from_type_param(raw: Option<&str>) -> Self {
        Self {
            issue_type: raw.and_then(IssueType::parse),
        }
    }
}

/// Query string of `GET /issues`
#[derive(Debug, Default, PartialEq, Eq)]
pub struct IssueListQuery {
    pub issue_type: Option<String>,
}

impl IssueListQuery {
    /// Built from raw pairs so repeated keys never fail the request.
    /// The first `type` wins; other keys are ignored.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        Self {
            issue_type: pairs
                .into_iter()
                .find(|(key, _)| key == "type")
                .map(|(_, value)| value),
        }
    }

    pub fn filter(&self) -> IssueFilter {
        IssueFilter::from_type_param(self.issue_type.as_deref())
    }
}

impl CreateIssueRequest {
    pub fn validate(self) -> AppResult<NewIssue> {
        let mut violations = Violations::new();
        violations.check(
            has_min_chars(&self.title, 3),
            "Title must be at least 3 characters",
        );
        violations.check(
            has_min_chars(&self.description, 10),
            "Description must be at least 10 characters",
        );

        let issue_type = self.issue_type.as_deref().and_then(IssueType::parse);
        violations.check(issue_type.is_some(), INVALID_TYPE);
        let priority = parse_optional(
            &mut violations,
            self.priority.as_deref(),
            IssuePriority::parse,
            INVALID_PRIORITY,
        );
        let status = parse_optional(
            &mut violations,
            self.status.as_deref(),
            IssueStatus::parse,
            INVALID_STATUS,
        );

        violations.finish()?;
        let Some(issue_type) = issue_type else {
            return Err(AppError::bad_request(INVALID_TYPE));
        };

        Ok(NewIssue {
            title: self.title,
            description: self.description,
            issue_type,
            priority: priority.unwrap_or_default(),
            status: status.unwrap_or_default(),
        })
    }
}

impl UpdateIssueRequest {
    pub fn validate(self) -> AppResult<IssueChanges> {
        let mut violations = Violations::new();
        let issue_type = parse_optional(
            &mut violations,
            self.issue_type.as_deref(),
            IssueType::parse,
            INVALID_TYPE,
        );
        let priority = parse_optional(
            &mut violations,
            self.priority.as_deref(),
            IssuePriority::parse,
            INVALID_PRIORITY,
        );
        let status = parse_optional(
            &mut violations,
            self.status.as_deref(),
            IssueStatus::parse,
            INVALID_STATUS,
        );

        violations.finish()?;

        Ok(IssueChanges {
            title: self.title,
            description: self.description,
            issue_type,
            priority,
            status,
        })
    }
}

fn parse_optional<T>(
    violations: &mut Violations,
    raw: Option<&str>,
    parse: fn(&str) -> Option<T>,
    message: &str,
) -> Option<T> {
    let raw = raw?;
    let parsed = parse(raw);
    violations.check(parsed.is_some(), message);
    parsed
}
