//! Logical resources cached by the client and their default policies.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::CachePolicy;

/// How quickly a resource changes, which decides its default policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Slow-changing catalog content (subjects, topics, question banks).
    ContentList,
    /// User-scoped progress and results.
    Progress,
    /// Fast-changing administrative configuration.
    AdminSettings,
    /// Live count of active sessions, refreshed on a timer.
    ActiveSessions,
}

/// Logical resource name, the first half of every query key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryResource {
    Subjects,
    Topics,
    Questions,
    Quizzes,
    Institutions,
    Campuses,
    Grades,
    StudentProgress,
    QuizResults,
    StudyPlans,
    AdminSettings,
    Users,
    ActiveSessions,
}

impl QueryResource {
    /// Backend collection the resource is read from.
    pub fn collection(self) -> &'static str {
        match self {
            QueryResource::Subjects => "subjects",
            QueryResource::Topics => "topics",
            QueryResource::Questions => "questions",
            QueryResource::Quizzes => "quizzes",
            QueryResource::Institutions => "institutions",
            QueryResource::Campuses => "campuses",
            QueryResource::Grades => "grades",
            QueryResource::StudentProgress => "student_progress",
            QueryResource::QuizResults => "quiz_results",
            QueryResource::StudyPlans => "study_plans",
            QueryResource::AdminSettings => "admin_settings",
            QueryResource::Users => "users",
            QueryResource::ActiveSessions => "active_sessions",
        }
    }

    pub fn kind(self) -> ResourceKind {
        match self {
            QueryResource::Subjects
            | QueryResource::Topics
            | QueryResource::Questions
            | QueryResource::Quizzes
            | QueryResource::Institutions
            | QueryResource::Campuses
            | QueryResource::Grades => ResourceKind::ContentList,
            QueryResource::StudentProgress
            | QueryResource::QuizResults
            | QueryResource::StudyPlans => ResourceKind::Progress,
            QueryResource::AdminSettings | QueryResource::Users => ResourceKind::AdminSettings,
            QueryResource::ActiveSessions => ResourceKind::ActiveSessions,
        }
    }

    /// Default freshness/retention policy for this resource.
    pub fn default_policy(self) -> CachePolicy {
        self.kind().default_policy()
    }

    pub fn all() -> &'static [QueryResource] {
        &[
            QueryResource::Subjects,
            QueryResource::Topics,
            QueryResource::Questions,
            QueryResource::Quizzes,
            QueryResource::Institutions,
            QueryResource::Campuses,
            QueryResource::Grades,
            QueryResource::StudentProgress,
            QueryResource::QuizResults,
            QueryResource::StudyPlans,
            QueryResource::AdminSettings,
            QueryResource::Users,
            QueryResource::ActiveSessions,
        ]
    }
}

impl std::fmt::Display for QueryResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.collection())
    }
}

impl ResourceKind {
    pub fn default_policy(self) -> CachePolicy {
        const MINUTE: Duration = Duration::from_secs(60);
        match self {
            ResourceKind::ContentList => CachePolicy::new(5 * MINUTE, 10 * MINUTE),
            ResourceKind::Progress => CachePolicy::new(2 * MINUTE, 10 * MINUTE),
            ResourceKind::AdminSettings => CachePolicy::new(Duration::from_secs(30), 5 * MINUTE),
            ResourceKind::ActiveSessions => {
                CachePolicy::new(Duration::from_secs(30), 5 * MINUTE)
                    .with_refetch_interval(5 * MINUTE)
            }
        }
    }
}
