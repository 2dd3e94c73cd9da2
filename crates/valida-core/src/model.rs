use std::fmt;

use serde::{Deserialize, Serialize};

/// Forum flavour as stored in the `forum.type` column.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ForumType {
    News,
    General,
    Social,
    EachUser,
    Single,
    QAndA,
    Blog,
    Other(String),
}

impl ForumType {
    pub fn as_str(&self) -> &str {
        match self {
            ForumType::News => "news",
            ForumType::General => "general",
            ForumType::Social => "social",
            ForumType::EachUser => "eachuser",
            ForumType::Single => "single",
            ForumType::QAndA => "qanda",
            ForumType::Blog => "blog",
            ForumType::Other(s) => s.as_str(),
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "news" => ForumType::News,
            "general" => ForumType::General,
            "social" => ForumType::Social,
            "eachuser" => ForumType::EachUser,
            "single" => ForumType::Single,
            "qanda" => ForumType::QAndA,
            "blog" => ForumType::Blog,
            other => ForumType::Other(other.to_string()),
        }
    }
}

impl From<String> for ForumType {
    fn from(s: String) -> Self {
        ForumType::parse(&s)
    }
}

impl From<ForumType> for String {
    fn from(t: ForumType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for ForumType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Activity completion tracking mode of a course module (`course_modules.completion`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionTracking {
    #[default]
    None,
    Manual,
    Automatic,
}

impl CompletionTracking {
    pub fn from_i64(v: i64) -> Self {
        match v {
            1 => CompletionTracking::Manual,
            2 => CompletionTracking::Automatic,
            _ => CompletionTracking::None,
        }
    }

    pub fn as_i64(self) -> i64 {
        match self {
            CompletionTracking::None => 0,
            CompletionTracking::Manual => 1,
            CompletionTracking::Automatic => 2,
        }
    }

    pub fn is_configured(self) -> bool {
        self != CompletionTracking::None
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GradeItemType {
    Course,
    Category,
    Mod,
    Manual,
    #[serde(other)]
    Other,
}

impl GradeItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GradeItemType::Course => "course",
            GradeItemType::Category => "category",
            GradeItemType::Mod => "mod",
            GradeItemType::Manual => "manual",
            GradeItemType::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "course" => GradeItemType::Course,
            "category" => GradeItemType::Category,
            "mod" => GradeItemType::Mod,
            "manual" => GradeItemType::Manual,
            _ => GradeItemType::Other,
        }
    }
}

/// Lifecycle of a tracked issue. Stored as 0/1; redundant with `resolved_at`
/// but kept for cheap filtering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    Open,
    Resolved,
}

impl IssueState {
    pub fn as_i64(self) -> i64 {
        match self {
            IssueState::Open => 0,
            IssueState::Resolved => 1,
        }
    }

    pub fn from_i64(v: i64) -> Self {
        if v == 1 {
            IssueState::Resolved
        } else {
            IssueState::Open
        }
    }
}
