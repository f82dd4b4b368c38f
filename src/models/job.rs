//! Job record data structure.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How item descriptions (and the matching feed layout) are produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptionFormat {
    /// `title | Location: ... | Department: ...`, link GUIDs, `lastBuildDate`
    Summary,
    /// Sentence form, numeric GUIDs, per-item `pubDate` and `source`
    #[default]
    Narrative,
}

impl fmt::Display for DescriptionFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Summary => f.write_str("summary"),
            Self::Narrative => f.write_str("narrative"),
        }
    }
}

impl std::str::FromStr for DescriptionFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "summary" => Ok(Self::Summary),
            "narrative" => Ok(Self::Narrative),
            other => Err(format!("unknown description format '{other}'")),
        }
    }
}

/// Inputs for [`JobRecord::describe`] that are not fields of the record.
#[derive(Debug, Clone, Copy)]
pub struct DescriptionContext<'a> {
    pub format: DescriptionFormat,
    pub organization: &'a str,
    pub default_location: &'a str,
}

/// One discovered vacancy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobRecord {
    /// Posting title
    pub title: String,

    /// Absolute URL to the posting
    pub link: String,

    /// Duty station, or the default location
    pub location: String,

    /// Department name (empty when unknown)
    pub department: String,

    /// Derived from the other fields
    pub description: String,
}

impl JobRecord {
    /// Build a record and derive its description.
    pub fn new(
        title: impl Into<String>,
        link: impl Into<String>,
        location: impl Into<String>,
        department: impl Into<String>,
        ctx: DescriptionContext<'_>,
    ) -> Self {
        let mut job = Self {
            title: title.into(),
            link: link.into(),
            location: location.into(),
            department: department.into(),
            description: String::new(),
        };
        job.description = job.describe(ctx);
        job
    }

    /// A record is publishable only with both a title and a link.
    pub fn is_valid(&self) -> bool {
        !self.title.trim().is_empty() && !self.link.trim().is_empty()
    }

    /// Render the description text for the given format.
    pub fn describe(&self, ctx: DescriptionContext<'_>) -> String {
        match ctx.format {
            DescriptionFormat::Summary => {
                let mut parts = vec![self.title.clone()];
                if !self.location.is_empty() && self.location != ctx.default_location {
                    parts.push(format!("Location: {}", self.location));
                }
                if !self.department.is_empty() {
                    parts.push(format!("Department: {}", self.department));
                }
                parts.join(" | ")
            }
            DescriptionFormat::Narrative => {
                let department = if self.department.is_empty() {
                    String::new()
                } else {
                    format!(" in the {}", self.department)
                };
                format!(
                    "{} has a vacancy for the position of {}{} Location: {}.",
                    ctx.organization, self.title, department, self.location
                )
            }
        }
    }
}
