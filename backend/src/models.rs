use serde::Deserialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Admin,
    Member,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Member => "member",
        }
    }

    pub fn parse(value: &str) -> Self {
        if value == "admin" {
            Role::Admin
        } else {
            Role::Member
        }
    }
}

#[derive(Clone, Debug)]
pub struct User {
    pub id: i32,
    pub user_name: String,
    pub password: String,
    pub role: Role,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Category {
    pub id: i32,
    pub category_name: String,
}

#[derive(Clone, Debug)]
pub struct Task {
    pub id: String,
    pub category_id: String,
    pub task_name: String,
    pub task_description: String,
    pub is_urgent: bool,
    pub due_date: String,
    pub created_by: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Field values written by add/edit; the id and timestamp belong to the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskFields {
    pub category_id: String,
    pub task_name: String,
    pub task_description: String,
    pub is_urgent: bool,
    pub due_date: String,
    pub created_by: String,
}

/// Persisted form of the urgency checkbox.
pub fn urgency_flag(is_urgent: bool) -> &'static str {
    if is_urgent {
        "on"
    } else {
        "off"
    }
}

pub fn parse_urgency_flag(value: &str) -> bool {
    value == "on"
}

#[derive(Deserialize, Default)]
pub struct TaskForm {
    pub category_id: Option<String>,
    pub task_name: Option<String>,
    pub task_description: Option<String>,
    pub is_urgent: Option<String>,
    pub due_date: Option<String>,
}

impl TaskForm {
    pub fn into_fields(self, created_by: &str) -> TaskFields {
        TaskFields {
            category_id: self.category_id.unwrap_or_default(),
            task_name: self.task_name.unwrap_or_default().trim().to_string(),
            task_description: self.task_description.unwrap_or_default(),
            // Browsers only submit a checkbox when it is ticked.
            is_urgent: self.is_urgent.is_some(),
            due_date: self.due_date.unwrap_or_default(),
            created_by: created_by.to_string(),
        }
    }
}

#[derive(Deserialize, Default)]
pub struct CategoryForm {
    pub category_name: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct SearchForm {
    pub query: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct CredentialsForm {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urgency_flag_round_values() {
        assert_eq!(urgency_flag(true), "on");
        assert_eq!(urgency_flag(false), "off");
        assert!(parse_urgency_flag("on"));
        assert!(!parse_urgency_flag("off"));
        assert!(!parse_urgency_flag(""));
    }

    #[test]
    fn test_checkbox_presence_sets_urgency() {
        let ticked = TaskForm {
            task_name: Some("  Water plants ".to_string()),
            is_urgent: Some("on".to_string()),
            ..Default::default()
        };
        let fields = ticked.into_fields("alice");
        assert!(fields.is_urgent);
        assert_eq!(fields.task_name, "Water plants");
        assert_eq!(fields.created_by, "alice");

        let unticked = TaskForm::default().into_fields("bob");
        assert!(!unticked.is_urgent);
        assert_eq!(unticked.category_id, "");
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("admin"), Role::Admin);
        assert_eq!(Role::parse("member"), Role::Member);
        assert_eq!(Role::parse("ADMIN"), Role::Member);
        assert_eq!(Role::Admin.as_str(), "admin");
    }
}
