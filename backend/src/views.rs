use std::collections::HashMap;
use std::fmt::Write;

use axum::http::StatusCode;

use crate::auth::CurrentUser;
use crate::models::{Category, Task};

pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn nav(user: Option<&CurrentUser>) -> String {
    let mut links = String::from(r#"<a href="/get_tasks">Home</a>"#);
    match user {
        Some(user) => {
            let name = escape(&user.username);
            let _ = write!(links, r#" <a href="/profile/{name}">Profile</a>"#);
            links.push_str(r#" <a href="/add_task">New Task</a>"#);
            if user.role == crate::models::Role::Admin {
                links.push_str(r#" <a href="/get_categories">Manage Categories</a>"#);
            }
            links.push_str(r#" <a href="/logout">Log Out</a>"#);
        }
        None => {
            links.push_str(r#" <a href="/login">Log In</a> <a href="/register">Register</a>"#);
        }
    }
    links
}

pub fn layout(title: &str, user: Option<&CurrentUser>, flashes: &[String], body: &str) -> String {
    let mut flash_html = String::new();
    for message in flashes {
        let _ = write!(flash_html, r#"<div class="flash">{}</div>"#, escape(message));
    }
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} | Task Manager</title>
<link rel="stylesheet" href="/static/style.css">
</head>
<body>
<nav>{nav}</nav>
<main>
{flash_html}
{body}
</main>
</body>
</html>"#,
        title = escape(title),
        nav = nav(user),
    )
}

fn search_form(query: &str) -> String {
    format!(
        r#"<form class="search" method="POST" action="/search">
<input type="text" name="query" value="{}" placeholder="Search tasks" maxlength="200">
<button type="submit">Search</button> <a href="/get_tasks">Reset</a>
</form>"#,
        escape(query)
    )
}

/// Task cards, with edit and delete links only on the viewer's own tasks.
pub fn task_list(tasks: &[Task], categories: &[Category], viewer: Option<&str>, query: &str) -> String {
    let names: HashMap<String, &str> = categories
        .iter()
        .map(|c| (c.id.to_string(), c.category_name.as_str()))
        .collect();

    let mut html = String::from("<h1>All Tasks</h1>");
    html.push_str(&search_form(query));

    if tasks.is_empty() {
        html.push_str(r#"<p class="empty">No results found</p>"#);
        return html;
    }

    html.push_str(r#"<ul class="tasks">"#);
    for task in tasks {
        let category = names.get(&task.category_id).copied().unwrap_or("Uncategorised");
        let urgent = if task.is_urgent { r#" <span class="urgent">Urgent</span>"# } else { "" };
        let _ = write!(
            html,
            r#"<li class="task"><h2>{name}{urgent}</h2>
<p class="meta">{category} &middot; due {due} &middot; by {owner}</p>
<p>{description}</p>"#,
            name = escape(&task.task_name),
            category = escape(category),
            due = escape(&task.due_date),
            owner = escape(&task.created_by),
            description = escape(&task.task_description),
        );
        if viewer == Some(task.created_by.as_str()) {
            let id = escape(&task.id);
            let _ = write!(
                html,
                r#"<p class="actions"><a href="/edit_task/{id}">Edit</a> <a href="/delete_task/{id}">Delete</a></p>"#
            );
        }
        html.push_str("</li>");
    }
    html.push_str("</ul>");
    html
}

pub fn task_form(heading: &str, action: &str, task: Option<&Task>, categories: &[Category]) -> String {
    let selected = task.map(|t| t.category_id.as_str()).unwrap_or("");
    let mut options = String::from(r#"<option value="" disabled>Choose category</option>"#);
    for category in categories {
        let id = category.id.to_string();
        let mark = if id == selected { " selected" } else { "" };
        let _ = write!(
            options,
            r#"<option value="{id}"{mark}>{}</option>"#,
            escape(&category.category_name)
        );
    }

    let field = |get: fn(&Task) -> &str| task.map(get).map(escape).unwrap_or_default();
    let checked = if task.is_some_and(|t| t.is_urgent) { " checked" } else { "" };

    format!(
        r#"<h1>{heading}</h1>
<form method="POST" action="{action}">
<label>Category <select name="category_id" required>{options}</select></label>
<label>Task name <input type="text" name="task_name" value="{name}" maxlength="200" required></label>
<label>Description <textarea name="task_description" maxlength="5000">{description}</textarea></label>
<label>Due date <input type="text" name="due_date" value="{due}" maxlength="100"></label>
<label><input type="checkbox" name="is_urgent"{checked}> Is urgent</label>
<button type="submit">Save</button> <a href="/get_tasks">Cancel</a>
</form>"#,
        heading = escape(heading),
        action = escape(action),
        name = field(|t| t.task_name.as_str()),
        description = field(|t| t.task_description.as_str()),
        due = field(|t| t.due_date.as_str()),
    )
}

pub fn category_list(categories: &[Category]) -> String {
    let mut html = String::from(
        r#"<h1>Manage Categories</h1><p><a href="/add_category">Add Category</a></p><ul class="categories">"#,
    );
    for category in categories {
        let _ = write!(
            html,
            r#"<li>{name} <a href="/edit_category/{id}">Edit</a> <a href="/delete_category/{id}">Delete</a></li>"#,
            name = escape(&category.category_name),
            id = category.id,
        );
    }
    html.push_str("</ul>");
    html
}

pub fn category_form(heading: &str, action: &str, category: Option<&Category>) -> String {
    format!(
        r#"<h1>{heading}</h1>
<form method="POST" action="{action}">
<label>Category name <input type="text" name="category_name" value="{name}" maxlength="100" required></label>
<button type="submit">Save</button> <a href="/get_categories">Cancel</a>
</form>"#,
        heading = escape(heading),
        action = escape(action),
        name = category.map(|c| escape(&c.category_name)).unwrap_or_default(),
    )
}

/// Shared register/login form.
pub fn credentials_form(heading: &str, action: &str, alternative: &str) -> String {
    format!(
        r#"<h1>{heading}</h1>
<form method="POST" action="{action}">
<label>Username <input type="text" name="username" minlength="3" maxlength="50" pattern="[A-Za-z0-9_-]+" required></label>
<label>Password <input type="password" name="password" minlength="5" maxlength="128" required></label>
<button type="submit">{heading}</button>
</form>
<p>{alternative}</p>"#,
        heading = escape(heading),
        action = escape(action),
    )
}

pub fn profile(username: &str) -> String {
    format!(r#"<h1>{}'s Profile</h1>"#, escape(username))
}

pub fn error_page(status: StatusCode) -> String {
    let reason = status.canonical_reason().unwrap_or("Error");
    layout(
        reason,
        None,
        &[],
        &format!(
            r#"<h1>{} {}</h1><p><a href="/get_tasks">Back to tasks</a></p>"#,
            status.as_u16(),
            escape(reason)
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn task(owner: &str, category_id: &str) -> Task {
        Task {
            id: "t1".to_string(),
            category_id: category_id.to_string(),
            task_name: "Fix <b>bike</b>".to_string(),
            task_description: "tyre".to_string(),
            is_urgent: true,
            due_date: "tomorrow".to_string(),
            created_by: owner.to_string(),
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"<a href="x">'&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;");
    }

    #[test]
    fn test_task_list_owner_controls_and_category_names() {
        let categories = vec![Category { id: 3, category_name: "Home".to_string() }];
        let tasks = vec![task("alice", "3"), task("bob", "9")];
        let html = task_list(&tasks, &categories, Some("alice"), "");

        assert_eq!(html.matches("/edit_task/t1").count(), 1);
        assert!(html.contains("Home"));
        assert!(html.contains("Uncategorised"));
        assert!(html.contains("Fix &lt;b&gt;bike&lt;/b&gt;"));
        assert!(!html.contains("<b>bike</b>"));
    }

    #[test]
    fn test_nav_depends_on_role() {
        let admin = CurrentUser { username: "admin".to_string(), role: Role::Admin };
        let member = CurrentUser { username: "alice".to_string(), role: Role::Member };
        assert!(layout("x", Some(&admin), &[], "").contains("/get_categories"));
        assert!(!layout("x", Some(&member), &[], "").contains("/get_categories"));
        assert!(layout("x", None, &[], "").contains("/login"));
    }

    #[test]
    fn test_task_form_preselects_category() {
        let categories = vec![
            Category { id: 1, category_name: "Home".to_string() },
            Category { id: 2, category_name: "Work".to_string() },
        ];
        let html = task_form("Edit Task", "/edit_task/t1", Some(&task("alice", "2")), &categories);
        assert!(html.contains(r#"<option value="2" selected>Work</option>"#));
        assert!(html.contains(" checked>"));
    }
}
