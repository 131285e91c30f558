//! HTML page rendering
//!
//! Templates are compiled into the binary and parsed once at startup.

use tera::{Context, Tera};

use crate::store::Todo;

const INDEX: &str = "index.html";
const EDIT: &str = "edit.html";

// `maxlength` hints for the browser; the server does not enforce them
const TITLE_MAX_LEN: usize = 200;
const DESCRIPTION_MAX_LEN: usize = 500;

/// Compiled page templates
pub struct Templates {
    tera: Tera,
}

impl Templates {
    pub fn new() -> Result<Self, tera::Error> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            (INDEX, include_str!("../templates/index.html")),
            (EDIT, include_str!("../templates/edit.html")),
        ])?;
        Ok(Self { tera })
    }

    /// List page with the creation form
    pub fn render_index(&self, todos: &[Todo]) -> Result<String, tera::Error> {
        let mut ctx = base_context();
        ctx.insert("todos", todos);
        self.tera.render(INDEX, &ctx)
    }

    /// Edit form pre-filled with the current values
    pub fn render_edit(&self, todo: &Todo) -> Result<String, tera::Error> {
        let mut ctx = base_context();
        ctx.insert("todo", todo);
        self.tera.render(EDIT, &ctx)
    }
}

fn base_context() -> Context {
    let mut ctx = Context::new();
    ctx.insert("title_max", &TITLE_MAX_LEN);
    ctx.insert("description_max", &DESCRIPTION_MAX_LEN);
    ctx
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn todo(id: i64, title: &str) -> Todo {
        Todo {
            id,
            title: title.to_string(),
            description: "desc".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_index_lists_todos() {
        let templates = Templates::new().unwrap();
        let html = templates
            .render_index(&[todo(3, "first"), todo(9, "second")])
            .unwrap();
        assert!(html.contains("first"));
        assert!(html.contains("second"));
        assert!(html.contains("/edit/9"));
        assert!(html.contains(r#"action="/delete/3" method="POST""#));
        assert!(html.contains("2024-05-01 09:30"));
    }

    #[test]
    fn test_index_empty() {
        let templates = Templates::new().unwrap();
        let html = templates.render_index(&[]).unwrap();
        assert!(html.contains("No Todos found"));
    }

    #[test]
    fn test_edit_prefilled_and_escaped() {
        let templates = Templates::new().unwrap();
        let html = templates.render_edit(&todo(4, "<script>x</script>")).unwrap();
        assert!(html.contains(r#"action="/edit/4""#));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>x"));
    }
}
