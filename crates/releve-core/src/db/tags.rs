//! Tags, tagging rules, and transaction-tag associations

use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Tag, TaggingRule, TaggingRuleWithTag};

/// Color given to tags created without one
pub const DEFAULT_TAG_COLOR: &str = "#6b7280";

/// Accepts `#rrggbb`
fn is_hex_color(color: &str) -> bool {
    color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit())
}

fn row_to_tag(row: &rusqlite::Row<'_>) -> rusqlite::Result<Tag> {
    let created_at_str: String = row.get(3)?;
    Ok(Tag {
        id: row.get(0)?,
        name: row.get(1)?,
        color: row.get(2)?,
        created_at: parse_datetime(&created_at_str),
    })
}

fn row_to_rule_with_tag(row: &rusqlite::Row<'_>) -> rusqlite::Result<TaggingRuleWithTag> {
    let created_at_str: String = row.get(4)?;
    Ok(TaggingRuleWithTag {
        rule: TaggingRule {
            id: row.get(0)?,
            keyword: row.get(1)?,
            tag_id: row.get(2)?,
            priority: row.get(3)?,
            created_at: parse_datetime(&created_at_str),
        },
        tag_name: row.get(5)?,
    })
}

impl Database {
    // ========== Tags ==========

    /// Create a tag. Names are unique; color defaults to grey.
    pub fn create_tag(&self, name: &str, color: Option<&str>) -> Result<i64> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Tag("Tag name cannot be empty".into()));
        }

        let color = color.unwrap_or(DEFAULT_TAG_COLOR);
        if !is_hex_color(color) {
            return Err(Error::Tag(format!(
                "Invalid color '{}': expected #rrggbb",
                color
            )));
        }

        if self.get_tag_by_name(name)?.is_some() {
            return Err(Error::Tag(format!("Tag '{}' already exists", name)));
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO tags (name, color) VALUES (?, ?)",
            params![name, color],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// List all tags by name
    pub fn list_tags(&self) -> Result<Vec<Tag>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, name, color, created_at FROM tags ORDER BY name")?;

        let tags = stmt
            .query_map([], row_to_tag)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(tags)
    }

    /// Get a tag by ID
    pub fn get_tag(&self, id: i64) -> Result<Option<Tag>> {
        let conn = self.conn()?;
        let tag = conn
            .query_row(
                "SELECT id, name, color, created_at FROM tags WHERE id = ?",
                params![id],
                row_to_tag,
            )
            .optional()?;
        Ok(tag)
    }

    /// Get a tag by name (case-insensitive)
    pub fn get_tag_by_name(&self, name: &str) -> Result<Option<Tag>> {
        let conn = self.conn()?;
        let tag = conn
            .query_row(
                "SELECT id, name, color, created_at FROM tags WHERE name = ? COLLATE NOCASE",
                params![name.trim()],
                row_to_tag,
            )
            .optional()?;
        Ok(tag)
    }

    /// Delete a tag.
    ///
    /// Its associations and rules go with it; transactions are untouched.
    pub fn delete_tag(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM tags WHERE id = ?", params![id])?;
        Ok(deleted > 0)
    }

    /// Tags attached to a transaction
    pub fn get_transaction_tags(&self, transaction_id: i64) -> Result<Vec<Tag>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT t.id, t.name, t.color, t.created_at
            FROM transaction_tags tt
            JOIN tags t ON t.id = tt.tag_id
            WHERE tt.transaction_id = ?
            ORDER BY t.name
            "#,
        )?;

        let tags = stmt
            .query_map(params![transaction_id], row_to_tag)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(tags)
    }

    // ========== Tagging rules ==========

    /// Create a keyword rule for a tag
    pub fn create_tagging_rule(&self, keyword: &str, tag_id: i64, priority: i64) -> Result<i64> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(Error::InvalidData("Rule keyword cannot be empty".into()));
        }

        if self.get_tag(tag_id)?.is_none() {
            return Err(Error::NotFound(format!("Tag {} not found", tag_id)));
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO tagging_rules (keyword, tag_id, priority) VALUES (?, ?, ?)",
            params![keyword, tag_id, priority],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// List rules in evaluation order: priority descending, then oldest first
    pub fn list_tagging_rules(&self) -> Result<Vec<TaggingRuleWithTag>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT r.id, r.keyword, r.tag_id, r.priority, r.created_at, t.name
            FROM tagging_rules r
            JOIN tags t ON t.id = r.tag_id
            ORDER BY r.priority DESC, r.id ASC
            "#,
        )?;

        let rules = stmt
            .query_map([], row_to_rule_with_tag)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rules)
    }

    /// Delete a rule
    pub fn delete_tagging_rule(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM tagging_rules WHERE id = ?", params![id])?;
        Ok(deleted > 0)
    }
}
