//! Tag and rule command implementations

use anyhow::Result;
use releve_core::db::Database;
use releve_core::models::Tag;
use releve_core::TagRuleMatcher;

/// Find a tag by numeric ID, falling back to its name
fn resolve_tag_arg(db: &Database, id_or_name: &str) -> Result<Tag> {
    if let Ok(id) = id_or_name.parse::<i64>() {
        if let Some(tag) = db.get_tag(id)? {
            return Ok(tag);
        }
    }

    db.get_tag_by_name(id_or_name)?
        .ok_or_else(|| anyhow::anyhow!("Tag not found: {}", id_or_name))
}

pub fn cmd_tags_list(db: &Database) -> Result<()> {
    let tags = db.list_tags()?;

    if tags.is_empty() {
        println!("No tags yet. Create one with: releve tags add Courses");
        return Ok(());
    }

    println!();
    println!("🏷️  Tags");
    println!("   ─────────────────────────────────────────────────────────────");

    for tag in tags {
        println!("   [{}] {} [{}]", tag.id, tag.name, tag.color);
    }

    Ok(())
}

pub fn cmd_tags_add(db: &Database, name: &str, color: Option<&str>) -> Result<()> {
    let tag_id = db.create_tag(name, color)?;
    println!("✅ Created tag '{}' (id: {})", name.trim(), tag_id);

    Ok(())
}

pub fn cmd_tags_remove(db: &Database, id: i64) -> Result<()> {
    let tag = db
        .get_tag(id)?
        .ok_or_else(|| anyhow::anyhow!("Tag {} not found", id))?;

    db.delete_tag(id)?;
    println!("✅ Removed tag '{}' and its rules", tag.name);

    Ok(())
}

pub fn cmd_rules_list(db: &Database) -> Result<()> {
    let rules = db.list_tagging_rules()?;

    if rules.is_empty() {
        println!("No tagging rules. Add one with:");
        println!("  releve rules add carrefour --tag Courses --priority 10");
        return Ok(());
    }

    println!();
    println!("📋 Tagging Rules (evaluated by priority, every match applies)");
    println!("   ─────────────────────────────────────────────────────────────");

    for r in rules {
        println!(
            "   [{}] \"{}\" → {} (priority: {})",
            r.rule.id, r.rule.keyword, r.tag_name, r.rule.priority
        );
    }

    Ok(())
}

pub fn cmd_rules_add(db: &Database, keyword: &str, tag: &str, priority: i64) -> Result<()> {
    let tag = resolve_tag_arg(db, tag)?;

    let rule_id = db.create_tagging_rule(keyword, tag.id, priority)?;
    println!(
        "✅ Created rule {} : \"{}\" → {} (priority: {})",
        rule_id,
        keyword.trim(),
        tag.name,
        priority
    );

    Ok(())
}

pub fn cmd_rules_remove(db: &Database, id: i64) -> Result<()> {
    if !db.delete_tagging_rule(id)? {
        anyhow::bail!("Rule {} not found", id);
    }
    println!("✅ Removed rule {}", id);

    Ok(())
}

pub fn cmd_rules_test(db: &Database, label: &str) -> Result<()> {
    let matcher = TagRuleMatcher::from_db(db)?;
    let matches = matcher.matching_rules(label);

    println!();
    println!("🧪 Testing: \"{}\"", label);

    if matches.is_empty() {
        println!("   No rules match; the transaction would be left untagged.");
        return Ok(());
    }

    for rule in matches {
        let tag_name = db
            .get_tag(rule.tag_id)?
            .map(|t| t.name)
            .unwrap_or_else(|| format!("#{}", rule.tag_id));
        println!(
            "   ✓ \"{}\" → {} (priority: {})",
            rule.keyword, tag_name, rule.priority
        );
    }

    Ok(())
}
